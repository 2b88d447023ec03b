use crate::{Entry, EntryInput, SearchMode, Store};
use codec::{record_on_disk_size, DATA_HEADER_SIZE, INDEX_HEADER_SIZE, INDEX_RECORD_SIZE};
use config::StoreConfig;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use tempfile::tempdir;

fn open(dir: &std::path::Path) -> Store {
    Store::open(StoreConfig::new(dir, "ledger")).expect("open")
}

fn append_n(store: &Store, n: u64, data_prefix: &str) {
    let entries: Vec<EntryInput> = (0..n)
        .map(|i| EntryInput::new(format!("{data_prefix}{i}").into_bytes()))
        .collect();
    let appended = store.append(&entries).expect("append");
    assert_eq!(appended, n);
}

#[test]
fn basic_append_and_read_round_trip() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());

    append_n(&store, 5, "row");

    assert_eq!(store.first_seqnum(), 1);
    assert_eq!(store.last_seqnum(), 5);
    assert_eq!(store.len(), 5);

    let mut out = vec![Entry::empty_slot(); 3];
    let n = store.read(2, &mut out).unwrap();
    assert_eq!(n, 3);
    assert_eq!(out[0].data(), b"row1");
    assert_eq!(out[1].data(), b"row2");
    assert_eq!(out[2].data(), b"row3");
}

#[test]
fn read_pads_unused_slots_past_last_seqnum() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    append_n(&store, 2, "row");

    let mut out = vec![Entry::empty_slot(); 5];
    let n = store.read(1, &mut out).unwrap();
    assert_eq!(n, 2);
    assert_eq!(out[2].seqnum, 0);
    assert_eq!(out[4].seqnum, 0);
}

#[test]
fn read_before_first_seqnum_returns_nothing() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    append_n(&store, 3, "row");

    let mut out = vec![Entry::empty_slot(); 2];
    let n = store.read(100, &mut out).unwrap();
    assert_eq!(n, 0);
    assert!(out.iter().all(|e| e.seqnum == 0));
}

#[test]
fn append_accepts_any_explicit_seqnum_as_the_first_on_an_empty_store() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());

    let batch = vec![
        EntryInput::new(b"m1".to_vec()).with_seqnum(1000).with_timestamp(42),
        EntryInput::new(b"m2".to_vec()).with_timestamp(42),
        EntryInput::new(b"m3".to_vec()),
    ];
    let appended = store.append(&batch).unwrap();
    assert_eq!(appended, 3);

    assert_eq!(store.first_seqnum(), 1000);
    assert_eq!(store.last_seqnum(), 1002);

    let mut out = vec![Entry::empty_slot(); 3];
    let n = store.read(1000, &mut out).unwrap();
    assert_eq!(n, 3);
    assert_eq!(out[0].seqnum, 1000);
    assert_eq!(out[0].timestamp, 42);
    assert_eq!(out[1].seqnum, 1001);
    assert_eq!(out[1].timestamp, 42);
    assert_eq!(out[2].seqnum, 1002);
    assert!(out[2].timestamp >= 42);
}

#[test]
fn append_rejects_noncorrelative_seqnum() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    append_n(&store, 2, "row");

    let bad = EntryInput::new(b"late".to_vec()).with_seqnum(10);
    let err = store.append(&[bad]).unwrap_err();
    assert_eq!(err.appended, 0);
    assert_eq!(store.last_seqnum(), 2, "rejected entry must not be applied");
}

#[test]
fn append_rejects_decreasing_explicit_timestamp() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());

    store
        .append(&[EntryInput::new(b"a".to_vec()).with_timestamp(100)])
        .unwrap();
    let err = store
        .append(&[EntryInput::new(b"b".to_vec()).with_timestamp(50)])
        .unwrap_err();
    assert_eq!(err.appended, 0);
    assert_eq!(store.last_timestamp(), 100);
}

#[test]
fn append_batch_partial_success_keeps_entries_before_failure() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());

    let batch = vec![
        EntryInput::new(b"a".to_vec()),
        EntryInput::new(b"b".to_vec()),
        EntryInput::new(b"c".to_vec()).with_seqnum(99),
    ];
    let err = store.append(&batch).unwrap_err();
    assert_eq!(err.appended, 2);
    assert_eq!(store.last_seqnum(), 2);
}

#[test]
fn search_finds_lower_and_upper_bounds_with_duplicate_timestamps() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());

    let batch = vec![
        EntryInput::new(b"a".to_vec()).with_timestamp(10),
        EntryInput::new(b"b".to_vec()).with_timestamp(10),
        EntryInput::new(b"c".to_vec()).with_timestamp(20),
        EntryInput::new(b"d".to_vec()).with_timestamp(20),
        EntryInput::new(b"e".to_vec()).with_timestamp(30),
    ];
    store.append(&batch).unwrap();

    assert_eq!(store.search(10, SearchMode::Lower).unwrap(), Some(1));
    assert_eq!(store.search(20, SearchMode::Lower).unwrap(), Some(3));
    assert_eq!(store.search(20, SearchMode::Upper).unwrap(), Some(5));
    assert_eq!(store.search(15, SearchMode::Lower).unwrap(), Some(3));
    assert_eq!(store.search(30, SearchMode::Upper).unwrap(), None);
    assert_eq!(store.search(0, SearchMode::Lower).unwrap(), Some(1));
}

#[test]
fn stats_aggregates_over_a_seqnum_range() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    append_n(&store, 4, "xy");

    let stats = store.stats(2, 3).unwrap().unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.first_seqnum, 2);
    assert_eq!(stats.last_seqnum, 3);
    assert_eq!(stats.index_size, 2 * codec::INDEX_RECORD_SIZE);
    let expected_data_size =
        codec::record_on_disk_size(0, "xy1".len() as u32) + codec::record_on_disk_size(0, "xy2".len() as u32);
    assert_eq!(stats.data_size, expected_data_size);
}

#[test]
fn rollback_trims_suffix_and_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = open(dir.path());
        append_n(&store, 5, "row");
        let removed = store.rollback(3).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.last_seqnum(), 3);
    }

    let store = open(dir.path());
    assert_eq!(store.last_seqnum(), 3);
    assert_eq!(store.first_seqnum(), 1);
    let mut out = vec![Entry::empty_slot(); 1];
    assert_eq!(store.read(4, &mut out).unwrap(), 0);
}

#[test]
fn rollback_below_first_seqnum_empties_the_store_without_erroring() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    // first_seqnum will be 20; a threshold strictly between 0 and
    // first_seqnum still empties the store rather than failing, per spec.
    store
        .append(&[EntryInput::new(b"a".to_vec()).with_seqnum(20)])
        .unwrap();
    append_n(&store, 4, "row");
    assert_eq!(store.first_seqnum(), 20);
    assert_eq!(store.last_seqnum(), 24);

    let removed = store.rollback(5).unwrap();
    assert_eq!(removed, 5);
    assert!(store.is_empty());
}

#[test]
fn rollback_to_zero_empties_the_store_but_keeps_milestone() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    append_n(&store, 3, "row");
    store.update_milestone(42).unwrap();

    store.rollback(0).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.milestone(), 42);

    let appended = store.append(&[EntryInput::new(b"fresh".to_vec())]).unwrap();
    assert_eq!(appended, 1);
    assert_eq!(store.first_seqnum(), 1);

    let mut out = vec![Entry::empty_slot(); 1];
    let n = store.read(1, &mut out).unwrap();
    assert_eq!(n, 1);
    assert_eq!(out[0].data(), b"fresh");
}

#[test]
fn purge_trims_prefix_and_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = open(dir.path());
        append_n(&store, 5, "row");
        let removed = store.purge(3).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.first_seqnum(), 3);
        assert_eq!(store.last_seqnum(), 5);
    }

    let store = open(dir.path());
    assert_eq!(store.first_seqnum(), 3);
    assert_eq!(store.last_seqnum(), 5);
    let mut out = vec![Entry::empty_slot(); 3];
    let n = store.read(3, &mut out).unwrap();
    assert_eq!(n, 3);
    assert_eq!(out[0].data(), b"row2");
}

#[test]
fn purge_preserves_milestone_by_default() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    append_n(&store, 4, "row");
    store.update_milestone(7).unwrap();

    store.purge(3).unwrap();
    assert_eq!(store.milestone(), 7);
}

#[test]
fn milestone_update_persists_across_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = open(dir.path());
        append_n(&store, 1, "row");
        store.update_milestone(123).unwrap();
    }
    let store = open(dir.path());
    assert_eq!(store.milestone(), 123);
}

#[test]
fn index_is_rebuilt_from_data_when_index_file_is_corrupt() {
    let dir = tempdir().unwrap();
    {
        let store = open(dir.path());
        append_n(&store, 4, "row");
    }

    let idx_path = dir.path().join("ledger.idx");
    let mut idx_file = OpenOptions::new().write(true).open(&idx_path).unwrap();
    idx_file.seek(SeekFrom::Start(0)).unwrap();
    idx_file.write_all(b"\xff\xff\xff\xff\xff\xff\xff\xff").unwrap();
    idx_file.flush().unwrap();
    drop(idx_file);

    let store = open(dir.path());
    assert_eq!(store.first_seqnum(), 1);
    assert_eq!(store.last_seqnum(), 4);

    let mut out = vec![Entry::empty_slot(); 4];
    let n = store.read(1, &mut out).unwrap();
    assert_eq!(n, 4);
    assert_eq!(out[3].data(), b"row3");
}

#[test]
fn rebuilt_index_does_not_retain_a_stale_tail_past_the_recovered_records() {
    let dir = tempdir().unwrap();
    {
        let store = open(dir.path());
        append_n(&store, 5, "row");
    }

    // Every record here is "rowN": 4 bytes of data, no metadata, so every
    // on-disk record is the same size and offsets are easy to compute.
    let rec_size = record_on_disk_size(0, 4);
    let fifth_offset = DATA_HEADER_SIZE + 4 * rec_size;

    // Truncate mid-header of the 5th record so the deep data walk treats it
    // as a torn tail: only 4 records (seqnums 1..=4) survive the rebuild,
    // even though the pre-corruption index file physically held 5.
    let dat_path = dir.path().join("ledger.dat");
    let dat_file = OpenOptions::new().write(true).open(&dat_path).unwrap();
    dat_file.set_len(fifth_offset + rec_size - 1).unwrap();
    drop(dat_file);

    // Corrupt the index header's magic so the opener falls back to a full
    // rebuild from the data file (spec §4.5 step 12), while the index file
    // itself is still physically sized for all 5 original records.
    let idx_path = dir.path().join("ledger.idx");
    let mut idx_file = OpenOptions::new().write(true).open(&idx_path).unwrap();
    idx_file.seek(SeekFrom::Start(0)).unwrap();
    idx_file.write_all(b"\xff\xff\xff\xff\xff\xff\xff\xff").unwrap();
    idx_file.flush().unwrap();
    drop(idx_file);

    let store = open(dir.path());
    assert_eq!(store.first_seqnum(), 1);
    assert_eq!(store.last_seqnum(), 4);
    drop(store);

    // The rebuilt index file must be truncated to exactly the 4 recovered
    // records: nothing but zero bytes may remain past the last one.
    let expected_len = INDEX_HEADER_SIZE + 4 * INDEX_RECORD_SIZE;
    let actual_len = std::fs::metadata(&idx_path).unwrap().len();
    assert_eq!(actual_len, expected_len);

    // A fresh fast-path open (check_on_open = false) must also see exactly
    // 4 records: scan_index_tail_backwards would otherwise pick up a stale
    // 5th index record surviving past the rebuilt tail.
    let fast_cfg = StoreConfig::new(dir.path(), "ledger").with_check_on_open(false);
    let store = Store::open(fast_cfg).expect("fast reopen");
    assert_eq!(store.first_seqnum(), 1);
    assert_eq!(store.last_seqnum(), 4);

    let mut out = vec![Entry::empty_slot(); 4];
    let n = store.read(1, &mut out).unwrap();
    assert_eq!(n, 4);
    assert_eq!(out[3].data(), b"row3");
}

#[test]
fn corrupted_data_record_is_detected_via_checksum_on_deep_open() {
    let dir = tempdir().unwrap();
    {
        let cfg = StoreConfig::new(dir.path(), "ledger").with_check_on_open(true);
        let store = Store::open(cfg).unwrap();
        append_n(&store, 3, "row");
    }

    let dat_path = dir.path().join("ledger.dat");
    let mut f = OpenOptions::new().write(true).open(&dat_path).unwrap();
    // Flip a byte inside the second record's payload.
    let offset = codec::DATA_HEADER_SIZE + codec::record_on_disk_size(0, 4) + codec::DATA_RECORD_HEADER_SIZE;
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.write_all(b"X").unwrap();
    f.flush().unwrap();
    drop(f);

    let cfg = StoreConfig::new(dir.path(), "ledger").with_check_on_open(true);
    let result = Store::open(cfg);
    assert!(result.is_err(), "checksum mismatch must be detected under deep open");
}

#[test]
fn empty_store_reports_zeroed_state() {
    let dir = tempdir().unwrap();
    let store = open(dir.path());
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
    assert_eq!(store.first_seqnum(), 0);
    assert_eq!(store.last_seqnum(), 0);
    assert!(store.stats(1, 10).unwrap().is_none());
    assert_eq!(store.search(5, SearchMode::Lower).unwrap(), None);
}
