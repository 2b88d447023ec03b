use config::StoreConfig;
use engine::{Entry, EntryInput, SearchMode, Store};

fn open(dir: &std::path::Path) -> Store {
    Store::open(StoreConfig::new(dir, "ledger")).unwrap()
}

#[test]
fn append_then_read_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open(dir.path());
        store
            .append(&[
                EntryInput::new(b"first".to_vec()),
                EntryInput::new(b"second".to_vec()),
            ])
            .unwrap();
        assert_eq!(store.last_seqnum(), 2);
    }

    let store = open(dir.path());
    let mut out = vec![Entry::empty_slot(); 2];
    let n = store.read(1, &mut out).unwrap();
    assert_eq!(n, 2);
    assert_eq!(out[0].data(), b"first");
    assert_eq!(out[1].data(), b"second");
}

#[test]
fn search_and_stats_agree_on_a_freshly_built_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path());

    let batch: Vec<EntryInput> = (0..10)
        .map(|i| EntryInput::new(format!("row{i}").into_bytes()).with_timestamp(100 + i))
        .collect();
    store.append(&batch).unwrap();

    let found = store.search(105, SearchMode::Lower).unwrap().unwrap();
    assert_eq!(found, 6);

    let stats = store.stats(1, 10).unwrap().unwrap();
    assert_eq!(stats.count, 10);
    assert_eq!(stats.first_seqnum, 1);
    assert_eq!(stats.last_seqnum, 10);
}

#[test]
fn rollback_and_purge_compose_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open(dir.path());
        let batch: Vec<EntryInput> = (0..8)
            .map(|i| EntryInput::new(format!("row{i}").into_bytes()))
            .collect();
        store.append(&batch).unwrap();
        store.rollback(6).unwrap();
        store.purge(3).unwrap();
        assert_eq!(store.first_seqnum(), 3);
        assert_eq!(store.last_seqnum(), 6);
    }

    let store = open(dir.path());
    assert_eq!(store.first_seqnum(), 3);
    assert_eq!(store.last_seqnum(), 6);
    assert_eq!(store.len(), 4);
}

#[test]
fn milestone_is_independent_of_record_trimming() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path());
    store
        .append(&[EntryInput::new(b"a".to_vec()), EntryInput::new(b"b".to_vec())])
        .unwrap();
    store.update_milestone(99).unwrap();
    store.purge(2).unwrap();
    assert_eq!(store.milestone(), 99);
}
