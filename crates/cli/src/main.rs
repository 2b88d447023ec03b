//! # CLI - ledgerdb interactive shell
//!
//! A REPL-style command-line interface over an `engine::Store`. Reads
//! commands from stdin, executes them against the store, and prints
//! results to stdout. Designed for both interactive use and scripted
//! testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! APPEND data [metadata]          Append one record, next seqnum + now()
//! READ seqnum [count]             Read count records starting at seqnum (default 1)
//! SEARCH timestamp [lower|upper]  Binary search by timestamp (default lower)
//! STATS [from] [to]               Range statistics (default: whole store)
//! ROLLBACK seqnum                 Trim every record above seqnum
//! PURGE seqnum                    Trim every record below seqnum
//! MILESTONE [value]               Print, or set, the milestone marker
//! INFO                            Print store debug info
//! EXIT / QUIT                     Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! LEDGERDB_DIR            Store directory       (default: ".")
//! LEDGERDB_NAME           Store name             (default: "ledger")
//! LEDGERDB_FSYNC          fsync every append     (default: "false")
//! LEDGERDB_CHECK_ON_OPEN  deep validate open     (default: "true")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! ledgerdb started (name=ledger, dir=., first=0, last=0, fsync=false)
//! > APPEND hello
//! OK seqnum=1
//! > READ 1
//! 1 hello
//! > EXIT
//! bye
//! ```
use anyhow::{Context, Result};
use engine::{Entry, EntryInput, SearchMode, Store};
use std::io::{self, BufRead, Write};

fn main() -> Result<()> {
    let config = config::StoreConfig::from_env();
    let store = Store::open(config.clone()).with_context(|| {
        format!(
            "failed to open store {:?} in {}",
            config.name,
            config.dir.display()
        )
    })?;

    println!(
        "ledgerdb started (name={}, dir={}, first={}, last={}, fsync={})",
        config.name,
        config.dir.display(),
        store.first_seqnum(),
        store.last_seqnum(),
        config.force_fsync
    );
    println!("Commands: APPEND data [metadata] | READ seqnum [count] | SEARCH ts [lower|upper]");
    println!("          STATS [from] [to] | ROLLBACK seqnum | PURGE seqnum | MILESTONE [value]");
    println!("          INFO | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "APPEND" => match parts.next() {
                    Some(data) => {
                        let metadata = parts.next().unwrap_or("");
                        let mut entry = EntryInput::new(data.as_bytes().to_vec());
                        if !metadata.is_empty() {
                            entry = entry.with_metadata(metadata.as_bytes().to_vec());
                        }
                        match store.append(&[entry]) {
                            Ok(_) => println!("OK seqnum={}", store.last_seqnum()),
                            Err(e) => println!(
                                "ERR append failed after {} entries: {}",
                                e.appended, e.error
                            ),
                        }
                    }
                    None => println!("ERR usage: APPEND data [metadata]"),
                },
                "READ" => match parse_u64(parts.next()) {
                    Some(seqnum) => {
                        let count: usize = parts
                            .next()
                            .and_then(|s| s.parse().ok())
                            .unwrap_or(1usize)
                            .max(1);
                        let mut out = vec![Entry::empty_slot(); count];
                        match store.read(seqnum, &mut out) {
                            Ok(n) => {
                                for entry in &out[..n] {
                                    println!(
                                        "{} {}",
                                        entry.seqnum,
                                        String::from_utf8_lossy(entry.data())
                                    );
                                }
                                if n == 0 {
                                    println!("(nil)");
                                }
                            }
                            Err(e) => println!("ERR read failed: {e}"),
                        }
                    }
                    None => println!("ERR usage: READ seqnum [count]"),
                },
                "SEARCH" => match parse_u64(parts.next()) {
                    Some(ts) => {
                        let mode = match parts.next().map(str::to_uppercase).as_deref() {
                            Some("UPPER") => SearchMode::Upper,
                            _ => SearchMode::Lower,
                        };
                        match store.search(ts, mode) {
                            Ok(Some(seqnum)) => println!("{seqnum}"),
                            Ok(None) => println!("(nil)"),
                            Err(e) => println!("ERR search failed: {e}"),
                        }
                    }
                    None => println!("ERR usage: SEARCH timestamp [lower|upper]"),
                },
                "STATS" => {
                    let from = parse_u64(parts.next()).unwrap_or_else(|| store.first_seqnum());
                    let to = parse_u64(parts.next()).unwrap_or_else(|| store.last_seqnum());
                    match store.stats(from, to) {
                        Ok(Some(s)) => println!(
                            "count={} index_size={} data_size={} first={} last={}",
                            s.count, s.index_size, s.data_size, s.first_seqnum, s.last_seqnum
                        ),
                        Ok(None) => println!("(empty)"),
                        Err(e) => println!("ERR stats failed: {e}"),
                    }
                }
                "ROLLBACK" => match parse_u64(parts.next()) {
                    Some(seqnum) => match store.rollback(seqnum) {
                        Ok(removed) => println!("OK removed={removed}"),
                        Err(e) => println!("ERR rollback failed: {e}"),
                    },
                    None => println!("ERR usage: ROLLBACK seqnum"),
                },
                "PURGE" => match parse_u64(parts.next()) {
                    Some(seqnum) => match store.purge(seqnum) {
                        Ok(removed) => println!("OK removed={removed}"),
                        Err(e) => println!("ERR purge failed: {e}"),
                    },
                    None => println!("ERR usage: PURGE seqnum"),
                },
                "MILESTONE" => match parts.next() {
                    Some(value) => match value.parse::<u64>() {
                        Ok(v) => match store.update_milestone(v) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR milestone update failed: {e}"),
                        },
                        Err(_) => println!("ERR usage: MILESTONE [value]"),
                    },
                    None => println!("{}", store.milestone()),
                },
                "INFO" => println!("{store:?}"),
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => println!("unknown command: {other}"),
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}

fn parse_u64(s: Option<&str>) -> Option<u64> {
    s.and_then(|s| s.parse().ok())
}
