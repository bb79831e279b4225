//! Tests for Store backends
//!
//! Every test runs against both the memory and the file backend:
//! - Typed set/get and missing keys
//! - Inclusive range scans, ordering and predicates
//! - Decode failures and type mismatches ending a scan
//! - Cancellation and deadlines
//! - Delete and close semantics
//! - Concurrent writers

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rowstore::record::{accept_all, BincodeCodec, Message, MessageCodec};
use rowstore::store::{FileStore, MemoryStore};
use rowstore::{RecordIterator, RowError, ScanContext, Store, StoreExt};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    username: String,
    created: i64,
}

impl Message for User {
    const TYPE_NAME: &'static str = "example.User";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LogLine {
    message: String,
}

impl Message for LogLine {
    const TYPE_NAME: &'static str = "example.LogLine";
}

fn user(name: &str) -> User {
    User {
        username: name.to_string(),
        created: 1_500_000_000,
    }
}

struct Backend {
    name: &'static str,
    store: Arc<dyn Store>,
    _dir: Option<TempDir>,
}

fn backends() -> Vec<Backend> {
    let dir = TempDir::new().unwrap();
    let file = FileStore::open("users", dir.path().join("users"), Duration::from_secs(1)).unwrap();
    vec![
        Backend {
            name: "memory",
            store: Arc::new(MemoryStore::new()),
            _dir: None,
        },
        Backend {
            name: "file",
            store: Arc::new(file),
            _dir: Some(dir),
        },
    ]
}

fn codec() -> MessageCodec<User> {
    MessageCodec::new()
}

/// Keys {5}, {6}, {8}
fn seed_scenario(store: &dyn Store) {
    for key in [5u8, 6, 8] {
        store.set(&[key], &user(&format!("user{}", key)), &codec()).unwrap();
    }
}

fn scan_users(store: &dyn Store, from: &[u8], to: &[u8]) -> RecordIterator<User> {
    store.scan(&ScanContext::background(), from, to, codec(), accept_all)
}

fn collect_keys(iter: RecordIterator<User>) -> Vec<Vec<u8>> {
    iter.map(|item| item.unwrap().0).collect()
}

// =============================================================================
// Get / Set
// =============================================================================

#[test]
fn test_set_get_round_trip() {
    for backend in backends() {
        let store = backend.store.as_ref();
        let alice = user("alice");
        store.set(b"alice", &alice, &codec()).unwrap();
        assert_eq!(store.get(b"alice", &codec()).unwrap(), alice, "{}", backend.name);
    }
}

#[test]
fn test_get_missing_key() {
    for backend in backends() {
        let result: Result<User, _> = backend.store.get(b"nobody", &codec());
        assert!(matches!(result, Err(RowError::KeyNotFound)), "{}", backend.name);
    }
}

#[test]
fn test_overwrite_last_writer_wins() {
    for backend in backends() {
        let store = backend.store.as_ref();
        store.set(b"k", &user("first"), &codec()).unwrap();
        store.set(b"k", &user("second"), &codec()).unwrap();
        assert_eq!(store.get(b"k", &codec()).unwrap().username, "second", "{}", backend.name);
        assert_eq!(collect_keys(scan_users(store, b"k", b"k")).len(), 1);
    }
}

#[test]
fn test_empty_key_is_a_key() {
    for backend in backends() {
        let store = backend.store.as_ref();
        store.set(b"", &user("empty"), &codec()).unwrap();
        assert_eq!(store.get(b"", &codec()).unwrap().username, "empty", "{}", backend.name);
        assert_eq!(collect_keys(scan_users(store, b"", b"")), vec![Vec::<u8>::new()]);
    }
}

#[test]
fn test_get_with_wrong_type_is_codec_error() {
    for backend in backends() {
        let store = backend.store.as_ref();
        store.set(b"k", &user("alice"), &codec()).unwrap();
        let result = store.get(b"k", &MessageCodec::<LogLine>::new());
        assert!(matches!(result, Err(RowError::Codec(_))), "{}", backend.name);
    }
}

// =============================================================================
// Range Scans
// =============================================================================

#[test]
fn test_scan_scenario_ranges() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        assert!(collect_keys(scan_users(store, &[4], &[4])).is_empty(), "{}", backend.name);
        assert_eq!(
            collect_keys(scan_users(store, &[5], &[8])),
            vec![vec![5], vec![6], vec![8]],
            "{}",
            backend.name
        );
        assert_eq!(collect_keys(scan_users(store, &[6], &[6])), vec![vec![6]]);
        assert!(collect_keys(scan_users(store, &[9], &[13])).is_empty());
        assert_eq!(collect_keys(scan_users(store, &[0], &[13])).len(), 3);
    }
}

#[test]
fn test_scan_reversed_range_is_empty() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let mut iter = scan_users(store, &[8], &[5]);
        assert!(!iter.has_next(), "{}", backend.name);
        assert!(matches!(iter.value(), Err(RowError::IteratorDone)));
    }
}

#[test]
fn test_scan_empty_store() {
    for backend in backends() {
        let mut iter = scan_users(backend.store.as_ref(), &[0], &[255]);
        assert!(!iter.has_next(), "{}", backend.name);
        assert!(matches!(iter.value(), Err(RowError::IteratorDone)));
    }
}

#[test]
fn test_scan_empty_range_pull_loop_has_no_error() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        for (from, to) in [([4u8], [4u8]), ([9], [13]), ([7], [7])] {
            let mut iter = scan_users(store, &from, &to);
            let mut pulled = Vec::new();
            while iter.has_next() {
                pulled.push(iter.value());
            }
            assert!(pulled.is_empty(), "{}: {:?}..={:?} gave {:?}", backend.name, from, to, pulled);
        }
    }
}

#[test]
fn test_scan_orders_by_bytes_not_insertion() {
    for backend in backends() {
        let store = backend.store.as_ref();
        let inserted: [&[u8]; 5] = [b"delta", b"alpha", b"charlie", b"bravo", b"alphabet"];
        for key in inserted {
            store.set(key, &user("x"), &codec()).unwrap();
        }

        let keys = collect_keys(scan_users(store, b"a", b"z"));
        assert_eq!(
            keys,
            vec![
                b"alpha".to_vec(),
                b"alphabet".to_vec(),
                b"bravo".to_vec(),
                b"charlie".to_vec(),
                b"delta".to_vec(),
            ],
            "{}",
            backend.name
        );
    }
}

#[test]
fn test_scan_bounds_are_inclusive_byte_prefixes() {
    for backend in backends() {
        let store = backend.store.as_ref();
        for key in [vec![1u8], vec![1, 0], vec![2], vec![2, 0]] {
            store.set(&key, &user("x"), &codec()).unwrap();
        }

        // [2, 0] sorts after [2], so it is outside [1]..=[2]
        let keys = collect_keys(scan_users(store, &[1], &[2]));
        assert_eq!(keys, vec![vec![1], vec![1, 0], vec![2]], "{}", backend.name);
    }
}

#[test]
fn test_scan_value_protocol() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let mut iter = scan_users(store, &[5], &[6]);
        assert!(iter.has_next());
        let (key, record) = iter.value().unwrap();
        assert_eq!(key, vec![5]);
        assert_eq!(record.username, "user5");

        assert!(iter.has_next());
        assert_eq!(iter.value().unwrap().0, vec![6]);

        assert!(!iter.has_next(), "{}", backend.name);
        assert!(matches!(iter.value(), Err(RowError::IteratorDone)));
        assert!(matches!(iter.value(), Err(RowError::IteratorDone)));
    }
}

#[test]
fn test_scan_predicate_filters() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let iter = store.scan(
            &ScanContext::background(),
            &[0],
            &[13],
            codec(),
            |u: &User| u.username != "user6",
        );
        assert_eq!(collect_keys(iter), vec![vec![5], vec![8]], "{}", backend.name);
    }
}

#[test]
fn test_scan_rejecting_predicate() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let mut iter = store.scan(&ScanContext::background(), &[0], &[13], codec(), |_: &User| false);
        assert!(!iter.has_next(), "{}", backend.name);
        assert!(matches!(iter.value(), Err(RowError::IteratorDone)));
    }
}

#[test]
fn test_scan_decode_failure_ends_scan() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);
        store.set_raw(&[6], &[0xFF, 0x00, 0x01]).unwrap();

        let mut iter = scan_users(store, &[5], &[8]);
        assert_eq!(iter.value().unwrap().0, vec![5]);

        assert!(iter.has_next(), "{}", backend.name);
        assert!(matches!(iter.value(), Err(RowError::Codec(_))));

        // Terminal: key 8 is never produced
        assert!(!iter.has_next());
        assert!(matches!(iter.value(), Err(RowError::Codec(_))));
    }
}

#[test]
fn test_scan_type_mismatch_ends_scan() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let mut iter = store.scan(
            &ScanContext::background(),
            &[0],
            &[13],
            MessageCodec::<LogLine>::new(),
            accept_all,
        );
        assert!(matches!(iter.value(), Err(RowError::Codec(_))), "{}", backend.name);
    }
}

#[test]
fn test_scan_with_plain_bincode_codec() {
    for backend in backends() {
        let store = backend.store.as_ref();
        let codec = BincodeCodec::<u64>::new();
        for n in [3u64, 1, 2] {
            store.set(&n.to_be_bytes(), &n, &codec).unwrap();
        }

        let values: Vec<u64> = store
            .scan(&ScanContext::background(), &0u64.to_be_bytes(), &u64::MAX.to_be_bytes(), codec, accept_all)
            .map(|item| item.unwrap().1)
            .collect();
        assert_eq!(values, vec![1, 2, 3], "{}", backend.name);
    }
}

// =============================================================================
// Cancellation and Deadlines
// =============================================================================

#[test]
fn test_scan_cancelled_before_start() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let (ctx, handle) = ScanContext::cancellable();
        handle.cancel();

        let mut iter = store.scan(&ctx, &[0], &[13], codec(), accept_all);
        assert!(iter.has_next(), "{}", backend.name);
        assert!(matches!(iter.value(), Err(RowError::Cancelled)));
        assert!(!iter.has_next());
    }
}

#[test]
fn test_scan_cancelled_mid_scan() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let (ctx, handle) = ScanContext::cancellable();
        let mut iter = store.scan(&ctx, &[0], &[13], codec(), accept_all);

        // First value pre-fetches key 6 before the cancel lands
        assert_eq!(iter.value().unwrap().0, vec![5]);
        handle.cancel();
        assert_eq!(iter.value().unwrap().0, vec![6]);

        assert!(matches!(iter.value(), Err(RowError::Cancelled)), "{}", backend.name);
        assert!(matches!(iter.value(), Err(RowError::Cancelled)));
    }
}

#[test]
fn test_scan_deadline_exceeded() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let ctx = ScanContext::timeout(Duration::from_millis(10));
        let mut iter = store.scan(&ctx, &[0], &[13], codec(), accept_all);
        thread::sleep(Duration::from_millis(50));

        let err = iter.value().unwrap_err();
        assert!(matches!(err, RowError::DeadlineExceeded), "{}", backend.name);
        assert!(err.is_cancellation());
    }
}

#[test]
fn test_dropping_cancel_handle_does_not_cancel() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let (ctx, handle) = ScanContext::cancellable();
        drop(handle);
        let iter = store.scan(&ctx, &[0], &[13], codec(), accept_all);
        assert_eq!(collect_keys(iter).len(), 3, "{}", backend.name);
    }
}

// =============================================================================
// Delete and Close
// =============================================================================

#[test]
fn test_delete_removes_from_get_and_scan() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        store.delete(&[6]).unwrap();
        let result: Result<User, _> = store.get(&[6], &codec());
        assert!(matches!(result, Err(RowError::KeyNotFound)), "{}", backend.name);
        assert_eq!(collect_keys(scan_users(store, &[0], &[13])), vec![vec![5], vec![8]]);

        // Deleting an absent key is not an error
        store.delete(&[6]).unwrap();
    }
}

#[test]
fn test_close_is_idempotent_and_final() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        store.close().unwrap();
        store.close().unwrap();

        assert!(matches!(store.get_raw(&[5]), Err(RowError::StoreClosed)), "{}", backend.name);
        assert!(matches!(store.set_raw(&[1], b"x"), Err(RowError::StoreClosed)));
        assert!(matches!(store.delete(&[5]), Err(RowError::StoreClosed)));

        let mut iter = scan_users(store, &[0], &[13]);
        assert!(iter.has_next());
        assert!(matches!(iter.value(), Err(RowError::StoreClosed)));
    }
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_writers_then_scan() {
    for backend in backends() {
        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let store = Arc::clone(&backend.store);
                thread::spawn(move || {
                    for i in 0..25u8 {
                        store.set(&[t, i], &user(&format!("{}-{}", t, i)), &codec()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let keys = collect_keys(scan_users(backend.store.as_ref(), &[0], &[255, 255]));
        assert_eq!(keys.len(), 100, "{}", backend.name);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_reads_during_open_scan() {
    for backend in backends() {
        let store = backend.store.as_ref();
        seed_scenario(store);

        let mut iter = scan_users(store, &[0], &[13]);
        assert_eq!(iter.value().unwrap().0, vec![5]);

        // An open scan never blocks point reads or writes
        assert_eq!(store.get(&[8], &codec()).unwrap().username, "user8");
        store.set(&[200], &user("late"), &codec()).unwrap();

        let rest: Vec<Vec<u8>> = iter.map(|r| r.unwrap().0).collect();
        assert_eq!(rest, vec![vec![6], vec![8]], "{}", backend.name);
    }
}
