//! Concurrent stress coverage for the dispatcher's core correctness
//! contract: under arbitrary interleaving of submissions and completions,
//! no two distinct queries ever share a `queryId`, and every submitter
//! receives exactly the result its own job produced.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use counters_dispatch::{QueryDispatcher, QueryResult};
use counters_storage::SqliteStore;

fn open_temp_db() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dispatch.sqlite");
    // Opening via SqliteStore first enables WAL mode and creates the
    // schema, matching the real deployment where the writer opens the
    // file before any worker reads it.
    let _store = SqliteStore::open(&path).unwrap();
    (dir, path)
}

#[test]
fn fifty_concurrent_submissions_never_collide_or_misroute() {
    let (_dir, path) = open_temp_db();
    let dispatcher = Arc::new(QueryDispatcher::new(&path, 8).unwrap());

    let handles: Vec<_> = (0..60)
        .map(|tag: i64| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                let job: counters_dispatch::Job = Box::new(move |_conn| Ok(QueryResult::Count(tag)));
                let result = dispatcher
                    .submit(job, Duration::from_secs(2), Duration::from_secs(2))
                    .expect("submission should succeed");
                match result {
                    QueryResult::Count(got) => assert_eq!(got, tag, "misrouted result"),
                    QueryResult::Facts(_) => panic!("expected a count result"),
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn timed_out_query_does_not_leak_into_a_later_submission() {
    let (_dir, path) = open_temp_db();
    let dispatcher = QueryDispatcher::new(&path, 1).unwrap();

    // A job that sleeps past its own query timeout: the submitter sees
    // DispatchError::Timeout, and the late result must land nowhere.
    let slow: counters_dispatch::Job = Box::new(|_conn| {
        std::thread::sleep(Duration::from_millis(200));
        Ok(QueryResult::Count(-1))
    });
    let err = dispatcher
        .submit(slow, Duration::from_secs(1), Duration::from_millis(20))
        .unwrap_err();
    assert!(matches!(err, counters_dispatch::DispatchError::Timeout));

    // Give the slow worker time to finish and attempt (and fail) delivery.
    std::thread::sleep(Duration::from_millis(400));

    let fast: counters_dispatch::Job = Box::new(|_conn| Ok(QueryResult::Count(42)));
    let result = dispatcher
        .submit(fast, Duration::from_secs(1), Duration::from_secs(1))
        .unwrap();
    match result {
        QueryResult::Count(got) => assert_eq!(got, 42),
        QueryResult::Facts(_) => panic!("expected a count result"),
    }
}
