//! The process-wide logger. Kept in its own test binary so no other test
//! can build the global engine first.

use std::{fs, sync::Barrier, thread};

use logs_plus::{Error, Field, LogConfig, configure, logger};
use serde_json::Value;
use uuid::Uuid;

#[test]
fn configured_global_logger_is_shared_across_threads() {
    const THREADS: usize = 8;
    let path = std::env::temp_dir().join(format!("logs-plus-global-{}.log", Uuid::new_v4()));
    configure(LogConfig {
        output_paths: vec![path.to_string_lossy().into_owned()],
        ..LogConfig::default()
    })
    .unwrap();
    assert!(matches!(
        configure(LogConfig::default()),
        Err(Error::AlreadyConfigured)
    ));

    let barrier = Barrier::new(THREADS);
    thread::scope(|scope| {
        for worker in 0..THREADS {
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                logger().debug(
                    "I am a Debug",
                    &[
                        Field::string("f0", "I go to school by bus"),
                        Field::uint("worker", worker as u64),
                    ],
                );
            });
        }
    });
    let (log, line) = (logger(), line!());
    log.sync().unwrap();

    assert_eq!(log.src_line(), line.to_string());
    let records: Vec<Value> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), THREADS);
    let mut workers: Vec<u64> = records
        .iter()
        .map(|r| r["context"]["worker"].as_u64().unwrap())
        .collect();
    workers.sort_unstable();
    assert_eq!(workers, (0..THREADS as u64).collect::<Vec<_>>());
    assert!(records.iter().all(|r| r["level"] == "debug"));
    fs::remove_file(&path).unwrap();
}
