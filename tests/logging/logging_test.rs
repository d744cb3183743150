//! Tests for `src/logging.rs`.

use sieve::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_with_file_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("nested").join("logs");
    assert!(!logs_dir.exists());

    // Only one global subscriber can be installed per process, so the
    // result may be an error; the directory is created either way.
    let _result = sieve::logging::init_with_file(&logs_dir);
    assert!(logs_dir.exists(), "logs directory should be created");
}

#[test]
fn init_cli_is_idempotent() {
    sieve::logging::init_cli();
    sieve::logging::init_cli();
}
