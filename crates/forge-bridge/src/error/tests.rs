//! Unit tests for bridge error types.

use std::path::PathBuf;
use std::sync::Arc;

use rstest::rstest;

use super::*;

#[test]
fn empty_path_uses_editor_wording() {
    assert_eq!(BridgeError::EmptyPath.to_string(), "No file selected.");
}

#[rstest]
#[case::missing(
    BridgeError::MissingPath { path: PathBuf::from("/data/in.csv") },
    "does not exist"
)]
#[case::not_a_file(
    BridgeError::NotAFile { path: PathBuf::from("/data/in.csv") },
    "is not a file"
)]
#[case::resolve(
    BridgeError::Resolve {
        path: PathBuf::from("/data/in.csv"),
        source: Arc::new(std::io::Error::other("boom")),
    },
    "boom"
)]
fn path_errors_name_the_path(#[case] error: BridgeError, #[case] detail: &str) {
    let message = error.to_string();
    assert!(
        message.contains("/data/in.csv"),
        "expected path in message: {message}"
    );
    assert!(
        message.contains(detail),
        "expected '{detail}' in message: {message}"
    );
}

#[rstest]
#[case::empty(BridgeError::EmptyPath, true)]
#[case::missing(BridgeError::MissingPath { path: PathBuf::from("x") }, true)]
#[case::not_a_file(BridgeError::NotAFile { path: PathBuf::from("x") }, true)]
#[case::executable(BridgeError::EmptyExecutable, false)]
#[case::worker(
    BridgeError::WorkerSpawn {
        path: PathBuf::from("x"),
        source: Arc::new(std::io::Error::other("no threads")),
    },
    false
)]
fn classifies_validation_errors(#[case] error: BridgeError, #[case] expected: bool) {
    assert_eq!(error.is_validation(), expected, "{error}");
}

#[test]
fn worker_spawn_exposes_source() {
    use std::error::Error as _;

    let error = BridgeError::WorkerSpawn {
        path: PathBuf::from("/data/in.csv"),
        source: Arc::new(std::io::Error::other("no threads")),
    };
    assert!(error.source().is_some());
}
