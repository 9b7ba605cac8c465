use std::path::{Path, PathBuf};

use voover_core::effects::EffectChain;

/// Write a chain preset into `dir` and return its path.
pub fn write_chain_preset(dir: &Path, name: &str, chain: &EffectChain) -> PathBuf {
    let path = dir.join(format!("{name}.json"));
    chain
        .save(&path)
        .expect("failed to write chain preset fixture");
    path
}

/// Write raw JSON into `dir`, for malformed or hand-written fixtures.
pub fn write_json(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(format!("{name}.json"));
    std::fs::write(&path, json).expect("failed to write json fixture");
    path
}

/// Get a temporary directory for test fixtures that persists for the test run.
pub fn fixture_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("failed to create temp dir for fixtures")
}
