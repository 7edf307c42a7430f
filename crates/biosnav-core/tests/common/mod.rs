//! Common test utilities for integration tests.

#![allow(dead_code)]

use biosnav_core::{Menu, NavigationConfig, ReplaySession};
use std::path::PathBuf;

pub const DOWN: &[u8] = b"\x1b[B";
pub const UP: &[u8] = b"\x1b[A";
pub const ENTER: &[u8] = b"\r";

/// Load a captured console transcript from the fixtures directory.
pub fn load_transcript(name: &str) -> String {
    let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("transcripts")
        .join(format!("{}.txt", name));

    std::fs::read_to_string(&fixture_path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", fixture_path.display(), e))
}

/// Replay session over several transcripts played back to back.
pub fn replay(names: &[&str]) -> ReplaySession {
    ReplaySession::new(names.iter().map(|name| load_transcript(name)).collect::<String>())
}

/// Disable step delays so tests run instantly.
pub fn immediate(menu: Menu) -> Menu {
    menu.with_navigation(NavigationConfig::immediate())
}

/// Expected bytes for `count` presses of `key` followed by `commit`.
pub fn keys(key: &[u8], count: usize, commit: &[u8]) -> Vec<u8> {
    let mut bytes = key.repeat(count);
    bytes.extend_from_slice(commit);
    bytes
}
