//! Shared test utilities for the ncanimate workspace.
//!
//! This crate provides:
//! - Catalog file generators with predictable time axes
//! - Product configurations used across the test suite
//! - Catalog and config file helpers
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert that a slot of a frame timetable map holds exactly the given
/// file ids for a layer, best match first.
///
/// ```ignore
/// assert_slot_files!(map, slot, "gbr4_temp", ["downloads/gbr4_v2/FAKE_0"]);
/// assert_slot_files!(map, slot, "gbr4_temp", []);
/// ```
#[macro_export]
macro_rules! assert_slot_files {
    ($map:expr, $slot:expr, $layer:expr, [$($id:expr),* $(,)?]) => {{
        let expected: Vec<&str> = vec![$($id),*];
        let actual: Vec<String> = $map
            .get(&$slot)
            .and_then(|table| table.get($layer))
            .map(|set| set.iter().map(|frame| frame.metadata().id.clone()).collect())
            .unwrap_or_default();
        assert_eq!(
            actual, expected,
            "unexpected frames for layer '{}' in slot {}",
            $layer, $slot
        );
    }};
}
