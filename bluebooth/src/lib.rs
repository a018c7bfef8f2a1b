//! Command-line glue around `bluebooth-core`.
//!
//! - [`paths`] — BlueZ storage layout and the root privilege gate
//! - [`settings`] — TOML settings with embedded defaults
//! - [`report`] — colored console messages and the JSON report

pub mod paths;
pub mod report;
pub mod settings;

/// Name shown in diagnostics.
pub const APP_ID: &str = "Bluebooth";
