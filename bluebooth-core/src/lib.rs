//! Recover a Bluetooth link key from a Windows registry export and write it
//! into the matching BlueZ `info` file, so a dual-boot machine can reuse one
//! pairing from both systems.
//!
//! - [`mac`] — MAC address validation and its colon/compact shapes
//! - [`export`] — BOM-aware line reader for `regedit` exports
//! - [`scanner`] — single-pass extraction of the host adapter and link key
//! - [`ini`] — lossless INI documents with value-less keys
//! - [`patch`] — backup, rewrite and rollback of the `[LinkKey]` field
//!
//! ```no_run
//! use std::path::Path;
//!
//! use bluebooth_core::{patch_link_key, scan_export, MacAddress};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let target: MacAddress = "AA:BB:CC:DD:EE:FF".parse()?;
//! let report = scan_export(Path::new("keys.reg"), &target)?;
//! if let Some(found) = report.outcome.extraction() {
//!     let info = Path::new("/var/lib/bluetooth")
//!         .join(found.host.to_string())
//!         .join(target.to_string())
//!         .join("info");
//!     patch_link_key(&info, &found.link_key)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod ini;
pub mod mac;
pub mod patch;
pub mod scanner;

pub use export::{Encoding, ExportError, ExportLines};
pub use ini::{IniDocument, IniError};
pub use mac::{MacAddress, MacParseError};
pub use patch::{backup_path, patch_link_key, PatchError, PatchSummary};
pub use scanner::{
    scan_export, scan_lines, Extraction, KeyScanner, LinkKey, ScanOutcome, ScanReport,
};
