//! Lossless INI documents in the shape BlueZ uses for its `info` files.
//!
//! Values may be absent (`Blocked` on its own line) and untouched lines are
//! written back exactly as they were read.

mod parser;
mod tree;
mod writer;

use thiserror::Error;

pub use parser::{parse, parse_file};
pub use tree::{IniDocument, IniLine};
pub use writer::{write, write_file};

/// Errors raised while reading, editing, or writing an INI document.
#[derive(Debug, Error)]
pub enum IniError {
    /// The file could not be read or written.
    #[error("INI I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A key appears before any `[section]` header.
    #[error("line {line}: entry outside of any section")]
    EntryOutsideSection { line: usize },
    /// A header line opens with `[` but does not close with `]`.
    #[error("line {line}: malformed section header")]
    MalformedSection { line: usize },
    /// The same section header appears twice.
    #[error("line {line}: duplicate section [{name}]")]
    DuplicateSection { line: usize, name: String },
    /// The same key appears twice in one section.
    #[error("line {line}: duplicate key {key} in section [{section}]")]
    DuplicateKey {
        line: usize,
        section: String,
        key: String,
    },
    /// An edit targeted a section that does not exist.
    #[error("section [{0}] not found")]
    MissingSection(String),
}
