//! Line reader for `regedit` text exports.
//!
//! `regedit` writes `.reg` files as UTF-16LE with a byte-order mark, while
//! hand-edited or converted exports are usually UTF-8. The reader sniffs the
//! BOM once and then yields one decoded line at a time, so exports of any size
//! are scanned in a single forward pass. Exports saved as UTF-16 without a BOM
//! are recognised by the NUL high byte of their leading ASCII text.

use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF16_NEWLINE: u16 = 0x000A;
/// Code units inspected when guessing the encoding of a BOM-less export.
const UTF16_SNIFF_UNITS: usize = 8;

/// Errors raised while reading a registry export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The export file could not be opened.
    #[error("failed to open registry export {path}: {source}")]
    Open { path: String, source: io::Error },
    /// Reading from the underlying source failed.
    #[error("failed to read registry export: {0}")]
    Read(#[from] io::Error),
}

/// Text encoding detected from the export's byte-order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Iterator over the decoded lines of a registry export.
///
/// Line terminators (`\n` or `\r\n`) are stripped. Invalid sequences are
/// replaced with U+FFFD rather than aborting the scan.
#[derive(Debug)]
pub struct ExportLines<R> {
    reader: R,
    encoding: Encoding,
    finished: bool,
}

impl<R: BufRead> ExportLines<R> {
    /// Wrap `reader`, consuming and interpreting any byte-order mark.
    pub fn new(mut reader: R) -> Result<Self, ExportError> {
        let head = reader.fill_buf()?;
        let (encoding, bom_len) = if head.starts_with(UTF16LE_BOM) {
            (Encoding::Utf16Le, UTF16LE_BOM.len())
        } else if head.starts_with(UTF16BE_BOM) {
            (Encoding::Utf16Be, UTF16BE_BOM.len())
        } else if head.starts_with(UTF8_BOM) {
            (Encoding::Utf8, UTF8_BOM.len())
        } else {
            (sniff_bomless(head), 0)
        };
        reader.consume(bom_len);
        debug!(?encoding, "detected registry export encoding");

        Ok(Self {
            reader,
            encoding,
            finished: false,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn next_utf8(&mut self) -> io::Result<Option<String>> {
        let mut bytes = Vec::new();
        if self.reader.read_until(b'\n', &mut bytes)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&bytes);
        Ok(Some(trim_line_ending(&line).to_string()))
    }

    fn next_utf16(&mut self) -> io::Result<Option<String>> {
        let mut units: Vec<u16> = Vec::new();
        let mut saw_input = false;

        while let Some(unit) = self.read_unit()? {
            saw_input = true;
            if unit == UTF16_NEWLINE {
                break;
            }
            units.push(unit);
        }

        if !saw_input {
            return Ok(None);
        }
        let line = String::from_utf16_lossy(&units);
        Ok(Some(trim_line_ending(&line).to_string()))
    }

    fn read_unit(&mut self) -> io::Result<Option<u16>> {
        if self.reader.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let mut pair = [0u8; 2];
        match self.reader.read_exact(&mut pair) {
            Ok(()) => {}
            // A dangling odd byte at the end carries no character.
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err),
        }

        Ok(Some(match self.encoding {
            Encoding::Utf16Be => u16::from_be_bytes(pair),
            _ => u16::from_le_bytes(pair),
        }))
    }
}

impl ExportLines<BufReader<File>> {
    /// Open an export file from disk.
    pub fn open(path: &Path) -> Result<Self, ExportError> {
        let file = File::open(path).map_err(|source| ExportError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> Iterator for ExportLines<R> {
    type Item = Result<String, ExportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let next = match self.encoding {
            Encoding::Utf8 => self.next_utf8(),
            Encoding::Utf16Le | Encoding::Utf16Be => self.next_utf16(),
        };

        match next {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(ExportError::Read(err)))
            }
        }
    }
}

/// Guess the encoding of a BOM-less export from its first code units.
///
/// Exports open with ASCII text, so UTF-16 shows up as a NUL in every second
/// byte: the odd bytes for little endian, the even bytes for big endian.
fn sniff_bomless(head: &[u8]) -> Encoding {
    let pairs: Vec<&[u8]> = head.chunks_exact(2).take(UTF16_SNIFF_UNITS).collect();
    if pairs.is_empty() {
        return Encoding::Utf8;
    }
    if pairs.iter().all(|pair| pair[0] != 0 && pair[1] == 0) {
        Encoding::Utf16Le
    } else if pairs.iter().all(|pair| pair[0] == 0 && pair[1] != 0) {
        Encoding::Utf16Be
    } else {
        Encoding::Utf8
    }
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
