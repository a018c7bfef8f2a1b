//! Link key extraction from a registry export.
//!
//! The scanner classifies lines purely by their text. The first line carrying
//! [`ADAPTER_MARKER`] names the host adapter; after it, the first line that
//! mentions the target device's compact address and carries a
//! [`HEX_VALUE_DELIMITER`] value holds the link key.

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::export::{ExportError, ExportLines};
use crate::mac::{MacAddress, COMPACT_LEN};

/// Registry subtree whose child keys are named after the host adapter.
pub const ADAPTER_MARKER: &str = r"BTHPORT\Parameters\Keys\";

/// Separator between a registry value name and its hex-encoded bytes.
pub const HEX_VALUE_DELIMITER: &str = "=hex:";

/// Lines `1..=HEADER_LINES` are the export preamble (editor banner, blank
/// line and the parent key headers) and are never classified.
pub const HEADER_LINES: usize = 4;

const CONTINUATION: char = '\\';

/// An uppercase hex link key with byte separators removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkKey(String);

impl LinkKey {
    /// Build a key from a comma separated `hex:` value.
    ///
    /// Returns `None` when nothing but separators remain, when a non-hex
    /// character is present, or when the digits do not form whole bytes.
    pub fn from_hex_value(raw: &str) -> Option<Self> {
        let digits: String = raw
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();
        if digits.is_empty()
            || digits.len() % 2 != 0
            || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return None;
        }
        Some(Self(digits.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LinkKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host adapter and link key recovered for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub host: MacAddress,
    pub link_key: LinkKey,
}

/// Result of a complete scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(Extraction),
    /// The adapter subtree exists but holds no key for the target.
    DeviceNotFound { host: MacAddress },
    /// No adapter subtree was found, so no device line was considered.
    AdapterNotFound,
}

impl ScanOutcome {
    pub fn host(&self) -> Option<MacAddress> {
        match self {
            ScanOutcome::Found(extraction) => Some(extraction.host),
            ScanOutcome::DeviceNotFound { host } => Some(*host),
            ScanOutcome::AdapterNotFound => None,
        }
    }

    pub fn extraction(&self) -> Option<&Extraction> {
        match self {
            ScanOutcome::Found(extraction) => Some(extraction),
            _ => None,
        }
    }
}

/// Outcome plus the number of physical lines consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub lines_scanned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    SeekingAdapter,
    SeekingDevice { host: MacAddress },
    /// A device value wrapped with trailing `\` continues on the next lines.
    CollectingValue { host: MacAddress, value: String },
    Done(Extraction),
}

/// Single-pass state machine over export lines.
#[derive(Debug, Clone)]
pub struct KeyScanner {
    target: String,
    state: ScanState,
    line_no: usize,
}

impl KeyScanner {
    pub fn new(target: &MacAddress) -> Self {
        Self {
            target: target.to_compact(),
            state: ScanState::SeekingAdapter,
            line_no: 0,
        }
    }

    /// Classify the next physical line. Lines fed after the key is found are
    /// counted but otherwise ignored.
    pub fn feed(&mut self, line: &str) {
        self.line_no += 1;
        let state = std::mem::replace(&mut self.state, ScanState::SeekingAdapter);
        self.state = match state {
            ScanState::SeekingAdapter => self.seek_adapter(line),
            ScanState::SeekingDevice { host } => self.seek_device(host, line),
            ScanState::CollectingValue { host, mut value } => {
                let (chunk, continues) = split_continuation(line.trim());
                value.push_str(chunk);
                if continues {
                    ScanState::CollectingValue { host, value }
                } else {
                    self.complete(host, &value)
                }
            }
            done @ ScanState::Done(_) => done,
        };
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ScanState::Done(_))
    }

    pub fn lines_scanned(&self) -> usize {
        self.line_no
    }

    /// Close the scan. A wrapped value cut off by the end of input is
    /// evaluated with the bytes collected so far.
    pub fn finish(self) -> ScanReport {
        let lines_scanned = self.line_no;
        let outcome = match self.state {
            ScanState::SeekingAdapter => ScanOutcome::AdapterNotFound,
            ScanState::SeekingDevice { host } => ScanOutcome::DeviceNotFound { host },
            ScanState::CollectingValue { host, value } => match LinkKey::from_hex_value(&value) {
                Some(link_key) => ScanOutcome::Found(Extraction { host, link_key }),
                None => ScanOutcome::DeviceNotFound { host },
            },
            ScanState::Done(extraction) => ScanOutcome::Found(extraction),
        };
        ScanReport {
            outcome,
            lines_scanned,
        }
    }

    fn seek_adapter(&self, line: &str) -> ScanState {
        if self.line_no <= HEADER_LINES {
            return ScanState::SeekingAdapter;
        }
        match adapter_address(line) {
            Some(host) => {
                debug!(line = self.line_no, %host, "found host adapter subtree");
                ScanState::SeekingDevice { host }
            }
            None => ScanState::SeekingAdapter,
        }
    }

    fn seek_device(&self, host: MacAddress, line: &str) -> ScanState {
        if !contains_address(line, &self.target) {
            return ScanState::SeekingDevice { host };
        }
        let Some((_, value)) = line.split_once(HEX_VALUE_DELIMITER) else {
            debug!(line = self.line_no, "target address without hex value, skipping");
            return ScanState::SeekingDevice { host };
        };

        let (chunk, continues) = split_continuation(value.trim());
        if continues {
            debug!(line = self.line_no, "device value continues on next line");
            return ScanState::CollectingValue {
                host,
                value: chunk.to_string(),
            };
        }
        self.complete(host, chunk)
    }

    fn complete(&self, host: MacAddress, value: &str) -> ScanState {
        match LinkKey::from_hex_value(value) {
            Some(link_key) => {
                debug!(line = self.line_no, "found device link key");
                ScanState::Done(Extraction { host, link_key })
            }
            None => {
                debug!(line = self.line_no, "device value is not a usable key, skipping");
                ScanState::SeekingDevice { host }
            }
        }
    }
}

/// Scan an iterator of lines, stopping as soon as the key is found.
pub fn scan_lines<I, S, E>(lines: I, target: &MacAddress) -> Result<ScanReport, E>
where
    I: IntoIterator<Item = Result<S, E>>,
    S: AsRef<str>,
{
    let mut scanner = KeyScanner::new(target);
    for line in lines {
        scanner.feed(line?.as_ref());
        if scanner.is_done() {
            break;
        }
    }
    Ok(scanner.finish())
}

/// Open and scan an export file.
pub fn scan_export(path: &Path, target: &MacAddress) -> Result<ScanReport, ExportError> {
    scan_lines(ExportLines::open(path)?, target)
}

fn adapter_address(line: &str) -> Option<MacAddress> {
    let (_, rest) = line.split_once(ADAPTER_MARKER)?;
    MacAddress::from_compact(rest.get(..COMPACT_LEN)?).ok()
}

/// Whether `line` holds `compact` as a whole token, ignoring ASCII case.
///
/// A match flanked by another hex digit is part of a longer token and does
/// not count.
fn contains_address(line: &str, compact: &str) -> bool {
    let haystack = line.to_ascii_lowercase();
    let bytes = haystack.as_bytes();
    haystack.match_indices(compact).any(|(start, matched)| {
        let end = start + matched.len();
        let before = start
            .checked_sub(1)
            .map(|i| bytes[i].is_ascii_hexdigit())
            .unwrap_or(false);
        let after = bytes.get(end).is_some_and(|b| b.is_ascii_hexdigit());
        !before && !after
    })
}

fn split_continuation(value: &str) -> (&str, bool) {
    match value.strip_suffix(CONTINUATION) {
        Some(head) => (head, true),
        None => (value, false),
    }
}
