use std::fmt::{self, Display, Formatter};

use crate::ini::IniError;

/// One physical line of an INI document.
///
/// Every variant keeps its `raw` text so unchanged lines are written back
/// byte for byte, including spacing and a trailing `\r`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IniLine {
    /// `[name]` header.
    Section { raw: String, name: String },
    /// `key=value`, or a bare `key` with no value.
    Entry {
        raw: String,
        key: String,
        value: Option<String>,
    },
    /// Blank line or `#`/`;` comment.
    Other(String),
}

impl IniLine {
    pub fn raw(&self) -> &str {
        match self {
            IniLine::Section { raw, .. } | IniLine::Entry { raw, .. } | IniLine::Other(raw) => raw,
        }
    }
}

/// A parsed INI document that remembers its exact layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IniDocument {
    pub lines: Vec<IniLine>,
    /// Whether the source ended with a newline.
    pub trailing_newline: bool,
}

impl IniDocument {
    /// Section names in document order.
    pub fn section_names(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                IniLine::Section { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.section_range(section).is_some()
    }

    /// Look up `key` in `section`. The inner `None` marks a value-less key.
    pub fn get(&self, section: &str, key: &str) -> Option<Option<&str>> {
        let range = self.section_range(section)?;
        self.lines[range].iter().find_map(|line| match line {
            IniLine::Entry { key: k, value, .. } if k == key => Some(value.as_deref()),
            _ => None,
        })
    }

    /// Set `key` in `section` to `value`, rendered as `key=value`.
    ///
    /// An existing entry is replaced in place. A new entry is placed after
    /// the last entry of the section.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), IniError> {
        let range = self
            .section_range(section)
            .ok_or_else(|| IniError::MissingSection(section.to_string()))?;

        let existing = range.clone().find(|&index| {
            matches!(&self.lines[index], IniLine::Entry { key: k, .. } if k == key)
        });

        match existing {
            Some(index) => {
                let line_ending = if self.lines[index].raw().ends_with('\r') {
                    "\r"
                } else {
                    ""
                };
                self.lines[index] = entry_line(key, value, line_ending);
            }
            None => {
                let anchor = range
                    .clone()
                    .rev()
                    .find(|&index| matches!(self.lines[index], IniLine::Entry { .. }))
                    .unwrap_or(range.start - 1);
                // Follow the line ending of the entry (or header) it lands after.
                let line_ending = if self.lines[anchor].raw().ends_with('\r') {
                    "\r"
                } else {
                    ""
                };
                self.lines.insert(anchor + 1, entry_line(key, value, line_ending));
            }
        }
        Ok(())
    }

    /// Line indices of the entries under `section`, header excluded.
    fn section_range(&self, section: &str) -> Option<std::ops::Range<usize>> {
        let header = self.lines.iter().position(
            |line| matches!(line, IniLine::Section { name, .. } if name == section),
        )?;
        let end = self.lines[header + 1..]
            .iter()
            .position(|line| matches!(line, IniLine::Section { .. }))
            .map(|offset| header + 1 + offset)
            .unwrap_or(self.lines.len());
        Some(header + 1..end)
    }
}

impl Display for IniDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line.raw())?;
        }
        if self.trailing_newline {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn entry_line(key: &str, value: &str, line_ending: &str) -> IniLine {
    IniLine::Entry {
        raw: format!("{key}={value}{line_ending}"),
        key: key.to_string(),
        value: Some(value.to_string()),
    }
}
