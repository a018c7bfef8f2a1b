use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::ini::{IniDocument, IniError, IniLine};

/// Parse INI text into an [`IniDocument`].
///
/// Comment lines start with `#` or `;`. Keys and values are split on the
/// first `=`; a line without `=` is a key with no value.
pub fn parse(text: &str) -> Result<IniDocument, IniError> {
    let (body, trailing_newline) = match text.strip_suffix('\n') {
        Some(body) => (body, true),
        None => (text, false),
    };
    if body.is_empty() && !trailing_newline {
        return Ok(IniDocument::default());
    }

    let mut lines = Vec::new();
    let mut sections: HashSet<String> = HashSet::new();
    let mut current: Option<(String, HashSet<String>)> = None;

    for (index, raw) in body.split('\n').enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            lines.push(IniLine::Other(raw.to_string()));
            continue;
        }

        if trimmed.starts_with('[') {
            let name = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .ok_or(IniError::MalformedSection { line: line_no })?;
            if !sections.insert(name.to_string()) {
                return Err(IniError::DuplicateSection {
                    line: line_no,
                    name: name.to_string(),
                });
            }
            current = Some((name.to_string(), HashSet::new()));
            lines.push(IniLine::Section {
                raw: raw.to_string(),
                name: name.to_string(),
            });
            continue;
        }

        let (section, keys) = current
            .as_mut()
            .ok_or(IniError::EntryOutsideSection { line: line_no })?;
        let (key, value) = match trimmed.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim().to_string())),
            None => (trimmed, None),
        };
        if !keys.insert(key.to_string()) {
            return Err(IniError::DuplicateKey {
                line: line_no,
                section: section.clone(),
                key: key.to_string(),
            });
        }
        lines.push(IniLine::Entry {
            raw: raw.to_string(),
            key: key.to_string(),
            value,
        });
    }

    Ok(IniDocument {
        lines,
        trailing_newline,
    })
}

/// Read and parse an INI file.
pub fn parse_file(path: &Path) -> Result<IniDocument, IniError> {
    let text = fs::read_to_string(path)?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_entry_before_first_section() {
        assert!(matches!(
            parse("Key=1\n[LinkKey]\n"),
            Err(IniError::EntryOutsideSection { line: 1 })
        ));
    }

    #[test]
    fn rejects_unterminated_header() {
        assert!(matches!(
            parse("[General]\nName=x\n[LinkKey\n"),
            Err(IniError::MalformedSection { line: 3 })
        ));
    }

    #[test]
    fn rejects_duplicates() {
        assert!(matches!(
            parse("[A]\n[A]\n"),
            Err(IniError::DuplicateSection { line: 2, .. })
        ));
        assert!(matches!(
            parse("[A]\nx=1\nx=2\n"),
            Err(IniError::DuplicateKey { line: 3, .. })
        ));
    }

    #[test]
    fn same_key_in_different_sections_is_fine() {
        let doc = parse("[A]\nx=1\n[B]\nx=2\n").expect("parse");
        assert_eq!(doc.get("B", "x"), Some(Some("2")));
    }

    #[test]
    fn value_keeps_later_equals_signs() {
        let doc = parse("[A]\nexpr = a=b\n").expect("parse");
        assert_eq!(doc.get("A", "expr"), Some(Some("a=b")));
    }

    #[test]
    fn empty_text_is_an_empty_document() {
        let doc = parse("").expect("parse");
        assert!(doc.lines.is_empty());
        assert_eq!(doc.to_string(), "");
    }
}
