use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Number of hex digits in a MAC address without separators.
pub const COMPACT_LEN: usize = 12;

const GROUPED_LEN: usize = COMPACT_LEN + 5;

/// Errors returned when a textual MAC address cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacParseError {
    /// Input is neither 12 bare digits nor 6 separated pairs.
    #[error("expected 12 hex digits or 6 separated pairs, got {0} characters")]
    Length(usize),
    /// Input contains a character that is not a hex digit.
    #[error("invalid hex digit {digit:?} at position {position}")]
    InvalidDigit { digit: char, position: usize },
    /// Pairs are separated by something other than one consistent `:` or `-`.
    #[error("pairs must be separated by a single consistent ':' or '-'")]
    Separator,
}

/// A 6-octet Bluetooth device address.
///
/// Displayed in colon form (`AA:BB:CC:DD:EE:FF`), the shape used by BlueZ for
/// directory names. [`MacAddress::to_compact`] gives the lowercase 12-digit
/// shape embedded in registry exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Parse exactly 12 hex digits with no separators, in any case.
    pub fn from_compact(raw: &str) -> Result<Self, MacParseError> {
        let digits: Vec<char> = raw.chars().collect();
        if digits.len() != COMPACT_LEN {
            return Err(MacParseError::Length(digits.len()));
        }
        let mut octets = [0u8; 6];
        for (index, octet) in octets.iter_mut().enumerate() {
            let hi = hex_value(digits[index * 2], index * 2)?;
            let lo = hex_value(digits[index * 2 + 1], index * 2 + 1)?;
            *octet = (hi << 4) | lo;
        }
        Ok(Self(octets))
    }

    /// Lowercase 12-digit form, as it appears in registry exports.
    pub fn to_compact(&self) -> String {
        self.0.iter().map(|octet| format!("{octet:02x}")).collect()
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.chars().count() {
            COMPACT_LEN => Self::from_compact(raw),
            GROUPED_LEN => Self::from_compact(&strip_grouping(raw)?),
            other => Err(MacParseError::Length(other)),
        }
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Return whether `raw` is 12 hex digits, optionally grouped into 6 pairs by
/// one consistent `:` or `-` separator.
pub fn is_valid(raw: &str) -> bool {
    raw.parse::<MacAddress>().is_ok()
}

/// Normalize any accepted shape into a [`MacAddress`] (displayed uppercase,
/// colon separated).
pub fn to_colon_form(raw: &str) -> Result<MacAddress, MacParseError> {
    raw.parse()
}

/// Lowercase compact form of `mac`.
pub fn to_compact_form(mac: &MacAddress) -> String {
    mac.to_compact()
}

fn strip_grouping(raw: &str) -> Result<String, MacParseError> {
    let chars: Vec<char> = raw.chars().collect();
    let separator = chars[2];
    if separator != ':' && separator != '-' {
        return Err(MacParseError::Separator);
    }

    let mut compact = String::with_capacity(COMPACT_LEN);
    for (position, ch) in chars.iter().enumerate() {
        if position % 3 == 2 {
            if *ch != separator {
                return Err(MacParseError::Separator);
            }
        } else {
            compact.push(*ch);
        }
    }
    Ok(compact)
}

fn hex_value(digit: char, position: usize) -> Result<u8, MacParseError> {
    digit
        .to_digit(16)
        .map(|value| value as u8)
        .ok_or(MacParseError::InvalidDigit { digit, position })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_three_shapes_case_insensitively() {
        for raw in [
            "aa:bb:cc:dd:ee:ff",
            "AA-BB-CC-DD-EE-FF",
            "aAbBcCdDeEfF",
            "Aa:Bb:cC:dD:Ee:fF",
        ] {
            let mac = to_colon_form(raw).expect("valid mac");
            assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:FF", "input {raw}");
        }
    }

    #[test]
    fn rejects_mixed_separators() {
        assert_eq!(
            "aa:bb-cc:dd:ee:ff".parse::<MacAddress>(),
            Err(MacParseError::Separator)
        );
        assert!(!is_valid("aa.bb.cc.dd.ee.ff"));
    }

    #[test]
    fn rejects_wrong_length_and_bad_digits() {
        assert_eq!(
            "aabbccddee".parse::<MacAddress>(),
            Err(MacParseError::Length(10))
        );
        assert!(!is_valid("aa:bb:cc:dd:ee"));
        assert!(!is_valid("aa:bb:cc:dd:ee:ff:00"));
        assert_eq!(
            "aabbccddeegg".parse::<MacAddress>(),
            Err(MacParseError::InvalidDigit {
                digit: 'g',
                position: 10
            })
        );
        assert!(!is_valid(""));
        assert!(!is_valid("aabbccddeeff "));
    }

    #[test]
    fn compact_form_is_lowercase() {
        let mac = MacAddress::new([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]);
        assert_eq!(to_compact_form(&mac), "001a7dda7113");
        assert_eq!(mac.to_string(), "00:1A:7D:DA:71:13");
    }

    #[test]
    fn compact_and_colon_forms_round_trip() {
        for raw in ["00:11:22:33:44:55", "0a-1b-2c-3d-4e-5f", "FFEEDDCCBBAA"] {
            let mac = to_colon_form(raw).expect("valid mac");
            let compact = to_compact_form(&mac);
            let expected: String = raw
                .chars()
                .filter(|c| c.is_ascii_hexdigit())
                .collect::<String>()
                .to_lowercase();
            assert_eq!(compact, expected);
            assert_eq!(to_colon_form(&compact).expect("compact is valid"), mac);
            assert_eq!(
                to_colon_form(&mac.to_string()).expect("colon form is valid"),
                mac
            );
        }
    }

    #[test]
    fn non_ascii_input_is_rejected_without_panicking() {
        assert!(!is_valid("ääbbccddeeff"));
        assert!(!is_valid("aa:bb:cc:dd:ee:fé"));
    }
}
