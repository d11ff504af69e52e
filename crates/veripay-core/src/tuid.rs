//! Transaction identifier (TUID) domain type and extraction.
//!
//! A TUID is printed on the receipt as one leading letter from {A, B}
//! followed by 15 to 30 digits. OCR commonly misreads the leading letter as
//! a digit ('A' as '4'; 'B' as '8', '5' or '6'), so extraction accepts those
//! digits in the leading position and corrects them deterministically.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::{Error, Result};

/// Inclusive bounds on the stripped length of a line considered a candidate.
pub const CANDIDATE_LEN: RangeInclusive<usize> = 18..=31;

/// Inclusive bounds on the digit count following the leading character.
pub const DIGIT_LEN: RangeInclusive<usize> = 15..=30;

/// Leading character alphabet accepted before correction.
static CANDIDATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[AB4856][0-9]{15,30}").expect("candidate pattern is valid"));

/// A validated transaction identifier in canonical form.
///
/// Construction goes through [`Tuid::parse`] or [`extract`], so a held value
/// always satisfies the canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tuid(String);

impl Tuid {
    /// Validates `value` against the canonical TUID shape.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error when the leading character is not 'A'
    /// or 'B', or the remainder is not 15 to 30 ASCII digits.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let mut chars = value.chars();
        let leading_ok = matches!(chars.next(), Some('A' | 'B'));
        let digits = chars.as_str();
        let digits_ok =
            DIGIT_LEN.contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());

        if leading_ok && digits_ok {
            Ok(Self(value))
        } else {
            Err(Error::invalid_input()
                .with_message(format!("not a canonical transaction id: {value:?}")))
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extracts the first identifier candidate from raw recognized text.
///
/// The algorithm is pure and deterministic:
///
/// 1. Strip every character except letters, digits and newlines.
/// 2. Split into lines; keep lines whose stripped length is within
///    [`CANDIDATE_LEN`].
/// 3. In candidate order, match the first occurrence of a leading character
///    from {A, B, 4, 5, 6, 8} followed by 15 to 30 digits. The first match
///    wins; later candidates are not evaluated.
/// 4. Correct the leading character: '4' becomes 'A'; '8', '5' or '6'
///    become 'B'.
pub fn extract(text: &str) -> Option<Tuid> {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '\n')
        .collect();

    for line in stripped.split('\n') {
        if !CANDIDATE_LEN.contains(&line.len()) {
            continue;
        }
        if let Some(found) = CANDIDATE_PATTERN.find(line) {
            return Some(Tuid(correct_leading(found.as_str())));
        }
    }

    None
}

/// Applies the leading-character OCR corrections.
///
/// The comparison is on character values, not numeric ones: '4' maps to 'A'
/// and '8'/'5'/'6' map to 'B', while 'A' and 'B' pass through unchanged.
fn correct_leading(raw: &str) -> String {
    let (head, tail) = raw.split_at(1);
    let head = match head {
        "4" => "A",
        "8" | "5" | "6" => "B",
        _ => head,
    };
    format!("{head}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_corrects_leading_four_to_a() {
        let text = "거래번호: 4123 4567 8901 2345 678\nthanks";
        let tuid = extract(text).unwrap();
        assert_eq!(tuid.as_str(), "A123456789012345678");
    }

    #[test]
    fn extract_corrects_leading_eight_five_six_to_b() {
        for lead in ["8", "5", "6"] {
            let line = format!("{lead}987654321098765432");
            let tuid = extract(&line).unwrap();
            assert_eq!(&tuid.as_str()[..1], "B", "leading {lead}");
            assert_eq!(&tuid.as_str()[1..], "987654321098765432");
        }
    }

    #[test]
    fn extract_keeps_valid_leading_letter() {
        let tuid = extract("B123456789012345678").unwrap();
        assert_eq!(tuid.as_str(), "B123456789012345678");
    }

    #[test]
    fn extract_is_deterministic() {
        let text = "line one\nA111122223333444455\nline three";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn extract_first_match_wins() {
        let text = "A111122223333444455\nB999988887777666655";
        assert_eq!(extract(text).unwrap().as_str(), "A111122223333444455");
    }

    #[test]
    fn extract_skips_lines_outside_length_bounds() {
        // 17 characters: one too short to be a candidate line.
        assert_eq!(extract("A1111222233334444"), None);
        // 32 characters: one too long.
        assert_eq!(extract("A1111222233334444555566667777888"), None);
    }

    #[test]
    fn extract_strips_punctuation_before_matching() {
        let text = "A1111-2222 3333.4444?55";
        assert_eq!(extract(text).unwrap().as_str(), "A111122223333444455");
    }

    #[test]
    fn extract_returns_none_without_candidates() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("no identifiers in this receipt"), None);
        // Right length, wrong leading character.
        assert_eq!(extract("C11112222333344445555"), None);
    }

    #[test]
    fn parse_accepts_canonical_ids() {
        assert!(Tuid::parse("A123456789012345").is_ok());
        assert!(Tuid::parse("B123456789012345678901234567890").is_ok());
    }

    #[test]
    fn parse_rejects_non_canonical_ids() {
        assert!(Tuid::parse("4123456789012345").is_err());
        assert!(Tuid::parse("A12345678901234").is_err());
        assert!(Tuid::parse("A1234567890123456789012345678901").is_err());
        assert!(Tuid::parse("AB2345678901234X").is_err());
        assert!(Tuid::parse("").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let tuid = Tuid::parse("A123456789012345").unwrap();
        let json = serde_json::to_string(&tuid).unwrap();
        assert_eq!(json, "\"A123456789012345\"");
    }
}
