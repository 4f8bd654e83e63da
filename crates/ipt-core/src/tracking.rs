//! India Post tracking-number format.
//!
//! Format: service letter (`E` Speed Post, `R` Registered Post, `A` Air Waybill),
//! one more capital letter, nine digits, then the `IN` country suffix.

use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::{errors::Error, Result};

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ERA][A-Z]\d{9}IN$").expect("valid regex"))
}

/// Remove every whitespace character from user input.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn is_valid_tracking_number(raw: &str) -> bool {
    let compact = normalize(raw);
    // `\d` in the regex crate is Unicode-aware; the format only allows ASCII digits.
    compact.is_ascii() && pattern().is_match(&compact)
}

/// A validated, whitespace-free tracking number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    pub fn parse(raw: &str) -> Result<Self> {
        if !is_valid_tracking_number(raw) {
            return Err(Error::InvalidTrackingNumber(raw.to_string()));
        }
        Ok(Self(normalize(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `EU 430410927 IN`, used in admin listings.
    pub fn display_spaced(&self) -> String {
        format!("{} {} {}", &self.0[..2], &self.0[2..11], &self.0[11..])
    }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
