//! Form identifiers embedded in submission file names.
//!
//! Intake names files like
//! `PetPantryForm_First_Last_100000000254_20251030_1819.pdf`; the 12-digit
//! token between underscores ties the file to its tracking row.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static FORM_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d{12})_").expect("form id pattern is valid"));

/// A 12-digit form submission identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(String);

impl FormId {
    /// Extract the form identifier from a file name.
    ///
    /// Returns the first underscore-delimited run of exactly twelve digits.
    pub fn from_file_name(name: &str) -> Option<Self> {
        FORM_ID_PATTERN
            .captures(name)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FormId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
