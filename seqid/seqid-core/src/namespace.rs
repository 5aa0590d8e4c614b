//! Namespace codes derived from display names.

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

/// Code used when a display name yields no initials.
pub const FALLBACK_NAMESPACE: &str = "XX";

/// Short code grouping the identifiers of one owning entity, e.g. `EP`.
///
/// Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Wrap an already derived code. Empty codes become the fallback.
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        if code.is_empty() {
            Self(FALLBACK_NAMESPACE.to_string())
        } else {
            Self(code)
        }
    }

    /// The fallback namespace
    pub fn fallback() -> Self {
        Self(FALLBACK_NAMESPACE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the fallback code
    pub fn is_fallback(&self) -> bool {
        self.0 == FALLBACK_NAMESPACE
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Namespace {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<Namespace> for String {
    fn from(namespace: Namespace) -> Self {
        namespace.0
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the namespace code for a display name.
///
/// Takes the first grapheme of every whitespace-separated word, uppercased,
/// so `"Exam Portal"` becomes `EP`. Names without any word map to
/// [`FALLBACK_NAMESPACE`].
pub fn derive_namespace(name: &str) -> Namespace {
    let code: String = name
        .split_whitespace()
        .filter_map(|word| word.graphemes(true).next())
        .map(str::to_uppercase)
        .collect();

    Namespace::new(code)
}
