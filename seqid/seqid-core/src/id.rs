//! Human-readable sequenced identifiers.

use crate::error::SeqIdError;
use crate::namespace::Namespace;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

/// An identifier of the form `<namespace>-<sequence>`, e.g. `EP-3`.
///
/// Serialized as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    namespace: Namespace,
    sequence: NonZeroU64,
}

impl Identifier {
    /// Create an identifier from its parts
    pub fn new(namespace: Namespace, sequence: NonZeroU64) -> Self {
        Self {
            namespace,
            sequence,
        }
    }

    /// Identifier for the sequence that follows `count` existing ones
    pub fn after_count(namespace: Namespace, count: usize) -> Self {
        Self::new(namespace, NonZeroU64::MIN.saturating_add(count as u64))
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.get()
    }

    /// Parse from a string
    pub fn parse(s: &str) -> Result<Self, SeqIdError> {
        let (namespace, sequence) = s
            .rsplit_once('-')
            .ok_or_else(|| SeqIdError::invalid_identifier(format!("missing '-' in '{}'", s)))?;

        if namespace.is_empty() {
            return Err(SeqIdError::invalid_identifier(format!(
                "empty namespace in '{}'",
                s
            )));
        }

        // canonical decimal only: no sign, no leading zeros
        if sequence.starts_with('0') || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SeqIdError::invalid_identifier(format!(
                "bad sequence in '{}'",
                s
            )));
        }

        let sequence = sequence
            .parse::<NonZeroU64>()
            .map_err(|e| SeqIdError::invalid_identifier(format!("bad sequence in '{}': {}", s, e)))?;

        Ok(Self::new(Namespace::new(namespace), sequence))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.namespace, self.sequence)
    }
}

impl FromStr for Identifier {
    type Err = SeqIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_count() {
        let id = Identifier::after_count(Namespace::new("EP"), 0);
        assert_eq!(id.to_string(), "EP-1");

        let id = Identifier::after_count(Namespace::new("EP"), 2);
        assert_eq!(id.to_string(), "EP-3");
        assert_eq!(id.sequence(), 3);
    }

    #[test]
    fn test_parse() {
        let id: Identifier = "EP-12".parse().unwrap();
        assert_eq!(id.namespace().as_str(), "EP");
        assert_eq!(id.sequence(), 12);
    }

    #[test]
    fn test_parse_namespace_with_dash() {
        let id = Identifier::parse("A-B-7").unwrap();
        assert_eq!(id.namespace().as_str(), "A-B");
        assert_eq!(id.sequence(), 7);
        assert_eq!(id.to_string(), "A-B-7");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Identifier::parse("EP").is_err());
        assert!(Identifier::parse("EP-0").is_err());
        assert!(Identifier::parse("EP-x").is_err());
        assert!(Identifier::parse("EP-+1").is_err());
        assert!(Identifier::parse("EP-01").is_err());
        assert!(Identifier::parse("-4").is_err());
        assert!(Identifier::parse("EP-").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let id = Identifier::parse("HR-4").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"HR-4\"");
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
