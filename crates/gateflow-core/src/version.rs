use crate::error::{GateflowError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// SemanticVersion
// ---------------------------------------------------------------------------

/// A `major.minor.patch` triple with a total order.
///
/// Parsing is lenient about *missing* components (`"2.1"` is `2.1.0`) but
/// strict about malformed ones: a non-numeric component or more than three
/// components is an error. The derived `Ord` compares component-wise, most
/// significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(GateflowError::InvalidVersion(s.to_string()));
        }
        let mut components = [0u64; 3];
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() > 3 {
            return Err(GateflowError::InvalidVersion(s.to_string()));
        }
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse()
                .map_err(|_| GateflowError::InvalidVersion(s.to_string()))?;
        }
        Ok(Self::new(components[0], components[1], components[2]))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for SemanticVersion {
    type Err = GateflowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SemanticVersion::parse(&s).map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn parse_full_triple() {
        let v = SemanticVersion::parse("2.10.3").unwrap();
        assert_eq!(v, SemanticVersion::new(2, 10, 3));
    }

    #[test]
    fn parse_missing_components_default_to_zero() {
        assert_eq!(
            SemanticVersion::parse("2").unwrap(),
            SemanticVersion::new(2, 0, 0)
        );
        assert_eq!(
            SemanticVersion::parse("2.1").unwrap(),
            SemanticVersion::new(2, 1, 0)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(SemanticVersion::parse("").is_err());
        assert!(SemanticVersion::parse("abc").is_err());
        assert!(SemanticVersion::parse("1.x.0").is_err());
        assert!(SemanticVersion::parse("1.2.3.4").is_err());
        assert!(SemanticVersion::parse("-1.0.0").is_err());
    }

    #[test]
    fn compare_is_reflexive() {
        let v = SemanticVersion::new(1, 2, 3);
        assert_eq!(v.cmp(&v), Ordering::Equal);
    }

    #[test]
    fn compare_most_significant_first() {
        assert!(SemanticVersion::new(2, 0, 0) > SemanticVersion::new(1, 99, 99));
        assert!(SemanticVersion::new(1, 5, 0) > SemanticVersion::new(1, 4, 99));
        assert!(SemanticVersion::new(1, 0, 2) > SemanticVersion::new(1, 0, 1));
    }

    #[test]
    fn sort_and_max() {
        let mut versions = vec![
            SemanticVersion::new(1, 5, 0),
            SemanticVersion::new(1, 0, 0),
            SemanticVersion::new(2, 0, 0),
        ];
        versions.sort();
        assert_eq!(versions[0], SemanticVersion::new(1, 0, 0));
        assert_eq!(
            versions.iter().copied().max().unwrap(),
            SemanticVersion::new(2, 0, 0)
        );
    }

    #[test]
    fn display_roundtrip() {
        let v = SemanticVersion::new(1, 2, 3);
        assert_eq!(SemanticVersion::parse(&v.to_string()).unwrap(), v);
    }

    #[test]
    fn serde_string_form() {
        let v = SemanticVersion::new(1, 2, 3);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let parsed: SemanticVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, v);
    }
}
