use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version \"{0}\"")]
pub struct VersionParseError(pub String);

/// A parsed package version.
///
/// Consists of up to four numeric release components and an optional
/// pre-release tag separated by a dash. Missing components count as zero,
/// so `1`, `1.0` and `1.0.0` compare equal. A pre-release sorts before the
/// release it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    release: Vec<u64>,
    pre: Option<String>,
}

impl Version {
    /// Parse a version string.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionParseError(input.to_string()));
        }

        let (numeric, pre) = match input.split_once('-') {
            Some((head, tail)) if !tail.is_empty() => (head, Some(tail.to_string())),
            Some(_) => return Err(VersionParseError(input.to_string())),
            None => (input, None),
        };

        let mut release = Vec::new();
        for part in numeric.split('.') {
            if part.is_empty() || release.len() == 4 {
                return Err(VersionParseError(input.to_string()));
            }
            let value = part
                .parse::<u64>()
                .map_err(|_| VersionParseError(input.to_string()))?;
            release.push(value);
        }

        Ok(Self { release, pre })
    }

    /// The numeric release components as parsed.
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// The pre-release tag, if any.
    pub fn pre(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    /// Whether this is a pre-release version.
    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }

    fn component(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some(ref pre) = self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_components() {
        assert_eq!(v("1").release(), &[1]);
        assert_eq!(v("1.2").release(), &[1, 2]);
        assert_eq!(v("1.2.3").release(), &[1, 2, 3]);
        assert_eq!(v("1.2.3.4").release(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_pre_release() {
        let version = v("1.2.3-beta1");
        assert_eq!(version.release(), &[1, 2, 3]);
        assert_eq!(version.pre(), Some("beta1"));
        assert!(version.is_pre_release());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("a.b").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.2.3.4.5").is_err());
        assert!(Version::parse("1.0-").is_err());
    }

    #[test]
    fn test_compare_padding() {
        assert_eq!(v("1"), v("1.0.0"));
        assert!(v("1.1") > v("1.0.9"));
        assert!(v("2") > v("1.9.9"));
    }

    #[test]
    fn test_compare_pre_release() {
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert!(v("1.0.1-alpha") > v("1.0.0"));
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["1", "1.2", "1.2.3", "1.2.3-rc1"] {
            assert_eq!(v(s).to_string(), s);
        }
    }
}
