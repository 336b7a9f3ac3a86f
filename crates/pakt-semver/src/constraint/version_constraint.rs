use std::fmt;

use super::interface::Constraint;
use super::operator::Operator;
use crate::version::{Version, VersionParseError};

/// A single operator/version comparison, e.g. `>= 1.2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    operator: Operator,
    version: Version,
}

impl VersionConstraint {
    pub fn new(operator: Operator, version: Version) -> Self {
        Self { operator, version }
    }

    /// Parse a constraint like `">= 1.2"` or `"1.2.3"` (bare version means equality).
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let input = input.trim();
        let split = input
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| VersionParseError(input.to_string()))?;
        let (op, version) = input.split_at(split);
        let op = op.trim();

        let operator = if op.is_empty() {
            Operator::Equal
        } else {
            Operator::parse(op).map_err(|_| VersionParseError(input.to_string()))?
        };

        Ok(Self::new(operator, Version::parse(version)?))
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl Constraint for VersionConstraint {
    fn matches(&self, version: &Version) -> bool {
        self.operator.compares(version.cmp(&self.version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.version)
    }
}
