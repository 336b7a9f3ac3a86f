use std::fmt;

use super::interface::Constraint;
use crate::version::Version;

/// Conjunction of child constraints: a version matches only if every
/// child matches.
#[derive(Debug)]
pub struct MultiConstraint {
    constraints: Vec<Box<dyn Constraint>>,
}

impl MultiConstraint {
    pub fn new(constraints: Vec<Box<dyn Constraint>>) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }
}

impl Constraint for MultiConstraint {
    fn matches(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }
}

impl fmt::Display for MultiConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
