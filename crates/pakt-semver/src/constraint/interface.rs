use std::fmt;

use crate::version::Version;

/// Trait for all constraint types.
///
/// A constraint is a predicate over versions. The `Display` form is
/// deterministic for a given constraint and doubles as its cache digest.
pub trait Constraint: fmt::Debug + fmt::Display {
    /// Check whether the given version satisfies this constraint.
    fn matches(&self, version: &Version) -> bool;
}
