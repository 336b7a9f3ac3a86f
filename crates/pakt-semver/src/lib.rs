//! Version parsing, comparison and constraint matching for the pakt resolver.
//!
//! Versions are plain dotted-numeric releases with an optional pre-release
//! tag (`1`, `1.2`, `1.2.3`, `1.2.3-beta1`). Constraints are predicates over
//! versions: a single operator comparison, a conjunction of constraints, or
//! a match-all wildcard.

pub mod constraint;
mod version;

pub use constraint::{Constraint, MatchAllConstraint, MultiConstraint, Operator, VersionConstraint};
pub use version::{Version, VersionParseError};
