//! Constraint predicates over versions.

mod interface;
mod match_all;
mod multi_constraint;
mod operator;
mod version_constraint;

pub use interface::Constraint;
pub use match_all::MatchAllConstraint;
pub use multi_constraint::MultiConstraint;
pub use operator::{InvalidOperatorError, Operator};
pub use version_constraint::VersionConstraint;
