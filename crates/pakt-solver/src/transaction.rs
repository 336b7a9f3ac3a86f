use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::package::Package;

/// A single operation in a transaction
#[derive(Debug, Clone)]
pub enum Operation {
    /// Install a new package
    Install(Arc<Package>),
    /// Remove an installed package
    Remove(Arc<Package>),
}

impl Operation {
    pub fn package(&self) -> &Arc<Package> {
        match self {
            Operation::Install(pkg) | Operation::Remove(pkg) => pkg,
        }
    }

    pub fn is_install(&self) -> bool {
        matches!(self, Operation::Install(_))
    }

    pub fn job_str(&self) -> &'static str {
        match self {
            Operation::Install(_) => "install",
            Operation::Remove(_) => "remove",
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Operation", 3)?;
        state.serialize_field("job", self.job_str())?;
        state.serialize_field("package", self.package().name())?;
        state.serialize_field("version", &self.package().version().to_string())?;
        state.end()
    }
}

/// The solver's output: an ordered list of installs and removals.
///
/// Operations are ordered so that removals which unblock other operations
/// come before the installs that depend on them; applying them in order
/// transforms the installed set into the solved state. An empty
/// transaction means no change is required.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transaction {
    operations: Vec<Operation>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_operations(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// All packages that will be installed
    pub fn installs(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Install(pkg) => Some(pkg),
            _ => None,
        })
    }

    /// All packages that will be removed
    pub fn removals(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Remove(pkg) => Some(pkg),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}
