use pakt_semver::{Constraint, Version};

use crate::pool::PackageId;
use crate::repository::RepoId;

/// A dependency edge from a package to a target name, optionally
/// restricted by a version constraint. `None` matches every version.
#[derive(Debug)]
pub struct Link {
    target: String,
    constraint: Option<Box<dyn Constraint>>,
}

impl Link {
    pub fn new(target: impl Into<String>, constraint: Option<Box<dyn Constraint>>) -> Self {
        Self {
            target: target.into(),
            constraint,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn constraint(&self) -> Option<&dyn Constraint> {
        self.constraint.as_deref()
    }

    /// The constraint rendered for diagnostics; `*` when unconstrained.
    pub fn constraint_string(&self) -> String {
        match self.constraint {
            Some(ref c) => c.to_string(),
            None => "*".to_string(),
        }
    }
}

/// A single candidate package version.
///
/// Packages are immutable once registered in a [`Pool`](crate::pool::Pool):
/// registration assigns the dense positive id used as the SAT literal base
/// and records the originating repository. Identity is the id; two handles
/// to the same pool entry compare equal by id.
#[derive(Debug)]
pub struct Package {
    id: PackageId,
    repository: RepoId,
    name: String,
    version: Version,
    requires: Vec<Link>,
    conflicts: Vec<Link>,
    provides: Vec<Link>,
    replaces: Vec<Link>,
    recommends: Vec<Link>,
    suggests: Vec<Link>,
}

impl Package {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            id: 0,
            repository: 0,
            name: name.into(),
            version,
            requires: Vec::new(),
            conflicts: Vec::new(),
            provides: Vec::new(),
            replaces: Vec::new(),
            recommends: Vec::new(),
            suggests: Vec::new(),
        }
    }

    /// Assign pool id and repository; called once at registration.
    pub(crate) fn register(&mut self, id: PackageId, repository: RepoId) {
        self.id = id;
        self.repository = repository;
    }

    /// The pool-assigned id; 0 until the package is registered.
    pub fn id(&self) -> PackageId {
        self.id
    }

    /// The repository this package was registered from.
    pub fn repository(&self) -> RepoId {
        self.repository
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// `name-version`, the canonical display form.
    pub fn pretty_string(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn require(&mut self, target: impl Into<String>, constraint: Option<Box<dyn Constraint>>) {
        self.requires.push(Link::new(target, constraint));
    }

    pub fn conflict(&mut self, target: impl Into<String>, constraint: Option<Box<dyn Constraint>>) {
        self.conflicts.push(Link::new(target, constraint));
    }

    pub fn provide(&mut self, target: impl Into<String>, constraint: Option<Box<dyn Constraint>>) {
        self.provides.push(Link::new(target, constraint));
    }

    pub fn replace(&mut self, target: impl Into<String>, constraint: Option<Box<dyn Constraint>>) {
        self.replaces.push(Link::new(target, constraint));
    }

    pub fn recommend(&mut self, target: impl Into<String>, constraint: Option<Box<dyn Constraint>>) {
        self.recommends.push(Link::new(target, constraint));
    }

    pub fn suggest(&mut self, target: impl Into<String>, constraint: Option<Box<dyn Constraint>>) {
        self.suggests.push(Link::new(target, constraint));
    }

    pub fn requires(&self) -> &[Link] {
        &self.requires
    }

    pub fn conflicts(&self) -> &[Link] {
        &self.conflicts
    }

    pub fn provides(&self) -> &[Link] {
        &self.provides
    }

    pub fn replaces(&self) -> &[Link] {
        &self.replaces
    }

    pub fn recommends(&self) -> &[Link] {
        &self.recommends
    }

    pub fn suggests(&self) -> &[Link] {
        &self.suggests
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Package {}

#[cfg(test)]
mod tests {
    use super::*;
    use pakt_semver::VersionConstraint;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_package_new() {
        let package = Package::new("foo", v("1.2"));
        assert_eq!(package.name(), "foo");
        assert_eq!(package.version(), &v("1.2"));
        assert_eq!(package.id(), 0);
        assert_eq!(package.pretty_string(), "foo-1.2");
    }

    #[test]
    fn test_package_links() {
        let mut package = Package::new("foo", v("1.0"));
        package.require("bar", Some(Box::new(VersionConstraint::parse(">= 1.0").unwrap())));
        package.conflict("baz", None);
        package.replace("old-foo", None);

        assert_eq!(package.requires().len(), 1);
        assert_eq!(package.requires()[0].target(), "bar");
        assert_eq!(package.requires()[0].constraint_string(), ">= 1.0");
        assert_eq!(package.conflicts()[0].constraint_string(), "*");
        assert_eq!(package.replaces()[0].target(), "old-foo");
    }
}
