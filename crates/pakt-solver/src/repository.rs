use pakt_semver::Version;

use crate::package::Package;

/// Identifier of a registered repository; assigned by the pool, 1-based.
/// The solver decides "is this package installed" by comparing a package's
/// repository id against the installed repository's id.
pub type RepoId = u32;

/// An ordered collection of packages from one source.
///
/// Repositories are built by the caller (from whatever metadata source)
/// and handed to [`Pool::add_repository`](crate::pool::Pool::add_repository)
/// wholesale; the pool then owns the packages and assigns their ids.
#[derive(Debug, Default)]
pub struct Repository {
    name: String,
    packages: Vec<Package>,
}

impl Repository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_package(&mut self, package: Package) -> &mut Self {
        self.packages.push(package);
        self
    }

    /// Whether a package with this name (and version, if given) is present.
    pub fn contains(&self, name: &str, version: Option<&Version>) -> bool {
        self.packages.iter().any(|p| {
            p.name().eq_ignore_ascii_case(name)
                && version.map_or(true, |v| p.version() == v)
        })
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Package>) {
        (self.name, self.packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_repository_membership() {
        let mut repo = Repository::new("remote");
        repo.add_package(Package::new("foo", v("1.0")));
        repo.add_package(Package::new("foo", v("2.0")));
        repo.add_package(Package::new("bar", v("1.0")));

        assert_eq!(repo.len(), 3);
        assert!(repo.contains("foo", None));
        assert!(repo.contains("Foo", Some(&v("2.0"))));
        assert!(!repo.contains("foo", Some(&v("3.0"))));
        assert!(!repo.contains("baz", None));
    }

    #[test]
    fn test_repository_enumeration_order() {
        let mut repo = Repository::new("remote");
        repo.add_package(Package::new("b", v("1.0")));
        repo.add_package(Package::new("a", v("1.0")));

        let names: Vec<_> = repo.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["b", "a"]);
    }
}
