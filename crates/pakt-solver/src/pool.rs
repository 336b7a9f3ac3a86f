use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use pakt_semver::Constraint;

use crate::package::Package;
use crate::repository::{RepoId, Repository};

/// A package id doubles as the SAT literal base: positive literals mean
/// "install package", negative mean "don't install". Ids are dense,
/// positive and 1-based.
pub type PackageId = i32;

/// Pool of all candidate packages across every registered repository.
///
/// The pool indexes packages by id, by name, and by the names they provide
/// or replace. Provider lookups are memoized per (name, constraint digest);
/// registering another repository invalidates the memo.
pub struct Pool {
    /// All packages; index is id - 1.
    packages: Vec<Arc<Package>>,

    /// Package ids indexed by name (lowercase).
    packages_by_name: HashMap<String, Vec<PackageId>>,

    /// Package ids indexed by the names they provide or replace (lowercase).
    providers: HashMap<String, Vec<PackageId>>,

    /// Registered repositories in registration order.
    repositories: Vec<RepositoryInfo>,

    /// Memoized what_provides results, keyed by (name, constraint digest).
    what_provides_cache: RefCell<HashMap<(String, Option<String>), Vec<PackageId>>>,
}

#[derive(Debug)]
struct RepositoryInfo {
    name: String,
    members: Vec<PackageId>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("packages", &self.packages.len())
            .field("repositories", &self.repositories)
            .finish()
    }
}

impl Pool {
    pub fn new() -> Self {
        Self {
            packages: Vec::new(),
            packages_by_name: HashMap::new(),
            providers: HashMap::new(),
            repositories: Vec::new(),
            what_provides_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Register a repository, assigning ids to its packages in order.
    /// Returns the repository's id.
    pub fn add_repository(&mut self, repository: Repository) -> RepoId {
        let repo_id = (self.repositories.len() + 1) as RepoId;
        let (name, packages) = repository.into_parts();

        let mut members = Vec::with_capacity(packages.len());
        for mut package in packages {
            let id = (self.packages.len() + 1) as PackageId;
            package.register(id, repo_id);

            self.packages_by_name
                .entry(package.name().to_lowercase())
                .or_default()
                .push(id);

            for link in package.provides().iter().chain(package.replaces()) {
                self.providers
                    .entry(link.target().to_lowercase())
                    .or_default()
                    .push(id);
            }

            self.packages.push(Arc::new(package));
            members.push(id);
        }

        log::debug!("registered repository {} with {} package(s)", name, members.len());
        self.repositories.push(RepositoryInfo { name, members });

        // later registrations change lookup results
        self.what_provides_cache.borrow_mut().clear();

        repo_id
    }

    /// Get a package by its id.
    pub fn package(&self, id: PackageId) -> Option<&Arc<Package>> {
        if id <= 0 {
            return None;
        }
        self.packages.get((id - 1) as usize)
    }

    /// Every package whose own name, provides, or replaces entry matches
    /// `name` and whose version satisfies `constraint` (`None` matches
    /// everything). Results come back in registration order and are
    /// memoized until the next repository registration.
    pub fn what_provides(&self, name: &str, constraint: Option<&dyn Constraint>) -> Vec<PackageId> {
        let key = (name.to_lowercase(), constraint.map(|c| c.to_string()));

        if let Some(hit) = self.what_provides_cache.borrow().get(&key) {
            return hit.clone();
        }

        let mut ids: Vec<PackageId> = Vec::new();
        if let Some(named) = self.packages_by_name.get(&key.0) {
            ids.extend(named);
        }
        if let Some(providing) = self.providers.get(&key.0) {
            ids.extend(providing);
        }
        ids.sort_unstable();
        ids.dedup();

        if let Some(constraint) = constraint {
            ids.retain(|&id| {
                self.package(id)
                    .map(|p| constraint.matches(p.version()))
                    .unwrap_or(false)
            });
        }

        self.what_provides_cache.borrow_mut().insert(key, ids.clone());
        ids
    }

    /// Ids of the packages registered from the given repository, in order.
    pub fn repository_packages(&self, repository: RepoId) -> &[PackageId] {
        if repository == 0 {
            return &[];
        }
        self.repositories
            .get((repository - 1) as usize)
            .map(|info| info.members.as_slice())
            .unwrap_or(&[])
    }

    /// The name a repository was registered under.
    pub fn repository_name(&self, repository: RepoId) -> Option<&str> {
        if repository == 0 {
            return None;
        }
        self.repositories
            .get((repository - 1) as usize)
            .map(|info| info.name.as_str())
    }

    /// The total number of registered packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pakt_semver::{Version, VersionConstraint};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn c(s: &str) -> Box<dyn Constraint> {
        Box::new(VersionConstraint::parse(s).unwrap())
    }

    #[test]
    fn test_pool_id_assignment() {
        let mut pool = Pool::new();
        let mut repo = Repository::new("remote");
        repo.add_package(Package::new("foo", v("1.0")));
        repo.add_package(Package::new("bar", v("1.0")));

        let repo_id = pool.add_repository(repo);
        assert_eq!(repo_id, 1);
        assert_eq!(pool.len(), 2);

        let foo = pool.package(1).unwrap();
        assert_eq!(foo.id(), 1);
        assert_eq!(foo.name(), "foo");
        assert_eq!(foo.repository(), repo_id);

        assert!(pool.package(0).is_none());
        assert!(pool.package(3).is_none());
    }

    #[test]
    fn test_what_provides_by_name() {
        let mut pool = Pool::new();
        let mut repo = Repository::new("remote");
        repo.add_package(Package::new("foo", v("1.0")));
        repo.add_package(Package::new("foo", v("2.0")));
        repo.add_package(Package::new("bar", v("1.0")));
        pool.add_repository(repo);

        assert_eq!(pool.what_provides("foo", None), vec![1, 2]);
        assert_eq!(pool.what_provides("FOO", None), vec![1, 2]);
        assert_eq!(pool.what_provides("baz", None), Vec::<PackageId>::new());
    }

    #[test]
    fn test_what_provides_constraint_filter() {
        let mut pool = Pool::new();
        let mut repo = Repository::new("remote");
        repo.add_package(Package::new("foo", v("1.0")));
        repo.add_package(Package::new("foo", v("2.0")));
        pool.add_repository(repo);

        let constraint = c(">= 2.0");
        assert_eq!(pool.what_provides("foo", Some(constraint.as_ref())), vec![2]);
    }

    #[test]
    fn test_what_provides_through_provides_and_replaces() {
        let mut pool = Pool::new();
        let mut repo = Repository::new("remote");

        let mut virt = Package::new("impl-a", v("1.0"));
        virt.provide("virtual", None);
        repo.add_package(virt);

        let mut replacer = Package::new("new-b", v("1.0"));
        replacer.replace("old-b", None);
        repo.add_package(replacer);

        pool.add_repository(repo);

        assert_eq!(pool.what_provides("virtual", None), vec![1]);
        assert_eq!(pool.what_provides("old-b", None), vec![2]);
    }

    #[test]
    fn test_what_provides_memoized() {
        let mut pool = Pool::new();
        let mut repo = Repository::new("remote");
        repo.add_package(Package::new("foo", v("1.0")));
        pool.add_repository(repo);

        let first = pool.what_provides("foo", None);
        let second = pool.what_provides("foo", None);
        assert_eq!(first, vec![1]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_cache_invalidated_by_registration() {
        let mut pool = Pool::new();
        let mut repo = Repository::new("first");
        repo.add_package(Package::new("foo", v("1.0")));
        pool.add_repository(repo);

        assert_eq!(pool.what_provides("foo", None), vec![1]);

        let mut second = Repository::new("second");
        second.add_package(Package::new("foo", v("2.0")));
        pool.add_repository(second);

        assert_eq!(pool.what_provides("foo", None), vec![1, 2]);
    }

    #[test]
    fn test_repository_packages_order() {
        let mut pool = Pool::new();
        let mut installed = Repository::new("installed");
        installed.add_package(Package::new("b", v("1.0")));
        installed.add_package(Package::new("a", v("1.0")));
        let installed_id = pool.add_repository(installed);

        let mut remote = Repository::new("remote");
        remote.add_package(Package::new("c", v("1.0")));
        let remote_id = pool.add_repository(remote);

        assert_eq!(pool.repository_packages(installed_id), &[1, 2]);
        assert_eq!(pool.repository_packages(remote_id), &[3]);
        assert_eq!(pool.repository_name(installed_id), Some("installed"));
    }
}
