use crate::package::Package;
use crate::pool::{PackageId, Pool};
use crate::rule::{literal_package, Literal};

/// Candidate selection policy.
///
/// The solver consults the policy for everything preference-shaped:
/// whether a package may be installed at all, which packages count as
/// update candidates for an installed package, which of several viable
/// candidates to try first, and whether installed packages may be
/// uninstalled to satisfy constraints (which turns update rules weak).
///
/// Implementations must be deterministic: the same inputs must produce the
/// same ordering, or solves stop being reproducible.
pub trait Policy {
    /// Whether the package is installable at all (platform filters etc).
    fn installable(&self, _pool: &Pool, _package: &Package) -> bool {
        true
    }

    /// Ordered update candidates for an installed package. With
    /// `allow_downgrade` the candidate set also contains older versions.
    fn find_update_packages(
        &self,
        pool: &Pool,
        package: &Package,
        allow_downgrade: bool,
    ) -> Vec<PackageId>;

    /// Order candidate literals by preference; the head is decided first
    /// and the tail is kept as branch alternatives.
    fn select_preferred(&self, pool: &Pool, literals: &[Literal]) -> Vec<Literal>;

    /// Whether the solver may uninstall installed packages. When true,
    /// update and feature rules are added weak.
    fn allow_uninstall(&self) -> bool {
        true
    }
}

/// Default policy: prefer the highest version, allow uninstalls.
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
    prefer_lowest: bool,
    allow_uninstall: bool,
}

impl DefaultPolicy {
    pub fn new() -> Self {
        Self {
            prefer_lowest: false,
            allow_uninstall: true,
        }
    }

    /// Prefer the lowest matching version instead of the highest.
    pub fn prefer_lowest(mut self, prefer: bool) -> Self {
        self.prefer_lowest = prefer;
        self
    }

    /// Control whether installed packages may be uninstalled.
    pub fn with_allow_uninstall(mut self, allow: bool) -> Self {
        self.allow_uninstall = allow;
        self
    }
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for DefaultPolicy {
    fn find_update_packages(
        &self,
        pool: &Pool,
        package: &Package,
        allow_downgrade: bool,
    ) -> Vec<PackageId> {
        let mut candidates = Vec::new();

        for id in pool.what_provides(package.name(), None) {
            if id == package.id() {
                continue;
            }
            let Some(candidate) = pool.package(id) else {
                continue;
            };
            // updates stay within the package name; providers of the name
            // under another name are not updates
            if !candidate.name().eq_ignore_ascii_case(package.name()) {
                continue;
            }

            let newer = candidate.version() > package.version();
            let different = candidate.version() != package.version();
            if newer || (allow_downgrade && different) {
                candidates.push(id);
            }
        }

        candidates
    }

    fn select_preferred(&self, pool: &Pool, literals: &[Literal]) -> Vec<Literal> {
        let mut sorted = literals.to_vec();
        sorted.sort_by(|&a, &b| {
            let id_a = literal_package(a);
            let id_b = literal_package(b);
            match (pool.package(id_a), pool.package(id_b)) {
                (Some(pkg_a), Some(pkg_b)) => {
                    let by_version = if self.prefer_lowest {
                        pkg_a.version().cmp(pkg_b.version())
                    } else {
                        pkg_b.version().cmp(pkg_a.version())
                    };
                    by_version.then(id_a.cmp(&id_b))
                }
                _ => id_a.cmp(&id_b),
            }
        });
        sorted
    }

    fn allow_uninstall(&self) -> bool {
        self.allow_uninstall
    }
}
