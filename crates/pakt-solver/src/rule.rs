use std::fmt;
use std::hash::{Hash, Hasher};

use crate::pool::PackageId;

/// A literal in SAT terms - positive means "install", negative means
/// "don't install". The absolute value is the package id; 0 is invalid.
pub type Literal = i32;

/// Rule id assigned by the rule set; doubles as the global insertion index.
pub type RuleId = u32;

/// The package a literal refers to.
#[inline]
pub fn literal_package(literal: Literal) -> PackageId {
    literal.abs()
}

/// Types of rules generated during dependency resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Dependency/conflict structure derived from package metadata
    Package,
    /// Rule emitted for a user job
    Job,
    /// Keep-or-upgrade rule for an installed package
    Update,
    /// Like update, but downgrades are permitted
    Feature,
    /// Clause learned from conflict analysis
    Learned,
    /// Reserved for branch-choice rules
    Choice,
}

/// Why a rule exists; drives problem rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleReason {
    JobInstall,
    JobRemove,
    JobLock,
    PackageRequires,
    PackageConflict,
    PackageSameName,
    PackageObsoletes,
    InstalledPackageObsoletes,
    NotInstallable,
    InternalAllowUpdate,
    Learned,
}

/// A SAT rule (clause): a disjunction of literals, satisfied when at
/// least one literal is true.
///
/// A rule with a single literal is an assertion and propagates
/// immediately at level 1. A rule with no literals is impossible - it can
/// never be satisfied and deterministically produces a problem.
///
/// # Examples
///
/// - `[A]` - package A must be installed
/// - `[-A]` - package A must not be installed
/// - `[-A, B, C]` - if A is installed, then B or C must be installed
/// - `[-A, -B]` - A and B cannot both be installed
#[derive(Clone)]
pub struct Rule {
    /// The literals in this rule
    literals: Vec<Literal>,
    /// Type of rule
    rule_type: RuleType,
    /// Why the rule was created
    reason: RuleReason,
    /// Rule ID (assigned by RuleSet)
    id: RuleId,
    /// Source package ID (for problem messages)
    source_package: Option<PackageId>,
    /// Target package name (for problem messages)
    target_name: Option<String>,
    /// Constraint string (for problem messages)
    constraint: Option<String>,
    /// Whether this rule is disabled
    disabled: bool,
    /// Weak rules may be silently disabled on conflict instead of
    /// contributing to a user-visible problem
    weak: bool,
}

impl Rule {
    /// Create a new rule with the given literals
    pub fn new(literals: Vec<Literal>, rule_type: RuleType, reason: RuleReason) -> Self {
        Self {
            literals,
            rule_type,
            reason,
            id: 0,
            source_package: None,
            target_name: None,
            constraint: None,
            disabled: false,
            weak: false,
        }
    }

    /// Require rule `(-P | Q1 | ... | Qn)`: if P is installed, one of its
    /// providers must be. Returns `None` when P provides itself (tautology).
    pub fn require(package: PackageId, providers: &[PackageId], reason: RuleReason) -> Option<Self> {
        if providers.contains(&package) {
            return None;
        }
        let mut literals = vec![-package];
        literals.extend(providers);
        Some(Self::new(literals, RuleType::Package, reason))
    }

    /// Update rule `(P | U1 | ... | Um)`: keep P installed or move to one
    /// of its update candidates.
    pub fn update(package: PackageId, candidates: &[PackageId], reason: RuleReason) -> Self {
        let mut literals = vec![package];
        literals.extend(candidates);
        Self::new(literals, RuleType::Package, reason)
    }

    /// Install rule `(P)`.
    pub fn install(package: PackageId, reason: RuleReason) -> Self {
        Self::new(vec![package], RuleType::Package, reason)
    }

    /// Install-one-of rule `(P1 | ... | Pn)`; with no candidates this is
    /// the impossible rule. Duplicate candidates collapse so the two
    /// watches always sit on distinct literals.
    pub fn install_one_of(packages: &[PackageId], reason: RuleReason) -> Self {
        let mut literals: Vec<Literal> = Vec::with_capacity(packages.len());
        for &package in packages {
            if !literals.contains(&package) {
                literals.push(package);
            }
        }
        Self::new(literals, RuleType::Package, reason)
    }

    /// Remove rule `(-P)`.
    pub fn remove(package: PackageId, reason: RuleReason) -> Self {
        Self::new(vec![-package], RuleType::Package, reason)
    }

    /// Conflict rule `(-A | -B)`. Returns `None` when A and B are the same
    /// package.
    pub fn conflict(a: PackageId, b: PackageId, reason: RuleReason) -> Option<Self> {
        if a == b {
            return None;
        }
        Some(Self::new(vec![-a, -b], RuleType::Package, reason))
    }

    /// The impossible rule: an empty clause, always false.
    pub fn impossible(reason: RuleReason) -> Self {
        Self::new(Vec::new(), RuleType::Package, reason)
    }

    /// Create a learned rule from conflict analysis
    pub fn learned(literals: Vec<Literal>) -> Self {
        Self::new(literals, RuleType::Learned, RuleReason::Learned)
    }

    /// Set the rule ID
    pub(crate) fn set_id(&mut self, id: RuleId) {
        self.id = id;
    }

    /// Re-type a rule; rules are constructed as package rules and adopt
    /// their final type when added to the set.
    pub(crate) fn set_type(&mut self, rule_type: RuleType) {
        self.rule_type = rule_type;
    }

    /// Get the rule ID
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Set source package for problem messages
    pub fn with_source(mut self, package: PackageId) -> Self {
        self.source_package = Some(package);
        self
    }

    /// Set target name for problem messages
    pub fn with_target(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    /// Set constraint for problem messages
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Get the rule type
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Get the reason tag
    pub fn reason(&self) -> RuleReason {
        self.reason
    }

    /// Get the literals
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Reorder literals; used to place the second watch on the literal
    /// decided at the highest level when adding learned rules.
    pub(crate) fn literals_mut(&mut self) -> &mut Vec<Literal> {
        &mut self.literals
    }

    /// Get source package ID
    pub fn source_package(&self) -> Option<PackageId> {
        self.source_package
    }

    /// Get target name
    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    /// Get constraint
    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    /// Check if this is an assertion (single literal)
    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    /// Check if this rule can never be satisfied (empty clause)
    pub fn is_impossible(&self) -> bool {
        self.literals.is_empty()
    }

    /// Check if this rule is disabled
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Disable this rule
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Enable this rule
    pub fn enable(&mut self) {
        self.disabled = false;
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub fn set_weak(&mut self, weak: bool) {
        self.weak = weak;
    }

    /// Get the number of literals
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Get a hash of this rule's literals for deduplication
    pub fn literal_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();

        // Sort literals for consistent hashing
        let mut sorted = self.literals.clone();
        sorted.sort_unstable();
        sorted.hash(&mut hasher);

        hasher.finish()
    }

    /// Check if two rules have the same literals (regardless of order)
    pub fn equals_literals(&self, other: &Rule) -> bool {
        if self.literals.len() != other.literals.len() {
            return false;
        }

        let mut a = self.literals.clone();
        let mut b = other.literals.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({:?}, {:?}, {:?})", self.rule_type, self.reason, self.literals)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|&l| {
                if l > 0 {
                    format!("+{}", l)
                } else {
                    format!("{}", l)
                }
            })
            .collect();

        write!(f, "({}) [{}]", self.reason_str(), literals.join(" | "))
    }
}

impl Rule {
    fn reason_str(&self) -> &'static str {
        match self.reason {
            RuleReason::JobInstall => "job-install",
            RuleReason::JobRemove => "job-remove",
            RuleReason::JobLock => "job-lock",
            RuleReason::PackageRequires => "requires",
            RuleReason::PackageConflict => "conflict",
            RuleReason::PackageSameName => "same-name",
            RuleReason::PackageObsoletes => "obsoletes",
            RuleReason::InstalledPackageObsoletes => "installed-obsoletes",
            RuleReason::NotInstallable => "not-installable",
            RuleReason::InternalAllowUpdate => "allow-update",
            RuleReason::Learned => "learned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_require() {
        let rule = Rule::require(1, &[2, 3, 4], RuleReason::PackageRequires).unwrap();
        assert_eq!(rule.literals(), &[-1, 2, 3, 4]);
        assert_eq!(rule.rule_type(), RuleType::Package);
    }

    #[test]
    fn test_rule_self_require_is_tautology() {
        assert!(Rule::require(1, &[2, 1], RuleReason::PackageRequires).is_none());
    }

    #[test]
    fn test_rule_require_no_providers() {
        let rule = Rule::require(1, &[], RuleReason::PackageRequires).unwrap();
        assert_eq!(rule.literals(), &[-1]);
        assert!(rule.is_assertion());
    }

    #[test]
    fn test_rule_update() {
        let rule = Rule::update(1, &[2, 3], RuleReason::InternalAllowUpdate);
        assert_eq!(rule.literals(), &[1, 2, 3]);
    }

    #[test]
    fn test_rule_conflict() {
        let rule = Rule::conflict(1, 2, RuleReason::PackageConflict).unwrap();
        assert_eq!(rule.literals(), &[-1, -2]);

        assert!(Rule::conflict(1, 1, RuleReason::PackageConflict).is_none());
    }

    #[test]
    fn test_rule_install_one_of() {
        let rule = Rule::install_one_of(&[1, 2], RuleReason::JobInstall);
        assert_eq!(rule.literals(), &[1, 2]);

        let impossible = Rule::install_one_of(&[], RuleReason::JobInstall);
        assert!(impossible.is_impossible());
    }

    #[test]
    fn test_rule_assertions() {
        assert!(Rule::install(5, RuleReason::JobLock).is_assertion());
        assert!(Rule::remove(5, RuleReason::JobRemove).is_assertion());
        assert!(!Rule::impossible(RuleReason::JobInstall).is_assertion());
    }

    #[test]
    fn test_rule_literal_hash() {
        let rule1 = Rule::new(vec![1, 2, 3], RuleType::Package, RuleReason::PackageRequires);
        let rule2 = Rule::new(vec![3, 1, 2], RuleType::Package, RuleReason::PackageRequires);
        let rule3 = Rule::new(vec![1, 2, 4], RuleType::Package, RuleReason::PackageRequires);

        assert_eq!(rule1.literal_hash(), rule2.literal_hash());
        assert_ne!(rule1.literal_hash(), rule3.literal_hash());
    }

    #[test]
    fn test_rule_equals_literals() {
        let rule1 = Rule::new(vec![1, 2, 3], RuleType::Package, RuleReason::PackageRequires);
        let rule2 = Rule::new(vec![3, 1, 2], RuleType::Job, RuleReason::JobInstall);
        let rule3 = Rule::new(vec![1, 2], RuleType::Package, RuleReason::PackageRequires);

        assert!(rule1.equals_literals(&rule2));
        assert!(!rule1.equals_literals(&rule3));
    }

    #[test]
    fn test_rule_weak_and_disable() {
        let mut rule = Rule::install(1, RuleReason::JobInstall);
        assert!(!rule.is_weak());
        assert!(rule.is_enabled());

        rule.set_weak(true);
        rule.disable();
        assert!(rule.is_weak());
        assert!(rule.is_disabled());

        rule.enable();
        assert!(rule.is_enabled());
    }

    #[test]
    fn test_rule_display() {
        let rule = Rule::require(1, &[2, 3], RuleReason::PackageRequires).unwrap();
        let display = format!("{}", rule);
        assert!(display.contains("requires"));
        assert!(display.contains("-1"));
        assert!(display.contains("+2"));
    }
}
