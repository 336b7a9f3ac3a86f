use std::collections::HashMap;

use crate::rule::{Rule, RuleId, RuleType};

/// Ordered, typed store of SAT rules.
///
/// Rules get a global id equal to their insertion index; each type also
/// keeps the ids of its rules in insertion order. Duplicate rules (same
/// literal multiset, any type) are rejected. Rules are never removed,
/// only disabled.
#[derive(Debug, Default)]
pub struct RuleSet {
    /// All rules indexed by ID
    rules: Vec<Rule>,

    /// Rule ids by type, in insertion order
    rules_by_type: HashMap<RuleType, Vec<RuleId>>,

    /// Literal-content hash for deduplication
    rule_hashes: HashMap<u64, Vec<RuleId>>,
}

impl RuleSet {
    /// Create a new empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule under the given type, returning its ID.
    /// Returns the existing rule's ID if a duplicate exists.
    pub fn add(&mut self, mut rule: Rule, rule_type: RuleType) -> RuleId {
        let hash = rule.literal_hash();
        if let Some(candidates) = self.rule_hashes.get(&hash) {
            for &existing_id in candidates {
                if let Some(existing) = self.get(existing_id) {
                    if existing.equals_literals(&rule) {
                        return existing_id;
                    }
                }
            }
        }

        let id = self.rules.len() as RuleId;
        rule.set_id(id);
        rule.set_type(rule_type);

        self.rules_by_type.entry(rule_type).or_default().push(id);
        self.rule_hashes.entry(hash).or_default().push(id);
        self.rules.push(rule);

        id
    }

    /// Get a rule by ID
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    /// Get a mutable reference to a rule by ID
    pub fn get_mut(&mut self, id: RuleId) -> Option<&mut Rule> {
        self.rules.get_mut(id as usize)
    }

    /// All rules in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Rules of one type, in insertion order
    pub fn iter_type(&self, rule_type: RuleType) -> impl Iterator<Item = &Rule> {
        self.rules_by_type
            .get(&rule_type)
            .into_iter()
            .flatten()
            .filter_map(move |&id| self.get(id))
    }

    /// Rules of any of the given types, in global insertion order
    pub fn iter_types<'a>(&'a self, types: &'a [RuleType]) -> impl Iterator<Item = &'a Rule> {
        self.rules.iter().filter(move |r| types.contains(&r.rule_type()))
    }

    /// Ids of all rules of one type, in insertion order
    pub fn ids_of_type(&self, rule_type: RuleType) -> Vec<RuleId> {
        self.rules_by_type
            .get(&rule_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Get the total number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the rule set is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Count rules by type
    pub fn count_by_type(&self, rule_type: RuleType) -> usize {
        self.rules_by_type
            .get(&rule_type)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Disable a rule
    pub fn disable(&mut self, id: RuleId) {
        if let Some(rule) = self.get_mut(id) {
            rule.disable();
        }
    }

    /// Enable a rule
    pub fn enable(&mut self, id: RuleId) {
        if let Some(rule) = self.get_mut(id) {
            rule.enable();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleReason;

    #[test]
    fn test_rule_set_add() {
        let mut rules = RuleSet::new();

        let id1 = rules.add(Rule::install(1, RuleReason::JobInstall), RuleType::Job);
        let id2 = rules.add(
            Rule::require(1, &[2, 3], RuleReason::PackageRequires).unwrap(),
            RuleType::Package,
        );

        assert_eq!(id1, 0);
        assert_eq!(id2, 1);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.get(id1).unwrap().rule_type(), RuleType::Job);
    }

    #[test]
    fn test_rule_set_deduplication() {
        let mut rules = RuleSet::new();

        let id1 = rules.add(
            Rule::new(vec![1, 2, 3], RuleType::Package, RuleReason::PackageRequires),
            RuleType::Package,
        );
        let id2 = rules.add(
            Rule::new(vec![3, 1, 2], RuleType::Package, RuleReason::PackageRequires),
            RuleType::Package,
        );

        // Same literals, different order - should deduplicate
        assert_eq!(id1, id2);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_rule_set_deduplication_across_types() {
        let mut rules = RuleSet::new();

        let id1 = rules.add(Rule::install(5, RuleReason::JobInstall), RuleType::Job);
        let id2 = rules.add(Rule::install(5, RuleReason::JobLock), RuleType::Package);

        assert_eq!(id1, id2);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_rule_set_iter_type() {
        let mut rules = RuleSet::new();
        rules.add(Rule::install(1, RuleReason::JobInstall), RuleType::Job);
        rules.add(Rule::install(2, RuleReason::JobInstall), RuleType::Job);
        rules.add(
            Rule::require(1, &[3, 4], RuleReason::PackageRequires).unwrap(),
            RuleType::Package,
        );

        assert_eq!(rules.iter_type(RuleType::Job).count(), 2);
        assert_eq!(rules.iter_type(RuleType::Package).count(), 1);
        assert_eq!(rules.iter_type(RuleType::Learned).count(), 0);
        assert_eq!(rules.count_by_type(RuleType::Job), 2);
    }

    #[test]
    fn test_rule_set_iter_types_in_insertion_order() {
        let mut rules = RuleSet::new();
        rules.add(Rule::install(1, RuleReason::JobInstall), RuleType::Job);
        rules.add(Rule::update(2, &[3], RuleReason::InternalAllowUpdate), RuleType::Update);
        rules.add(Rule::install(4, RuleReason::JobInstall), RuleType::Job);
        rules.add(Rule::update(5, &[6], RuleReason::InternalAllowUpdate), RuleType::Feature);

        let ids: Vec<RuleId> = rules
            .iter_types(&[RuleType::Job, RuleType::Update, RuleType::Feature])
            .map(|r| r.id())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        let ids: Vec<RuleId> = rules
            .iter_types(&[RuleType::Update, RuleType::Feature])
            .map(|r| r.id())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_rule_set_disable_enable() {
        let mut rules = RuleSet::new();
        rules.add(Rule::install(1, RuleReason::JobInstall), RuleType::Job);

        assert!(!rules.get(0).unwrap().is_disabled());

        rules.disable(0);
        assert!(rules.get(0).unwrap().is_disabled());

        rules.enable(0);
        assert!(!rules.get(0).unwrap().is_disabled());
    }
}
