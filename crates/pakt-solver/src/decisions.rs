use crate::pool::PackageId;
use crate::rule::{literal_package, Literal, RuleId};

/// Tracks decisions made during SAT solving.
///
/// Each decision records whether a package is installed (+) or not (-),
/// at what decision level it was made, and which rule forced it.
///
/// Uses a flat Vec indexed by package id for O(1) lookups: 0 = undecided,
/// >0 = installed at that level, <0 = not installed at that level.
#[derive(Debug, Default)]
pub(crate) struct Decisions {
    /// Maps package id to signed decision level; index is the package id
    decision_map: Vec<i32>,

    /// Decisions in the order they were made, with the forcing rule
    decision_queue: Vec<(Literal, Option<RuleId>)>,
}

impl Decisions {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn ensure_capacity(&mut self, package_id: PackageId) {
        let id = package_id as usize;
        if id >= self.decision_map.len() {
            self.decision_map.resize(id + 1, 0);
        }
    }

    /// Make a decision at the given level.
    ///
    /// Returns false if this conflicts with an existing decision.
    pub fn decide(&mut self, literal: Literal, level: u32, reason: Option<RuleId>) -> bool {
        let package_id = literal_package(literal);
        self.ensure_capacity(package_id);

        let id = package_id as usize;
        let existing = self.decision_map[id];
        if existing != 0 {
            return (existing > 0) == (literal > 0);
        }

        self.decision_map[id] = if literal > 0 {
            level as i32
        } else {
            -(level as i32)
        };
        self.decision_queue.push((literal, reason));

        true
    }

    /// Check if a literal is satisfied by current decisions
    #[inline]
    pub fn satisfied(&self, literal: Literal) -> bool {
        let id = literal_package(literal) as usize;
        match self.decision_map.get(id) {
            Some(&d) if d != 0 => (d > 0) == (literal > 0),
            _ => false,
        }
    }

    /// Check if a literal conflicts with current decisions
    #[inline]
    pub fn conflict(&self, literal: Literal) -> bool {
        let id = literal_package(literal) as usize;
        match self.decision_map.get(id) {
            Some(&d) if d != 0 => (d > 0) != (literal > 0),
            _ => false,
        }
    }

    /// Check if a package has been decided (either way)
    #[inline]
    pub fn decided(&self, package_id: PackageId) -> bool {
        let id = package_id as usize;
        id < self.decision_map.len() && self.decision_map[id] != 0
    }

    /// Check if a package is undecided
    #[inline]
    pub fn undecided(&self, package_id: PackageId) -> bool {
        !self.decided(package_id)
    }

    /// The decision level for a package; 0 when undecided.
    #[inline]
    pub fn decision_level(&self, package_id: PackageId) -> u32 {
        let id = package_id as usize;
        match self.decision_map.get(id) {
            Some(&d) => d.unsigned_abs(),
            None => 0,
        }
    }

    /// The rule that forced a decision on this literal's package.
    pub fn decision_rule(&self, literal: Literal) -> Option<RuleId> {
        let package_id = literal_package(literal);
        self.decision_queue
            .iter()
            .find(|&&(lit, _)| literal_package(lit) == package_id)
            .and_then(|&(_, reason)| reason)
    }

    /// The decision at a queue offset.
    #[inline]
    pub fn at(&self, offset: usize) -> (Literal, Option<RuleId>) {
        self.decision_queue[offset]
    }

    /// The reason of the most recent decision.
    pub fn last_reason(&self) -> Option<RuleId> {
        self.decision_queue.last().and_then(|&(_, reason)| reason)
    }

    /// Revert all decisions made above the target level.
    pub fn revert_to_level(&mut self, target_level: u32) {
        while let Some(&(literal, _)) = self.decision_queue.last() {
            let id = literal_package(literal) as usize;
            if self.decision_map[id].unsigned_abs() <= target_level {
                break;
            }
            self.decision_map[id] = 0;
            self.decision_queue.pop();
        }
    }

    /// Drop decisions from the tail until the queue has the given length.
    pub fn rewind_to(&mut self, len: usize) {
        while self.decision_queue.len() > len {
            if let Some((literal, _)) = self.decision_queue.pop() {
                self.decision_map[literal_package(literal) as usize] = 0;
            }
        }
    }

    pub fn queue(&self) -> &[(Literal, Option<RuleId>)] {
        &self.decision_queue
    }

    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    /// Reset all decisions
    pub fn reset(&mut self) {
        self.decision_map.fill(0);
        self.decision_queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decisions_decide() {
        let mut decisions = Decisions::new();

        assert!(decisions.decide(1, 1, Some(0)));
        assert!(decisions.satisfied(1));
        assert!(!decisions.satisfied(-1));
        assert!(decisions.decided(1));

        assert!(decisions.decide(-2, 1, Some(1)));
        assert!(decisions.satisfied(-2));
        assert!(!decisions.satisfied(2));
        assert!(decisions.decided(2));
    }

    #[test]
    fn test_decisions_conflict() {
        let mut decisions = Decisions::new();
        decisions.decide(1, 1, None);

        // deciding the opposite reports a conflict, re-deciding is fine
        assert!(!decisions.decide(-1, 1, None));
        assert!(decisions.decide(1, 2, None));

        assert!(decisions.conflict(-1));
        assert!(!decisions.conflict(1));
        assert!(!decisions.conflict(2));
    }

    #[test]
    fn test_decisions_levels() {
        let mut decisions = Decisions::new();
        decisions.decide(1, 1, None);
        decisions.decide(-2, 3, None);

        assert_eq!(decisions.decision_level(1), 1);
        assert_eq!(decisions.decision_level(2), 3);
        assert_eq!(decisions.decision_level(9), 0);
    }

    #[test]
    fn test_decisions_revert() {
        let mut decisions = Decisions::new();
        decisions.decide(1, 1, None);
        decisions.decide(2, 2, None);
        decisions.decide(-3, 3, None);

        decisions.revert_to_level(1);

        assert!(decisions.decided(1));
        assert!(decisions.undecided(2));
        assert!(decisions.undecided(3));
        assert_eq!(decisions.len(), 1);
    }

    #[test]
    fn test_decisions_rewind() {
        let mut decisions = Decisions::new();
        decisions.decide(1, 1, None);
        decisions.decide(2, 1, None);
        decisions.decide(3, 1, None);

        decisions.rewind_to(1);

        assert!(decisions.decided(1));
        assert!(decisions.undecided(2));
        assert!(decisions.undecided(3));
    }

    #[test]
    fn test_decisions_decision_rule() {
        let mut decisions = Decisions::new();
        decisions.decide(1, 1, Some(42));
        decisions.decide(-2, 1, None);

        assert_eq!(decisions.decision_rule(1), Some(42));
        assert_eq!(decisions.decision_rule(-1), Some(42));
        assert_eq!(decisions.decision_rule(2), None);
        assert_eq!(decisions.last_reason(), None);
    }

    #[test]
    fn test_decisions_reset() {
        let mut decisions = Decisions::new();
        decisions.decide(1, 1, None);
        decisions.reset();

        assert_eq!(decisions.len(), 0);
        assert!(decisions.undecided(1));
    }
}
