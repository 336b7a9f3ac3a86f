use crate::rule::{Literal, Rule, RuleId};

/// Two-watched literals graph for efficient unit propagation.
///
/// Each non-assertion rule watches exactly 2 of its literals. When a
/// watched literal becomes false, the solver tries to find another
/// literal to watch before treating the rule as unit or conflicting.
/// Watches are kept as per-literal lists of watch nodes instead of
/// intrusive next-pointers, so no rule back-references are needed.
#[derive(Debug, Default)]
pub(crate) struct WatchGraph {
    /// Maps literal index -> list of (rule_id, other_watched_literal)
    watches: Vec<Vec<WatchNode>>,
}

/// A watch node linking a rule to its other watched literal
#[derive(Debug, Clone, Copy)]
pub(crate) struct WatchNode {
    /// Rule ID
    pub rule_id: RuleId,
    /// The other watched literal in this rule
    pub other_watch: Literal,
}

impl WatchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert literal to index (handles positive and negative literals)
    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn get_watches_mut(&mut self, literal: Literal) -> &mut Vec<WatchNode> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    /// Add a rule, watching its first two literals. Assertions and
    /// impossible rules have nothing to watch.
    pub fn add_rule(&mut self, rule: &Rule) {
        let literals = rule.literals();
        if literals.len() < 2 {
            return;
        }

        let rule_id = rule.id();
        let watch1 = literals[0];
        let watch2 = literals[1];

        self.get_watches_mut(watch1).push(WatchNode {
            rule_id,
            other_watch: watch2,
        });
        self.get_watches_mut(watch2).push(WatchNode {
            rule_id,
            other_watch: watch1,
        });
    }

    /// Get rules watching a specific literal
    pub fn get_watches(&self, literal: Literal) -> &[WatchNode] {
        let idx = Self::literal_to_index(literal);
        if idx < self.watches.len() {
            &self.watches[idx]
        } else {
            &[]
        }
    }

    fn remove_watch(&mut self, literal: Literal, rule_id: RuleId) {
        let idx = Self::literal_to_index(literal);
        if idx < self.watches.len() {
            self.watches[idx].retain(|w| w.rule_id != rule_id);
        }
    }

    /// Move a rule's watch from one literal to another
    pub fn move_watch(&mut self, rule_id: RuleId, from: Literal, to: Literal, other: Literal) {
        self.remove_watch(from, rule_id);
        self.get_watches_mut(to).push(WatchNode {
            rule_id,
            other_watch: other,
        });

        // the other watch now pairs with the new literal
        let idx = Self::literal_to_index(other);
        if idx < self.watches.len() {
            for node in &mut self.watches[idx] {
                if node.rule_id == rule_id && node.other_watch == from {
                    node.other_watch = to;
                }
            }
        }
    }
}
