//! Pairwise conflict classification for proposals of one scheduling cycle.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::goal::Goal;
use crate::core::types::{Block, Conflict, ConflictKind, Proposal, Support};

/// Aggregate counts over the conflict history of one planning session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictStats {
    pub total: usize,
    pub by_type: BTreeMap<ConflictKind, usize>,
}

/// A conflict between the proposals at `left` and `right` (indexes into the
/// slice passed to [`ConflictDetector::detect`], `left < right`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictPair {
    pub left: usize,
    pub right: usize,
    pub conflict: Conflict,
}

#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    /// Goal relations each block belongs to (as block or as support).
    memberships: BTreeMap<Block, BTreeSet<usize>>,
    history: Vec<Conflict>,
}

impl ConflictDetector {
    pub fn new(goal: &Goal) -> Self {
        let mut memberships: BTreeMap<Block, BTreeSet<usize>> = BTreeMap::new();
        for (index, relation) in goal.relations().into_iter().enumerate() {
            if let Support::Block(below) = relation.on {
                memberships.entry(below).or_default().insert(index);
            }
            memberships.entry(relation.block).or_default().insert(index);
        }
        Self {
            memberships,
            history: Vec::new(),
        }
    }

    /// Classify two proposals, first matching rule wins.
    pub fn classify(&self, a: &Proposal, b: &Proposal) -> Option<ConflictKind> {
        let (a, b) = (&a.proposed, &b.proposed);
        if a.block == b.block {
            return Some(ConflictKind::Resource);
        }
        if a.to == b.to && !a.to.is_table() {
            return Some(ConflictKind::Destination);
        }
        if a.to.as_block() == Some(&b.block) || b.to.as_block() == Some(&a.block) {
            return Some(ConflictKind::Ordering);
        }
        let a_relations = self.relations_touched(&a.block, &a.to);
        let b_relations = self.relations_touched(&b.block, &b.to);
        if !a_relations.is_disjoint(&b_relations) {
            return Some(ConflictKind::Goal);
        }
        None
    }

    /// Compare every pair of `proposals` and record the conflicts found.
    pub fn detect(&mut self, proposals: &[Proposal], cycle: u32) -> Vec<ConflictPair> {
        let mut found = Vec::new();
        for left in 0..proposals.len() {
            for right in (left + 1)..proposals.len() {
                let (a, b) = (&proposals[left], &proposals[right]);
                let Some(kind) = self.classify(a, b) else {
                    continue;
                };
                let conflict = Conflict {
                    kind,
                    participants: vec![a.agent_id.clone(), b.agent_id.clone()],
                    severity: kind.severity(),
                    cycle,
                };
                self.history.push(conflict.clone());
                found.push(ConflictPair {
                    left,
                    right,
                    conflict,
                });
            }
        }
        found
    }

    pub fn history(&self) -> &[Conflict] {
        &self.history
    }

    pub fn stats(&self) -> ConflictStats {
        let mut stats = ConflictStats::default();
        for conflict in &self.history {
            stats.total += 1;
            *stats.by_type.entry(conflict.kind).or_default() += 1;
        }
        stats
    }

    /// Forget the history (new planning session).
    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn relations_touched(&self, block: &Block, to: &Support) -> BTreeSet<usize> {
        let mut touched = self.memberships.get(block).cloned().unwrap_or_default();
        if let Some(destination) = to.as_block() {
            if let Some(relations) = self.memberships.get(destination) {
                touched.extend(relations);
            }
        }
        touched
    }
}
