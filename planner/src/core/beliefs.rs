//! In-memory belief model of the blocks world.
//!
//! The support relation is the source of truth. Two indexes are kept in step
//! with it on every write: which block rests on a given block, and the set of
//! clear blocks. Mutation only happens through [`Beliefs::apply`] (and the
//! edit helpers used when the world changes outside planner control), so the
//! forest-of-chains invariant is checked at each write.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::error::{IllegalReason, PlanError};
use crate::core::types::{Block, GoalRelation, Move, Support, validate_block_id};

/// Serializable view of the beliefs, returned to the caller as `beliefs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeliefSnapshot {
    /// Stacks bottom to top.
    pub stacks: Vec<Vec<Block>>,
    pub on: BTreeMap<Block, Support>,
    pub clear: Vec<Block>,
}

#[derive(Debug, Clone, Default)]
pub struct Beliefs {
    on: BTreeMap<Block, Support>,
    above: BTreeMap<Block, Block>,
    clear: BTreeSet<Block>,
    /// Blocks resting on the table, in the order they arrived there.
    bases: Vec<Block>,
}

impl Beliefs {
    /// Build beliefs from bottom-to-top stacks. Empty stacks are ignored.
    pub fn from_stacks(stacks: &[Vec<Block>]) -> Result<Self, PlanError> {
        let mut beliefs = Self::default();
        for stack in stacks {
            let mut below = Support::Table;
            for block in stack {
                validate_block_id(block.as_str()).map_err(PlanError::MalformedWorld)?;
                if beliefs.contains(block) {
                    return Err(PlanError::MalformedWorld(format!(
                        "block '{block}' appears more than once"
                    )));
                }
                beliefs.link(block.clone(), below);
                below = Support::Block(block.clone());
            }
        }
        Ok(beliefs)
    }

    pub fn contains(&self, block: &Block) -> bool {
        self.on.contains_key(block)
    }

    pub fn len(&self) -> usize {
        self.on.len()
    }

    pub fn is_empty(&self) -> bool {
        self.on.is_empty()
    }

    /// All blocks in id order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.on.keys()
    }

    /// True if nothing rests on `block`. Unknown blocks are never clear.
    pub fn is_clear(&self, block: &Block) -> bool {
        self.clear.contains(block)
    }

    /// Like [`Beliefs::is_clear`], with the table always clear.
    pub fn is_clear_support(&self, support: &Support) -> bool {
        match support {
            Support::Table => true,
            Support::Block(block) => self.is_clear(block),
        }
    }

    pub fn support_of(&self, block: &Block) -> Option<&Support> {
        self.on.get(block)
    }

    /// The block resting directly on `block`, if any.
    pub fn above(&self, block: &Block) -> Option<&Block> {
        self.above.get(block)
    }

    /// Every block stacked on `block`, nearest first.
    pub fn blocks_above(&self, block: &Block) -> Vec<Block> {
        let mut out = Vec::new();
        let mut cursor = self.above(block);
        while let Some(next) = cursor {
            out.push(next.clone());
            cursor = self.above(next);
        }
        out
    }

    /// True if `relation.block` rests directly on `relation.on`.
    pub fn holds(&self, relation: &GoalRelation) -> bool {
        self.support_of(&relation.block) == Some(&relation.on)
    }

    /// Check the preconditions of `mv` without applying it.
    pub fn check(&self, mv: &Move) -> Result<(), PlanError> {
        let illegal = |reason| PlanError::IllegalMove {
            mv: mv.clone(),
            reason,
        };
        let current = self
            .support_of(&mv.block)
            .ok_or_else(|| illegal(IllegalReason::UnknownBlock))?;
        if let Support::Block(target) = &mv.to {
            if target == &mv.block {
                return Err(illegal(IllegalReason::SelfTarget));
            }
            if !self.contains(target) {
                return Err(illegal(IllegalReason::UnknownDestination));
            }
        }
        if current == &mv.to {
            return Err(illegal(IllegalReason::NoOp));
        }
        if !self.is_clear(&mv.block) {
            return Err(illegal(IllegalReason::BlockNotClear));
        }
        if !self.is_clear_support(&mv.to) {
            return Err(illegal(IllegalReason::DestinationNotClear));
        }
        Ok(())
    }

    /// Apply a committed move, or fail with [`PlanError::IllegalMove`] leaving
    /// the beliefs untouched.
    pub fn apply(&mut self, mv: &Move) -> Result<(), PlanError> {
        self.check(mv)?;
        self.unlink(&mv.block);
        self.link(mv.block.clone(), mv.to.clone());
        debug_assert!(
            self.is_grounded(&mv.block),
            "support relation must stay acyclic after {mv}"
        );
        Ok(())
    }

    /// Add a new block on the table or on a clear block.
    pub fn insert(&mut self, block: Block, on: Support) -> Result<(), PlanError> {
        validate_block_id(block.as_str()).map_err(PlanError::MalformedEdit)?;
        if self.contains(&block) {
            return Err(PlanError::MalformedEdit(format!(
                "block '{block}' already exists"
            )));
        }
        if let Support::Block(target) = &on {
            if !self.contains(target) {
                return Err(PlanError::MalformedEdit(format!(
                    "cannot add '{block}' on unknown block '{target}'"
                )));
            }
            if !self.is_clear(target) {
                return Err(PlanError::MalformedEdit(format!(
                    "cannot add '{block}' on '{target}': not clear"
                )));
            }
        }
        self.link(block, on);
        Ok(())
    }

    /// Remove a block from the world. Blocks stacked on it settle onto its
    /// former support. Returns that support.
    pub fn remove(&mut self, block: &Block) -> Result<Support, PlanError> {
        let support = self
            .support_of(block)
            .cloned()
            .ok_or_else(|| PlanError::MalformedEdit(format!("unknown block '{block}'")))?;
        let base_index = self.bases.iter().position(|b| b == block);
        match self.above.remove(block) {
            Some(upper) => {
                self.on.insert(upper.clone(), support.clone());
                match &support {
                    Support::Table => {
                        if let Some(index) = base_index {
                            self.bases[index] = upper;
                        }
                    }
                    Support::Block(below) => {
                        self.above.insert(below.clone(), upper);
                    }
                }
            }
            None => match &support {
                Support::Table => {
                    if let Some(index) = base_index {
                        self.bases.remove(index);
                    }
                }
                Support::Block(below) => {
                    self.above.remove(below);
                    self.clear.insert(below.clone());
                }
            },
        }
        self.on.remove(block);
        self.clear.remove(block);
        Ok(support)
    }

    /// Stacks bottom to top, ordered by when their base reached the table.
    pub fn stacks(&self) -> Vec<Vec<Block>> {
        self.bases
            .iter()
            .map(|base| {
                let mut stack = vec![base.clone()];
                stack.extend(self.blocks_above(base));
                stack
            })
            .collect()
    }

    /// Clear blocks in id order.
    pub fn clear_blocks(&self) -> Vec<Block> {
        self.clear.iter().cloned().collect()
    }

    pub fn snapshot(&self) -> BeliefSnapshot {
        BeliefSnapshot {
            stacks: self.stacks(),
            on: self.on.clone(),
            clear: self.clear_blocks(),
        }
    }

    /// Attach a block that currently has no support entry.
    fn link(&mut self, block: Block, on: Support) {
        match &on {
            Support::Table => self.bases.push(block.clone()),
            Support::Block(target) => {
                self.clear.remove(target);
                self.above.insert(target.clone(), block.clone());
            }
        }
        self.clear.insert(block.clone());
        self.on.insert(block, on);
    }

    /// Detach a clear block from its support.
    fn unlink(&mut self, block: &Block) {
        match self.on.remove(block) {
            Some(Support::Table) => self.bases.retain(|b| b != block),
            Some(Support::Block(below)) => {
                self.above.remove(&below);
                self.clear.insert(below);
            }
            None => {}
        }
    }

    /// True if following supports from `block` reaches the table.
    fn is_grounded(&self, block: &Block) -> bool {
        let mut cursor = block;
        for _ in 0..=self.on.len() {
            match self.on.get(cursor) {
                Some(Support::Table) => return true,
                Some(Support::Block(below)) => cursor = below,
                None => return false,
            }
        }
        false
    }
}
