//! Test-only helpers for building worlds and goals from string literals.

use crate::core::beliefs::Beliefs;
use crate::core::goal::{Goal, GoalChain};
use crate::core::types::{Block, MoveGroup};

/// Create a block from an id literal.
pub fn block(id: &str) -> Block {
    Block::new(id)
}

/// Create bottom-to-top stacks from nested id literals.
pub fn stacks(layout: &[&[&str]]) -> Vec<Vec<Block>> {
    layout
        .iter()
        .map(|stack| stack.iter().map(|id| Block::new(*id)).collect())
        .collect()
}

/// Create a goal chain from tokens (must end with `"Table"`).
pub fn chain(tokens: &[&str]) -> GoalChain {
    GoalChain::from_tokens(tokens).expect("valid goal chain")
}

/// Create a multi-chain goal.
pub fn goal(chains: &[&[&str]]) -> Goal {
    Goal::new(chains.iter().map(|tokens| chain(tokens)).collect()).expect("valid goal")
}

/// Replay move groups on fresh beliefs built from `layout`, asserting every
/// move is legal in the state that precedes it.
pub fn replay(layout: &[Vec<Block>], groups: &[MoveGroup]) -> Beliefs {
    let mut beliefs = Beliefs::from_stacks(layout).expect("valid stacks");
    for group in groups {
        for mv in group.moves() {
            beliefs
                .apply(mv)
                .unwrap_or_else(|err| panic!("replay failed: {err}"));
        }
    }
    beliefs
}
