//! Single-tower planner: clear-then-stack, one goal chain at a time.
//!
//! Relations are resolved from the table end upward. Clearing always looks at
//! the working beliefs as they are after the moves already planned, never at
//! the initial snapshot, which is what keeps interleaved cases such as the
//! Sussman anomaly correct.

use crate::core::beliefs::Beliefs;
use crate::core::error::PlanError;
use crate::core::goal::GoalChain;
use crate::core::types::{AgentId, Block, Move, Support};

/// Ordered moves realizing one goal chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TowerPlan {
    pub moves: Vec<Move>,
    /// Goal relations that needed a stacking move.
    pub relations_resolved: usize,
}

impl TowerPlan {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Plan every move needed to build `chain`, starting from `beliefs`.
///
/// `beliefs` is not modified; planning runs on a private copy. An already
/// satisfied chain yields an empty plan.
pub fn plan_tower(
    beliefs: &Beliefs,
    chain: &GoalChain,
    actor: &AgentId,
) -> Result<TowerPlan, PlanError> {
    let mut working = beliefs.clone();
    let mut plan = TowerPlan::default();

    for relation in chain.relations() {
        if working.holds(&relation) {
            continue;
        }
        clear(&mut working, &relation.block, actor, &mut plan.moves)?;
        if let Support::Block(destination) = &relation.on {
            clear(&mut working, destination, actor, &mut plan.moves)?;
        }
        let stack = Move::new(relation.block.clone(), relation.on.clone(), actor.clone());
        working.apply(&stack)?;
        plan.moves.push(stack);
        plan.relations_resolved += 1;
    }

    Ok(plan)
}

/// The first move [`plan_tower`] would make from `beliefs`, or `None` if the
/// chain already holds.
pub fn next_move(beliefs: &Beliefs, chain: &GoalChain, actor: &AgentId) -> Option<Move> {
    let relation = chain
        .relations()
        .into_iter()
        .find(|relation| !beliefs.holds(relation))?;

    if let Some(top) = topmost_above(beliefs, &relation.block) {
        return Some(Move::new(top, Support::Table, actor.clone()));
    }
    if let Support::Block(destination) = &relation.on {
        if let Some(top) = topmost_above(beliefs, destination) {
            return Some(Move::new(top, Support::Table, actor.clone()));
        }
    }
    Some(Move::new(relation.block, relation.on, actor.clone()))
}

/// Move everything resting on `block` to the table, topmost first.
fn clear(
    working: &mut Beliefs,
    block: &Block,
    actor: &AgentId,
    moves: &mut Vec<Move>,
) -> Result<(), PlanError> {
    let Some(upper) = working.above(block).cloned() else {
        return Ok(());
    };
    clear(working, &upper, actor, moves)?;
    let unstack = Move::new(upper, Support::Table, actor.clone());
    working.apply(&unstack)?;
    moves.push(unstack);
    Ok(())
}

fn topmost_above(beliefs: &Beliefs, block: &Block) -> Option<Block> {
    beliefs.blocks_above(block).pop()
}
