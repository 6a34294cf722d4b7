//! Replanning after the world changed outside planner control.
//!
//! No progress bookkeeping is carried over from the previous plan: the
//! current actual stacks (with any external edits applied) become a fresh
//! belief snapshot, and relations that already hold cost nothing when the
//! scheduler runs again.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::beliefs::Beliefs;
use crate::core::error::PlanError;
use crate::core::types::{AgentId, Block, Move, Support};
use crate::plan::{PlanReport, PlanRequest, PlannerOptions, start_with};

/// Actor recorded on moves made by hand in the consuming layer.
pub const MANUAL_ACTOR: &str = "manual";

/// A change made to the live world outside planner control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorldEdit {
    /// A manual move (e.g. a drag in the UI). Must be legal.
    Move { block: Block, to: Support },
    /// A new block placed on the table or on a clear block.
    Add {
        block: Block,
        #[serde(default = "table")]
        on: Support,
    },
    /// A block taken away; anything on it settles onto its support.
    Remove { block: Block },
}

fn table() -> Support {
    Support::Table
}

/// Current world, pending edits and (possibly updated) goal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplanRequest {
    #[serde(flatten)]
    pub plan: PlanRequest,
    #[serde(default)]
    pub edits: Vec<WorldEdit>,
}

/// Apply `edits` in order. Stops at the first invalid edit.
pub fn apply_edits(beliefs: &mut Beliefs, edits: &[WorldEdit]) -> Result<(), PlanError> {
    for edit in edits {
        debug!(?edit, "applying world edit");
        match edit {
            WorldEdit::Move { block, to } => {
                let manual = Move::new(block.clone(), to.clone(), AgentId::new(MANUAL_ACTOR));
                beliefs.apply(&manual)?;
            }
            WorldEdit::Add { block, on } => beliefs.insert(block.clone(), on.clone())?,
            WorldEdit::Remove { block } => {
                beliefs.remove(block)?;
            }
        }
    }
    Ok(())
}

/// Fresh beliefs for the request's stacks with its edits applied.
pub fn current_world(request: &ReplanRequest) -> Result<Beliefs, PlanError> {
    let mut beliefs = Beliefs::from_stacks(&request.plan.stacks)?;
    apply_edits(&mut beliefs, &request.edits)?;
    Ok(beliefs)
}

/// Re-run planning from the current actual world.
pub fn replan(
    request: &ReplanRequest,
    defaults: &PlannerOptions,
) -> Result<PlanReport, PlanError> {
    let beliefs = current_world(request)?;
    let goal = request.plan.resolve_goal()?;
    let options = request.plan.options.apply_to(defaults);
    let report = start_with(beliefs, goal, options)?.run_to_end();
    info!(
        edits = request.edits.len(),
        moves = report.move_count(),
        achieved = report.goal_achieved,
        "replanning finished"
    );
    Ok(report)
}

/// Stacks after the execution layer has carried out the first
/// `executed_groups` move groups of `report`, recovered from its intention
/// log. `initial` are the stacks the report was planned from.
pub fn stacks_after(
    initial: &[Vec<Block>],
    report: &PlanReport,
    executed_groups: usize,
) -> Vec<Vec<Block>> {
    if executed_groups == 0 {
        return initial.to_vec();
    }
    report
        .intention_log
        .iter()
        .filter(|entry| !entry.moves.is_empty())
        .nth(executed_groups - 1)
        .or_else(|| report.intention_log.last())
        .map(|entry| entry.stacks.clone())
        .unwrap_or_else(|| initial.to_vec())
}
