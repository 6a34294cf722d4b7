//! Planner entry point: request in, cycle-by-cycle schedule out.
//!
//! A planning call builds fresh beliefs from the stacks snapshot, validates
//! the goal against them, and drives a [`CycleRunner`] to a terminal state.
//! Input problems are rejected up front; running out of iterations or time is
//! reported on the [`PlanReport`] instead.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::beliefs::{BeliefSnapshot, Beliefs};
use crate::core::conflict::ConflictStats;
use crate::core::error::PlanError;
use crate::core::goal::{Goal, GoalChain};
use crate::core::negotiation::{FirstCome, NegotiationStrategy, StrategyKind};
use crate::core::scheduler::CycleEntry;
use crate::core::types::{Block, MoveGroup};
use crate::cycle::{CycleRunner, StopReason};

/// Effective options for one planning call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerOptions {
    pub max_iterations: u32,
    pub deliberation_timeout_ms: u64,
    pub enable_negotiation: bool,
    pub negotiation_strategy: StrategyKind,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            deliberation_timeout_ms: 5 * 60 * 1000,
            enable_negotiation: true,
            negotiation_strategy: StrategyKind::PreferStack,
        }
    }
}

impl PlannerOptions {
    /// The tie-break policy to inject into the scheduler. Without negotiation
    /// the lower agent index always wins.
    pub fn strategy(&self) -> Box<dyn NegotiationStrategy> {
        if self.enable_negotiation {
            self.negotiation_strategy.build()
        } else {
            Box::new(FirstCome)
        }
    }
}

/// Per-request overrides of the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliberation_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_negotiation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation_strategy: Option<StrategyKind>,
}

impl OptionOverrides {
    pub fn apply_to(&self, defaults: &PlannerOptions) -> PlannerOptions {
        PlannerOptions {
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            deliberation_timeout_ms: self
                .deliberation_timeout_ms
                .unwrap_or(defaults.deliberation_timeout_ms),
            enable_negotiation: self
                .enable_negotiation
                .unwrap_or(defaults.enable_negotiation),
            negotiation_strategy: self
                .negotiation_strategy
                .unwrap_or(defaults.negotiation_strategy),
        }
    }
}

/// Planning input. Exactly one of `goal`, `goal_chains` or `goal_text` must
/// be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    /// Stacks bottom to top.
    pub stacks: Vec<Vec<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_chains: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_text: Option<String>,
    #[serde(default)]
    pub options: OptionOverrides,
}

impl PlanRequest {
    pub fn resolve_goal(&self) -> Result<Goal, PlanError> {
        match (&self.goal, &self.goal_chains, &self.goal_text) {
            (Some(tokens), None, None) => Goal::new(vec![GoalChain::from_tokens(tokens)?]),
            (None, Some(chains), None) => Goal::new(
                chains
                    .iter()
                    .map(|tokens| GoalChain::from_tokens(tokens))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (None, None, Some(text)) => Goal::parse_text(text),
            (None, None, None) => Err(PlanError::MalformedGoal(
                "one of goal, goalChains or goalText is required".to_string(),
            )),
            _ => Err(PlanError::MalformedGoal(
                "only one of goal, goalChains or goalText may be given".to_string(),
            )),
        }
    }
}

/// Planning output consumed by the execution layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    /// One group per cycle that committed at least one move.
    pub moves: Vec<MoveGroup>,
    /// Scheduling cycles run.
    pub iterations: u32,
    pub goal_achieved: bool,
    /// Goal relations established by committed moves.
    pub relations_resolved: usize,
    pub agent_count: usize,
    pub intention_log: Vec<CycleEntry>,
    pub beliefs: BeliefSnapshot,
    pub planner_options_used: PlannerOptions,
    pub conflicts: ConflictStats,
    pub stop: StopReason,
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanReport {
    /// Total number of single-block moves across all groups.
    pub fn move_count(&self) -> usize {
        self.moves.iter().map(|group| group.moves().len()).sum()
    }
}

/// Validate `request` and return a runner positioned before the first cycle.
///
/// Drivers that pace execution (or may cancel) iterate the runner themselves
/// and call [`CycleRunner::finish`].
pub fn start(request: &PlanRequest, defaults: &PlannerOptions) -> Result<CycleRunner, PlanError> {
    let beliefs = Beliefs::from_stacks(&request.stacks)?;
    let goal = request.resolve_goal()?;
    start_with(beliefs, goal, request.options.apply_to(defaults))
}

/// Like [`start`], for beliefs the caller already built.
pub fn start_with(
    beliefs: Beliefs,
    goal: Goal,
    options: PlannerOptions,
) -> Result<CycleRunner, PlanError> {
    goal.validate_against(&beliefs)?;
    debug!(
        blocks = beliefs.len(),
        chains = goal.chains().len(),
        ?options,
        "planning session started"
    );
    Ok(CycleRunner::new(beliefs, goal, options))
}

/// Plan `request` to completion.
pub fn plan(request: &PlanRequest, defaults: &PlannerOptions) -> Result<PlanReport, PlanError> {
    let report = start(request, defaults)?.run_to_end();
    info!(
        iterations = report.iterations,
        moves = report.move_count(),
        achieved = report.goal_achieved,
        "planning finished"
    );
    Ok(report)
}
