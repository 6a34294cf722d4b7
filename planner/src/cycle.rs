//! Cycle runner: drives the scheduler until the goal holds or a budget runs out.
//!
//! The runner is an [`Iterator`] over intention-log entries. Each call to
//! `next` runs exactly one scheduling cycle, so the iterator boundary is the
//! only suspension point: a driver can pace execution against an animation,
//! check for world changes, or cancel by simply not asking for another cycle.
//! [`CycleRunner::finish`] turns the runner into the final [`PlanReport`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::beliefs::Beliefs;
use crate::core::budget::Budget;
use crate::core::goal::Goal;
use crate::core::scheduler::{CycleEntry, Scheduler};
use crate::core::types::MoveGroup;
use crate::plan::{PlanReport, PlannerOptions};

/// Runner state machine.
///
/// `Idle → Planning → (Proposing → ConflictCheck → Applying → GoalCheck)* →
/// Achieved | BudgetExhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    Planning,
    Proposing,
    ConflictCheck,
    Applying,
    GoalCheck,
    Achieved,
    BudgetExhausted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Achieved | Phase::BudgetExhausted)
    }
}

/// Why the runner stopped. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum StopReason {
    /// Every goal chain holds.
    Achieved,
    /// The iteration cap was reached first.
    #[serde(rename_all = "camelCase")]
    BudgetExhausted { iterations: u32, max_iterations: u32 },
    /// The wall-clock safety limit was reached first.
    #[serde(rename_all = "camelCase")]
    TimedOut { elapsed_ms: u64, limit_ms: u64 },
    /// The driver stopped requesting cycles before a terminal state.
    #[serde(rename_all = "camelCase")]
    Cancelled { iterations: u32 },
}

impl StopReason {
    /// Caller-facing warning for every outcome except success.
    pub fn message(&self) -> Option<String> {
        match self {
            StopReason::Achieved => None,
            StopReason::BudgetExhausted { max_iterations, .. } => Some(format!(
                "planner could not achieve the goal within the iteration limit ({max_iterations})"
            )),
            StopReason::TimedOut { limit_ms, .. } => Some(format!(
                "planner could not achieve the goal within the deliberation timeout ({limit_ms} ms)"
            )),
            StopReason::Cancelled { iterations } => Some(format!(
                "planning was cancelled after {iterations} cycle(s)"
            )),
        }
    }
}

#[derive(Debug)]
pub struct CycleRunner {
    scheduler: Scheduler,
    beliefs: Beliefs,
    options: PlannerOptions,
    budget: Budget,
    phase: Phase,
    stop: Option<StopReason>,
    log: Vec<CycleEntry>,
}

impl CycleRunner {
    pub fn new(beliefs: Beliefs, goal: Goal, options: PlannerOptions) -> Self {
        let budget = Budget::new(
            options.max_iterations,
            Duration::from_millis(options.deliberation_timeout_ms),
        );
        let scheduler = Scheduler::new(goal, options.strategy());
        Self {
            scheduler,
            beliefs,
            options,
            budget,
            phase: Phase::Idle,
            stop: None,
            log: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn beliefs(&self) -> &Beliefs {
        &self.beliefs
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop.as_ref()
    }

    pub fn iterations(&self) -> u32 {
        self.scheduler.cycles()
    }

    /// Run every remaining cycle, then report.
    pub fn run_to_end(mut self) -> PlanReport {
        while self.next().is_some() {}
        self.finish()
    }

    /// Build the report. A runner that has not reached a terminal state is
    /// reported as cancelled.
    pub fn finish(mut self) -> PlanReport {
        let stop = match self.settle() {
            Some(stop) => stop,
            None => StopReason::Cancelled {
                iterations: self.iterations(),
            },
        };
        let goal_achieved = stop == StopReason::Achieved;
        if let Some(message) = stop.message() {
            warn!(iterations = self.iterations(), "{message}");
        }

        let relations_resolved = self
            .log
            .iter()
            .map(|entry| entry.relations_reached.len())
            .sum();
        let moves = self
            .log
            .iter()
            .filter_map(|entry| MoveGroup::from_moves(entry.moves.clone()))
            .collect();

        PlanReport {
            moves,
            iterations: self.iterations(),
            goal_achieved,
            relations_resolved,
            agent_count: self.scheduler.agents().len(),
            beliefs: self.beliefs.snapshot(),
            planner_options_used: self.options,
            conflicts: self.scheduler.conflict_stats(),
            timed_out: matches!(stop, StopReason::TimedOut { .. }),
            error: stop.message(),
            stop,
            intention_log: self.log,
        }
    }

    /// Check for a terminal state, recording it when first reached.
    fn settle(&mut self) -> Option<StopReason> {
        if let Some(stop) = &self.stop {
            return Some(stop.clone());
        }
        let stop = if self.scheduler.goal().is_satisfied(&self.beliefs) {
            self.phase = Phase::Achieved;
            StopReason::Achieved
        } else if self.budget.iterations_exhausted(self.iterations()) {
            self.phase = Phase::BudgetExhausted;
            StopReason::BudgetExhausted {
                iterations: self.iterations(),
                max_iterations: self.budget.max_iterations(),
            }
        } else if self.budget.remaining_time().is_none() {
            self.phase = Phase::BudgetExhausted;
            StopReason::TimedOut {
                elapsed_ms: millis(self.budget.elapsed()),
                limit_ms: millis(self.budget.timeout()),
            }
        } else {
            return None;
        };
        info!(stop = ?stop, iterations = self.iterations(), "cycle runner stopped");
        self.stop = Some(stop.clone());
        Some(stop)
    }
}

impl Iterator for CycleRunner {
    type Item = CycleEntry;

    fn next(&mut self) -> Option<CycleEntry> {
        if self.phase == Phase::Idle {
            self.phase = Phase::Planning;
        }
        if self.settle().is_some() {
            return None;
        }

        self.phase = Phase::Proposing;
        let proposals = self.scheduler.propose(&self.beliefs);

        self.phase = Phase::ConflictCheck;
        let negotiation = self.scheduler.negotiate(proposals.clone());

        self.phase = Phase::Applying;
        let commit = self.scheduler.commit(&mut self.beliefs, &negotiation.accepted);

        self.phase = Phase::GoalCheck;
        let entry = self
            .scheduler
            .record(&self.beliefs, proposals, negotiation, commit);
        debug!(
            cycle = entry.cycle,
            moves = entry.moves.len(),
            pending = entry.pending_relations.len(),
            "cycle committed"
        );
        self.log.push(entry.clone());
        if self.scheduler.goal().is_satisfied(&self.beliefs) {
            self.settle();
        }
        Some(entry)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{goal, stacks};

    fn runner(layout: &[&[&str]], chains: &[&[&str]], options: PlannerOptions) -> CycleRunner {
        let beliefs = Beliefs::from_stacks(&stacks(layout)).expect("beliefs");
        CycleRunner::new(beliefs, goal(chains), options)
    }

    #[test]
    fn runner_walks_phases_to_achieved() {
        let mut run = runner(&[&["A"], &["B"]], &[&["A", "B", "Table"]], PlannerOptions::default());
        assert_eq!(run.phase(), Phase::Idle);

        let entry = run.next().expect("one cycle");
        assert_eq!(entry.cycle, 1);
        assert_eq!(run.phase(), Phase::Achieved);
        assert!(run.phase().is_terminal());
        assert_eq!(run.stop_reason(), Some(&StopReason::Achieved));
        assert!(run.next().is_none());

        let report = run.finish();
        assert!(report.goal_achieved);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.error, None);
    }

    #[test]
    fn satisfied_goal_runs_zero_cycles() {
        let report = runner(&[&["B", "A"]], &[&["A", "B", "Table"]], PlannerOptions::default())
            .run_to_end();
        assert!(report.goal_achieved);
        assert_eq!(report.iterations, 0);
        assert!(report.moves.is_empty());
        assert_eq!(report.relations_resolved, 0);
    }

    #[test]
    fn iteration_cap_reports_budget_exhausted() {
        let options = PlannerOptions {
            max_iterations: 1,
            ..PlannerOptions::default()
        };
        let report = runner(
            &[&["D"], &["C"], &["B"], &["A"]],
            &[&["A", "B", "C", "D", "Table"]],
            options,
        )
        .run_to_end();

        assert!(!report.goal_achieved);
        assert!(!report.timed_out);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.intention_log.len(), 1);
        assert_eq!(
            report.stop,
            StopReason::BudgetExhausted {
                iterations: 1,
                max_iterations: 1
            }
        );
        assert!(
            report
                .error
                .as_deref()
                .is_some_and(|msg| msg.contains("iteration limit"))
        );
    }

    #[test]
    fn zero_timeout_reports_timed_out() {
        let options = PlannerOptions {
            deliberation_timeout_ms: 0,
            ..PlannerOptions::default()
        };
        let report = runner(&[&["A"], &["B"]], &[&["A", "B", "Table"]], options).run_to_end();
        assert!(!report.goal_achieved);
        assert!(report.timed_out);
        assert!(matches!(report.stop, StopReason::TimedOut { limit_ms: 0, .. }));
    }

    #[test]
    fn driver_can_cancel_between_cycles() {
        let mut run = runner(
            &[&["D"], &["C"], &["B"], &["A"]],
            &[&["A", "B", "C", "D", "Table"]],
            PlannerOptions::default(),
        );
        let first = run.next().expect("first cycle");
        assert_eq!(first.moves.len(), 1);

        let report = run.finish();
        assert!(!report.goal_achieved);
        assert_eq!(report.stop, StopReason::Cancelled { iterations: 1 });
        assert_eq!(report.moves.len(), 1);
    }

    #[test]
    fn stop_reason_serializes_with_tag() {
        let json = serde_json::to_value(StopReason::BudgetExhausted {
            iterations: 3,
            max_iterations: 3,
        })
        .expect("serialize");
        assert_eq!(json["reason"], "budgetExhausted");
        assert_eq!(json["maxIterations"], 3);
    }
}
