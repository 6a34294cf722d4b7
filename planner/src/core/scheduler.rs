//! Multi-agent scheduler: one conflict-free batch of moves per cycle.
//!
//! Each goal chain is served by its own agent. A cycle is split into three
//! steps so the cycle runner can observe the phase in between:
//!
//! 1. [`Scheduler::propose`]: every agent with an unsatisfied chain proposes
//!    the next move of its tower plan against the shared beliefs.
//! 2. [`Scheduler::negotiate`]: pairwise conflict detection, then the largest
//!    conflict-free subset in strategy priority order.
//! 3. [`Scheduler::commit`]: apply the accepted moves. Illegal moves are
//!    dropped for the cycle instead of failing the plan.
//!
//! Deferred proposals are not queued; the agent simply proposes again on the
//! next cycle.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::beliefs::Beliefs;
use crate::core::conflict::{ConflictDetector, ConflictPair, ConflictStats};
use crate::core::error::{IllegalReason, PlanError};
use crate::core::goal::Goal;
use crate::core::negotiation::NegotiationStrategy;
use crate::core::tower::next_move;
use crate::core::types::{AgentId, Block, Conflict, GoalRelation, Move, Proposal};

/// Above this many proposals the subset search falls back to greedy
/// priority order.
const EXACT_SEARCH_LIMIT: usize = 16;

/// Result of conflict resolution for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Negotiation {
    /// Accepted proposals, highest priority first.
    pub accepted: Vec<Proposal>,
    pub deferred: Vec<Proposal>,
    pub conflicts: Vec<Conflict>,
}

/// A proposal that failed its preconditions at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedMove {
    #[serde(rename = "move")]
    pub dropped: Move,
    pub reason: IllegalReason,
}

/// Moves actually committed in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub applied: Vec<Move>,
    pub dropped: Vec<DroppedMove>,
}

/// Intention-log entry for one scheduling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleEntry {
    /// 1-indexed cycle number.
    pub cycle: u32,
    /// Moves executed concurrently in this cycle.
    pub moves: Vec<Move>,
    /// Stacks after the cycle, bottom to top.
    pub stacks: Vec<Vec<Block>>,
    /// Goal relations established by this cycle's moves.
    pub relations_reached: Vec<GoalRelation>,
    /// Goal relations still open after the cycle.
    pub pending_relations: Vec<GoalRelation>,
    pub clear: Vec<Block>,
    pub proposals: Vec<Proposal>,
    pub conflicts: Vec<Conflict>,
    /// Proposals excluded by conflicts, retried next cycle.
    pub deferred: Vec<Proposal>,
    pub dropped: Vec<DroppedMove>,
}

#[derive(Debug)]
pub struct Scheduler {
    goal: Goal,
    agents: Vec<AgentId>,
    detector: ConflictDetector,
    strategy: Box<dyn NegotiationStrategy>,
    cycle: u32,
    clock: u64,
}

impl Scheduler {
    pub fn new(goal: Goal, strategy: Box<dyn NegotiationStrategy>) -> Self {
        let agents = (0..goal.chains().len()).map(AgentId::for_index).collect();
        let detector = ConflictDetector::new(&goal);
        debug!(chains = goal.chains().len(), strategy = strategy.name(), "scheduler created");
        Self {
            goal,
            agents,
            detector,
            strategy,
            cycle: 0,
            clock: 0,
        }
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u32 {
        self.cycle
    }

    pub fn conflict_history(&self) -> &[Conflict] {
        self.detector.history()
    }

    pub fn conflict_stats(&self) -> ConflictStats {
        self.detector.stats()
    }

    /// Start a new cycle: one proposal per agent whose chain is unsatisfied.
    pub fn propose(&mut self, beliefs: &Beliefs) -> Vec<Proposal> {
        self.cycle += 1;
        let mut proposals = Vec::new();
        for (index, (chain, agent)) in self.goal.chains().iter().zip(&self.agents).enumerate() {
            let Some(proposed) = next_move(beliefs, chain, agent) else {
                continue;
            };
            self.clock += 1;
            proposals.push(Proposal {
                agent_id: agent.clone(),
                agent_index: index,
                proposed,
                timestamp: self.clock,
            });
        }
        debug!(cycle = self.cycle, proposals = proposals.len(), "proposals collected");
        proposals
    }

    /// Detect conflicts and keep the largest conflict-free subset.
    pub fn negotiate(&mut self, proposals: Vec<Proposal>) -> Negotiation {
        let pairs = self.detector.detect(&proposals, self.cycle);
        let order = self.strategy.priority_order(&proposals);
        let chosen = select_compatible(&order, &pairs, proposals.len());

        let mut accepted = Vec::with_capacity(chosen.len());
        let mut deferred = Vec::new();
        let mut by_index: Vec<Option<Proposal>> = proposals.into_iter().map(Some).collect();
        for index in order {
            let Some(proposal) = by_index[index].take() else {
                continue;
            };
            if chosen.contains(&index) {
                accepted.push(proposal);
            } else {
                debug!(
                    cycle = self.cycle,
                    agent = %proposal.agent_id,
                    proposed = %proposal.proposed,
                    "proposal deferred by conflict"
                );
                deferred.push(proposal);
            }
        }

        Negotiation {
            accepted,
            deferred,
            conflicts: pairs.into_iter().map(|pair| pair.conflict).collect(),
        }
    }

    /// Apply accepted proposals to the shared beliefs.
    pub fn commit(&self, beliefs: &mut Beliefs, accepted: &[Proposal]) -> Commit {
        let mut commit = Commit::default();
        for proposal in accepted {
            match beliefs.apply(&proposal.proposed) {
                Ok(()) => commit.applied.push(proposal.proposed.clone()),
                Err(PlanError::IllegalMove { mv, reason }) => {
                    warn!(cycle = self.cycle, %mv, %reason, "dropping illegal proposal");
                    commit.dropped.push(DroppedMove { dropped: mv, reason });
                }
                Err(err) => {
                    warn!(cycle = self.cycle, error = %err, "dropping proposal");
                }
            }
        }
        commit
    }

    /// Build the intention-log entry for the cycle just committed.
    pub fn record(
        &self,
        beliefs: &Beliefs,
        proposals: Vec<Proposal>,
        negotiation: Negotiation,
        commit: Commit,
    ) -> CycleEntry {
        let relations_reached = commit
            .applied
            .iter()
            .filter(|mv| self.goal.target_of(&mv.block) == Some(&mv.to))
            .map(|mv| GoalRelation {
                block: mv.block.clone(),
                on: mv.to.clone(),
            })
            .collect();
        CycleEntry {
            cycle: self.cycle,
            moves: commit.applied,
            stacks: beliefs.stacks(),
            relations_reached,
            pending_relations: self.goal.pending_relations(beliefs),
            clear: beliefs.clear_blocks(),
            proposals,
            conflicts: negotiation.conflicts,
            deferred: negotiation.deferred,
            dropped: commit.dropped,
        }
    }

    /// Propose, negotiate and commit one full cycle.
    pub fn run_cycle(&mut self, beliefs: &mut Beliefs) -> CycleEntry {
        let proposals = self.propose(beliefs);
        let negotiation = self.negotiate(proposals.clone());
        let commit = self.commit(beliefs, &negotiation.accepted);
        self.record(beliefs, proposals, negotiation, commit)
    }
}

/// Largest conflict-free subset of `0..len`, preferring earlier entries of
/// `order` among subsets of equal size.
fn select_compatible(order: &[usize], pairs: &[ConflictPair], len: usize) -> Vec<usize> {
    let mut blocked = vec![vec![false; len]; len];
    for pair in pairs {
        blocked[pair.left][pair.right] = true;
        blocked[pair.right][pair.left] = true;
    }

    if len > EXACT_SEARCH_LIMIT {
        let mut chosen: Vec<usize> = Vec::new();
        for &candidate in order {
            if chosen.iter().all(|&kept| !blocked[kept][candidate]) {
                chosen.push(candidate);
            }
        }
        return chosen;
    }

    let mut best = Vec::new();
    let mut current = Vec::new();
    search(order, &blocked, 0, &mut current, &mut best);
    best
}

/// Include-first depth-first search; the first subset of maximal size found
/// is the one favouring higher priorities.
fn search(
    order: &[usize],
    blocked: &[Vec<bool>],
    depth: usize,
    current: &mut Vec<usize>,
    best: &mut Vec<usize>,
) {
    if current.len() + (order.len() - depth) <= best.len() {
        return;
    }
    if depth == order.len() {
        *best = current.clone();
        return;
    }
    let candidate = order[depth];
    if current.iter().all(|&kept| !blocked[kept][candidate]) {
        current.push(candidate);
        search(order, blocked, depth + 1, current, best);
        current.pop();
    }
    search(order, blocked, depth + 1, current, best);
}
