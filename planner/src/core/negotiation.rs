//! Tie-break policies for contested scheduling slots.
//!
//! A strategy only orders proposals by priority. The scheduler keeps the
//! largest conflict-free subset and uses this order to choose among subsets
//! of equal size, so a higher-priority proposal wins whenever a conflict
//! forces an exclusion.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::Proposal;

pub trait NegotiationStrategy: fmt::Debug {
    /// Stable name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Indexes into `proposals`, highest priority first.
    fn priority_order(&self, proposals: &[Proposal]) -> Vec<usize>;
}

/// Lower goal-chain index wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCome;

impl NegotiationStrategy for FirstCome {
    fn name(&self) -> &'static str {
        "first-come"
    }

    fn priority_order(&self, proposals: &[Proposal]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..proposals.len()).collect();
        order.sort_by_key(|&i| (proposals[i].agent_index, proposals[i].timestamp));
        order
    }
}

/// Stacking moves beat clearing moves, then lower goal-chain index wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferStack;

impl NegotiationStrategy for PreferStack {
    fn name(&self) -> &'static str {
        "prefer-stack"
    }

    fn priority_order(&self, proposals: &[Proposal]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..proposals.len()).collect();
        order.sort_by_key(|&i| {
            let proposal = &proposals[i];
            (
                !proposal.proposed.is_stacking(),
                proposal.agent_index,
                proposal.timestamp,
            )
        });
        order
    }
}

/// Configurable selector for the strategy implementations above.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    FirstCome,
    #[default]
    PreferStack,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn NegotiationStrategy> {
        match self {
            StrategyKind::FirstCome => Box::new(FirstCome),
            StrategyKind::PreferStack => Box::new(PreferStack),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.build().name())
    }
}
