//! Typed errors raised by the planner core.
//!
//! Running out of iterations or wall-clock time is not an error: the cycle
//! runner reports those as a stop reason on an otherwise normal result.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Move;

/// Why a move violates the blocks-world preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllegalReason {
    UnknownBlock,
    UnknownDestination,
    BlockNotClear,
    DestinationNotClear,
    SelfTarget,
    NoOp,
}

impl fmt::Display for IllegalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IllegalReason::UnknownBlock => "block is not in the world",
            IllegalReason::UnknownDestination => "destination is not in the world",
            IllegalReason::BlockNotClear => "block is not clear",
            IllegalReason::DestinationNotClear => "destination is not clear",
            IllegalReason::SelfTarget => "block cannot be placed on itself",
            IllegalReason::NoOp => "block already rests on the destination",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("illegal move {mv}: {reason}")]
    IllegalMove { mv: Move, reason: IllegalReason },

    #[error("malformed goal: {0}")]
    MalformedGoal(String),

    #[error("malformed world: {0}")]
    MalformedWorld(String),

    #[error("malformed edit: {0}")]
    MalformedEdit(String),
}
