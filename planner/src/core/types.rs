//! Shared deterministic types for planner core logic.
//!
//! These types define stable contracts between core components and the wire
//! format consumed by the execution layer. They carry no I/O and serialize
//! deterministically.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Reserved token for the table sentinel.
pub const TABLE: &str = "Table";

static BLOCK_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Opaque block identifier (e.g. `"A"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Block(String);

impl Block {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Block {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Check that `id` is usable as a block identifier.
///
/// Ids are single tokens of `[A-Za-z0-9_-]` and must not collide with the
/// table sentinel.
pub fn validate_block_id(id: &str) -> Result<(), String> {
    if id == TABLE {
        return Err(format!("'{TABLE}' is reserved and cannot name a block"));
    }
    if !BLOCK_ID_RE.is_match(id) {
        return Err(format!("block id must be [A-Za-z0-9_-]+ (got '{id}')"));
    }
    Ok(())
}

/// What a block rests on.
///
/// Serialized as a plain string: `"Table"` or the supporting block id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Support {
    Table,
    Block(Block),
}

impl Support {
    pub fn is_table(&self) -> bool {
        matches!(self, Support::Table)
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Support::Table => None,
            Support::Block(block) => Some(block),
        }
    }
}

impl From<String> for Support {
    fn from(token: String) -> Self {
        if token == TABLE {
            Support::Table
        } else {
            Support::Block(Block(token))
        }
    }
}

impl From<Support> for String {
    fn from(support: Support) -> Self {
        match support {
            Support::Table => TABLE.to_string(),
            Support::Block(block) => block.0,
        }
    }
}

impl From<Block> for Support {
    fn from(block: Block) -> Self {
        Support::Block(block)
    }
}

impl From<&str> for Support {
    fn from(token: &str) -> Self {
        Support::from(token.to_string())
    }
}

impl fmt::Display for Support {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Support::Table => f.write_str(TABLE),
            Support::Block(block) => block.fmt(f),
        }
    }
}

/// Identity of one scheduling agent (one per goal chain).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `Agent-A`, `Agent-B`, ... for the first 26 chains, `Agent-27` onwards after.
    pub fn for_index(index: usize) -> Self {
        match u8::try_from(index) {
            Ok(i) if i < 26 => Self(format!("Agent-{}", char::from(b'A' + i))),
            _ => Self(format!("Agent-{}", index + 1)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A committed (or candidate) single-block relocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub block: Block,
    pub to: Support,
    pub actor: AgentId,
}

impl Move {
    pub fn new(block: Block, to: impl Into<Support>, actor: AgentId) -> Self {
        Self {
            block,
            to: to.into(),
            actor,
        }
    }

    /// True when the move lands on another block rather than the table.
    pub fn is_stacking(&self) -> bool {
        !self.to.is_table()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.block, self.to, self.actor)
    }
}

/// One adjacent pair of a goal chain: `block` directly on `on`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoalRelation {
    pub block: Block,
    pub on: Support,
}

impl fmt::Display for GoalRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.block, self.on)
    }
}

/// Candidate next move of one agent, before conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub agent_id: AgentId,
    /// Index of the goal chain this agent serves.
    pub agent_index: usize,
    #[serde(rename = "move")]
    pub proposed: Move,
    /// Logical clock, monotonically increasing within one planning session.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    Resource,
    Destination,
    Ordering,
    Goal,
}

impl ConflictKind {
    pub fn severity(self) -> Severity {
        match self {
            ConflictKind::Resource | ConflictKind::Destination => Severity::High,
            ConflictKind::Ordering | ConflictKind::Goal => Severity::Medium,
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConflictKind::Resource => "RESOURCE_CONFLICT",
            ConflictKind::Destination => "DESTINATION_CONFLICT",
            ConflictKind::Ordering => "ORDERING_CONFLICT",
            ConflictKind::Goal => "GOAL_CONFLICT",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Medium,
    High,
}

/// Result of comparing two proposals of the same cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub participants: Vec<AgentId>,
    pub severity: Severity,
    /// Scheduling cycle (1-indexed) in which the conflict was detected.
    pub cycle: u32,
}

/// Moves handed to the execution layer for one cycle.
///
/// A lone move serializes as the move itself, a concurrent cycle as
/// `{"moves": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveGroup {
    Concurrent { moves: Vec<Move> },
    Single(Move),
}

impl MoveGroup {
    /// Group the moves of one cycle. Returns `None` for an empty cycle.
    pub fn from_moves(mut moves: Vec<Move>) -> Option<Self> {
        match moves.len() {
            0 => None,
            1 => moves.pop().map(MoveGroup::Single),
            _ => Some(MoveGroup::Concurrent { moves }),
        }
    }

    pub fn moves(&self) -> &[Move] {
        match self {
            MoveGroup::Single(mv) => std::slice::from_ref(mv),
            MoveGroup::Concurrent { moves } => moves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_serializes_table_sentinel_as_string() {
        let json = serde_json::to_string(&Support::Table).expect("serialize");
        assert_eq!(json, "\"Table\"");
        let parsed: Support = serde_json::from_str("\"B\"").expect("parse");
        assert_eq!(parsed, Support::Block(Block::new("B")));
    }

    #[test]
    fn agent_ids_follow_letter_sequence() {
        assert_eq!(AgentId::for_index(0).as_str(), "Agent-A");
        assert_eq!(AgentId::for_index(1).as_str(), "Agent-B");
        assert_eq!(AgentId::for_index(25).as_str(), "Agent-Z");
        assert_eq!(AgentId::for_index(26).as_str(), "Agent-27");
    }

    #[test]
    fn validate_block_id_rejects_reserved_and_multi_token_ids() {
        assert!(validate_block_id("A").is_ok());
        assert!(validate_block_id("red_1").is_ok());
        assert!(validate_block_id("Table").is_err());
        assert!(validate_block_id("A B").is_err());
        assert!(validate_block_id("").is_err());
    }

    #[test]
    fn move_group_shape_depends_on_cycle_size() {
        let a = Move::new(Block::new("A"), Support::Table, AgentId::for_index(0));
        let b = Move::new(Block::new("B"), Block::new("C"), AgentId::for_index(1));

        assert_eq!(MoveGroup::from_moves(Vec::new()), None);

        let single = MoveGroup::from_moves(vec![a.clone()]).expect("single");
        let json = serde_json::to_value(&single).expect("serialize");
        assert_eq!(json["block"], "A");
        assert_eq!(json["to"], "Table");

        let concurrent = MoveGroup::from_moves(vec![a, b]).expect("concurrent");
        assert_eq!(concurrent.moves().len(), 2);
        let json = serde_json::to_value(&concurrent).expect("serialize");
        assert_eq!(json["moves"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn conflict_kind_severity_and_labels() {
        assert_eq!(ConflictKind::Resource.severity(), Severity::High);
        assert_eq!(ConflictKind::Destination.severity(), Severity::High);
        assert_eq!(ConflictKind::Ordering.severity(), Severity::Medium);
        assert_eq!(ConflictKind::Goal.severity(), Severity::Medium);
        assert_eq!(ConflictKind::Resource.to_string(), "RESOURCE_CONFLICT");
        let json = serde_json::to_string(&ConflictKind::Goal).expect("serialize");
        assert_eq!(json, "\"GOAL\"");
    }
}
