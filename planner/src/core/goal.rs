//! Goal chains and their validation against a world.
//!
//! A chain `[b1, b2, ..., bn, Table]` reads "b1 on b2, ..., bn on Table".
//! Relations are always listed from the table end upward, which is the order
//! the tower planner resolves them in.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::beliefs::Beliefs;
use crate::core::error::PlanError;
use crate::core::types::{Block, GoalRelation, Support, TABLE, validate_block_id};

static ON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+on\s+").unwrap());
static CHAIN_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[;\n]").unwrap());

/// One target tower. Serialized as its token list, e.g. `["A","B","Table"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct GoalChain {
    /// `b1..bn`, top of the desired tower first.
    blocks: Vec<Block>,
}

impl GoalChain {
    /// Parse `[b1, ..., bn, "Table"]`.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, PlanError> {
        let Some((last, blocks)) = tokens.split_last() else {
            return Err(PlanError::MalformedGoal("goal chain is empty".to_string()));
        };
        if last.as_ref() != TABLE {
            return Err(PlanError::MalformedGoal(format!(
                "goal chain must end at {TABLE} (got '{}')",
                last.as_ref()
            )));
        }
        if blocks.is_empty() {
            return Err(PlanError::MalformedGoal(format!(
                "goal chain names no blocks before {TABLE}"
            )));
        }

        let mut seen = BTreeSet::new();
        let mut parsed = Vec::with_capacity(blocks.len());
        for token in blocks {
            let token = token.as_ref();
            validate_block_id(token).map_err(PlanError::MalformedGoal)?;
            let block = Block::new(token);
            if !seen.insert(block.clone()) {
                return Err(PlanError::MalformedGoal(format!(
                    "block '{block}' appears more than once in a goal chain"
                )));
            }
            parsed.push(block);
        }
        Ok(Self { blocks: parsed })
    }

    /// Parse a sentence such as `"A on B on Table"` (case-insensitive `on`
    /// and `table`).
    pub fn parse_text(text: &str) -> Result<Self, PlanError> {
        let tokens: Vec<String> = ON_RE
            .split(text.trim())
            .map(|token| {
                let token = token.trim();
                if token.eq_ignore_ascii_case(TABLE) {
                    TABLE.to_string()
                } else {
                    token.to_string()
                }
            })
            .filter(|token| !token.is_empty())
            .collect();
        Self::from_tokens(&tokens)
    }

    /// Blocks of the chain, top of the desired tower first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Goal relations from the table end upward.
    pub fn relations(&self) -> Vec<GoalRelation> {
        let mut relations = Vec::with_capacity(self.blocks.len());
        let mut below = Support::Table;
        for block in self.blocks.iter().rev() {
            relations.push(GoalRelation {
                block: block.clone(),
                on: below,
            });
            below = Support::Block(block.clone());
        }
        relations
    }

    /// Relations not yet holding in `beliefs`, from the table end upward.
    pub fn pending_relations(&self, beliefs: &Beliefs) -> Vec<GoalRelation> {
        self.relations()
            .into_iter()
            .filter(|relation| !beliefs.holds(relation))
            .collect()
    }

    pub fn is_satisfied(&self, beliefs: &Beliefs) -> bool {
        self.relations().iter().all(|relation| beliefs.holds(relation))
    }

    pub fn tokens(&self) -> Vec<String> {
        self.blocks
            .iter()
            .map(|block| block.as_str().to_string())
            .chain(std::iter::once(TABLE.to_string()))
            .collect()
    }
}

impl TryFrom<Vec<String>> for GoalChain {
    type Error = PlanError;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_tokens(&tokens)
    }
}

impl From<GoalChain> for Vec<String> {
    fn from(chain: GoalChain) -> Self {
        chain.tokens()
    }
}

/// A full goal: one or more chains over disjoint block sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    chains: Vec<GoalChain>,
    /// Desired support of every goal block.
    targets: BTreeMap<Block, Support>,
}

impl Goal {
    pub fn new(chains: Vec<GoalChain>) -> Result<Self, PlanError> {
        if chains.is_empty() {
            return Err(PlanError::MalformedGoal("no goal chains given".to_string()));
        }
        let mut targets = BTreeMap::new();
        for (index, chain) in chains.iter().enumerate() {
            for relation in chain.relations() {
                if targets.contains_key(&relation.block) {
                    return Err(PlanError::MalformedGoal(format!(
                        "block '{}' appears in more than one goal chain (chain {})",
                        relation.block,
                        index + 1
                    )));
                }
                targets.insert(relation.block, relation.on);
            }
        }
        Ok(Self { chains, targets })
    }

    /// Parse one chain per line or `;`-separated clause.
    pub fn parse_text(text: &str) -> Result<Self, PlanError> {
        let chains = CHAIN_SEPARATOR_RE
            .split(text)
            .filter(|clause| !clause.trim().is_empty())
            .map(GoalChain::parse_text)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(chains)
    }

    /// Reject goals that mention blocks missing from the world.
    pub fn validate_against(&self, beliefs: &Beliefs) -> Result<(), PlanError> {
        let unknown: Vec<&str> = self
            .targets
            .keys()
            .filter(|block| !beliefs.contains(block))
            .map(Block::as_str)
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        Err(PlanError::MalformedGoal(format!(
            "goal references unknown block(s): {}",
            unknown.join(", ")
        )))
    }

    pub fn chains(&self) -> &[GoalChain] {
        &self.chains
    }

    /// Every goal relation, chain by chain.
    pub fn relations(&self) -> Vec<GoalRelation> {
        self.chains.iter().flat_map(GoalChain::relations).collect()
    }

    /// Where `block` should rest, if the goal mentions it.
    pub fn target_of(&self, block: &Block) -> Option<&Support> {
        self.targets.get(block)
    }

    pub fn is_satisfied(&self, beliefs: &Beliefs) -> bool {
        self.chains.iter().all(|chain| chain.is_satisfied(beliefs))
    }

    pub fn pending_relations(&self, beliefs: &Beliefs) -> Vec<GoalRelation> {
        self.chains
            .iter()
            .flat_map(|chain| chain.pending_relations(beliefs))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{block, chain, stacks};

    #[test]
    fn relations_run_from_table_upward() {
        let relations = chain(&["A", "B", "C", "Table"]).relations();
        let rendered: Vec<String> = relations.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["C on Table", "B on C", "A on B"]);
    }

    #[test]
    fn from_tokens_rejects_malformed_chains() {
        let cases: [&[&str]; 5] = [
            &[],
            &["Table"],
            &["A", "B"],
            &["A", "Table", "B", "Table"],
            &["A", "A", "Table"],
        ];
        for tokens in cases {
            let err = GoalChain::from_tokens(tokens).expect_err("malformed");
            assert!(matches!(err, PlanError::MalformedGoal(_)), "{tokens:?}");
        }
    }

    #[test]
    fn parse_text_accepts_sentence_form() {
        let parsed = GoalChain::parse_text("A on B ON c on table").expect("parse");
        assert_eq!(parsed.tokens(), vec!["A", "B", "c", "Table"]);
    }

    #[test]
    fn goal_parse_text_splits_chains() {
        let goal = Goal::parse_text("A on B on Table; C on Table\nD on E on Table").expect("parse");
        assert_eq!(goal.chains().len(), 3);
        assert_eq!(goal.target_of(&block("A")), Some(&Support::from("B")));
        assert_eq!(goal.target_of(&block("C")), Some(&Support::Table));
        assert_eq!(goal.target_of(&block("Z")), None);
    }

    #[test]
    fn goal_rejects_blocks_shared_across_chains() {
        let err = Goal::new(vec![chain(&["A", "B", "Table"]), chain(&["C", "B", "Table"])])
            .expect_err("shared block");
        assert!(err.to_string().contains("more than one goal chain"));
    }

    #[test]
    fn goal_rejects_empty_chain_list() {
        assert!(Goal::new(Vec::new()).is_err());
    }

    #[test]
    fn validate_against_reports_unknown_blocks() {
        let beliefs = Beliefs::from_stacks(&stacks(&[&["A"], &["B"]])).expect("beliefs");
        let goal = Goal::new(vec![chain(&["A", "X", "Table"])]).expect("goal");
        let err = goal.validate_against(&beliefs).expect_err("unknown");
        assert!(err.to_string().contains("X"));
    }

    #[test]
    fn satisfaction_and_pending_relations_track_beliefs() {
        let beliefs = Beliefs::from_stacks(&stacks(&[&["C", "B"], &["A"]])).expect("beliefs");
        let goal_chain = chain(&["A", "B", "C", "Table"]);

        assert!(!goal_chain.is_satisfied(&beliefs));
        let pending: Vec<String> = goal_chain
            .pending_relations(&beliefs)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(pending, vec!["A on B"]);
    }

    #[test]
    fn chain_serializes_as_token_list() {
        let json = serde_json::to_string(&chain(&["A", "Table"])).expect("serialize");
        assert_eq!(json, r#"["A","Table"]"#);
        let err = serde_json::from_str::<GoalChain>(r#"["A"]"#).expect_err("no table");
        assert!(err.to_string().contains("must end at Table"));
    }
}
