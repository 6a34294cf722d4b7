//! End-to-end planning scenarios and exhaustive property checks.
//!
//! The property tests enumerate every world of four blocks (every ordering,
//! every way of cutting it into stacks) against every goal over those blocks,
//! then replay the returned schedule cycle by cycle.

use std::collections::BTreeSet;

use planner::core::beliefs::Beliefs;
use planner::core::types::{Block, ConflictKind, MoveGroup};
use planner::plan::{PlanReport, PlanRequest, PlannerOptions, plan};
use planner::test_support::{block, replay, stacks};

const BLOCKS: [&str; 4] = ["A", "B", "C", "D"];

fn request(layout: Vec<Vec<Block>>, chains: Vec<Vec<String>>) -> PlanRequest {
    PlanRequest {
        stacks: layout,
        goal_chains: Some(chains),
        ..PlanRequest::default()
    }
}

fn tokens(chain: &[&str]) -> Vec<String> {
    chain.iter().map(|id| (*id).to_string()).collect()
}

fn run(layout: &[&[&str]], chains: &[&[&str]]) -> PlanReport {
    let chains = chains.iter().map(|chain| tokens(chain)).collect();
    plan(&request(stacks(layout), chains), &PlannerOptions::default()).expect("plan")
}

fn permutations(items: &[&'static str]) -> Vec<Vec<&'static str>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for (i, first) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, *first);
            out.push(tail);
        }
    }
    out
}

/// Every world over `BLOCKS`: each ordering cut into stacks at every subset
/// of the gaps between neighbours.
fn all_worlds() -> Vec<Vec<Vec<Block>>> {
    let mut worlds = BTreeSet::new();
    for order in permutations(&BLOCKS) {
        for cuts in 0u32..(1 << (BLOCKS.len() - 1)) {
            let mut world = vec![vec![block(order[0])]];
            for (gap, id) in order.iter().enumerate().skip(1) {
                if cuts & (1 << (gap - 1)) != 0 {
                    world.push(Vec::new());
                }
                if let Some(stack) = world.last_mut() {
                    stack.push(block(id));
                }
            }
            world.sort();
            worlds.insert(world);
        }
    }
    worlds.into_iter().collect()
}

/// Replay `report` from `layout`, checking per-cycle invariants, and return
/// the final beliefs.
fn replay_checked(layout: &[Vec<Block>], report: &PlanReport) -> Beliefs {
    let mut beliefs = Beliefs::from_stacks(layout).expect("valid stacks");
    for group in &report.moves {
        let moves = group.moves();
        let mut seen_blocks = BTreeSet::new();
        let mut seen_destinations = BTreeSet::new();
        for mv in moves {
            assert!(seen_blocks.insert(mv.block.clone()), "block moved twice in one cycle");
            if let Some(destination) = mv.to.as_block() {
                assert!(
                    seen_destinations.insert(destination.clone()),
                    "destination shared within one cycle"
                );
            }
            beliefs
                .check(mv)
                .unwrap_or_else(|err| panic!("move illegal before its cycle: {err}"));
        }
        for mv in moves {
            beliefs
                .apply(mv)
                .unwrap_or_else(|err| panic!("concurrent moves interfere: {err}"));
        }
    }
    beliefs
}

fn assert_plan_properties(layout: Vec<Vec<Block>>, chains: Vec<Vec<String>>) {
    let req = request(layout.clone(), chains);
    let goal = req.resolve_goal().expect("goal");
    let already = goal.is_satisfied(&Beliefs::from_stacks(&layout).expect("beliefs"));

    let report = plan(&req, &PlannerOptions::default()).expect("plan");
    assert!(report.goal_achieved, "goal not achieved for {layout:?}");
    assert!(report.error.is_none());
    if already {
        assert!(report.moves.is_empty());
        assert_eq!(report.relations_resolved, 0);
    }

    let after = replay_checked(&layout, &report);
    assert!(goal.is_satisfied(&after), "replayed moves miss goal for {layout:?}");
    assert_eq!(after.stacks(), report.beliefs.stacks);

    let again = plan(
        &request(report.beliefs.stacks.clone(), req.goal_chains.clone().unwrap_or_default()),
        &PlannerOptions::default(),
    )
    .expect("replan");
    assert!(again.moves.is_empty(), "replanning a finished world must be a no-op");
}

#[test]
fn scenario_stack_already_in_goal_order_needs_no_moves() {
    // Stacks are bottom to top: D already rests on C on B on A.
    let report = run(&[&["A", "B", "C", "D"]], &[&["D", "C", "B", "A", "Table"]]);
    assert!(report.goal_achieved);
    assert!(report.moves.is_empty());
    assert_eq!(report.relations_resolved, 0);
    assert_eq!(report.iterations, 0);
}

#[test]
fn scenario_full_reversal() {
    let layout = stacks(&[&["D", "C", "B", "A"]]);
    let report = run(&[&["D", "C", "B", "A"]], &[&["D", "C", "B", "A", "Table"]]);
    assert!(report.goal_achieved);
    assert_eq!(report.beliefs.stacks, stacks(&[&["A", "B", "C", "D"]]));
    let after = replay(&layout, &report.moves);
    assert_eq!(after.stacks(), stacks(&[&["A", "B", "C", "D"]]));
}

#[test]
fn scenario_four_separate_piles() {
    let layout = stacks(&[&["D"], &["C"], &["B"], &["A"]]);
    let report = run(&[&["D"], &["C"], &["B"], &["A"]], &[&["A", "B", "C", "D", "Table"]]);
    assert!(report.goal_achieved);
    assert_eq!(report.move_count(), 3);
    assert_eq!(report.relations_resolved, 3);

    // Every prefix of the schedule is a valid, grounded world.
    for executed in 0..=report.moves.len() {
        let partial = replay(&layout, &report.moves[..executed]);
        assert_eq!(partial.len(), 4);
        let stacked: usize = partial.stacks().iter().map(Vec::len).sum();
        assert_eq!(stacked, 4);
    }
}

#[test]
fn scenario_interleaved_piles_clear_before_restacking() {
    let report = run(&[&["A", "D"], &["C", "B"]], &[&["A", "B", "C", "D", "Table"]]);
    assert!(report.goal_achieved);
    assert_eq!(report.move_count(), 5);
    assert_eq!(report.relations_resolved, 4);
    let targets: Vec<String> = report
        .moves
        .iter()
        .flat_map(|group| group.moves().iter().map(|mv| format!("{}>{}", mv.block, mv.to)))
        .collect();
    assert_eq!(targets, vec!["D>Table", "B>Table", "C>D", "B>C", "A>B"]);
}

#[test]
fn scenario_disjoint_chains_share_a_cycle() {
    let report = run(
        &[&["A"], &["B"], &["C"], &["D"]],
        &[&["A", "B", "Table"], &["C", "D", "Table"]],
    );
    assert!(report.goal_achieved);
    assert_eq!(report.agent_count, 2);
    assert!(
        report
            .moves
            .iter()
            .any(|group| matches!(group, MoveGroup::Concurrent { moves } if moves.len() == 2))
    );
}

#[test]
fn scenario_contested_block_reports_one_resource_conflict() {
    let report = run(
        &[&["B", "D", "Z"], &["A"], &["C"]],
        &[&["B", "A", "Table"], &["D", "C", "Table"]],
    );
    assert!(report.goal_achieved);

    let first = &report.intention_log[0];
    assert_eq!(first.proposals.len(), 2);
    assert_eq!(first.conflicts.len(), 1);
    assert_eq!(first.conflicts[0].kind, ConflictKind::Resource);
    assert_eq!(first.moves.len(), 1);
    assert_eq!(first.moves[0].block, block("Z"));
    assert!(report.conflicts.total >= 1);
    assert_eq!(
        report.conflicts.by_type.get(&ConflictKind::Resource).copied(),
        Some(report.conflicts.total)
    );
}

#[test]
fn every_single_chain_over_four_blocks_is_achieved() {
    let worlds = all_worlds();
    assert_eq!(worlds.len(), 73);
    for world in &worlds {
        for order in permutations(&BLOCKS) {
            let mut chain = tokens(&order);
            chain.push("Table".to_string());
            assert_plan_properties(world.clone(), vec![chain]);
        }
    }
}

#[test]
fn every_pair_of_disjoint_chains_over_four_blocks_is_achieved() {
    for world in all_worlds() {
        for order in permutations(&BLOCKS) {
            let low = vec![order[0].to_string(), order[1].to_string(), "Table".to_string()];
            let high = vec![order[2].to_string(), order[3].to_string(), "Table".to_string()];
            assert_plan_properties(world.clone(), vec![low, high]);
        }
    }
}

#[test]
fn partial_goals_leave_other_blocks_alone_once_clear() {
    for world in all_worlds() {
        assert_plan_properties(world, vec![tokens(&["B", "A", "Table"])]);
    }
}
