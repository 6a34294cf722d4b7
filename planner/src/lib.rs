//! Blocks-world planning and scheduling engine.
//!
//! Given a world of stacked blocks and one or more goal towers, the planner
//! produces a schedule of legal moves, grouped into cycles of moves that can
//! run concurrently. Each goal tower is served by its own agent; agents
//! propose against shared beliefs and a scheduler resolves contention once
//! per cycle. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (beliefs, tower planning,
//!   conflict detection, scheduling). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, request files, intention
//!   log persistence).
//!
//! Orchestration modules ([`plan`], [`cycle`], [`replan`]) drive core logic
//! per request and back the CLI commands.

pub mod core;
pub mod cycle;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod plan;
pub mod replan;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
