//! I/O helpers for planner commands.

pub mod config;
pub mod intention_log;
pub mod request;
