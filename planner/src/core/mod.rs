//! Deterministic, pure planning logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests. The
//! wall clock is only read by [`budget`].

pub mod beliefs;
pub mod budget;
pub mod conflict;
pub mod error;
pub mod goal;
pub mod negotiation;
pub mod scheduler;
pub mod tower;
pub mod types;
