//! Convenience re-exports for common `connections-rs` types.
//!
//! ```ignore
//! use connections_rs::prelude::*;
//! ```
//!
//! Covers the client, the puzzle model, the solver with its events and
//! config, the oracle boundary, and the cache implementations.

pub use crate::{OpenRouterClient, json_schema_for};

pub use crate::cache::{DiskCache, MemoryCache, NoCache, ResponseCache};
pub use crate::config::SolverConfig;
pub use crate::oracle::{
    CandidateGroup, GuessFuture, GuessResponse, LlmOracle, Oracle, OracleRequest,
};
pub use crate::puzzle::{AnswerKey, Group};
pub use crate::solver::{
    EventHandler, LoggingHandler, NoopHandler, Outcome, SolveEvent, Solver, Status, Verdict,
};
