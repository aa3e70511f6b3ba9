//! Progress events emitted by the [`Solver`](super::Solver).
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or silent runs |
//! | [`LoggingHandler`] | Debug logging via `tracing` |
//! | Custom `impl EventHandler` | Console output, recording, metrics |

use super::state::{Outcome, Verdict};
use crate::oracle::{CandidateGroup, GuessResponse};
use tracing::debug;

/// Events emitted during a run, in order.
#[derive(Debug)]
pub enum SolveEvent<'a> {
    /// A new oracle round is starting.
    RoundStart {
        round: u32,
        remaining: usize,
        mistakes_left: usize,
    },
    /// The prompt for this round has been rendered.
    Prompt(&'a str),
    /// The response came from the cache; the oracle was not called.
    CacheHit { key: &'a str },
    /// Candidate groups for this round.
    Response(&'a GuessResponse),
    /// One candidate has been judged.
    Judged {
        candidate: &'a CandidateGroup,
        verdict: Verdict,
    },
    /// Candidates after the first wrong one were not considered.
    Discarded { count: usize },
    /// The run has ended.
    Finished(&'a Outcome),
}

/// Observer for [`SolveEvent`]s.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &SolveEvent<'_>) {
        let _ = event;
    }
}

/// Ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// Logs every event at `DEBUG`, including the full prompt text.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &SolveEvent<'_>) {
        match event {
            SolveEvent::RoundStart {
                round,
                remaining,
                mistakes_left,
            } => {
                debug!("[round {round}] {remaining} items left, {mistakes_left} mistakes left");
            }
            SolveEvent::Prompt(prompt) => debug!("prompt:\n{prompt}"),
            SolveEvent::CacheHit { key } => debug!(key = *key, "using cached response"),
            SolveEvent::Response(response) => {
                debug!("{} candidate group(s)", response.groups.len());
            }
            SolveEvent::Judged { candidate, verdict } => {
                debug!("{verdict:?}: {}", candidate.items.join(", "));
            }
            SolveEvent::Discarded { count } => {
                debug!("discarded {count} candidate(s) after a wrong guess");
            }
            SolveEvent::Finished(outcome) => {
                debug!(
                    "finished: {:?} after {} round(s), {} confirmed",
                    outcome.status,
                    outcome.rounds,
                    outcome.confirmed.len()
                );
            }
        }
    }
}
