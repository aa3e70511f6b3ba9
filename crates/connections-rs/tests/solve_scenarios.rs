//! End-to-end runs of the solver against scripted oracles.

use std::collections::VecDeque;
use std::sync::Mutex;

use connections_rs::cache::{DiskCache, NoCache};
use connections_rs::oracle::parse_guess_response;
use connections_rs::prelude::*;
use connections_rs::prompt::build_prompt;

/// Replays raw model replies through the real response parser.
struct ReplayOracle {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl ReplayOracle {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Oracle for ReplayOracle {
    fn guess<'a>(&'a self, _request: &'a OracleRequest) -> GuessFuture<'a> {
        *self.calls.lock().unwrap() += 1;
        let reply = self.replies.lock().unwrap().pop_front();
        Box::pin(async move {
            let reply = reply.ok_or_else(|| "no more replies".to_string())?;
            parse_guess_response(&reply)
        })
    }
}

fn answer_key() -> AnswerKey {
    AnswerKey::parse(&["A, B, C, D", "E, F, G, H", "I, J, K, L", "M, N, O, P"]).unwrap()
}

const ALL_CORRECT: &str = r#"```json
{"groups": [
    {"items": ["A", "B", "C", "D"], "reason": "first four"},
    {"items": ["H", "G", "F", "E"], "reason": "second four"},
    {"items": ["I", "J", "K", "L"], "reason": "third four"},
    {"items": ["M", "N", "O", "P"], "reason": "last four"}
]}
```"#;

#[tokio::test]
async fn solves_on_first_call() {
    let oracle = ReplayOracle::new(&[ALL_CORRECT]);
    let outcome = Solver::new(&oracle, &mut NoCache, SolverConfig::default())
        .run(&answer_key())
        .await
        .unwrap();

    assert_eq!(outcome.status, Status::Solved);
    assert!(outcome.rejected.is_empty());
    assert!(outcome.unresolved.is_empty());
    assert_eq!(outcome.mistakes_left, 4);
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn correct_group_after_a_miss_must_be_guessed_again() {
    let oracle = ReplayOracle::new(&[
        r#"{"groups": [
            {"items": ["A", "B", "C", "E"], "reason": "wrong"},
            {"items": ["I", "J", "K", "L"], "reason": "right but too late"}
        ]}"#,
        r#"{"groups": [
            {"items": ["I", "J", "K", "L"], "reason": "again"},
            {"items": ["A", "B", "C", "D"], "reason": "fixed"},
            {"items": ["E", "F", "G", "H"], "reason": "fixed"},
            {"items": ["M", "N", "O", "P"], "reason": "rest"}
        ]}"#,
    ]);
    let outcome = Solver::new(&oracle, &mut NoCache, SolverConfig::default())
        .run(&answer_key())
        .await
        .unwrap();

    assert!(outcome.is_solved());
    assert_eq!(outcome.rejected, vec![vec!["A", "B", "C", "E"]]);
    assert_eq!(outcome.mistakes_left, 3);
    // IJKL only counts from the second response.
    assert_eq!(outcome.confirmed[0], Group::new(["I", "J", "K", "L"]));
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn four_single_misses_exhaust_the_budget() {
    let miss = r#"{"groups": [{"items": ["A", "E", "I", "M"], "reason": "nope"}]}"#;
    let oracle = ReplayOracle::new(&[miss, miss, miss, miss, ALL_CORRECT]);
    let outcome = Solver::new(&oracle, &mut NoCache, SolverConfig::default())
        .run(&answer_key())
        .await
        .unwrap();

    assert_eq!(outcome.status, Status::Exhausted);
    assert!(outcome.confirmed.is_empty());
    assert_eq!(outcome.unresolved.len(), 16);
    assert_eq!(outcome.rejected.len(), 4);
    assert_eq!(oracle.calls(), 4);
    assert!(outcome.to_string().starts_with("Failed to connect all words"));
}

#[tokio::test]
async fn malformed_reply_surfaces_as_error() {
    let oracle = ReplayOracle::new(&["I think the groups are fish and fire."]);
    let err = Solver::new(&oracle, &mut NoCache, SolverConfig::default())
        .run(&answer_key())
        .await
        .unwrap_err();
    assert!(err.starts_with("malformed oracle response"), "{err}");
}

#[tokio::test]
async fn disk_cache_replays_a_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let miss = r#"{"groups": [{"items": ["A", "E", "I", "M"], "reason": "nope"}]}"#;

    let first = ReplayOracle::new(&[miss, ALL_CORRECT]);
    let mut cache = DiskCache::new(dir.path()).unwrap();
    let first_run = Solver::new(&first, &mut cache, SolverConfig::default())
        .run(&answer_key())
        .await
        .unwrap();
    assert_eq!(first.calls(), 2);

    let second = ReplayOracle::new(&[]);
    let mut reopened = DiskCache::new(dir.path()).unwrap();
    let replayed = Solver::new(&second, &mut reopened, SolverConfig::default())
        .run(&answer_key())
        .await
        .unwrap();
    assert_eq!(second.calls(), 0);
    assert_eq!(replayed.status, first_run.status);
    assert_eq!(replayed.rejected, first_run.rejected);
    assert_eq!(replayed.mistakes_left, 3);
}

#[tokio::test]
async fn different_seed_misses_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = DiskCache::new(dir.path()).unwrap();

    let first = ReplayOracle::new(&[ALL_CORRECT]);
    Solver::new(&first, &mut cache, SolverConfig::default().with_seed(1))
        .run(&answer_key())
        .await
        .unwrap();

    let second = ReplayOracle::new(&[ALL_CORRECT]);
    Solver::new(&second, &mut cache, SolverConfig::default().with_seed(2))
        .run(&answer_key())
        .await
        .unwrap();
    assert_eq!(second.calls(), 1);
}

#[test]
fn prompt_is_referentially_transparent() {
    let items = ["P", "A", "K", "E"];
    let rejected = vec![vec!["A", "E", "I", "M"]];
    let first = build_prompt(&items, &rejected);
    let second = build_prompt(&items, &rejected);
    assert_eq!(first.as_bytes(), second.as_bytes());
}
