//! The guess/verify/retry loop.
//!
//! Each round the [`Solver`] shuffles the remaining items, renders a prompt
//! (with feedback about earlier wrong guesses), asks the oracle (or the
//! cache) for candidate groups, and verifies them in order with
//! [`PuzzleState::apply_response`]. The run ends when every item is grouped
//! ([`Status::Solved`]) or the mistake budget is spent
//! ([`Status::Exhausted`]).
//!
//! The shuffle generator belongs to the solver and is seeded once. It keeps
//! advancing across rounds, and across runs if the same solver is reused,
//! so a fixed seed reproduces the whole sequence of prompts.

pub mod events;
pub mod state;

pub use events::{EventHandler, LoggingHandler, NoopHandler, SolveEvent};
pub use state::{Outcome, PuzzleState, Status, Verdict};

use crate::cache::{ResponseCache, cache_key};
use crate::config::SolverConfig;
use crate::oracle::{GuessResponse, Oracle, OracleRequest, parse_guess_response};
use crate::prompt::{build_prompt, template_id};
use crate::puzzle::AnswerKey;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::warn;

/// Drives puzzle runs against an oracle.
pub struct Solver<'a> {
    oracle: &'a dyn Oracle,
    cache: &'a mut dyn ResponseCache,
    config: SolverConfig,
    rng: StdRng,
    event_handler: &'a dyn EventHandler,
}

impl<'a> Solver<'a> {
    /// Create a solver whose shuffle generator is seeded from `config.seed`.
    pub fn new(
        oracle: &'a dyn Oracle,
        cache: &'a mut dyn ResponseCache,
        config: SolverConfig,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            oracle,
            cache,
            config,
            rng,
            event_handler: &NoopHandler,
        }
    }

    /// Replace the shuffle generator.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.event_handler = handler;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Run one puzzle to completion.
    ///
    /// Returns `Ok` for both solved and exhausted runs.
    ///
    /// # Errors
    ///
    /// - The oracle fails, including a malformed response. This is the only
    ///   fatal error of the guessing loop itself.
    /// - `max_rounds` round-trips pass without the run ending. Only an oracle
    ///   that keeps repeating confirmed groups can get here, since every other
    ///   response either confirms a group or spends a mistake. This cap is an
    ///   extra guard on top of the loop's own termination rules.
    pub async fn run(&mut self, key: &AnswerKey) -> Result<Outcome, String> {
        let mut state = PuzzleState::new(key, self.config.max_mistakes);
        let template = template_id();

        while state.status() == Status::Running {
            if state.rounds() >= self.config.max_rounds {
                return Err(format!(
                    "no result after {} oracle rounds ({} items left)",
                    state.rounds(),
                    state.remaining().len()
                ));
            }

            let mut items: Vec<String> = state.remaining().iter().cloned().collect();
            items.shuffle(&mut self.rng);
            let rejected = state.rejected().to_vec();

            self.event_handler.on_event(&SolveEvent::RoundStart {
                round: state.rounds() + 1,
                remaining: items.len(),
                mistakes_left: state.mistakes_left(),
            });

            let prompt = build_prompt(&items, &rejected);
            self.event_handler.on_event(&SolveEvent::Prompt(&prompt));

            let key_str = cache_key(&self.config.model, &template, &items, &rejected);
            let request = OracleRequest {
                model: self.config.model.clone(),
                prompt,
                items,
                rejected,
            };
            let response = self.ask(&key_str, &request).await?;
            state.record_round();
            self.event_handler.on_event(&SolveEvent::Response(&response));

            let judged = state.apply_response(key, &response);
            for &(idx, verdict) in &judged {
                self.event_handler.on_event(&SolveEvent::Judged {
                    candidate: &response.groups[idx],
                    verdict,
                });
            }
            let unjudged = response.groups.len() - judged.len();
            if unjudged > 0 && judged.last().map(|(_, v)| *v) == Some(Verdict::Incorrect) {
                self.event_handler
                    .on_event(&SolveEvent::Discarded { count: unjudged });
            }
        }

        let outcome = Outcome::from(state);
        self.event_handler.on_event(&SolveEvent::Finished(&outcome));
        Ok(outcome)
    }

    /// Answer a request from the cache, or from the oracle on a miss.
    async fn ask(&mut self, key: &str, request: &OracleRequest) -> Result<GuessResponse, String> {
        if let Some(raw) = self.cache.get(key) {
            match parse_guess_response(&raw) {
                Ok(response) => {
                    self.event_handler.on_event(&SolveEvent::CacheHit { key });
                    return Ok(response);
                }
                Err(e) => warn!("Ignoring unusable cache entry {key}: {e}"),
            }
        }

        let response = self.oracle.guess(request).await?;
        match serde_json::to_string(&response) {
            Ok(json) => self.cache.put(key, json),
            Err(e) => warn!("Failed to serialize response for cache: {e}"),
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NoCache};
    use crate::oracle::{CandidateGroup, GuessFuture};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns canned responses in order and records every request.
    struct ScriptedOracle {
        responses: Mutex<VecDeque<Result<GuessResponse, String>>>,
        requests: Mutex<Vec<OracleRequest>>,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<Result<GuessResponse, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn requests(&self) -> Vec<OracleRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Oracle for ScriptedOracle {
        fn guess<'a>(&'a self, request: &'a OracleRequest) -> GuessFuture<'a> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()));
            Box::pin(async move { next })
        }
    }

    /// Records events as strings.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl EventHandler for Recorder {
        fn on_event(&self, event: &SolveEvent<'_>) {
            let line = match event {
                SolveEvent::RoundStart { round, .. } => format!("round {round}"),
                SolveEvent::Prompt(_) => return,
                SolveEvent::CacheHit { .. } => "cache hit".to_string(),
                SolveEvent::Response(_) => return,
                SolveEvent::Judged { candidate, verdict } => {
                    format!("{verdict:?} {}", candidate.items.join(""))
                }
                SolveEvent::Discarded { count } => format!("discarded {count}"),
                SolveEvent::Finished(outcome) => format!("finished {:?}", outcome.status),
            };
            self.0.lock().unwrap().push(line);
        }
    }

    fn key() -> AnswerKey {
        AnswerKey::parse(&["A,B,C,D", "E,F,G,H", "I,J,K,L", "M,N,O,P"]).unwrap()
    }

    fn response(groups: &[[&str; 4]]) -> Result<GuessResponse, String> {
        Ok(GuessResponse::new(
            groups
                .iter()
                .map(|g| CandidateGroup::new(*g, "r"))
                .collect(),
        ))
    }

    const ALL: [[&str; 4]; 4] = [
        ["A", "B", "C", "D"],
        ["E", "F", "G", "H"],
        ["I", "J", "K", "L"],
        ["M", "N", "O", "P"],
    ];

    #[tokio::test]
    async fn solves_in_one_round() {
        let oracle = ScriptedOracle::new(vec![response(&ALL)]);
        let mut cache = NoCache;
        let outcome = Solver::new(&oracle, &mut cache, SolverConfig::default())
            .run(&key())
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::Solved);
        assert_eq!(outcome.confirmed.len(), 4);
        assert_eq!(outcome.mistakes_left, 4);
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn wrong_guess_is_fed_back_into_next_prompt() {
        let oracle = ScriptedOracle::new(vec![
            response(&[["A", "B", "C", "E"], ["I", "J", "K", "L"]]),
            response(&ALL),
        ]);
        let mut cache = NoCache;
        let recorder = Recorder::default();
        let outcome = Solver::new(&oracle, &mut cache, SolverConfig::default())
            .with_event_handler(&recorder)
            .run(&key())
            .await
            .unwrap();

        assert!(outcome.is_solved());
        assert_eq!(outcome.mistakes_left, 3);

        let requests = oracle.requests();
        assert!(requests[0].rejected.is_empty());
        assert!(!requests[0].prompt.contains("You previously guessed"));
        assert_eq!(requests[1].rejected, vec![vec!["A", "B", "C", "E"]]);
        assert!(requests[1].prompt.contains("\"A\",\"B\",\"C\",\"E\""));
        assert_eq!(requests[0].items.len(), 16);
        assert_eq!(requests[1].items.len(), 16);

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "round 1",
                "Incorrect ABCE",
                "discarded 1",
                "round 2",
                "Correct ABCD",
                "Correct EFGH",
                "Correct IJKL",
                "Correct MNOP",
                "finished Solved",
            ]
        );
    }

    #[tokio::test]
    async fn exhausts_after_four_misses() {
        let miss = || response(&[["A", "E", "I", "M"]]);
        let oracle = ScriptedOracle::new(vec![miss(), miss(), miss(), miss(), miss()]);
        let mut cache = NoCache;
        let outcome = Solver::new(&oracle, &mut cache, SolverConfig::default())
            .run(&key())
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::Exhausted);
        assert_eq!(outcome.rejected.len(), 4);
        assert_eq!(outcome.unresolved.len(), 16);
        assert_eq!(oracle.calls(), 4);
    }

    #[tokio::test]
    async fn malformed_response_aborts_run() {
        let oracle = ScriptedOracle::new(vec![Err(
            "malformed oracle response: invalid JSON".to_string()
        )]);
        let mut cache = MemoryCache::new();
        let err = Solver::new(&oracle, &mut cache, SolverConfig::default())
            .run(&key())
            .await
            .unwrap_err();
        assert!(err.starts_with("malformed oracle response"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn cache_hit_skips_oracle() {
        let mut cache = MemoryCache::new();

        let first = ScriptedOracle::new(vec![response(&ALL)]);
        Solver::new(&first, &mut cache, SolverConfig::default())
            .run(&key())
            .await
            .unwrap();
        assert_eq!(first.calls(), 1);
        assert_eq!(cache.len(), 1);

        // Same seed, same puzzle: identical request, served from cache.
        let second = ScriptedOracle::new(vec![]);
        let recorder = Recorder::default();
        let outcome = Solver::new(&second, &mut cache, SolverConfig::default())
            .with_event_handler(&recorder)
            .run(&key())
            .await
            .unwrap();
        assert!(outcome.is_solved());
        assert_eq!(second.calls(), 0);
        assert!(recorder.0.lock().unwrap().contains(&"cache hit".to_string()));
    }

    #[tokio::test]
    async fn corrupt_cache_entry_falls_back_to_oracle() {
        struct Poisoned;
        impl ResponseCache for Poisoned {
            fn get(&mut self, _key: &str) -> Option<String> {
                Some(r#"{"groups": []}"#.to_string())
            }
            fn put(&mut self, _key: &str, _value: String) {}
        }

        let oracle = ScriptedOracle::new(vec![response(&ALL)]);
        let mut cache = Poisoned;
        let outcome = Solver::new(&oracle, &mut cache, SolverConfig::default())
            .run(&key())
            .await
            .unwrap();
        assert!(outcome.is_solved());
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn same_seed_gives_same_shuffles() {
        let script = || {
            vec![
                response(&[["A", "E", "I", "M"]]),
                response(&[["B", "F", "J", "N"]]),
                response(&ALL),
            ]
        };
        let a = ScriptedOracle::new(script());
        let b = ScriptedOracle::new(script());
        let config = SolverConfig::default().with_seed(42);
        Solver::new(&a, &mut NoCache, config.clone())
            .run(&key())
            .await
            .unwrap();
        Solver::new(&b, &mut NoCache, config)
            .run(&key())
            .await
            .unwrap();

        let orders_a: Vec<Vec<String>> = a.requests().into_iter().map(|r| r.items).collect();
        let orders_b: Vec<Vec<String>> = b.requests().into_iter().map(|r| r.items).collect();
        assert_eq!(orders_a, orders_b);
        // The stream advances between rounds.
        assert!(orders_a[0] != orders_a[1] || orders_a[1] != orders_a[2]);
    }

    #[tokio::test]
    async fn injected_rng_drives_the_shuffle() {
        let script = || vec![response(&[["A", "E", "I", "M"]]), response(&ALL)];
        let run_with = |seed: u64| {
            let oracle = ScriptedOracle::new(script());
            async move {
                // Overrides the generator seeded from config.
                let config = SolverConfig::default().with_seed(seed + 100);
                Solver::new(&oracle, &mut NoCache, config)
                    .with_rng(StdRng::seed_from_u64(seed))
                    .run(&key())
                    .await
                    .unwrap();
                oracle
                    .requests()
                    .into_iter()
                    .map(|r| r.items)
                    .collect::<Vec<_>>()
            }
        };

        let first = run_with(7).await;
        let again = run_with(7).await;
        let other = run_with(8).await;
        assert_eq!(first.len(), 2);
        assert_eq!(first, again);
        assert_ne!(first[0], other[0]);

        let from_config = {
            let oracle = ScriptedOracle::new(script());
            Solver::new(&oracle, &mut NoCache, SolverConfig::default().with_seed(7))
                .run(&key())
                .await
                .unwrap();
            oracle.requests()[0].items.clone()
        };
        assert_eq!(first[0], from_config);
    }

    #[tokio::test]
    async fn stalled_oracle_hits_round_cap() {
        let oracle = ScriptedOracle::new(vec![
            response(&[["A", "B", "C", "D"]]),
            response(&[["A", "B", "C", "D"]]),
            response(&[["A", "B", "C", "D"]]),
        ]);
        let config = SolverConfig::default().with_max_rounds(3);
        let err = Solver::new(&oracle, &mut NoCache, config)
            .run(&key())
            .await
            .unwrap_err();
        assert!(err.contains("no result after 3 oracle rounds"), "{err}");
    }
}
