//! Puzzle state and the per-response verification step.

use crate::oracle::GuessResponse;
use crate::puzzle::{AnswerKey, Group, Item};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle of a puzzle run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    /// Every item has been grouped.
    Solved,
    /// The wrong-guess budget ran out with items still ungrouped.
    Exhausted,
}

/// How one candidate group was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Matches an answer group that had not been found yet.
    Correct,
    /// Matches an answer group that was confirmed earlier. No state change.
    AlreadySolved,
    /// Matches no answer group.
    Incorrect,
}

/// Mutable state of one puzzle run.
#[derive(Debug, Clone)]
pub struct PuzzleState {
    remaining: BTreeSet<Item>,
    confirmed: Vec<Group>,
    rejected: Vec<Vec<Item>>,
    rounds: u32,
    max_mistakes: usize,
}

impl PuzzleState {
    pub fn new(key: &AnswerKey, max_mistakes: usize) -> Self {
        Self {
            remaining: key.universe(),
            confirmed: Vec::new(),
            rejected: Vec::new(),
            rounds: 0,
            max_mistakes,
        }
    }

    /// Items not yet placed in a confirmed group, in sorted order.
    pub fn remaining(&self) -> &BTreeSet<Item> {
        &self.remaining
    }

    pub fn confirmed(&self) -> &[Group] {
        &self.confirmed
    }

    /// Wrong guesses so far, items in the order the oracle gave them.
    pub fn rejected(&self) -> &[Vec<Item>] {
        &self.rejected
    }

    /// Oracle round-trips performed so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn mistakes_left(&self) -> usize {
        self.max_mistakes.saturating_sub(self.rejected.len())
    }

    pub fn status(&self) -> Status {
        if self.remaining.is_empty() {
            Status::Solved
        } else if self.rejected.len() >= self.max_mistakes {
            Status::Exhausted
        } else {
            Status::Running
        }
    }

    pub(crate) fn record_round(&mut self) {
        self.rounds += 1;
    }

    /// Judge a candidate against the answer key without changing state.
    pub fn judge(&self, key: &AnswerKey, candidate: &Group) -> Verdict {
        match key.find(candidate) {
            Some(_) if self.confirmed.contains(candidate) => Verdict::AlreadySolved,
            Some(_) => Verdict::Correct,
            None => Verdict::Incorrect,
        }
    }

    /// Verify one oracle response, candidate by candidate, in order.
    ///
    /// A correct candidate is confirmed and processing continues. The first
    /// incorrect candidate is recorded as rejected and ends processing:
    /// anything after it in the same response is discarded, right or wrong.
    /// Candidates are judged even after the last group is confirmed, so a
    /// trailing wrong guess still costs a mistake.
    ///
    /// Returns `(index, verdict)` for every candidate that was looked at.
    pub fn apply_response(
        &mut self,
        key: &AnswerKey,
        response: &GuessResponse,
    ) -> Vec<(usize, Verdict)> {
        let mut judged = Vec::with_capacity(response.groups.len());
        for (idx, candidate) in response.groups.iter().enumerate() {
            let group = candidate.group();
            let verdict = self.judge(key, &group);
            judged.push((idx, verdict));
            match verdict {
                Verdict::Correct => {
                    for item in group.items() {
                        self.remaining.remove(item);
                    }
                    self.confirmed.push(group);
                }
                Verdict::AlreadySolved => {}
                Verdict::Incorrect => {
                    self.rejected.push(candidate.items.clone());
                    break;
                }
            }
        }
        judged
    }
}

// ── Outcome ────────────────────────────────────────────────────────

/// Final report of a finished run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub status: Status,
    pub confirmed: Vec<Group>,
    pub rejected: Vec<Vec<Item>>,
    /// Items never placed in a confirmed group, sorted.
    pub unresolved: Vec<Item>,
    pub rounds: u32,
    pub mistakes_left: usize,
}

impl Outcome {
    pub fn is_solved(&self) -> bool {
        self.status == Status::Solved
    }
}

impl From<PuzzleState> for Outcome {
    fn from(state: PuzzleState) -> Self {
        Self {
            status: state.status(),
            mistakes_left: state.mistakes_left(),
            unresolved: state.remaining.into_iter().collect(),
            confirmed: state.confirmed,
            rejected: state.rejected,
            rounds: state.rounds,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Solved => {
                writeln!(f, "All words connected!")?;
                writeln!(f, "Guesses remaining: {}", self.mistakes_left)?;
            }
            _ => writeln!(f, "Failed to connect all words")?,
        }
        writeln!(f, "Correctly found words:")?;
        if self.confirmed.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for group in &self.confirmed {
            writeln!(f, "  - {group}")?;
        }
        if !self.unresolved.is_empty() {
            writeln!(f, "Remaining words: {}", self.unresolved.join(", "))?;
        }
        write!(f, "Oracle rounds: {}", self.rounds)
    }
}
