//! Puzzle model: items, groups, and the answer key.
//!
//! A [`Group`] keeps the order its items were given in (for display and for
//! the feedback text sent back to the model), but compares as a set: two
//! groups are equal iff they contain exactly the same items.

use std::collections::BTreeSet;
use std::fmt;

/// Number of groups in a puzzle.
pub const GROUP_COUNT: usize = 4;

/// Number of items in each group.
pub const GROUP_SIZE: usize = 4;

/// A single puzzle token. Identity is exact string equality.
pub type Item = String;

// ── Group ──────────────────────────────────────────────────────────

/// Items claimed (or known) to share a common category.
#[derive(Debug, Clone, Eq)]
pub struct Group {
    items: Vec<Item>,
}

impl Group {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Item>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list of items, trimming each one.
    ///
    /// Empty entries (e.g. from a trailing comma) are kept as empty strings
    /// so that [`AnswerKey::new`] can reject them with a clear message.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(|item| item.trim().to_string()))
    }

    /// Items in presentation order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The group's items as a set.
    pub fn item_set(&self) -> BTreeSet<&str> {
        self.items.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.item_set() == other.item_set()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.items.join(", "))
    }
}

// ── AnswerKey ──────────────────────────────────────────────────────

/// The ground-truth partition of all items into four groups.
#[derive(Debug, Clone)]
pub struct AnswerKey {
    groups: Vec<Group>,
}

impl AnswerKey {
    /// Build an answer key, checking the shape of every group.
    ///
    /// Requires exactly [`GROUP_COUNT`] groups of [`GROUP_SIZE`] distinct,
    /// non-empty items. Overlap between groups is not checked.
    pub fn new(groups: Vec<Group>) -> Result<Self, String> {
        if groups.len() != GROUP_COUNT {
            return Err(format!(
                "expected {GROUP_COUNT} answer groups, got {}",
                groups.len()
            ));
        }
        for (idx, group) in groups.iter().enumerate() {
            let n = idx + 1;
            if group.items.iter().any(|item| item.is_empty()) {
                return Err(format!("answer group {n} contains an empty item"));
            }
            if group.len() != GROUP_SIZE {
                return Err(format!(
                    "answer group {n} must have {GROUP_SIZE} items, got {} ({group})",
                    group.len()
                ));
            }
            if group.item_set().len() != GROUP_SIZE {
                return Err(format!("answer group {n} repeats an item ({group})"));
            }
        }
        Ok(Self { groups })
    }

    /// Parse one comma-separated string per group.
    pub fn parse<S: AsRef<str>>(lists: &[S]) -> Result<Self, String> {
        Self::new(lists.iter().map(|l| Group::parse(l.as_ref())).collect())
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The full item universe: the union of every group.
    pub fn universe(&self) -> BTreeSet<Item> {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter().cloned())
            .collect()
    }

    /// Index of the answer group whose item set exactly equals `candidate`.
    pub fn find(&self, candidate: &Group) -> Option<usize> {
        self.groups.iter().position(|g| g == candidate)
    }
}
