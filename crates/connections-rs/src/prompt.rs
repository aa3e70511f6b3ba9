//! Prompt rendering for the guess oracle.
//!
//! The prompt is a fixed instructional preamble, the remaining items, an
//! optional feedback block listing rejected guesses, and the output-format
//! contract. Rendering is a pure function of its inputs so that identical
//! puzzle states produce byte-identical prompts (and therefore cache hits).

use crate::cache::fnv1a;

const PREAMBLE: &str = "\
Find groups of four items that share something in common.
Category Examples

FISH: Bass, Flounder, Salmon, Trout
FIRE ___:
Ant, Drill, Island, Opal
Categories will always be more specific than
\"5-LETTER-WORDS,\" \"NAMES\" or \"VERBS.\"

Each puzzle has exactly one solution. Every item fits in
exactly one category.

Watch out for words that seem to belong to multiple categories!

Order your answers in terms of your confidence level, high
confidence first.

Here are the items:
";

const OUTPUT_CONTRACT: &str = "\
Return your guess as ONLY JSON like this:

{\"groups\":
    [
        {\"items\": [\"item1a\", \"item2a\", \"item3a\", \"item4a\"],
            \"reason\": \"...\"},
        {\"items\": [\"item1b\", \"item2b\", \"item3b\", \"item4b\"],
            \"reason\": \"...\"}
    ]}

Each \"items\" array must contain exactly four of the items above.
No other text.
";

/// Wrap each item in double quotes and join with commas.
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("\"{}\"", item.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Feedback block listing previously rejected guesses, one per line.
///
/// Returns an empty string when nothing has been rejected yet.
pub fn format_feedback<S: AsRef<str>>(rejected: &[Vec<S>]) -> String {
    if rejected.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = rejected.iter().map(|g| format_list(g)).collect();
    format!(
        "You previously guessed\n{}\nThose answers are not correct. Do not repeat them.\n",
        lines.join("\n")
    )
}

/// Render the full prompt for one oracle round-trip.
pub fn build_prompt<S: AsRef<str>>(items: &[S], rejected: &[Vec<S>]) -> String {
    let feedback = format_feedback(rejected);
    let mut prompt = String::with_capacity(PREAMBLE.len() + OUTPUT_CONTRACT.len() + 512);
    prompt.push_str(PREAMBLE);
    prompt.push('\n');
    prompt.push_str(&format_list(items));
    prompt.push_str("\n\n");
    if !feedback.is_empty() {
        prompt.push_str(&feedback);
        prompt.push('\n');
    }
    prompt.push_str(OUTPUT_CONTRACT);
    prompt
}

/// Stable identity of the prompt template, used as part of the cache key.
///
/// Changes whenever the fixed template text changes, so cached responses
/// for an older wording are never reused.
pub fn template_id() -> String {
    let mut text = String::with_capacity(PREAMBLE.len() + OUTPUT_CONTRACT.len());
    text.push_str(PREAMBLE);
    text.push_str(OUTPUT_CONTRACT);
    format!("{:016x}", fnv1a(text.as_bytes()))
}
