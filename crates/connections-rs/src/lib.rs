//! Solve "Connections" word-grouping puzzles by guessing with an LLM.
//!
//! Given the four answer groups of a puzzle, `connections-rs` repeatedly
//! asks a language model (via the [OpenRouter](https://openrouter.ai/)
//! chat completions API) to partition the remaining items into groups of
//! four, checks each proposed group against the answer key, and feeds wrong
//! guesses back into the next prompt. A run ends when every item has been
//! grouped or after four wrong guesses.
//!
//! # Getting started
//!
//! ```ignore
//! use connections_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let api_key = std::env::var("OPENROUTER_KEY").unwrap();
//!     let client = OpenRouterClient::new(api_key)?;
//!
//!     let key = AnswerKey::parse(&[
//!         "bass, flounder, salmon, trout",
//!         "ant, drill, island, opal",
//!         "...", "...",
//!     ])?;
//!     let config = SolverConfig::new("openai/gpt-4o");
//!     let oracle = LlmOracle::new(&client, &config);
//!     let mut cache = DiskCache::in_temp_dir()?;
//!
//!     let outcome = Solver::new(&oracle, &mut cache, config)
//!         .run(&key)
//!         .await?;
//!     println!("{outcome}");
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`puzzle`] | [`Group`](puzzle::Group) and [`AnswerKey`](puzzle::AnswerKey) |
//! | [`prompt`] | Deterministic prompt rendering with wrong-guess feedback |
//! | [`oracle`] | [`Oracle`](oracle::Oracle) trait, LLM-backed oracle, response validation |
//! | [`cache`] | [`ResponseCache`](cache::ResponseCache) trait plus memory/disk/no-op stores |
//! | [`solver`] | The guess/verify/retry loop and its events |
//! | [`config`] | [`SolverConfig`](config::SolverConfig) |
//! | [`api`] | Retry with backoff |
//! | [`logging`] | Console `tracing` layer for the binary |

pub mod api;
pub mod cache;
pub mod config;
pub mod logging;
pub mod oracle;
pub mod prelude;
pub mod prompt;
pub mod puzzle;
pub mod solver;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const REFERER: &str = "https://github.com/tacryt-socryp/connections-rs";
const TITLE: &str = "connections-rs";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` for a type implementing
/// `schemars::JsonSchema`.
///
/// ```
/// use connections_rs::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct Pair {
///     left: String,
///     right: String,
/// }
///
/// let schema = json_schema_for::<Pair>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"left".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request ────────────────────────────────────────────────────────

/// A chat completion request carrying one prompt as a single user turn.
#[derive(Serialize, Debug)]
pub struct ChatRequest<'a> {
    model: &'a str,
    messages: [UserTurn<'a>; 1],
    #[serde(skip_serializing_if = "is_zero_u32")]
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

impl<'a> ChatRequest<'a> {
    /// `max_tokens` of 0 leaves the limit to the provider.
    pub fn user(model: &'a str, prompt: &'a str, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model,
            messages: [UserTurn {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        }
    }
}

// ── Response ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<RawError>,
    usage: Option<RawUsage>,
}

#[derive(Deserialize)]
struct RawChoice {
    message: RawMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct RawMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct RawError {
    message: String,
}

#[derive(Deserialize)]
struct RawUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .user_agent("connections-rs/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
        })
    }

    /// Send `request` and return the text of the first choice, if any.
    ///
    /// HTTP failures come back as `OpenRouter API HTTP <status>: <body>` so
    /// [`api::retry`] can tell rate limits and outages from bad requests.
    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>, String> {
        let start = Instant::now();
        let resp = self
            .http
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(request)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;
        debug!(
            model = request.model,
            "HTTP {status} in {:.1}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("OpenRouter API HTTP {status}: {text}"));
        }
        first_choice_text(&text)
    }
}

/// Pull the reply text out of a chat-completions response body.
fn first_choice_text(body: &str) -> Result<Option<String>, String> {
    let parsed: RawChatResponse =
        serde_json::from_str(body).map_err(|e| format!("failed to parse response: {e}"))?;

    if let Some(err) = parsed.error {
        return Err(format!("OpenRouter API error: {}", err.message));
    }
    if let Some(usage) = parsed.usage {
        debug!(
            "tokens: prompt={}, completion={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
        );
    }

    let Some(choice) = parsed.choices.and_then(|c| c.into_iter().next()) else {
        return Ok(None);
    };
    if let Some(reason) = choice.finish_reason.as_deref().filter(|r| *r != "stop") {
        debug!("reply ended early: finish_reason={reason}");
    }
    Ok(choice.message.content)
}
