//! The guess oracle: turns a prompt into candidate groups.
//!
//! The [`Oracle`] trait is the boundary the solver depends on. The
//! production implementation, [`LlmOracle`], sends the prompt to a chat
//! model through [`OpenRouterClient`] and validates the reply with
//! [`parse_guess_response`]. Tests substitute scripted oracles.
//!
//! Replies must be a JSON object of the shape
//!
//! ```json
//! {"groups": [{"items": ["a", "b", "c", "d"], "reason": "..."}]}
//! ```
//!
//! optionally wrapped in a Markdown code fence. Anything else is a
//! malformed oracle response, which is not retried or repaired.

use crate::api::retry::retry_api_call;
use crate::config::SolverConfig;
use crate::puzzle::Group;
use crate::{ChatRequest, OpenRouterClient, json_schema_for};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Prefix shared by every malformed-response error message.
pub const MALFORMED: &str = "malformed oracle response";

// ── Response types ─────────────────────────────────────────────────

/// One proposed group and the model's rationale for it.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct CandidateGroup {
    /// Exactly four items.
    #[schemars(length(equal = 4))]
    pub items: Vec<String>,
    /// Why the items belong together. Not used for verification.
    pub reason: String,
}

impl CandidateGroup {
    pub fn new<I, S>(items: I, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            reason: reason.into(),
        }
    }

    pub fn group(&self) -> Group {
        Group::new(self.items.iter().cloned())
    }
}

/// Candidate groups, highest confidence first.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct GuessResponse {
    #[schemars(length(min = 1))]
    pub groups: Vec<CandidateGroup>,
}

impl GuessResponse {
    pub fn new(groups: Vec<CandidateGroup>) -> Self {
        Self { groups }
    }
}

// ── Parsing ────────────────────────────────────────────────────────

/// Remove a surrounding Markdown code fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Parse and schema-check a raw oracle reply.
pub fn parse_guess_response(raw: &str) -> Result<GuessResponse, String> {
    let body = strip_code_fence(raw);
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| format!("{MALFORMED}: invalid JSON: {e}"))?;

    let schema = json_schema_for::<GuessResponse>();
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| format!("{MALFORMED}: response schema is invalid: {e}"))?;
    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();
    if !errors.is_empty() {
        return Err(format!(
            "{MALFORMED}: schema validation failed:\n{}",
            errors.join("\n")
        ));
    }

    serde_json::from_value(value).map_err(|e| format!("{MALFORMED}: {e}"))
}

// ── Oracle trait ───────────────────────────────────────────────────

/// Everything that determines one oracle answer.
///
/// `items` and `rejected` are carried alongside the rendered prompt so that
/// implementations (and the cache key) can see the structured inputs.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub model: String,
    pub prompt: String,
    pub items: Vec<String>,
    pub rejected: Vec<Vec<String>>,
}

/// Boxed future returned by [`Oracle::guess`].
pub type GuessFuture<'a> = Pin<Box<dyn Future<Output = Result<GuessResponse, String>> + Send + 'a>>;

/// Produces candidate groups for a prompt.
///
/// Uses a boxed future so that the trait is dyn-compatible.
pub trait Oracle: Send + Sync {
    fn guess<'a>(&'a self, request: &'a OracleRequest) -> GuessFuture<'a>;
}

// ── LlmOracle ──────────────────────────────────────────────────────

/// Oracle backed by an OpenRouter chat model.
pub struct LlmOracle<'c> {
    client: &'c OpenRouterClient,
    config: SolverConfig,
}

impl<'c> LlmOracle<'c> {
    pub fn new(client: &'c OpenRouterClient, config: &SolverConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }
}

impl Oracle for LlmOracle<'_> {
    fn guess<'a>(&'a self, request: &'a OracleRequest) -> GuessFuture<'a> {
        Box::pin(async move {
            let body = ChatRequest::user(
                &request.model,
                &request.prompt,
                self.config.max_tokens,
                self.config.temperature,
            );
            let content = retry_api_call(&self.config.retry, || self.client.chat(&body))
                .await?
                .ok_or_else(|| format!("{MALFORMED}: empty reply"))?;
            debug!("reply:\n{content}");

            parse_guess_response(&content)
        })
    }
}
