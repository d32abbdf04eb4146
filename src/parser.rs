//! # Batch Payload Parser
//!
//! Extracts prompt strings from a raw batch payload. Payloads are expected to
//! be JSON of the shape `{"prompts": ["...", ...]}`, but the parser tolerates
//! anything: malformed JSON, a missing `prompts` field, or a non-array value
//! all yield an empty result with a logged warning, never an error that
//! aborts the run.

use serde::Deserialize;
use tracing::warn;

/// Minimum trimmed prompt length accepted into the selectable pool
pub const DEFAULT_MIN_PROMPT_CHARS: usize = 5;

/// Tagged result of parsing a batch payload.
///
/// Shape problems are represented explicitly rather than by probing fields at
/// runtime: a payload either yields items or it yields nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPrompts {
    Items(Vec<String>),
    Empty,
}

impl ParsedPrompts {
    /// Unwrap into a (possibly empty) vector of prompts
    pub fn into_items(self) -> Vec<String> {
        match self {
            ParsedPrompts::Items(items) => items,
            ParsedPrompts::Empty => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParsedPrompts::Items(items) => items.is_empty(),
            ParsedPrompts::Empty => true,
        }
    }
}

/// Expected payload shape; every field is optional so shape mismatches
/// deserialize to `None` instead of failing
#[derive(Debug, Deserialize)]
struct BatchPayload {
    #[serde(default)]
    prompts: Option<serde_json::Value>,
}

/// Parses raw batch payloads into validated prompt pools
#[derive(Debug, Clone)]
pub struct PromptParser {
    min_prompt_chars: usize,
}

impl PromptParser {
    pub fn new(min_prompt_chars: usize) -> Self {
        Self { min_prompt_chars }
    }

    pub fn min_prompt_chars(&self) -> usize {
        self.min_prompt_chars
    }

    /// Parse a raw payload into the ordered sequence of valid prompts.
    ///
    /// Invalid items (non-strings, or strings whose trimmed length does not
    /// exceed the minimum) are silently excluded from the pool; only payload
    /// level problems are logged.
    pub fn parse_prompts(&self, unit_id: &str, raw_payload: &str) -> ParsedPrompts {
        let payload: BatchPayload = match serde_json::from_str(raw_payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    unit_id = %unit_id,
                    error = %e,
                    "Batch payload did not parse as JSON, contributing zero items"
                );
                return ParsedPrompts::Empty;
            }
        };

        let entries = match payload.prompts {
            Some(serde_json::Value::Array(entries)) => entries,
            Some(_) => {
                warn!(
                    unit_id = %unit_id,
                    "Batch payload 'prompts' field is not an array, contributing zero items"
                );
                return ParsedPrompts::Empty;
            }
            None => {
                warn!(
                    unit_id = %unit_id,
                    "Batch payload has no 'prompts' field, contributing zero items"
                );
                return ParsedPrompts::Empty;
            }
        };

        let items: Vec<String> = entries
            .into_iter()
            .filter_map(|entry| match entry {
                serde_json::Value::String(s) if s.trim().len() > self.min_prompt_chars => Some(s),
                _ => None,
            })
            .collect();

        ParsedPrompts::Items(items)
    }
}

impl Default for PromptParser {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PROMPT_CHARS)
    }
}
