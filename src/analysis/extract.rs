use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::analysis::literal::{parse_literal, LiteralError};

pub const EXTRACTION_FAILED: &str = "Could not extract valid JSON from the model response.";

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```[A-Za-z0-9_+-]*").unwrap();
    // Greedy on purpose: first `{` to last `}`, not a balanced match
    static ref BRACE_SPAN: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
}

/// Neither the strict nor the permissive pass found a value in the reply.
#[derive(Error, Debug, PartialEq)]
#[error("Could not extract valid JSON from the model response.")]
pub struct ExtractError(#[source] pub LiteralError);

/// Recovers the JSON value a model reply is supposed to contain.
///
/// Tries, in order: strict JSON on the brace span of the fence-stripped text,
/// then the permissive literal parser on the whole fence-stripped text.
pub fn extract(raw: &str) -> Result<Value, ExtractError> {
    let text = CODE_FENCE.replace_all(raw, "");
    let text = text.trim();

    if let Some(span) = BRACE_SPAN.find(text) {
        let cleaned = span.as_str().replace(['\n', '\r'], " ");
        match serde_json::from_str::<Value>(&cleaned) {
            Ok(value) => return Ok(value),
            Err(err) => debug!("Brace span is not strict JSON: {}", err),
        }
    }

    parse_literal(text).map_err(|err| {
        error!("JSON parsing error: {}", err);
        ExtractError(err)
    })
}
