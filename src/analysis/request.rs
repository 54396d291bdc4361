use serde_json::Value;
use thiserror::Error;

pub const LEGAL_TEXT_KEY: &str = "legal_text";

#[derive(Error, Debug, PartialEq)]
pub enum RequestError {
    #[error("Missing 'legal_text' in request body")]
    MissingText,
    #[error("Invalid or empty legal text provided")]
    InvalidText,
}

#[derive(Debug)]
pub struct AnalysisRequest {
    pub legal_text: String,
}

impl AnalysisRequest {
    /// Validates a raw request body.
    ///
    /// The text is kept as sent; surrounding whitespace only matters for the
    /// blank check.
    pub fn from_body(body: &[u8]) -> Result<Self, RequestError> {
        let data: Value = serde_json::from_slice(body).map_err(|_| RequestError::MissingText)?;
        let legal_text = match data.as_object().and_then(|map| map.get(LEGAL_TEXT_KEY)) {
            Some(value) => value,
            None => return Err(RequestError::MissingText),
        };

        match legal_text.as_str() {
            Some(text) if !text.trim().is_empty() => Ok(AnalysisRequest {
                legal_text: text.to_string(),
            }),
            _ => Err(RequestError::InvalidText),
        }
    }
}
