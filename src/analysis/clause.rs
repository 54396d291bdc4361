use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const GOOD_CLAUSES_KEY: &str = "good_clauses";
pub const BAD_CLAUSES_KEY: &str = "bad_clauses";

/// Fair ("good") and unfair ("bad") clauses found in a legal text.
///
/// Both lists are always present. A set `error` means some stage degraded and
/// the lists must not be read as a successful analysis.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ClauseSet {
    pub good_clauses: Vec<String>,
    pub bad_clauses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClauseSet {
    pub fn degraded(message: impl Into<String>) -> Self {
        ClauseSet {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Normalizes a mapping recovered from a model reply.
    ///
    /// Returns the clause set along with the expected keys that were absent.
    /// Keys other than the two clause lists are ignored.
    pub fn from_mapping(mapping: &Map<String, Value>) -> (Self, Vec<&'static str>) {
        let mut missing = Vec::new();
        let mut clauses = |key: &'static str| -> Vec<String> {
            match mapping.get(key) {
                Some(Value::Array(items)) => items.iter().map(clause_text).collect(),
                _ => {
                    missing.push(key);
                    Vec::new()
                }
            }
        };
        let good_clauses = clauses(GOOD_CLAUSES_KEY);
        let bad_clauses = clauses(BAD_CLAUSES_KEY);

        (
            ClauseSet {
                good_clauses,
                bad_clauses,
                error: None,
            },
            missing,
        )
    }
}

fn clause_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
