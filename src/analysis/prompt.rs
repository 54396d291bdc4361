use crate::analysis::clause::{BAD_CLAUSES_KEY, GOOD_CLAUSES_KEY};

const SYSTEM_MESSAGE: &str = "You are a legal expert who analyzes contract clauses.";

/// Role-tagged messages sent to the chat-completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrompt {
    pub system: String,
    pub user: String,
}

impl ModelPrompt {
    /// The legal text is interpolated as is, without escaping.
    pub fn for_legal_text(legal_text: &str) -> Self {
        let user = format!(
            r#"Analyze the following legal text and categorize each clause as either "good" or "bad" for a typical contract participant.
Good clauses are those that are fair, balanced, and protect both parties' interests.
Bad clauses are those that are one-sided, potentially exploitative, or have hidden implications.

Format your response as JSON with exactly two keys:
1. "{GOOD_CLAUSES_KEY}": A list of strings, where each string is a good clause
2. "{BAD_CLAUSES_KEY}": A list of strings, where each string is a bad clause

Respond only with the JSON object, no additional text or explanation.

Legal text to analyze:
{legal_text}
"#
        );

        ModelPrompt {
            system: SYSTEM_MESSAGE.to_string(),
            user,
        }
    }
}
