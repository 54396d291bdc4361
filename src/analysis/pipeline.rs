use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::analysis::clause::ClauseSet;
use crate::analysis::extract::{extract, ExtractError};
use crate::analysis::prompt::ModelPrompt;
use crate::analysis::provider::{ChatCompletionRequest, CompletionClient, ProviderError};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("OpenRouter API key not configured")]
    MissingCredential,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error("Failed to parse AI response")]
    NotAMapping,
}

/// What the pipeline needs to know about the provider account.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

pub struct AnalysisPipeline {
    client: Arc<dyn CompletionClient>,
    settings: ProviderSettings,
}

impl AnalysisPipeline {
    pub fn new(client: Arc<dyn CompletionClient>, settings: ProviderSettings) -> Self {
        AnalysisPipeline { client, settings }
    }

    /// Categorizes the clauses of `legal_text`.
    ///
    /// Never fails: every degraded stage yields empty clause lists plus an
    /// `error` describing what went wrong.
    pub async fn analyze(&self, legal_text: &str) -> ClauseSet {
        match self.try_analyze(legal_text).await {
            Ok(clauses) => clauses,
            Err(err) => {
                error!("Analysis degraded: {}", err);
                ClauseSet::degraded(err.to_string())
            }
        }
    }

    async fn try_analyze(&self, legal_text: &str) -> Result<ClauseSet, AnalysisError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(AnalysisError::MissingCredential)?;

        let request = ChatCompletionRequest::new(
            &self.settings.model,
            ModelPrompt::for_legal_text(legal_text),
            self.settings.temperature,
        );
        let reply = self.client.complete(api_key, &request).await?;

        let mapping = match extract(&reply)? {
            serde_json::Value::Object(map) => map,
            _ => return Err(AnalysisError::NotAMapping),
        };
        let (clauses, missing) = ClauseSet::from_mapping(&mapping);
        if !missing.is_empty() {
            warn!(missing = ?missing, "Model response missing expected keys");
        }
        info!(
            good = clauses.good_clauses.len(),
            bad = clauses.bad_clauses.len(),
            "Categorized clauses"
        );
        Ok(clauses)
    }
}
