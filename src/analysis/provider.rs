use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::analysis::prompt::ModelPrompt;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API request failed: {status}")]
    Status { status: u16 },
    #[error("Failed to parse provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Analysis error: provider reply contained no message content")]
    EmptyReply,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl ChatCompletionRequest {
    pub fn new(model: &str, prompt: ModelPrompt, temperature: f32) -> Self {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: prompt.system,
                },
                ChatMessage {
                    role: "user".into(),
                    content: prompt.user,
                },
            ],
            temperature,
        }
    }
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    content: Option<String>,
}

/// A chat-completion service that answers with free text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the request and returns the content of the first choice.
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, ProviderError>;
}

/// OpenAI-compatible chat-completion endpoint, OpenRouter by default.
pub struct OpenRouterClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl OpenRouterClient {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for the completion provider")?;
        Ok(OpenRouterClient { http, endpoint })
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, ProviderError> {
        debug!(endpoint = %self.endpoint, model = %request.model, "sending completion request");
        let resp = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status != reqwest::StatusCode::OK {
            error!(status = status.as_u16(), body = %body, "API request failed");
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ProviderError::EmptyReply)
    }
}


#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use super::*;

    async fn fake_provider(status: StatusCode, body: Value) -> Url {
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(move |headers: HeaderMap, Json(req): Json<Value>| {
                let body = body.clone();
                async move {
                    let authorized = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer sk-test");
                    if !authorized {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
                    }
                    assert_eq!(req["messages"][0]["role"], "system");
                    assert_eq!(req["messages"][1]["role"], "user");
                    (status, Json(body))
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        Url::parse(&format!("http://{addr}/api/v1/chat/completions")).unwrap()
    }

    fn client(endpoint: Url) -> OpenRouterClient {
        OpenRouterClient::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest::new("test/model", ModelPrompt::for_legal_text("clause"), 0.3)
    }

    #[test]
    fn request_serializes_to_the_chat_completion_shape() {
        let body = serde_json::to_value(request()).unwrap();
        assert_eq!(body["model"], "test/model");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let endpoint = fake_provider(
            StatusCode::OK,
            json!({"choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ]}),
        )
        .await;

        let content = client(endpoint).complete("sk-test", &request()).await.unwrap();
        assert_eq!(content, "first");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let endpoint = fake_provider(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({"error": "overloaded"}),
        )
        .await;

        let err = client(endpoint).complete("sk-test", &request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 503 }));
        assert_eq!(err.to_string(), "API request failed: 503");
    }

    #[tokio::test]
    async fn wrong_key_surfaces_as_status() {
        let endpoint = fake_provider(StatusCode::OK, json!({"choices": []})).await;

        let err = client(endpoint).complete("sk-other", &request()).await.unwrap_err();
        assert_eq!(err.to_string(), "API request failed: 401");
    }

    #[tokio::test]
    async fn empty_choices_are_an_empty_reply() {
        let endpoint = fake_provider(StatusCode::OK, json!({"choices": []})).await;

        let err = client(endpoint).complete("sk-test", &request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyReply));
    }

    #[tokio::test]
    async fn unexpected_body_is_a_decode_error() {
        let endpoint = fake_provider(StatusCode::OK, json!({"result": "ok"})).await;

        let err = client(endpoint).complete("sk-test", &request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Url::parse(&format!("http://{addr}/v1/chat/completions")).unwrap();
        let err = client(endpoint).complete("sk-test", &request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert!(err.to_string().starts_with("Request error: "));
    }

    #[tokio::test]
    async fn slow_provider_times_out_as_a_transport_error() {
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"choices": [{"message": {"content": "late"}}]}))
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let endpoint = Url::parse(&format!("http://{addr}/api/v1/chat/completions")).unwrap();
        let client = OpenRouterClient::new(endpoint, Duration::from_millis(100)).unwrap();
        let err = client.complete("sk-test", &request()).await.unwrap_err();
        match &err {
            ProviderError::Transport(source) => assert!(source.is_timeout(), "{source}"),
            other => panic!("expected a transport error, got {other:?}"),
        }
        assert!(err.to_string().starts_with("Request error: "));
    }
}
