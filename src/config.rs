use std::time::Duration;

use anyhow::{Context, Result};
use clap_serde_derive::ClapSerde;
use url::Url;

use crate::analysis::pipeline::ProviderSettings;

#[derive(ClapSerde, Debug)]
pub struct Config {
    /// The address the listener binds to
    #[default("0.0.0.0".to_string())]
    #[arg(short, long, env)]
    pub(crate) address: String,

    /// The port the listener binds to
    #[default(5000)]
    #[arg(short, long, env)]
    pub(crate) port: u16,

    /// API key for the chat-completion provider
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub(crate) api_key: String,

    /// Chat-completion endpoint of the provider
    #[default("https://openrouter.ai/api/v1/chat/completions".to_string())]
    #[arg(long, env)]
    pub(crate) api_url: String,

    /// Model identifier sent with every completion request
    #[default("google/gemini-2.5-pro-exp-03-25:free".to_string())]
    #[arg(short, long, env)]
    pub(crate) model: String,

    /// Sampling temperature, kept low for stable categorization
    #[default(0.3)]
    #[arg(long, env)]
    pub(crate) temperature: f32,

    /// Upper bound in seconds for a single provider call
    #[default(60)]
    #[arg(long, env)]
    pub(crate) request_timeout: u64,

    /// OTLP collector endpoint, telemetry export is disabled when empty
    #[arg(long, env)]
    pub(crate) otlp_endpoint: String,

    /// Also log to the console when exporting to an OTLP collector
    #[arg(long, env)]
    pub(crate) console: bool,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        Self::from_toml_str(&str)
    }

    pub fn from_toml_str(str: &str) -> Result<Self> {
        let opt: <Config as ClapSerde>::Opt = toml::from_str(str)?;
        Ok(Config::from(opt))
    }

    pub fn api_url(&self) -> Result<Url> {
        Url::parse(&self.api_url).with_context(|| format!("Invalid api_url {}", self.api_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        let api_key = match self.api_key.trim() {
            "" => None,
            key => Some(key.to_string()),
        };
        ProviderSettings {
            api_key,
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_hosted_provider() {
        let config = Config::default();
        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(
            config.api_url().unwrap().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert!(config.otlp_endpoint.is_empty());
    }

    #[test]
    fn toml_overrides_only_the_given_keys() {
        let config = Config::from_toml_str(
            r#"
            port = 8080
            model = "mistralai/mistral-7b-instruct"
            api_key = "sk-test"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.address, "0.0.0.0");

        let settings = config.provider_settings();
        assert_eq!(settings.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.model, "mistralai/mistral-7b-instruct");
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = Config::from_toml_str(r#"api_key = "   ""#).unwrap();
        assert!(config.provider_settings().api_key.is_none());
        assert!(Config::default().provider_settings().api_key.is_none());
    }

    #[test]
    fn malformed_api_url_is_rejected() {
        let config = Config::from_toml_str(r#"api_url = "not a url""#).unwrap();
        assert!(config.api_url().is_err());
    }
}
