//! Completion client for OpenAI-compatible chat APIs

use super::{build_messages, models::*, Completion, CompletionProvider};
use crate::config::CompletionConfig;
use crate::error::CompletionError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Client for the hosted chat-completion endpoint. One attempt per call, no retries.
pub struct CompletionClient {
    config: CompletionConfig,
    http_client: Client,
}

impl CompletionClient {
    /// Create a new completion client
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(CompletionError::Network)?;

        if !config.has_api_key() {
            warn!("No completion API key configured; remote completions will fail");
        }

        info!(
            "Initialized completion client for {} (timeout={}s, max_output_tokens={})",
            config.api_url, config.timeout_secs, config.max_output_tokens
        );

        Ok(Self { config, http_client })
    }

    /// Make a single API request
    async fn try_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CompletionError> {
        debug!("Making chat completion request for model {}", request.model);

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| self.classify_transport_error(e))?;
            return serde_json::from_str(&body)
                .map_err(|e| CompletionError::MalformedResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let api_error = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                if api_error.as_ref().is_some_and(|e| e.is("insufficient_quota")) {
                    warn!("Provider quota exhausted");
                    Err(CompletionError::QuotaExceeded)
                } else {
                    warn!("Provider rate limit exceeded");
                    Err(CompletionError::RateLimited)
                }
            }
            _ => {
                let detail = api_error.map(|e| e.message).unwrap_or(body);
                error!("Completion request failed with status {}: {}", status, detail);
                Err(CompletionError::Provider(format!("Status {}: {}", status, detail)))
            }
        }
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            warn!("Completion request timed out after {}s", self.config.timeout_secs);
            CompletionError::Timeout(self.config.timeout_secs)
        } else {
            error!("Completion transport error: {}", err);
            CompletionError::Network(err)
        }
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<Completion, CompletionError> {
        if !self.config.has_api_key() {
            return Err(CompletionError::MissingCredentials);
        }

        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: build_messages(prompt),
            max_tokens: self.config.max_output_tokens,
        };

        let started = Instant::now();
        let response = self.try_request(&request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::MalformedResponse("no message content".to_string()))?
            .trim()
            .to_string();

        let usage_tokens = match response.usage {
            Some(usage) => usage.total_tokens,
            None => {
                warn!("Completion response carried no usage block");
                0
            }
        };

        debug!(
            "Completion finished in {}ms using {} tokens",
            started.elapsed().as_millis(),
            usage_tokens
        );

        Ok(Completion { text, usage_tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use secrecy::Secret;
    use serde_json::json;
    use std::io::Write;

    fn test_config(api_url: String) -> CompletionConfig {
        CompletionConfig {
            api_url,
            api_key: Secret::new("sk-test".to_string()),
            timeout_secs: 5,
            ..CompletionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "max_tokens": 50,
                "messages": [
                    {"role": "system"},
                    {"role": "user", "content": "capital of France? in <20 words."}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{"message": {"role": "assistant", "content": "  Paris.  "}}],
                    "usage": {"prompt_tokens": 70, "completion_tokens": 2, "total_tokens": 72}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = CompletionClient::new(test_config(format!("{}/v1/chat/completions", server.url()))).unwrap();
        let completion = client.complete("gpt-4o", "capital of France?").await.unwrap();

        assert_eq!(completion, Completion { text: "Paris.".to_string(), usage_tokens: 72 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_quota_and_rate_limit_are_distinguished() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/v1/chat/completions", server.url());
        let client = CompletionClient::new(test_config(url)).unwrap();

        let quota = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(json!({"error": {"message": "quota", "type": "insufficient_quota", "code": "insufficient_quota"}}).to_string())
            .create_async()
            .await;
        let err = client.complete("gpt-3.5-turbo", "hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::QuotaExceeded));
        quota.remove_async().await;

        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(json!({"error": {"message": "slow down", "code": "rate_limit_exceeded"}}).to_string())
            .create_async()
            .await;
        let err = client.complete("gpt-3.5-turbo", "hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::RateLimited));
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body(json!({"error": {"message": "upstream exploded"}}).to_string())
            .create_async()
            .await;

        let client = CompletionClient::new(test_config(format!("{}/v1/chat/completions", server.url()))).unwrap();
        match client.complete("gpt-3.5-turbo", "hi").await {
            Err(CompletionError::Provider(detail)) => assert!(detail.contains("upstream exploded")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_chunked_body(|writer| {
                std::thread::sleep(Duration::from_secs(3));
                writer.write_all(br#"{"choices": []}"#)
            })
            .create_async()
            .await;

        let mut config = test_config(format!("{}/v1/chat/completions", server.url()));
        config.timeout_secs = 1;
        let client = CompletionClient::new(config).unwrap();

        let err = client.complete("gpt-3.5-turbo", "hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::Timeout(1)));
        assert_eq!(
            crate::error::SustainError::from(err).status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": []}).to_string())
            .create_async()
            .await;

        let client = CompletionClient::new(test_config(format!("{}/v1/chat/completions", server.url()))).unwrap();
        let err = client.complete("gpt-3.5-turbo", "hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_never_calls_provider() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let mut config = test_config(format!("{}/v1/chat/completions", server.url()));
        config.api_key = Secret::new(String::new());
        let client = CompletionClient::new(config).unwrap();

        let err = client.complete("gpt-3.5-turbo", "hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingCredentials));
        mock.assert_async().await;
    }
}
