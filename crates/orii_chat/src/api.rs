//! HTTP client for the Orii backend.
//!
//! The pipeline only needs [`CompletionClient`]; [`ApiClient`] implements it
//! against `POST /api/demo` and also wraps the informational endpoints.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult, PipelineError, PipelineResult};
use crate::types::{CompletionOutput, CompletionRequest};

/// Anything that can turn a prompt into generated text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<CompletionOutput>;
}

/// `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    pub model: String,
    pub version: String,
}

/// `GET /api/model-info`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub company: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
}

/// Body of `POST /api/contact`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> ChatResult<()> {
        if self.name.trim().is_empty() {
            return Err(ChatError::InvalidContactForm("name is required".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(ChatError::InvalidContactForm("message is required".to_string()));
        }
        match self.email.trim().split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(ChatError::InvalidContactForm(format!(
                "'{}' is not a valid email address",
                self.email
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactReceipt {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct DemoResponse {
    response: Option<String>,
    model: Option<String>,
    tokens_used: Option<u64>,
}

/// reqwest-backed client for the backend's `/api` routes.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ChatConfig,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub async fn health(&self) -> ChatResult<HealthStatus> {
        self.get_json("/api/health").await
    }

    pub async fn model_info(&self) -> ChatResult<ModelInfo> {
        self.get_json("/api/model-info").await
    }

    pub async fn submit_contact(&self, form: &ContactForm) -> ChatResult<ContactReceipt> {
        form.validate()?;

        let url = self.config.endpoint("/api/contact");
        debug!("POST {}", url);
        let response = self
            .with_timeout(self.client.post(&url).json(form))
            .send()
            .await
            .map_err(PipelineError::from)?;
        let (status, body) = read_body(response).await?;
        Ok(decode(status, &body)?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ChatResult<T> {
        let url = self.config.endpoint(path);
        debug!("GET {}", url);
        let response = self
            .with_timeout(self.client.get(&url))
            .send()
            .await
            .map_err(PipelineError::from)?;
        let (status, body) = read_body(response).await?;
        Ok(decode(status, &body)?)
    }

    fn with_timeout(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.request_timeout() {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

#[async_trait]
impl CompletionClient for ApiClient {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<CompletionOutput> {
        let url = self.config.endpoint("/api/demo");
        debug!(
            "POST {} (prompt {} chars, max_tokens {})",
            url,
            request.prompt.len(),
            request.max_tokens
        );

        let response = self.client.post(&url).json(request).send().await?;
        let (status, body) = read_body(response).await?;
        parse_completion(status, &body)
    }
}

async fn read_body(response: reqwest::Response) -> PipelineResult<(StatusCode, String)> {
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

fn ensure_success(status: StatusCode, body: &str) -> PipelineResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let snippet: String = body.chars().take(200).collect();
    Err(PipelineError::Transport(format!("HTTP {}: {}", status, snippet)))
}

fn decode<T: serde::de::DeserializeOwned>(status: StatusCode, body: &str) -> PipelineResult<T> {
    ensure_success(status, body)?;
    serde_json::from_str(body).map_err(|e| PipelineError::MalformedResponse(e.to_string()))
}

/// Classify a `/api/demo` reply.
///
/// Non-2xx is a transport failure; a 2xx body without a string `response`
/// field is malformed. An empty `response` is passed through as-is.
pub(crate) fn parse_completion(status: StatusCode, body: &str) -> PipelineResult<CompletionOutput> {
    let reply: DemoResponse = decode(status, body)?;
    let text = reply.response.ok_or_else(|| {
        PipelineError::MalformedResponse("missing 'response' field".to_string())
    })?;

    Ok(CompletionOutput {
        text,
        model: reply.model,
        tokens_used: reply.tokens_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer exactly one HTTP request with a canned reply; yields the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let reply = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    fn client_for(url: &str) -> ApiClient {
        ApiClient::new(ChatConfig {
            backend_url: url.to_string(),
            ..ChatConfig::default()
        })
    }

    #[test]
    fn test_parse_completion_success() {
        let output = parse_completion(
            StatusCode::OK,
            r#"{"model":"Orii-O1","response":"Hi there","tokens_used":50}"#,
        )
        .unwrap();

        assert_eq!(output.text, "Hi there");
        assert_eq!(output.model.as_deref(), Some("Orii-O1"));
        assert_eq!(output.tokens_used, Some(50));
    }

    #[test]
    fn test_parse_completion_missing_field_is_malformed() {
        let err = parse_completion(StatusCode::OK, r#"{"detail":"nope"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));

        let err = parse_completion(StatusCode::OK, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));

        let err = parse_completion(StatusCode::OK, r#"{"response": 42}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_completion_non_success_is_transport() {
        let err = parse_completion(StatusCode::INTERNAL_SERVER_ERROR, r#"{"response":"x"}"#).unwrap_err();

        assert!(matches!(err, PipelineError::Transport(msg) if msg.contains("500")));
    }

    #[test]
    fn test_parse_completion_keeps_empty_text() {
        let output = parse_completion(StatusCode::OK, r#"{"response":""}"#).unwrap();
        assert!(output.text.is_empty());
    }

    #[test]
    fn test_contact_form_validation() {
        let mut form = ContactForm {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            company: None,
            message: "Tell me more".to_string(),
        };
        assert!(form.validate().is_ok());

        form.email = "ada-at-example".to_string();
        assert!(matches!(form.validate(), Err(ChatError::InvalidContactForm(_))));

        form.email = "ada@example.com".to_string();
        form.message = "  ".to_string();
        assert!(matches!(form.validate(), Err(ChatError::InvalidContactForm(_))));
    }

    #[tokio::test]
    async fn test_complete_posts_prompt_and_budget() {
        let (url, server) = serve_once("200 OK", r#"{"response":"Hello from Orii"}"#).await;
        let client = client_for(&url);

        let output = client
            .complete(&CompletionRequest {
                prompt: "Hi".to_string(),
                max_tokens: 150,
            })
            .await
            .unwrap();

        assert_eq!(output.text, "Hello from Orii");
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/demo"));
        assert!(request.contains(r#""prompt":"Hi""#));
        assert!(request.contains(r#""max_tokens":150"#));
    }

    #[tokio::test]
    async fn test_complete_unreachable_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client_for(&url)
            .complete(&CompletionRequest {
                prompt: "Hi".to_string(),
                max_tokens: 150,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Transport(_)));
    }

    #[tokio::test]
    async fn test_health() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"status":"healthy","model":"Orii-O1","version":"1.0.0"}"#,
        )
        .await;

        let health = client_for(&url).health().await.unwrap();

        assert_eq!(health.status, "healthy");
        assert!(server.await.unwrap().starts_with("GET /api/health"));
    }

    #[tokio::test]
    async fn test_model_info() {
        let (url, _server) = serve_once(
            "200 OK",
            r#"{"name":"Orii-O1","company":"Orii-Gen","version":"1.0.0",
               "capabilities":["Code Generation and Review"],
               "specifications":{"parameters":"Advanced Architecture"}}"#,
        )
        .await;

        let info = client_for(&url).model_info().await.unwrap();

        assert_eq!(info.company, "Orii-Gen");
        assert_eq!(info.capabilities.len(), 1);
        assert_eq!(info.specifications["parameters"], "Advanced Architecture");
    }

    #[tokio::test]
    async fn test_invalid_contact_form_is_not_sent() {
        let client = client_for("http://127.0.0.1:9");
        let form = ContactForm {
            name: String::new(),
            email: "ada@example.com".to_string(),
            company: None,
            message: "hi".to_string(),
        };

        let err = client.submit_contact(&form).await.unwrap_err();

        assert!(matches!(err, ChatError::InvalidContactForm(_)));
    }
}
