//! Tag suggestion through an external completion provider.
//!
//! The service validates input, builds one prompt and hands it to a
//! [`SuggestionProvider`]. It keeps no state between calls: no cache, no retry.
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    NotesError, Result, SuggestionConfig, SuggestionError, TagSuggestionRequest,
    TagSuggestionResponse,
};

/// Generates the instruction sent to the provider for `note_content`.
pub fn build_prompt(note_content: &str) -> String {
    format!(
        "You are a tagging expert. Given the content of a note, suggest relevant tags. \
         Only output the tags, comma separated.\n\nNote Content: {}",
        note_content
    )
}

/// An external generative-text service able to answer a prompt with
/// `{ "tags": [string] }`.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
    ) -> std::result::Result<TagSuggestionResponse, SuggestionError>;
}

/// Stateless request/response wrapper around a provider.
pub struct TagSuggestionService<P> {
    provider: P,
}

impl<P: SuggestionProvider> TagSuggestionService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Asks the provider for tags describing `request.note_content`.
    ///
    /// Empty content is rejected before any outbound call. The provider's tags
    /// are returned as-is, order and duplicates included.
    pub async fn suggest(&self, request: &TagSuggestionRequest) -> Result<TagSuggestionResponse> {
        if request.note_content.trim().is_empty() {
            return Err(NotesError::validation(
                "Please enter some content to suggest tags",
            ));
        }

        debug!(
            "Requesting tag suggestions for {} characters of content",
            request.note_content.len()
        );
        let prompt = build_prompt(&request.note_content);

        match self.provider.complete(&prompt).await {
            Ok(response) => {
                info!("Provider suggested {} tags", response.tags.len());
                Ok(response)
            }
            Err(e) => {
                error!("Tag suggestion failed: {}", e);
                Err(NotesError::SuggestionFailed(e))
            }
        }
    }
}

// ── OpenAI-compatible chat completions ──────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// JSON schema the provider is asked to conform to
fn tags_response_format() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "suggest_tags",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "tags": {
                        "type": "array",
                        "description": "An array of suggested tags for the note.",
                        "items": { "type": "string" }
                    }
                },
                "required": ["tags"],
                "additionalProperties": false
            }
        }
    })
}

/// Extracts `{ "tags": [...] }` from the first choice's message content.
pub(crate) fn parse_completion(
    response: CompletionResponse,
) -> std::result::Result<TagSuggestionResponse, SuggestionError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| SuggestionError::MalformedResponse {
            message: "response contained no message content".to_string(),
        })?;

    serde_json::from_str::<TagSuggestionResponse>(content.trim()).map_err(|e| {
        warn!("Provider content did not match the tags schema: {}", e);
        SuggestionError::MalformedResponse {
            message: format!("content is not {{\"tags\": [string]}}: {}", e),
        }
    })
}

/// Typed HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpSuggestionProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpSuggestionProvider {
    pub fn new(config: &SuggestionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotesError::ConfigError {
                message: format!("HTTP client error: {}", e),
            })?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SuggestionProvider for HttpSuggestionProvider {
    async fn complete(
        &self,
        prompt: &str,
    ) -> std::result::Result<TagSuggestionResponse, SuggestionError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: tags_response_format(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("POST {} (model {})", self.endpoint, self.model);
        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SuggestionError::Provider { status, body });
        }

        let completion: CompletionResponse =
            resp.json()
                .await
                .map_err(|e| SuggestionError::MalformedResponse {
                    message: format!("Parse completion response: {}", e),
                })?;

        parse_completion(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    };

    /// Replays a canned answer and records prompts
    struct ScriptedProvider {
        answer: fn() -> std::result::Result<TagSuggestionResponse, SuggestionError>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedProvider {
        fn new(answer: fn() -> std::result::Result<TagSuggestionResponse, SuggestionError>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl SuggestionProvider for ScriptedProvider {
        async fn complete(
            &self,
            prompt: &str,
        ) -> std::result::Result<TagSuggestionResponse, SuggestionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            (self.answer)()
        }
    }

    fn unordered_tags() -> std::result::Result<TagSuggestionResponse, SuggestionError> {
        Ok(TagSuggestionResponse {
            tags: vec!["shopping".into(), "food".into(), "shopping".into()],
        })
    }

    fn provider_down() -> std::result::Result<TagSuggestionResponse, SuggestionError> {
        Err(SuggestionError::Provider {
            status: 503,
            body: "overloaded".into(),
        })
    }

    #[tokio::test]
    async fn empty_content_never_reaches_provider() {
        let service = TagSuggestionService::new(ScriptedProvider::new(unordered_tags));

        for content in ["", "   \n"] {
            let result = service.suggest(&TagSuggestionRequest::new(content)).await;
            assert!(matches!(result, Err(NotesError::ValidationError { .. })));
        }
        assert_eq!(service.provider().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tags_pass_through_unchanged() {
        let service = TagSuggestionService::new(ScriptedProvider::new(unordered_tags));

        let response = service
            .suggest(&TagSuggestionRequest::new("buy milk and eggs"))
            .await
            .unwrap();

        assert_eq!(response.tags, vec!["shopping", "food", "shopping"]);
        let prompt = service.provider().last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.ends_with("Note Content: buy milk and eggs"));
    }

    #[tokio::test]
    async fn every_call_goes_to_provider() {
        let service = TagSuggestionService::new(ScriptedProvider::new(unordered_tags));
        let request = TagSuggestionRequest::new("same content");

        service.suggest(&request).await.unwrap();
        service.suggest(&request).await.unwrap();

        assert_eq!(service.provider().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn provider_error_becomes_suggestion_failed() {
        let service = TagSuggestionService::new(ScriptedProvider::new(provider_down));

        let result = service.suggest(&TagSuggestionRequest::new("notes")).await;
        match result {
            Err(NotesError::SuggestionFailed(SuggestionError::Provider { status, .. })) => {
                assert_eq!(status, 503)
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(service.provider().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parse_completion_reads_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"tags\":[\"b\",\"a\"]}"}}]}"#;
        let completion: CompletionResponse = serde_json::from_str(raw).unwrap();

        let parsed = parse_completion(completion).unwrap();
        assert_eq!(parsed.tags, vec!["b", "a"]);
    }

    #[test]
    fn parse_completion_rejects_plain_text() {
        let raw = r#"{"choices":[{"message":{"content":"shopping, food"}}]}"#;
        let completion: CompletionResponse = serde_json::from_str(raw).unwrap();

        assert!(matches!(
            parse_completion(completion),
            Err(SuggestionError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn parse_completion_rejects_missing_choices() {
        let completion: CompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            parse_completion(completion),
            Err(SuggestionError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn request_body_carries_schema() {
        let body = CompletionRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "p",
            }],
            response_format: tags_response_format(),
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][0]["content"], "p");
        assert_eq!(
            value["response_format"]["json_schema"]["schema"]["required"][0],
            "tags"
        );
    }

    // ── HttpSuggestionProvider against a local socket ──

    /// Reads one HTTP request (headers plus `Content-Length` body) as text
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answers a single request with `status` and `body`; yields the request text
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{}/v1/chat/completions", addr), handle)
    }

    fn http_service(endpoint: String) -> TagSuggestionService<HttpSuggestionProvider> {
        let config = SuggestionConfig {
            endpoint,
            model: "test-model".to_string(),
            api_key_env: "TAGNOTES_TEST_KEY_NEVER_SET".to_string(),
            timeout_secs: 5,
        };
        TagSuggestionService::new(HttpSuggestionProvider::new(&config).unwrap())
    }

    #[tokio::test]
    async fn http_valid_completion_returns_tags() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"tags\":[\"shopping\",\"food\"]}"}}]}"#,
        )
        .await;
        let service = http_service(endpoint.clone());
        assert_eq!(service.provider().endpoint(), endpoint);

        let response = service
            .suggest(&TagSuggestionRequest::new("buy milk and eggs"))
            .await
            .unwrap();
        assert_eq!(response.tags, vec!["shopping", "food"]);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.contains("\"model\":\"test-model\""));
        assert!(request.contains("suggest_tags"));
        assert!(request.contains("buy milk and eggs"));
    }

    #[tokio::test]
    async fn http_error_status_is_provider_failure() {
        let (endpoint, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;

        let result = http_service(endpoint)
            .suggest(&TagSuggestionRequest::new("notes"))
            .await;
        match result {
            Err(NotesError::SuggestionFailed(SuggestionError::Provider { status, body })) => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn http_garbage_body_is_malformed() {
        let (endpoint, server) = serve_once("200 OK", "<html>not json</html>").await;

        let result = http_service(endpoint)
            .suggest(&TagSuggestionRequest::new("notes"))
            .await;
        assert!(matches!(
            result,
            Err(NotesError::SuggestionFailed(SuggestionError::MalformedResponse { .. }))
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn http_closed_port_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = http_service(format!("http://{}/v1/chat/completions", addr))
            .suggest(&TagSuggestionRequest::new("notes"))
            .await;
        assert!(matches!(
            result,
            Err(NotesError::SuggestionFailed(SuggestionError::Transport(_)))
        ));
    }
}
