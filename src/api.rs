use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::TranslateError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SYSTEM_PROMPT: &str = "You are a translation assistant. If the text is in English, \
translate it into Simplified Chinese; otherwise translate it into English. \
Reply with the translation only, no explanations.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// One outbound call, fully owned by the task that issues it. Snapshotting
/// the config here means a settings save mid-flight cannot tear a request.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub source_text: String,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl TranslationRequest {
    pub fn from_config(text: &str, cfg: &Config) -> Self {
        Self {
            source_text: text.to_string(),
            endpoint: normalize_base_url(&cfg.api_base_url),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        }
    }
}

fn normalize_base_url(s: &str) -> String {
    let mut t = s.trim().trim_end_matches('/').to_string();
    if t.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }
    // Allow users to paste the full endpoint and still work.
    if let Some(stripped) = t.strip_suffix("/chat/completions") {
        t = stripped.to_string();
    }
    t.trim_end_matches('/').to_string()
}

pub async fn translate_text(
    client: &reqwest::Client,
    req: &TranslationRequest,
) -> Result<String, TranslateError> {
    if req.api_key.trim().is_empty() {
        return Err(TranslateError::MissingCredential);
    }

    let user_content = format!("Translate: {}", req.source_text);
    let body = ChatRequest {
        model: &req.model,
        messages: vec![
            ChatMessage { role: "system", content: SYSTEM_PROMPT },
            ChatMessage { role: "user", content: &user_content },
        ],
    };

    let url = format!("{}/chat/completions", req.endpoint);
    let resp = client
        .post(&url)
        .bearer_auth(&req.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| TranslateError::Network(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(TranslateError::Network(format!("HTTP {}: {}", status, text)));
    }

    let parsed: ChatResponse = resp
        .json()
        .await
        .map_err(|e| TranslateError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .first()
        .map(|c| c.message.content.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TranslateError::MalformedResponse("empty completion".to_string()))
}

/// Seam the coordinator dispatches through; lets tests swap the network out.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

pub struct HttpTranslator {
    client: reqwest::Client,
    config: Arc<Mutex<Config>>,
    handle: tokio::runtime::Handle,
}

impl HttpTranslator {
    pub fn new(config: Arc<Mutex<Config>>, handle: tokio::runtime::Handle) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build client");
        Self { client, config, handle }
    }
}

impl Translator for HttpTranslator {
    // Runs on the blocking pool, never on the UI or coordinator thread.
    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let req = {
            let cfg = self.config.lock().unwrap();
            TranslationRequest::from_config(text, &cfg)
        };
        self.handle.block_on(translate_text(&self.client, &req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(endpoint: &str, key: &str) -> TranslationRequest {
        TranslationRequest {
            source_text: "hello".to_string(),
            endpoint: endpoint.to_string(),
            api_key: key.to_string(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }

    #[test]
    fn normalize_base_url_handles_empty_and_endpoint_suffix() {
        assert_eq!(normalize_base_url(""), DEFAULT_BASE_URL);
        assert_eq!(
            normalize_base_url(" https://api.openai.com/v1/ "),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            normalize_base_url("http://api.server/v1/chat/completions"),
            "http://api.server/v1"
        );
        assert_eq!(
            normalize_base_url("http://api.server/v1/chat/completions/"),
            "http://api.server/v1"
        );
    }

    #[tokio::test]
    async fn missing_key_short_circuits_before_any_network() {
        // Port 9 on localhost; nothing listens there, so reaching the
        // network at all would surface as Network, not MissingCredential.
        let client = reqwest::Client::new();
        let req = request("http://127.0.0.1:9", "");
        let err = translate_text(&client, &req).await.unwrap_err();
        assert_eq!(err, TranslateError::MissingCredential);
    }

    #[tokio::test]
    async fn successful_completion_returns_trimmed_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":" 你好 "}}]}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let req = request(&server.url(), "sk-test");
        let out = translate_text(&client, &req).await.unwrap();

        mock.assert_async().await;
        assert_eq!(out, "你好");
    }

    #[tokio::test]
    async fn http_error_status_maps_to_network() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":"invalid key"}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let req = request(&server.url(), "sk-test");
        let err = translate_text(&client, &req).await.unwrap_err();
        assert!(matches!(err, TranslateError::Network(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn undecodable_body_maps_to_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("this is not json")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let req = request(&server.url(), "sk-test");
        let err = translate_text(&client, &req).await.unwrap_err();
        assert!(matches!(err, TranslateError::MalformedResponse(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn empty_choices_maps_to_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let req = request(&server.url(), "sk-test");
        let err = translate_text(&client, &req).await.unwrap_err();
        assert!(matches!(err, TranslateError::MalformedResponse(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn timeout_maps_to_network_within_the_bound() {
        // Bound but never served: the connection opens and then nothing
        // answers, so the client timeout is what ends the call.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        let req = request(&format!("http://{}", addr), "sk-test");

        let started = std::time::Instant::now();
        let err = translate_text(&client, &req).await.unwrap_err();
        assert!(matches!(err, TranslateError::Network(_)), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
