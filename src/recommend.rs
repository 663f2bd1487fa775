use crate::config::Config;
use crate::mood::Mood;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Shown instead of a song when the service answers with a non-success status
/// or cannot be reached.
pub const SERVICE_ERROR_PLACEHOLDER: &str = "Error contacting recommendation service";

/// Shown instead of a song when the reply body is not what we expect.
pub const PARSE_ERROR_PLACEHOLDER: &str = "Error getting recommendation";

#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Request failed {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    #[error("Malformed reply {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RecommendError {
    fn from(error: reqwest::Error) -> Self {
        RecommendError::Transport(Box::new(error))
    }
}

/// Status and body of one text generation call, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: StatusCode,
    pub body: String,
}

/// Remote text generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<RawReply, RecommendError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [ChatMessage<'a>; 1],
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
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

/// [`TextGenerator`] talking to an OpenAI style `chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl ChatCompletionsClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: None,
            model: None,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let mut client = Self::new(builder.build()?, config.endpoint.clone());
        client.api_key = config.api_key.clone();
        client.model = config.model.clone();
        Ok(client)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<RawReply, RecommendError> {
        let request = ChatRequest {
            model: self.model.as_deref(),
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        // json() sets Content-Type: application/json
        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::trace!(%status, %body, "text generation reply");
        Ok(RawReply { status, body })
    }
}

pub fn recommendation_prompt(mood: Mood) -> String {
    format!(
        "Recommend one Spotify song for someone who is feeling {mood}. \
         Only return the song name and artist in this format: 'Song Name by Artist'. \
         No explanation or additional text. Don't repeat the same songs."
    )
}

/// Pulls `choices[0].message.content` out of a chat completion body.
pub fn parse_reply(body: &str) -> Result<String, RecommendError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| RecommendError::Parse(e.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RecommendError::Parse("no choices".to_string()))?;
    let content = choice.message.content.trim();
    if content.is_empty() {
        return Err(RecommendError::Parse("empty content".to_string()));
    }
    Ok(content.to_string())
}

/// Asks the text generator for a song matching a mood.
#[derive(Clone)]
pub struct RecommendationClient {
    generator: Arc<dyn TextGenerator>,
}

impl RecommendationClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Always yields something displayable: the song or one of the placeholders.
    pub async fn recommend(&self, mood: Mood) -> String {
        let prompt = recommendation_prompt(mood);
        tracing::debug!(%prompt, "requesting recommendation");

        let reply = match self.generator.complete(&prompt).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(%error, "recommendation service unreachable");
                return SERVICE_ERROR_PLACEHOLDER.to_string();
            }
        };

        if !reply.status.is_success() {
            tracing::warn!(status = %reply.status, body = %reply.body, "recommendation service error");
            return SERVICE_ERROR_PLACEHOLDER.to_string();
        }

        match parse_reply(&reply.body) {
            Ok(song) => song,
            Err(error) => {
                tracing::warn!(%error, "could not parse recommendation");
                PARSE_ERROR_PLACEHOLDER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Canned {
        reply: Result<RawReply, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn status(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(RawReply {
                    status: StatusCode::from_u16(status).unwrap(),
                    body: body.to_string(),
                }),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                reply: Err("connection refused".to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn complete(&self, prompt: &str) -> Result<RawReply, RecommendError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|e| RecommendError::Transport(e.into()))
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let generator = Canned::status(200, r#"{"choices":[{"message":{"content":"X by Y"}}]}"#);
        let client = RecommendationClient::new(generator);
        assert_eq!(client.recommend(Mood::Happy).await, "X by Y");
    }

    #[tokio::test]
    async fn server_error_ignores_body() {
        let generator = Canned::status(500, r#"{"choices":[{"message":{"content":"X by Y"}}]}"#);
        let client = RecommendationClient::new(generator);
        assert_eq!(client.recommend(Mood::Sad).await, SERVICE_ERROR_PLACEHOLDER);
    }

    #[tokio::test]
    async fn missing_choices_is_parse_error() {
        let generator = Canned::status(200, r#"{"id":"abc"}"#);
        let client = RecommendationClient::new(generator);
        assert_eq!(client.recommend(Mood::Neutral).await, PARSE_ERROR_PLACEHOLDER);
    }

    #[tokio::test]
    async fn non_json_body_is_parse_error() {
        let generator = Canned::status(200, "<html>oops</html>");
        let client = RecommendationClient::new(generator);
        assert_eq!(client.recommend(Mood::Neutral).await, PARSE_ERROR_PLACEHOLDER);
    }

    #[tokio::test]
    async fn unreachable_service_is_service_error() {
        let client = RecommendationClient::new(Canned::unreachable());
        assert_eq!(client.recommend(Mood::Happy).await, SERVICE_ERROR_PLACEHOLDER);
    }

    #[tokio::test]
    async fn prompt_names_the_mood() {
        let generator = Canned::status(200, r#"{"choices":[{"message":{"content":"X by Y"}}]}"#);
        let client = RecommendationClient::new(generator.clone());
        client.recommend(Mood::Sad).await;
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("feeling sad"));
        assert!(prompts[0].contains("'Song Name by Artist'"));
        assert!(prompts[0].contains("repeat"));
    }

    #[test]
    fn parse_reply_edge_cases() {
        assert!(matches!(
            parse_reply(r#"{"choices":[]}"#),
            Err(RecommendError::Parse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"choices":[{"message":{}}]}"#),
            Err(RecommendError::Parse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"choices":[{"message":{"content":42}}]}"#),
            Err(RecommendError::Parse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"choices":[{"message":{"content":"  \n"}}]}"#),
            Err(RecommendError::Parse(_))
        ));
        assert_eq!(
            parse_reply(r#"{"choices":[{"message":{"content":"Song by Band\n"}},{"message":{"content":"Other by Band"}}]}"#).unwrap(),
            "Song by Band"
        );
    }

    #[tokio::test]
    async fn posts_single_user_message() {
        let server = MockServer::start_async().await;
        let prompt = recommendation_prompt(Mood::Happy);
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("content-type", "application/json")
                    .json_body(json!({"messages": [{"role": "user", "content": prompt}]}));
                then.status(200)
                    .json_body(json!({"choices": [{"message": {"content": "Happy by Pharrell Williams"}}]}));
            })
            .await;

        let generator =
            ChatCompletionsClient::new(reqwest::Client::new(), server.url("/chat/completions"));
        let client = RecommendationClient::new(Arc::new(generator));
        assert_eq!(client.recommend(Mood::Happy).await, "Happy by Pharrell Williams");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn sends_model_and_bearer_when_configured() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer secret")
                    .json_body_partial(r#"{"model": "tiny"}"#);
                then.status(200)
                    .json_body(json!({"choices": [{"message": {"content": "A by B"}}]}));
            })
            .await;

        let generator =
            ChatCompletionsClient::new(reqwest::Client::new(), server.url("/chat/completions"))
                .with_api_key("secret")
                .with_model("tiny");
        let reply = generator.complete("hi").await.unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn timeout_maps_to_service_placeholder() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({"choices": [{"message": {"content": "Too by Late"}}]}));
            })
            .await;

        let config = Config {
            endpoint: server.url("/chat/completions"),
            request_timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let generator = ChatCompletionsClient::from_config(&config).unwrap();
        assert!(matches!(
            generator.complete("hi").await,
            Err(RecommendError::Transport(_))
        ));

        let client = RecommendationClient::new(Arc::new(generator));
        assert_eq!(client.recommend(Mood::Happy).await, SERVICE_ERROR_PLACEHOLDER);
    }

    #[tokio::test]
    async fn http_500_maps_to_service_placeholder() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500).body("upstream down");
            })
            .await;

        let generator =
            ChatCompletionsClient::new(reqwest::Client::new(), server.url("/chat/completions"));
        let client = RecommendationClient::new(Arc::new(generator));
        assert_eq!(client.recommend(Mood::Sad).await, SERVICE_ERROR_PLACEHOLDER);
    }
}
