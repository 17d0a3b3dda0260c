//! `POST /api/chat` transport.
//!
//! The request carries the whole conversation as structured `messages`; the
//! response body is plain text streamed until the connection closes.

use serde::Serialize;
use url::Url;

use super::{ChatBackend, ChatRequest, Turn, ensure_success};
use crate::config::Endpoint;
use crate::error::{Error, Result};
use crate::routes::{CHAT_PATH, RouteTable};
use crate::session::Role;
use crate::stream::{ResponseStream, delta_events};

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    messages: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

/// Streams the assistant reply as plain text.
#[derive(Clone)]
pub struct ChatStreamBackend {
    http: reqwest::Client,
    url: Url,
    api_key: Option<String>,
    system_prompt: Option<String>,
}

impl std::fmt::Debug for ChatStreamBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStreamBackend")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl ChatStreamBackend {
    pub fn new(http: reqwest::Client, routes: &RouteTable) -> Result<Self> {
        Ok(Self {
            http,
            url: routes.resolve(CHAT_PATH)?,
            api_key: None,
            system_prompt: None,
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn messages(&self, turns: Vec<Turn>) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Turn {
                role: Role::System,
                content: prompt.clone(),
            });
        }
        messages.extend(turns);
        messages
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatStreamBackend {
    fn endpoint(&self) -> Endpoint {
        Endpoint::Stream
    }

    fn supports_attachments(&self) -> bool {
        false
    }

    async fn send(&self, request: ChatRequest) -> Result<ResponseStream> {
        if request.attachment.is_some() {
            return Err(Error::AttachmentUnsupported(Endpoint::Stream.as_str()));
        }

        let messages = self.messages(request.messages);
        let body = ChatBody {
            messages: &messages,
            api_key: self.api_key.as_deref(),
        };

        let response = self.http.post(self.url.clone()).json(&body).send().await?;
        let response = ensure_success(response).await?;

        tracing::debug!(
            name: "backend.chat.stream.open",
            status = response.status().as_u16(),
            turns = messages.len(),
            "Response stream opened"
        );

        Ok(delta_events(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ChatStreamBackend {
        let routes =
            RouteTable::for_origin(&Url::parse("http://127.0.0.1:8000").unwrap());
        ChatStreamBackend::new(reqwest::Client::new(), &routes).unwrap()
    }

    #[test]
    fn test_url_goes_through_api_rewrite() {
        assert_eq!(backend().url().as_str(), "http://127.0.0.1:8000/api/chat");
    }

    #[test]
    fn test_system_prompt_leads_messages() {
        let backend = backend().with_system_prompt(Some("Answer from context.".into()));
        let messages = backend.messages(vec![Turn {
            role: Role::User,
            content: "Hello".into(),
        }]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Hello");
    }

    #[test]
    fn test_blank_api_key_is_dropped() {
        let backend = backend().with_api_key(Some("  ".into()));
        let body = ChatBody {
            messages: &[],
            api_key: backend.api_key.as_deref(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("api_key").is_none());
        assert_eq!(json["messages"], serde_json::json!([]));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let backend = backend().with_api_key(Some("sk-secret".into()));
        assert!(!format!("{backend:?}").contains("sk-secret"));
    }
}
