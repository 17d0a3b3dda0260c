//! `POST /upload_and_ask` transport.

use futures::stream;
use reqwest::multipart::Form;
use serde::Deserialize;
use url::Url;

use super::{ChatBackend, ChatRequest, ensure_success};
use crate::config::Endpoint;
use crate::error::{Error, Result};
use crate::routes::{RouteTable, UPLOAD_AND_ASK_PATH};
use crate::stream::{ContextSource, ResponseEvent, ResponseStream};

/// JSON body returned by the upload endpoint.
///
/// Only `answer` is required. `context` may be absent, `null`, or a shape we
/// do not understand; in those cases the answer is still delivered.
#[derive(Debug, Deserialize)]
struct UploadAnswer {
    answer: String,
    #[serde(default)]
    context: Option<serde_json::Value>,
}

impl UploadAnswer {
    fn parse(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// `[[text, score], ...]` passages, or nothing.
    fn sources(&mut self) -> Vec<ContextSource> {
        match self.context.take() {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(name: "backend.upload.context_ignored", error = %e, "Unrecognised context dropped");
                Vec::new()
            }),
        }
    }
}

/// Sends the draft as a multipart form and waits for one JSON answer.
#[derive(Debug, Clone)]
pub struct UploadBackend {
    http: reqwest::Client,
    url: Url,
}

impl UploadBackend {
    pub fn new(http: reqwest::Client, routes: &RouteTable) -> Result<Self> {
        Ok(Self {
            http,
            url: routes.resolve(UPLOAD_AND_ASK_PATH)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl ChatBackend for UploadBackend {
    fn endpoint(&self) -> Endpoint {
        Endpoint::Upload
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    async fn send(&self, request: ChatRequest) -> Result<ResponseStream> {
        let mut form = Form::new().text("message", request.message);
        if let Some(attachment) = request.attachment {
            form = form.part("file", attachment.into_part()?);
        }

        let response = self.http.post(self.url.clone()).multipart(form).send().await?;
        let response = ensure_success(response).await?;
        let mut body = UploadAnswer::parse(&response.bytes().await?)?;
        let sources = body.sources();

        tracing::debug!(
            name: "backend.upload.answer",
            chars = body.answer.chars().count(),
            sources = sources.len(),
            "Answer received"
        );

        let event = ResponseEvent::Answer {
            text: body.answer,
            sources,
        };
        Ok(Box::pin(stream::iter([Ok::<_, Error>(event)])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> (String, Vec<ContextSource>) {
        let mut body = UploadAnswer::parse(json.as_bytes()).unwrap();
        let sources = body.sources();
        (body.answer, sources)
    }

    #[test]
    fn test_answer_with_sources() {
        let (answer, sources) =
            parse(r#"{"answer":"The incumbent won.","context":[["results",0.9],["turnout",0.4]]}"#);
        assert_eq!(answer, "The incumbent won.");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].text, "turnout");
    }

    #[test]
    fn test_missing_or_null_context_keeps_answer() {
        assert_eq!(parse(r#"{"answer":"yes"}"#), ("yes".to_string(), vec![]));
        assert_eq!(
            parse(r#"{"answer":"The incumbent won.","context":null}"#),
            ("The incumbent won.".to_string(), vec![])
        );
    }

    #[test]
    fn test_unrecognised_context_is_dropped() {
        let (answer, sources) =
            parse(r#"{"answer":"The incumbent won.","context":"[Source 1]: results"}"#);
        assert_eq!(answer, "The incumbent won.");
        assert!(sources.is_empty());

        let (_, sources) = parse(r#"{"answer":"a","context":[{"text":"x"}]}"#);
        assert!(sources.is_empty());
    }

    #[test]
    fn test_body_without_answer_is_a_json_error() {
        let err = UploadAnswer::parse(b"<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        let err = UploadAnswer::parse(br#"{"context":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
