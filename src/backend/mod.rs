//! Backend transports.
//!
//! The [`ChatBackend`] trait is the seam between the session controller and
//! HTTP. Each implementation speaks one backend contract and hands back a
//! [`ResponseStream`] of events:
//!
//! - [`UploadBackend`]: `POST /upload_and_ask` (multipart in, JSON answer out)
//! - [`ChatStreamBackend`]: `POST /api/chat` (JSON messages in, text stream out)
//!
//! [`check_health`] probes `GET /api/health`.

pub mod chat_stream;
pub mod health;
pub mod upload;

pub use chat_stream::ChatStreamBackend;
pub use health::{HealthStatus, check_health};
pub use upload::UploadBackend;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::attachment::Attachment;
use crate::config::{AppConfig, Endpoint};
use crate::error::{Error, Result};
use crate::routes::RouteTable;
use crate::session::Role;
use crate::stream::ResponseStream;

/// One prior or current turn, as sent to the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Everything one submission sends to the backend.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The draft text (may be empty when a file is attached).
    pub message: String,
    /// Optional attached file.
    pub attachment: Option<Attachment>,
    /// Transcript turns including the message being submitted.
    pub messages: Vec<Turn>,
}

/// Trait for chat backends.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Which contract this backend speaks.
    fn endpoint(&self) -> Endpoint;

    /// Whether a file can travel with the request.
    fn supports_attachments(&self) -> bool;

    /// Issue one request and return its response events.
    ///
    /// Resolves once response headers arrive; the body is consumed lazily
    /// through the returned stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the backend
    /// answers with a non-success status.
    async fn send(&self, request: ChatRequest) -> Result<ResponseStream>;
}

/// Build the shared HTTP client from config.
pub fn http_client(config: &AppConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.backend.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Build the backend selected by `chat.endpoint`.
pub fn from_config(
    config: &AppConfig,
    http: reqwest::Client,
    routes: &RouteTable,
) -> Result<Arc<dyn ChatBackend>> {
    let backend: Arc<dyn ChatBackend> = match config.chat.endpoint {
        Endpoint::Upload => Arc::new(UploadBackend::new(http, routes)?),
        Endpoint::Stream => Arc::new(
            ChatStreamBackend::new(http, routes)?
                .with_api_key(config.chat.api_key.clone())
                .with_system_prompt(config.chat.system_prompt.clone()),
        ),
    };
    Ok(backend)
}

/// Turn a non-success response into [`Error::Api`].
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".into());
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}
