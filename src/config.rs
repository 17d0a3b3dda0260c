use clap::{Parser, ValueEnum};
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::attachment::ACCEPTED_EXTENSIONS;

/// Default backend origin (the local document QA server).
pub const DEFAULT_BACKEND_ORIGIN: &str = "http://127.0.0.1:8000";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Backend origin that `/api/*` and `/upload_and_ask` are forwarded to
    #[arg(long, env = "BACKEND_ORIGIN")]
    pub backend_origin: Option<String>,

    /// Which backend contract to talk to
    #[arg(long, value_enum, env = "CHAT_ENDPOINT")]
    pub endpoint: Option<Endpoint>,

    /// API key forwarded to the streaming endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds (no timeout when unset)
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

/// Backend contract used for each submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// `POST /upload_and_ask`: multipart form in, one JSON answer out.
    #[default]
    Upload,
    /// `POST /api/chat`: JSON messages in, plain-text byte stream out.
    Stream,
}

impl Endpoint {
    /// Name used in config files and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Stream => "stream",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub chat: ChatConfig,
    pub attachments: AttachmentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub origin: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub endpoint: Endpoint,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Sent as the leading `system` message on the streaming endpoint.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttachmentConfig {
    /// Extensions offered by the file picker, with leading dot.
    pub accepted: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("backend.origin", DEFAULT_BACKEND_ORIGIN)?
            .set_default("chat.endpoint", Endpoint::default().as_str())?
            .set_default("attachments.accepted", ACCEPTED_EXTENSIONS.to_vec())?;

        // An explicit file must exist; ./docchat.{yaml,toml,json} is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("docchat").required(false)),
        };

        // DOCCHAT_BACKEND__ORIGIN=http://10.0.0.2:8000
        builder = builder.add_source(
            Environment::with_prefix("DOCCHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Priority: CLI flag > CLI env var > DOCCHAT_ env > config file > defaults.
        if let Some(origin) = cli.backend_origin {
            builder = builder.set_override("backend.origin", origin)?;
        }
        if let Some(endpoint) = cli.endpoint {
            builder = builder.set_override("chat.endpoint", endpoint.as_str())?;
        }
        if let Some(key) = cli.api_key {
            builder = builder.set_override("chat.api_key", key)?;
        }
        if let Some(secs) = cli.timeout_secs {
            builder = builder.set_override("backend.timeout_secs", secs)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Parsed backend origin.
    pub fn backend_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.backend.origin)
    }
}
