//! docchat terminal client
//!
//! Entry point: loads config, probes the backend, then runs the chat loop.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_fields_in_debug)]

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use docchat::attachment::{self, Attachment};
use docchat::backend::{self, ChatBackend};
use docchat::config::AppConfig;
use docchat::console::{self, Command, HELP, TYPING_INDICATOR};
use docchat::routes::RouteTable;
use docchat::session::{ChatController, ExchangeOutcome, SubmitRejected};
use docchat::Error;

/// Everything the chat loop needs.
struct App {
    config: AppConfig,
    http: reqwest::Client,
    routes: RouteTable,
    backend: Arc<dyn ChatBackend>,
    chat: ChatController,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before the filter reads RUST_LOG
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED); stdout is reserved for the chat
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Configuration error")?;
    let origin = config
        .backend_url()
        .with_context(|| format!("Invalid backend origin: {}", config.backend.origin))?;

    info!(
        name: "config.loaded",
        origin = %origin,
        endpoint = %config.chat.endpoint,
        "Configuration loaded"
    );

    let routes = RouteTable::for_origin(&origin);
    let http = backend::http_client(&config)?;
    let backend = backend::from_config(&config, http.clone(), &routes)?;

    match backend::check_health(&http, &routes).await {
        Ok(status) if status.is_ok() => {
            info!(name: "backend.healthy", origin = %origin, "Backend reachable");
        }
        Ok(status) => {
            warn!(name: "backend.unhealthy", status = %status.status, "Backend reports a problem");
        }
        Err(e) => {
            warn!(name: "backend.unreachable", error = %e, "Health probe failed; continuing");
        }
    }

    let mut app = App {
        config,
        http,
        routes,
        backend,
        chat: ChatController::new(),
    };

    println!("docchat ({} endpoint). Type /help for commands.", app.backend.endpoint());
    app.run().await?;

    info!(name: "session.ended", session = %app.chat.id(), turns = app.chat.transcript().len(), "Session ended");
    Ok(())
}

impl App {
    async fn run(&mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            prompt("you> ")?;

            // Ctrl-C at the prompt quits; during a reply it only cancels.
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                println!();
                return Ok(());
            };

            match console::parse_command(&line) {
                Command::Submit(text) => self.submit(text).await?,
                Command::Attach(path) => self.attach(&path).await,
                Command::Detach => match self.chat.detach() {
                    Ok(Some(file)) => println!("Removed {}.", file.file_name()),
                    Ok(None) => println!("No file attached."),
                    Err(e) => println!("{e}"),
                },
                Command::History => println!("{}", console::render_session(&self.chat)),
                Command::Health => self.health().await,
                Command::Help => println!("{HELP}"),
                Command::Quit => return Ok(()),
                Command::Unknown(cmd) => println!("Unknown command {cmd}. Type /help."),
            }
        }
    }

    async fn submit(&mut self, text: String) -> anyhow::Result<()> {
        if let Err(e) = self.chat.set_draft(text) {
            println!("{e}");
            return Ok(());
        }
        if !self.chat.can_submit() {
            // Blank line with no file: nothing to do.
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        print!("{TYPING_INDICATOR}");
        std::io::stdout().flush()?;

        let mut started = false;
        let mut write_error = None;
        let result = self
            .chat
            .send_with(self.backend.as_ref(), &cancel, |event| {
                if write_error.is_some() {
                    return;
                }
                if let Err(e) = console::write_fragment(&mut std::io::stdout().lock(), !started, event.text()) {
                    write_error = Some(e);
                }
                started = true;
            })
            .await;
        watcher.abort();
        if let Some(e) = write_error {
            return Err(e.into());
        }

        if !started {
            print!("\r\x1b[2K");
        }

        match result {
            Ok(ExchangeOutcome::Completed) => {
                if started {
                    println!();
                } else {
                    println!("{}", console::reply_prefix());
                }
                self.print_sources();
            }
            Ok(ExchangeOutcome::Failed) => {
                if started {
                    println!();
                }
                println!("error: {}", self.chat.error().unwrap_or_default());
            }
            Ok(ExchangeOutcome::Cancelled) => println!("\n[cancelled]"),
            Err(SubmitRejected::Empty) => {}
            Err(e @ SubmitRejected::InFlight) => println!("{e}"),
        }
        std::io::stdout().flush()?;
        Ok(())
    }

    fn print_sources(&self) {
        for source in self.chat.last_sources() {
            let preview: String = source.text.chars().take(80).collect();
            println!("  [{:.2}] {}", source.score, preview.replace('\n', " "));
        }
    }

    async fn attach(&mut self, path: &Path) {
        if !self.backend.supports_attachments() {
            println!("{}", Error::AttachmentUnsupported(self.backend.endpoint().as_str()));
            return;
        }
        if !attachment::is_accepted(path, &self.config.attachments.accepted) {
            println!(
                "Note: {} is not one of {}; sending anyway.",
                path.display(),
                self.config.attachments.accepted.join(", ")
            );
        }

        match Attachment::load(path).await {
            Ok(file) => {
                let name = file.file_name().to_string();
                let size = file.size();
                match self.chat.attach(file) {
                    Ok(()) => println!("Attached {name} ({size} bytes)."),
                    Err(e) => println!("{e}"),
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    async fn health(&self) {
        match backend::check_health(&self.http, &self.routes).await {
            Ok(status) => println!("backend: {}", status.status),
            Err(e) => println!("backend unreachable: {e}"),
        }
    }
}

fn prompt(text: &str) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "{text}")?;
    out.flush()
}
