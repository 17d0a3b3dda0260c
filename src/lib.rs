//! docchat
//!
//! A terminal chat client for a document question-answering backend. The
//! user types a message, optionally attaches a file, and watches the reply
//! render as it streams in.
//!
//! # Architecture
//!
//! - **Session**: one controller owns the draft, transcript, in-flight flag,
//!   and error, and drives one exchange at a time
//! - **Stream**: stateful UTF-8 decoding of response bodies into text fragments
//! - **Backend**: transports for the upload and streaming-chat contracts
//! - **Routes**: declarative rewrite of page paths onto the backend origin
//!
//! # Modules
//!
//! - [`session`]: Chat session controller and transcript
//! - [`stream`]: Response events and fragment decoding
//! - [`backend`]: `ChatBackend` trait and HTTP implementations
//! - [`routes`]: Path rewrite table
//! - [`attachment`]: Files selected for upload
//! - [`config`]: Layered configuration
//! - [`console`]: Terminal input parsing and rendering

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::format_push_string)]

pub mod attachment;
pub mod backend;
pub mod config;
pub mod console;
pub mod error;
pub mod routes;
pub mod session;
pub mod stream;

pub use error::{Error, Result};
