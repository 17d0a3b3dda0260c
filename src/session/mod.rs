//! Chat session state.
//!
//! A [`ChatController`] owns everything the chat page shows: the draft,
//! the optional attachment, the transcript, the in-flight flag, and the
//! last error. All mutation goes through its transition methods, so the
//! state can be driven and inspected without any rendering layer.
//!
//! # Example
//!
//! ```rust
//! use docchat::session::{ChatController, Role};
//!
//! let mut chat = ChatController::new();
//! chat.set_draft("Hello").unwrap();
//! let request = chat.begin_submit().unwrap();
//! assert_eq!(request.message, "Hello");
//! assert!(chat.is_loading());
//! assert_eq!(chat.transcript().entries()[0].role, Role::User);
//! ```

mod controller;
mod transcript;

pub use controller::{ChatController, Draft, ExchangeOutcome, Phase, SubmitRejected};
pub use transcript::{Entry, Role, Transcript};
