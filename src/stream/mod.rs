//! Response events and the text fragment producer.
//!
//! A backend reply reaches the session controller as a stream of
//! [`ResponseEvent`]s. Streaming bodies become one [`ResponseEvent::Delta`]
//! per decoded fragment; a finished JSON answer becomes a single
//! [`ResponseEvent::Answer`]. The stream ending is the completion signal.
//!
//! # Example
//!
//! ```rust
//! use docchat::stream::text_fragments;
//! use futures::{TryStreamExt, stream};
//!
//! # tokio_test_block_on(async {
//! let chunks = vec![Ok::<_, docchat::Error>(b"Hi".to_vec()), Ok(b" there".to_vec())];
//! let text: Vec<String> = text_fragments(stream::iter(chunks)).try_collect().await.unwrap();
//! assert_eq!(text.concat(), "Hi there");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod utf8;

pub use utf8::Utf8Decoder;

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::{Error, Result};

/// A retrieved passage the backend used for its answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "(String, f64)")]
pub struct ContextSource {
    pub text: String,
    pub score: f64,
}

impl From<(String, f64)> for ContextSource {
    fn from((text, score): (String, f64)) -> Self {
        Self { text, score }
    }
}

/// Incremental output of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEvent {
    /// Text fragment to append to the assistant entry.
    Delta {
        /// Decoded text, never split inside a character.
        text: String,
    },
    /// Complete answer delivered in one piece.
    Answer {
        /// Answer text.
        text: String,
        /// Passages the answer was grounded on, if the backend reported them.
        sources: Vec<ContextSource>,
    },
}

impl ResponseEvent {
    /// The text this event contributes to the transcript.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Delta { text } | Self::Answer { text, .. } => text,
        }
    }
}

/// Boxed event stream handed from a backend to the controller.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<ResponseEvent>> + Send>>;

/// Decode a byte stream into text fragments in arrival order.
///
/// Empty fragments (a chunk holding only part of a character) are skipped.
/// A stream with no bytes yields nothing.
pub fn text_fragments<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<Error> + Send,
{
    async_stream::try_stream! {
        let mut decoder = Utf8Decoder::new();

        futures::pin_mut!(bytes);
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(Into::<Error>::into)?;
            let text = decoder.decode(chunk.as_ref());
            if !text.is_empty() {
                yield text;
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            yield tail;
        }
    }
}

/// Wrap a byte stream as a stream of [`ResponseEvent::Delta`]s.
pub fn delta_events<S, B, E>(bytes: S) -> ResponseStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    Box::pin(text_fragments(bytes).map(|r| r.map(|text| ResponseEvent::Delta { text })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{TryStreamExt, stream};

    async fn collect(chunks: Vec<&'static [u8]>) -> Vec<String> {
        let source = stream::iter(chunks.into_iter().map(Ok::<_, Error>));
        text_fragments(source).try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_fragments_arrive_in_order() {
        let fragments = collect(vec![&b"Hi"[..], &b" there"[..]]).await;
        assert_eq!(fragments, vec!["Hi".to_string(), " there".to_string()]);
    }

    #[tokio::test]
    async fn test_chunking_does_not_change_text() {
        let text = "naïve café — 日本語 🦀";
        let bytes: &'static [u8] = text.as_bytes();

        let whole = collect(vec![bytes]).await.concat();
        for size in 1..=5 {
            let chunked = collect(bytes.chunks(size).collect()).await.concat();
            assert_eq!(chunked, whole, "chunk size {size}");
        }
        assert_eq!(whole, text);
    }

    #[tokio::test]
    async fn test_partial_char_chunk_yields_nothing_until_complete() {
        let fragments = collect(vec![&b"\xE2\x82"[..], &b"\xAC5"[..]]).await;
        assert_eq!(fragments, vec!["\u{20ac}5".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_stream_is_silent() {
        assert!(collect(vec![]).await.is_empty());
    }

    #[tokio::test]
    async fn test_error_stops_the_stream() {
        let source = stream::iter(vec![
            Ok(b"partial".to_vec()),
            Err(Error::Api {
                status: 502,
                message: "upstream reset".into(),
            }),
            Ok(b"never".to_vec()),
        ]);
        let mut fragments = Box::pin(text_fragments(source));
        assert_eq!(fragments.next().await.unwrap().unwrap(), "partial");
        assert!(fragments.next().await.unwrap().is_err());
        assert!(fragments.next().await.is_none());
    }

    #[tokio::test]
    async fn test_delta_events_wrap_fragments() {
        let source = stream::iter(vec![Ok::<_, Error>(b"ok".to_vec())]);
        let events: Vec<ResponseEvent> = delta_events(source).try_collect().await.unwrap();
        assert_eq!(events, vec![ResponseEvent::Delta { text: "ok".into() }]);
        assert_eq!(events[0].text(), "ok");
    }

    #[test]
    fn test_context_source_from_pair() {
        let sources: Vec<ContextSource> =
            serde_json::from_str(r#"[["Mayor term is four years.", 0.87]]"#).unwrap();
        assert_eq!(sources[0].text, "Mayor term is four years.");
        assert!((sources[0].score - 0.87).abs() < f64::EPSILON);
    }
}
