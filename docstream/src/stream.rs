//! Wire protocol decoding for the generation stream.
//!
//! The service answers `POST /generate-stream` with a newline-delimited
//! body where every line of interest is `data: <json>`. [`EventStream`]
//! wraps the raw byte stream and yields decoded [`StreamEvent`]s, keeping
//! a persistent buffer so lines split across network reads reassemble
//! correctly.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::RawFailure;
use crate::types::QualityScore;

/// Prefix that marks a payload-bearing line.
pub const DATA_PREFIX: &str = "data: ";

/// Boxed byte stream as produced by a streaming response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// One event from the generation stream.
///
/// The wire form is a JSON object tagged by `type`, for example
/// `{"type":"chunk","content":"# Intro\n"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// A fragment of the document, to be appended in arrival order.
    Chunk {
        /// Markdown fragment.
        content: String,
    },
    /// Trailing attribution footer, sent at most once near the end.
    Attribution {
        /// Footer text.
        content: String,
    },
    /// Terminal success marker.
    #[serde(rename_all = "camelCase")]
    Complete {
        /// Quality assessment of the finished document.
        quality_score: QualityScore,
        /// Opaque generation metadata, absent on older servers.
        #[serde(default)]
        metadata: Option<serde_json::Value>,
    },
    /// Terminal failure marker.
    Error {
        /// Error text, sometimes a serialized API error body.
        error: String,
    },
}

impl StreamEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Decoder for the `data: <json>` line protocol.
///
/// Bytes are buffered across reads and consumed line by line, so a `data:`
/// line split over any number of network reads decodes once, as a whole.
/// Lines without the [`DATA_PREFIX`] are skipped. A final unterminated
/// line is flushed when the inner stream ends.
#[derive(Debug)]
pub struct EventStream<S> {
    inner: S,
    buffer: Vec<u8>,
    done: bool,
}

impl<S> EventStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    /// Create a decoder over a raw byte stream.
    pub const fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            done: false,
        }
    }

    /// Try to extract the next complete line from the buffer.
    fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let rest = self.buffer.split_off(pos + 1);
        let mut line = std::mem::replace(&mut self.buffer, rest);
        line.pop();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Decode one line of the protocol.
    ///
    /// Returns `None` for blank lines and lines without the data prefix.
    /// A payload that is not valid event JSON comes back as a
    /// [`RawFailure::Parse`].
    #[must_use]
    pub fn parse_data_line(line: &str) -> Option<Result<StreamEvent, RawFailure>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let payload = trimmed.strip_prefix(DATA_PREFIX)?;
        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => Some(Ok(event)),
            Err(err) => Some(Err(RawFailure::Parse {
                detail: err.to_string(),
                line: trimmed.to_string(),
            })),
        }
    }
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<StreamEvent, RawFailure>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // Drain complete lines before asking the network for more.
            if let Some(line) = self.next_line() {
                if let Some(item) = Self::parse_data_line(&line) {
                    return Poll::Ready(Some(item));
                }
                continue;
            }

            if self.done {
                if self.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                // Flush the final unterminated line.
                let remaining = std::mem::take(&mut self.buffer);
                let line = String::from_utf8_lossy(&remaining).into_owned();
                if let Some(item) = Self::parse_data_line(&line) {
                    return Poll::Ready(Some(item));
                }
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => self.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(err))) => {
                    return Poll::Ready(Some(Err(RawFailure::Transport(err))));
                }
                Poll::Ready(None) => self.done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
