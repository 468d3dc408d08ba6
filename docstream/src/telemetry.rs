//! Session telemetry built on the `tracing` ecosystem.
//!
//! Works with any tracing subscriber; nothing here can fail, so a session's
//! outcome never depends on the telemetry sink. Metrics are additionally
//! returned as a plain value for callers that want to inspect them.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{Span, debug, info, info_span, trace};

use crate::stream::StreamEvent;
use crate::types::{DocType, GenerationRequest};

/// Metrics collected over one generation session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Stream events decoded, terminal events included.
    pub events: usize,
    /// Chunk events applied to the document.
    pub chunks: usize,
    /// Bytes of document content received.
    pub document_bytes: usize,
    /// Bytes of source code submitted.
    pub input_bytes: usize,
    /// Wall-clock duration of the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    /// Whether the session reached a terminal `complete` event.
    pub success: bool,
}

impl SessionMetrics {
    /// Document throughput in bytes per second.
    #[must_use]
    pub fn bytes_per_second(&self) -> Option<f64> {
        self.duration.map(|d| {
            let secs = d.as_secs_f64();
            if secs > 0.0 {
                self.document_bytes as f64 / secs
            } else {
                0.0
            }
        })
    }
}

impl std::fmt::Display for SessionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Generation Metrics")?;
        writeln!(f, "  Events:    {}", self.events)?;
        writeln!(f, "  Chunks:    {}", self.chunks)?;
        writeln!(
            f,
            "  Bytes:     {} in, {} out",
            self.input_bytes, self.document_bytes
        )?;
        if let Some(d) = self.duration {
            writeln!(f, "  Duration:  {:.2}s", d.as_secs_f64())?;
            if let Some(rate) = self.bytes_per_second() {
                writeln!(f, "  Rate:      {rate:.0} B/s")?;
            }
        }
        writeln!(f, "  Success:   {}", self.success)?;
        Ok(())
    }
}

/// Telemetry collector for one generation session.
///
/// Emits tracing events while accumulating a [`SessionMetrics`] snapshot.
#[derive(Debug, Clone)]
pub struct Telemetry {
    start: Instant,
    language: Option<String>,
    metrics: SessionMetrics,
}

impl Telemetry {
    /// Start collecting for the given request.
    #[must_use]
    pub fn new(request: &GenerationRequest) -> Self {
        Self {
            start: Instant::now(),
            language: request.language.clone(),
            metrics: SessionMetrics {
                input_bytes: request.code.len(),
                ..SessionMetrics::default()
            },
        }
    }

    /// Record a decoded stream event.
    pub fn record_event(&mut self, event: &StreamEvent) {
        self.metrics.events += 1;
        match event {
            StreamEvent::Chunk { content } => {
                self.metrics.chunks += 1;
                self.metrics.document_bytes += content.len();
                trace!(bytes = content.len(), "chunk received");
            }
            StreamEvent::Attribution { content } => {
                self.metrics.document_bytes += content.len();
                trace!(bytes = content.len(), "attribution received");
            }
            StreamEvent::Complete { quality_score, .. } => {
                debug!(score = quality_score.score, grade = %quality_score.grade, "complete received");
            }
            StreamEvent::Error { error } => {
                debug!(error, "error event received");
            }
        }
    }

    /// Complete the session and return final metrics.
    #[must_use]
    pub fn complete(&mut self, success: bool) -> SessionMetrics {
        let duration = self.start.elapsed();
        self.metrics.duration = Some(duration);
        self.metrics.success = success;

        info!(
            duration_ms = duration.as_millis(),
            success,
            input_bytes = self.metrics.input_bytes,
            language = self.language.as_deref(),
            events = self.metrics.events,
            chunks = self.metrics.chunks,
            document_bytes = self.metrics.document_bytes,
            "generation_completed"
        );

        self.metrics
    }

    /// Get current metrics snapshot.
    #[must_use]
    pub const fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Create a span for a generation session.
    #[must_use]
    pub fn session_span(doc_type: DocType, filename: &str) -> Span {
        info_span!("generation", doc_type = %doc_type, filename = %filename)
    }
}
