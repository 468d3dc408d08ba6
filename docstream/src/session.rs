//! Generation session driver.
//!
//! [`Generator`] runs at most one live session at a time: it issues the
//! request, decodes the event stream, folds events into the document and
//! publishes an observable [`GenerationState`] snapshot after every event.
//! Starting a new session cancels the previous one, and [`Generator::cancel`]
//! freezes all externally visible state even when buffered bytes keep
//! arriving afterwards.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::classify;
use crate::client::Client;
use crate::document::DocumentAccumulator;
use crate::error::{GenerateError, RawFailure};
use crate::stream::{BodyStream, EventStream, StreamEvent};
use crate::telemetry::Telemetry;
use crate::types::{GenerationRequest, GenerationResult, QualityScore, RateLimitInfo};

/// Callback fired once per session that reaches a terminal `complete`.
pub type UsageListener = Arc<dyn Fn() + Send + Sync>;

/// Observable snapshot of the active (or most recent) session.
///
/// Snapshots are published through a watch channel after every applied
/// event, so subscribers can render the document incrementally.
#[derive(Debug, Clone, Default)]
pub struct GenerationState {
    /// Document assembled so far.
    pub document: String,
    /// Quality assessment, present once the `complete` event arrived.
    pub quality_score: Option<QualityScore>,
    /// Whether a session is currently running.
    pub generating: bool,
    /// Latest rate-limit snapshot. Survives failures and session restarts.
    pub rate_limit: Option<RateLimitInfo>,
    /// Advisory retry window from the last failure, in seconds.
    pub retry_after_seconds: Option<u64>,
    /// Classified error of the last failed session.
    pub error: Option<GenerateError>,
}

#[derive(Clone)]
struct ActiveSession {
    id: Uuid,
    token: CancellationToken,
}

/// Drives generation sessions against a [`Client`].
///
/// Obtained from [`Client::generator`]. All methods take `&self`; the
/// generator can be shared behind an `Arc` between the task that calls
/// [`generate`](Self::generate) and the one that calls
/// [`cancel`](Self::cancel).
pub struct Generator {
    client: Client,
    state: watch::Sender<GenerationState>,
    active: Mutex<Option<ActiveSession>>,
    usage_listener: Option<UsageListener>,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("client", &self.client)
            .field("generating", &self.is_generating())
            .field("has_usage_listener", &self.usage_listener.is_some())
            .finish_non_exhaustive()
    }
}

impl Generator {
    /// Create a generator over the given client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        let (state, _) = watch::channel(GenerationState::default());
        Self {
            client,
            state,
            active: Mutex::new(None),
            usage_listener: None,
        }
    }

    /// Register a callback fired once per session that completes.
    ///
    /// Meant for usage accounting: the service bills per completed
    /// generation, so the callback fires exactly when a session reaches
    /// its `complete` event, never for failures or cancellations.
    #[must_use]
    pub fn with_usage_listener(mut self, listener: impl Fn() + Send + Sync + 'static) -> Self {
        self.usage_listener = Some(Arc::new(listener));
        self
    }

    /// Subscribe to state snapshots, one per applied event.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> GenerationState {
        self.state.borrow().clone()
    }

    /// Whether a session is currently running.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.state.borrow().generating
    }

    /// Run one generation session to completion.
    ///
    /// Any session already running is cancelled first; there is at most
    /// one live session per generator. On failure the classified error is
    /// both returned and recorded in the observable state. On success the
    /// accumulated document is returned; the quality score is absent when
    /// the stream ended without a `complete` event, which is how a
    /// cancelled session comes back.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] classifying whatever failed, from a
    /// refused connection to a malformed stream payload.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, GenerateError> {
        let session = self.begin();
        let mut telemetry = Telemetry::new(&request);
        info!(
            session = %session.id,
            doc_type = %request.doc_type,
            filename = %request.filename,
            input_bytes = request.code.len(),
            "generation started"
        );

        match self.run(&request, &session.token, &mut telemetry).await {
            Ok(result) => {
                let completed = result.is_complete();
                self.publish(&session.token, |state| state.generating = false);
                if completed
                    && !session.token.is_cancelled()
                    && let Some(listener) = &self.usage_listener
                {
                    listener();
                }
                let metrics = telemetry.complete(completed);
                debug!(
                    session = %session.id,
                    document_bytes = metrics.document_bytes,
                    completed,
                    "generation finished"
                );
                self.finish(&session);
                Ok(result)
            }
            Err(raw) => {
                let error = classify(&raw);
                warn!(
                    session = %session.id,
                    kind = %error.kind,
                    status = ?error.status_code,
                    "generation failed"
                );
                self.publish(&session.token, |state| {
                    state.generating = false;
                    state.retry_after_seconds = error.retry_after_seconds;
                    state.error = Some(error.clone());
                });
                let _ = telemetry.complete(false);
                self.finish(&session);
                Err(error)
            }
        }
    }

    /// Cancel the active session.
    ///
    /// Idempotent; calling with no session running is a no-op. After this
    /// returns, no further document or score updates become visible, even
    /// for bytes that were already buffered.
    pub fn cancel(&self) {
        let session = self.active.lock().expect("session slot poisoned").take();
        if let Some(session) = session {
            session.token.cancel();
            self.state.send_modify(|state| state.generating = false);
            debug!(session = %session.id, "generation cancelled");
        }
    }

    /// Clear document, score and error state.
    ///
    /// Does not touch the network or the rate-limit snapshot; use
    /// [`cancel`](Self::cancel) to stop a running session.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            state.document.clear();
            state.quality_score = None;
            state.error = None;
            state.retry_after_seconds = None;
        });
        debug!("session state reset");
    }

    /// Install a fresh session, cancelling any previous one.
    fn begin(&self) -> ActiveSession {
        let session = ActiveSession {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        };
        let previous = self
            .active
            .lock()
            .expect("session slot poisoned")
            .replace(session.clone());
        if let Some(previous) = previous {
            previous.token.cancel();
            debug!(session = %previous.id, "superseded by new generation");
        }
        self.state.send_modify(|state| {
            state.document.clear();
            state.quality_score = None;
            state.error = None;
            state.retry_after_seconds = None;
            state.generating = true;
        });
        session
    }

    /// Release the session slot if this session still owns it.
    fn finish(&self, session: &ActiveSession) {
        let mut slot = self.active.lock().expect("session slot poisoned");
        if slot.as_ref().is_some_and(|active| active.id == session.id) {
            *slot = None;
        }
    }

    /// Publish a state mutation unless the session has been cancelled.
    ///
    /// This is the single gate that makes cancellation final: once the
    /// token is cancelled, nothing further reaches subscribers.
    fn publish(&self, token: &CancellationToken, apply: impl FnOnce(&mut GenerationState)) {
        if token.is_cancelled() {
            return;
        }
        self.state.send_modify(apply);
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
        telemetry: &mut Telemetry,
    ) -> Result<GenerationResult, RawFailure> {
        // Dropping the in-flight request on cancellation aborts it at the
        // transport level instead of waiting out the response.
        let issued = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("cancellation observed before response");
                return Ok(GenerationResult {
                    documentation: String::new(),
                    quality_score: None,
                    metadata: None,
                });
            }
            issued = self.client.issue(request) => issued,
        };
        if let Some(info) = issued.rate_limit {
            self.publish(token, |state| state.rate_limit = Some(info));
        }
        let response = issued.outcome?;

        let body: BodyStream = Box::pin(response.bytes_stream());
        let mut events = EventStream::new(body);
        let mut document = DocumentAccumulator::new();
        let mut quality_score = None;
        let mut metadata = None;

        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!("cancellation observed, dropping stream");
                    break;
                }
                next = events.next() => next,
            };
            let Some(item) = next else { break };
            let event = item?;
            if token.is_cancelled() {
                break;
            }
            telemetry.record_event(&event);

            match event {
                StreamEvent::Chunk { content } => {
                    document.append_chunk(&content);
                    self.publish(token, |state| state.document = document.snapshot());
                }
                StreamEvent::Attribution { content } => {
                    document.append_attribution(&content);
                    self.publish(token, |state| state.document = document.snapshot());
                }
                StreamEvent::Complete {
                    quality_score: score,
                    metadata: meta,
                } => {
                    quality_score = Some(score);
                    metadata = meta;
                    self.publish(token, |state| state.quality_score = Some(score));
                    break;
                }
                StreamEvent::Error { error } => {
                    return Err(RawFailure::Event { message: error });
                }
            }
        }

        Ok(GenerationResult {
            documentation: document.into_string(),
            quality_score,
            metadata,
        })
    }
}
