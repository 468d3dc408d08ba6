#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(tail_expr_drop_order)]
//! Docstream is a streaming client for an AI documentation-generation
//! service: submit source code, receive a markdown document chunk by
//! chunk, and get every possible failure back as one classified error
//! type with retry guidance.
//!
//! The crate is organized around a small pipeline:
//!
//! - [`client::Client`] issues `POST /generate-stream` and captures
//!   rate-limit headers before any error branching.
//! - [`stream::EventStream`] decodes the `data: <json>` line protocol
//!   into [`stream::StreamEvent`]s across arbitrary read boundaries.
//! - [`document::DocumentAccumulator`] folds events into markdown,
//!   keeping code-fence parity intact.
//! - [`session::Generator`] drives one session at a time, publishes
//!   observable state per event and supports idempotent cancellation.
//! - [`classify`] maps any raw failure onto the [`error::ErrorKind`]
//!   taxonomy.
//!
//! # Example
//!
//! ```rust,ignore
//! use docstream::prelude::*;
//!
//! let client = Client::builder()
//!     .base_url("https://api.docstream.dev")
//!     .token(std::env::var("DOCSTREAM_API_TOKEN")?)
//!     .build();
//!
//! let generator = client.generator();
//! let result = generator
//!     .generate(GenerationRequest::new(code, DocType::Readme, "lib.rs"))
//!     .await?;
//! println!("{}", result.documentation);
//! ```

pub mod auth;
pub mod classify;
pub mod client;
pub mod document;
pub mod error;
pub mod prelude;
pub mod session;
pub mod stream;
pub mod telemetry;
pub mod types;

pub use auth::{EnvToken, StaticToken, TokenProvider};
pub use classify::classify;
pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, GENERATE_STREAM_PATH, Issued};
pub use document::DocumentAccumulator;
pub use error::{DEFAULT_RETRY_AFTER_SECS, ErrorKind, GenerateError, RawFailure, Result};
pub use session::{GenerationState, Generator, UsageListener};
pub use stream::{DATA_PREFIX, EventStream, StreamEvent};
pub use telemetry::{SessionMetrics, Telemetry};
pub use types::{
    ApiErrorBody, DocType, GenerationRequest, GenerationResult, Grade, QualityScore, RateLimitInfo,
};
