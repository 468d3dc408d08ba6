//! Common imports for docstream applications.
//!
//! ```rust,ignore
//! use docstream::prelude::*;
//! ```

pub use crate::auth::{EnvToken, StaticToken, TokenProvider};
pub use crate::client::{Client, ClientBuilder};
pub use crate::error::{ErrorKind, GenerateError, Result};
pub use crate::session::{GenerationState, Generator};
pub use crate::stream::StreamEvent;
pub use crate::types::{
    DocType, GenerationRequest, GenerationResult, Grade, QualityScore, RateLimitInfo,
};
