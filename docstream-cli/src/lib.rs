//! docstream CLI library for batch documentation generation.
//!
//! This crate drives the `docstream` client from the command line.

pub mod batch;

pub use batch::{BatchConfig, BatchReport, BatchRunner};
