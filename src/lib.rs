#![doc = "llm-ingest: flatten a Git repository into one LLM-ready text artifact."]

//! The pipeline resolves a source string (remote URL or local directory) into
//! a query, clones remotes through the external `git` binary, walks the tree
//! concurrently under hard resource ceilings, and renders a summary, a
//! directory tree and the concatenated file contents.
//!
//! # Usage
//! Call [`ingest`] with a source string and [`IngestOptions`], or plug in a
//! custom [`fetch::Fetcher`] via [`ingest_with`].

pub mod cli;
pub mod error;
pub mod fetch;
pub mod ignore_defaults;
pub mod ingest;
pub mod limiter;
pub mod overrides;
pub mod patterns;
pub mod render;
pub mod resolve;
pub mod scan;

pub use error::IngestError;
pub use ingest::{ingest, ingest_with, Digest, IngestOptions};
pub use limiter::Limiter;
pub use resolve::{IngestQuery, DEFAULT_MAX_FILE_SIZE};
