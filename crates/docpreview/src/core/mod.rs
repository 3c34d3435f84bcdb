//! Core conversion pipeline.
//!
//! - `config`: service configuration and discovery
//! - `formats`: extension → family classification
//! - `staging`: per-request staging files for rendered PDFs
//! - `pipeline`: the `Previewer` that ties them to a renderer

pub mod config;
pub mod formats;
pub mod pipeline;
pub mod staging;
