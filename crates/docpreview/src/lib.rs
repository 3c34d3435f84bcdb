//! docpreview - office documents to PDF, over HTTP
//!
//! docpreview classifies an uploaded document by extension into one of three
//! families (document, worksheet, presentation), renders it to PDF through a
//! pluggable [`Renderer`](render::Renderer) and streams the result back as a
//! download.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docpreview::{PreviewConfig, Previewer};
//!
//! # #[tokio::main]
//! # async fn main() -> docpreview::Result<()> {
//! let previewer = Previewer::with_libreoffice(PreviewConfig::default())?;
//! let result = previewer.convert_file("report.docx").await?;
//! result.persist_to("report.pdf").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core Module** (`core`): configuration, classification, staging, pipeline
//! - **Render Module** (`render`): renderer trait, option wiring, LibreOffice backend
//! - **API Module** (`api`, feature `api`): axum router and download responses

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod render;

#[cfg(feature = "api")]
pub mod api;

pub use error::{PreviewError, Result};

pub use core::config::PreviewConfig;
pub use core::formats::{Classification, FormatRegistry, SupportedFormat, classify};
pub use core::pipeline::{ConversionRequest, ConversionResult, Previewer};
pub use core::staging::{StagingArea, TempArtifact};
