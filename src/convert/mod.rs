//! Conversion pipeline
//!
//! Job records, the shared registry, the per-job worker, document assembly,
//! and the HTML-to-JSON bridge.

use thiserror::Error;

use crate::layout::LayoutError;
use crate::pdf::PdfError;

pub mod bridge;
pub mod html;
pub mod job;
pub mod registry;
pub mod worker;

pub use job::{ConversionJob, JobSnapshot, JobStatus};
pub use registry::JobRegistry;
pub use worker::{run_conversion, WorkerSettings};

/// Job-level failures; each one drives the job to its terminal error state
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{0}")]
    Pdf(#[from] PdfError),

    #[error("{0}")]
    Layout(#[from] LayoutError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("conversion cancelled")]
    Cancelled,

    #[error("conversion exceeded the {0}s budget")]
    DeadlineExceeded(u64),

    #[error("worker task failed: {0}")]
    TaskJoin(String),
}
