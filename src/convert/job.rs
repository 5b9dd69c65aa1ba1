//! Conversion job records
//!
//! One job per submitted document, tracked by identifier from submission to
//! a terminal state. Only the worker mutates a job; the polling interface
//! reads snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Job state machine: starting -> processing -> finalizing -> completed | error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Processing,
    Finalizing,
    Completed,
    Error,
}

impl JobStatus {
    /// Terminal states accept no further updates
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Finalizing => "finalizing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

/// Progress after `completed` of `total` pages: the 5-90% band is reserved
/// for page processing, below it document open and font extraction, above
/// it finalization
pub fn page_progress(completed: usize, total: usize) -> u8 {
    5 + (85 * completed / total.max(1)) as u8
}

/// One tracked conversion
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    /// Composed comparison document, set on completion
    pub result: Option<String>,
    pub error: Option<String>,
    /// Whole-document preview payload, set while starting
    pub pdf_base64: Option<String>,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
}

impl ConversionJob {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            status: JobStatus::Starting,
            progress: 0,
            message: "Initializing conversion...".to_string(),
            result: None,
            error: None,
            pdf_base64: None,
            cancel_requested: false,
            created_at: Utc::now(),
        }
    }

    /// Progress is monotonically non-decreasing and capped at 100
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    pub fn complete(&mut self, result: String, message: String) {
        self.status = JobStatus::Completed;
        self.set_progress(100);
        self.message = message;
        self.result = Some(result);
    }

    pub fn fail(&mut self, error: String) {
        self.status = JobStatus::Error;
        self.message = format!("Error: {}", error);
        self.error = Some(error);
    }
}

/// Wire shape returned by the polling interface
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ConversionJob> for JobSnapshot {
    fn from(job: &ConversionJob) -> Self {
        Self {
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            error: job.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_band_for_pages() {
        assert_eq!(page_progress(0, 10), 5);
        assert_eq!(page_progress(5, 10), 47);
        assert_eq!(page_progress(10, 10), 90);
        // Guard against a zero-page document
        assert_eq!(page_progress(0, 0), 5);
    }

    #[test]
    fn progress_never_decreases() {
        let mut job = ConversionJob::new(Uuid::new_v4());
        job.set_progress(40);
        job.set_progress(20);
        assert_eq!(job.progress, 40);
        job.set_progress(200);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn completion_is_terminal_with_full_progress() {
        let mut job = ConversionJob::new(Uuid::new_v4());
        job.complete("<html></html>".to_string(), "done".to_string());
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.status.is_terminal());
        assert_eq!(job.progress, 100);
        assert!(job.result.is_some());
        assert!(job.error.is_none());
    }

    #[test]
    fn failure_captures_the_error() {
        let mut job = ConversionJob::new(Uuid::new_v4());
        job.fail("boom".to_string());
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.status.is_terminal());
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert_eq!(job.message, "Error: boom");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn snapshot_omits_absent_error() {
        let job = ConversionJob::new(Uuid::new_v4());
        let json = serde_json::to_string(&JobSnapshot::from(&job)).unwrap();
        assert!(!json.contains("error"));
    }
}
