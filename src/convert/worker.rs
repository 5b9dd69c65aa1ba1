//! Conversion worker
//!
//! One worker per job, spawned fire-and-forget at submission. Pages are
//! processed strictly sequentially in page order; the font table is built
//! once before the page loop and is read-only afterwards. CPU-bound work
//! runs under spawn_blocking so the runtime stays responsive.
//!
//! Cancellation and the per-job wall-clock budget are checked between
//! pages; either trips the job into its terminal error state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::task;
use tracing::{error, info};
use uuid::Uuid;

use super::job::{page_progress, JobStatus};
use super::{bridge, html, ConvertError, JobRegistry};
use crate::layout::{compose_page, FontResolver};
use crate::pdf::{self, PdfFile};

/// Per-job settings handed to the worker at spawn time
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

/// Drive one conversion job to a terminal state
pub async fn run_conversion(
    registry: JobRegistry,
    job_id: Uuid,
    pdf_path: PathBuf,
    settings: WorkerSettings,
) {
    info!(job_id = %job_id, path = %pdf_path.display(), "starting conversion");
    if let Err(e) = convert(&registry, job_id, &pdf_path, &settings).await {
        match &e {
            ConvertError::Cancelled => info!(job_id = %job_id, "conversion cancelled"),
            other => error!(job_id = %job_id, error = %other, "conversion failed"),
        }
        registry.update(job_id, |job| job.fail(e.to_string())).await;
    }
}

async fn convert(
    registry: &JobRegistry,
    job_id: Uuid,
    pdf_path: &Path,
    settings: &WorkerSettings,
) -> Result<(), ConvertError> {
    let started = Instant::now();

    // Whole-document preview payload for the comparison view
    let data = tokio::fs::read(pdf_path).await?;
    let preview = BASE64.encode(&data);
    {
        let preview = preview.clone();
        registry
            .update(job_id, |job| job.pdf_base64 = Some(preview))
            .await;
    }

    let file = task::spawn_blocking(move || PdfFile::from_bytes(data))
        .await
        .map_err(join_error)??;
    let total = file.page_count();

    // Font table: built once, read-only for the rest of the job
    let resolver = {
        let file = file.clone();
        task::spawn_blocking(move || {
            let fonts = pdf::fonts::extract_fonts(file.objects());
            FontResolver::build(&fonts)
        })
        .await
        .map_err(join_error)?
    };
    let resolver = Arc::new(resolver);

    registry
        .update(job_id, |job| {
            job.status = JobStatus::Processing;
            job.set_progress(5);
        })
        .await;

    let mut pages_html = String::new();
    for index in 0..total {
        if registry.cancel_requested(job_id).await {
            return Err(ConvertError::Cancelled);
        }
        if started.elapsed() > settings.timeout {
            return Err(ConvertError::DeadlineExceeded(settings.timeout.as_secs()));
        }

        registry
            .update(job_id, |job| {
                job.set_progress(page_progress(index, total));
                job.message = format!("Processing page {} of {}", index + 1, total);
            })
            .await;

        let page_html = {
            let file = file.clone();
            let resolver = Arc::clone(&resolver);
            task::spawn_blocking(move || -> Result<String, ConvertError> {
                let content = pdf::extract_page(&file, index)?;
                let layout = compose_page(&content, &resolver)?;
                Ok(layout.to_html())
            })
            .await
            .map_err(join_error)??
        };
        pages_html.push_str(&page_html);
        pages_html.push('\n');
    }

    registry
        .update(job_id, |job| {
            job.status = JobStatus::Finalizing;
            job.set_progress(95);
            job.message = "Finalizing HTML output...".to_string();
        })
        .await;

    let seconds = started.elapsed().as_secs_f64();
    let font_css = resolver.face_css();
    let clean = html::clean_document(&pages_html, font_css);
    let comparison = html::comparison_document(&pages_html, font_css, &preview, total, seconds);

    // Persisted artifacts: the replica and its structured re-derivation
    tokio::fs::create_dir_all(&settings.output_dir).await?;
    tokio::fs::write(settings.output_dir.join(format!("{}.html", job_id)), &clean).await?;
    let json = serde_json::to_string_pretty(&bridge::html_to_document(&clean))?;
    tokio::fs::write(settings.output_dir.join(format!("{}.json", job_id)), json).await?;

    registry
        .update(job_id, |job| {
            job.complete(
                comparison,
                format!("Conversion completed in {:.2} seconds", seconds),
            )
        })
        .await;
    info!(job_id = %job_id, pages = total, seconds, "conversion completed");
    Ok(())
}

fn join_error(e: task::JoinError) -> ConvertError {
    ConvertError::TaskJoin(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionJob;
    use crate::pdf::test_support::minimal_pdf_bytes;

    fn settings(dir: &Path) -> WorkerSettings {
        WorkerSettings {
            output_dir: dir.to_path_buf(),
            timeout: Duration::from_secs(60),
        }
    }

    async fn submit(registry: &JobRegistry, dir: &Path) -> (Uuid, PathBuf) {
        let id = Uuid::new_v4();
        registry.insert(ConversionJob::new(id)).await;
        let pdf_path = dir.join("input.pdf");
        tokio::fs::write(&pdf_path, minimal_pdf_bytes()).await.unwrap();
        (id, pdf_path)
    }

    #[tokio::test]
    async fn conversion_reaches_completed_and_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JobRegistry::new();
        let (id, pdf_path) = submit(&registry, dir.path()).await;

        run_conversion(registry.clone(), id, pdf_path, settings(dir.path())).await;

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed, "{:?}", snapshot);
        assert_eq!(snapshot.progress, 100);
        assert!(snapshot.error.is_none());

        assert!(dir.path().join(format!("{}.html", id)).exists());
        assert!(dir.path().join(format!("{}.json", id)).exists());

        let (_, result) = registry.take_result(id).await.unwrap();
        let result = result.unwrap();
        assert!(result.contains("page-container"));
        assert!(result.contains("data:application/pdf;base64,"));
    }

    #[tokio::test]
    async fn missing_input_file_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JobRegistry::new();
        let id = Uuid::new_v4();
        registry.insert(ConversionJob::new(id)).await;

        run_conversion(
            registry.clone(),
            id,
            dir.path().join("nope.pdf"),
            settings(dir.path()),
        )
        .await;

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert!(snapshot.error.is_some());
        assert!(snapshot.message.starts_with("Error:"));
    }

    #[tokio::test]
    async fn garbage_input_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JobRegistry::new();
        let id = Uuid::new_v4();
        registry.insert(ConversionJob::new(id)).await;
        let path = dir.path().join("bad.pdf");
        tokio::fs::write(&path, b"definitely not a pdf").await.unwrap();

        run_conversion(registry.clone(), id, path, settings(dir.path())).await;

        assert_eq!(
            registry.snapshot(id).await.unwrap().status,
            JobStatus::Error
        );
    }

    #[tokio::test]
    async fn pre_cancelled_job_ends_in_error_without_processing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JobRegistry::new();
        let (id, pdf_path) = submit(&registry, dir.path()).await;
        registry.request_cancel(id).await;

        run_conversion(registry.clone(), id, pdf_path, settings(dir.path())).await;

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert!(snapshot.error.unwrap().contains("cancelled"));
        assert!(!dir.path().join(format!("{}.html", id)).exists());
    }

    #[tokio::test]
    async fn exhausted_budget_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let registry = JobRegistry::new();
        let (id, pdf_path) = submit(&registry, dir.path()).await;

        let mut settings = settings(dir.path());
        settings.timeout = Duration::ZERO;
        run_conversion(registry.clone(), id, pdf_path, settings).await;

        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert!(snapshot.error.unwrap().contains("budget"));
    }
}
