//! Conversion endpoints
//!
//! - POST   /convert            - upload a PDF, start a conversion job
//! - GET    /progress/:job_id   - poll job status
//! - GET    /result/:job_id     - retrieve the comparison view, consuming the job
//! - GET    /compare/:job_id    - retrieve the comparison view, read-only
//! - GET    /edit/:job_id       - editor for the persisted replica
//! - POST   /edit/:job_id       - save an edited replica, regenerate its JSON
//! - DELETE /convert/:job_id    - request cancellation of a running job

use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::admission;
use crate::convert::{self, html as doc_html, ConversionJob, JobStatus, WorkerSettings};
use crate::state::AppState;

/// Uploads above this are refused before admission even runs; admission
/// enforces the real ceiling with a proper message
const UPLOAD_BODY_LIMIT: usize = 256 * 1024 * 1024;

#[derive(Serialize)]
struct SubmitResponse {
    status: &'static str,
    job_id: String,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ErrorBody {
    fn rejection(message: String) -> Self {
        Self {
            status: "error",
            message: Some(message),
            error: None,
        }
    }

    fn not_found() -> Self {
        Self {
            status: "not_found",
            message: None,
            error: Some("Job not found".to_string()),
        }
    }
}

#[derive(Deserialize)]
struct EditSubmission {
    edited_html: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/convert", post(submit))
        .route("/convert/:job_id", axum::routing::delete(cancel))
        .route("/progress/:job_id", get(progress))
        .route("/result/:job_id", get(result))
        .route("/compare/:job_id", get(compare))
        .route("/edit/:job_id", get(edit_view).post(edit_save))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// POST /convert
///
/// Saves the uploaded file, runs admission checks, and spawns the worker
/// fire-and-forget; the response carries only the job identifier.
async fn submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("pdf") {
            let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
            match field.bytes().await {
                Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorBody::rejection(format!("Upload failed: {}", e))),
                    )
                        .into_response()
                }
            }
            break;
        }
    }

    let Some((file_name, bytes)) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::rejection("Missing 'pdf' form field".to_string())),
        )
            .into_response();
    };

    let job_id = Uuid::new_v4();
    let upload_dir = state.config().storage.upload_dir.clone();
    if let Err(e) = tokio::fs::create_dir_all(&upload_dir).await {
        return internal_error(format!("could not create upload dir: {}", e));
    }
    // Key the stored upload by job id; client file names are untrusted
    let pdf_path = upload_dir.join(format!("{}.pdf", job_id));
    if let Err(e) = tokio::fs::write(&pdf_path, &bytes).await {
        return internal_error(format!("could not store upload: {}", e));
    }

    // Admission runs on a blocking thread: it opens and scans the PDF
    let limits = state.config().limits.clone();
    let admission_path = pdf_path.clone();
    let errors = match tokio::task::spawn_blocking(move || {
        admission::validate(&admission_path, &limits)
    })
    .await
    {
        Ok(errors) => errors,
        Err(e) => return internal_error(format!("admission check failed: {}", e)),
    };

    if !errors.is_empty() {
        warn!(file = %file_name, reasons = errors.len(), "upload rejected");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::rejection(errors.join(" | "))),
        )
            .into_response();
    }

    info!(job_id = %job_id, file = %file_name, "upload admitted");
    state.jobs().insert(ConversionJob::new(job_id)).await;

    let settings = WorkerSettings {
        output_dir: state.config().storage.output_dir.clone(),
        timeout: Duration::from_secs(state.config().jobs.timeout_secs),
    };
    tokio::spawn(convert::run_conversion(
        state.jobs().clone(),
        job_id,
        pdf_path,
        settings,
    ));

    Json(SubmitResponse {
        status: "ok",
        job_id: job_id.to_string(),
    })
    .into_response()
}

/// GET /progress/:job_id
async fn progress(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    let Some(id) = parse_id(&job_id) else {
        return not_found();
    };
    match state.jobs().snapshot(id).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => not_found(),
    }
}

/// GET /result/:job_id - consumes the job record; retrievable exactly once
async fn result(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    let Some(id) = parse_id(&job_id) else {
        return not_found();
    };
    match state.jobs().take_result(id).await {
        Some((JobStatus::Completed, Some(html))) => Html(html).into_response(),
        Some((status, _)) => incomplete(status),
        None => not_found(),
    }
}

/// GET /compare/:job_id - read-only view of the same document
async fn compare(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    let Some(id) = parse_id(&job_id) else {
        return not_found();
    };
    match state.jobs().peek_result(id).await {
        Some((JobStatus::Completed, Some(html))) => Html(html).into_response(),
        Some((status, _)) => incomplete(status),
        None => not_found(),
    }
}

/// DELETE /convert/:job_id
async fn cancel(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    let Some(id) = parse_id(&job_id) else {
        return not_found();
    };
    if state.jobs().request_cancel(id).await {
        StatusCode::ACCEPTED.into_response()
    } else {
        not_found()
    }
}

/// GET /edit/:job_id
async fn edit_view(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    if parse_id(&job_id).is_none() {
        return not_found();
    }
    let html_path = state
        .config()
        .storage
        .output_dir
        .join(format!("{}.html", job_id));
    let content = tokio::fs::read_to_string(&html_path).await.unwrap_or_default();
    Html(doc_html::editor_document(&job_id, &content)).into_response()
}

/// POST /edit/:job_id - overwrite the replica and regenerate its JSON
async fn edit_save(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Form(submission): Form<EditSubmission>,
) -> impl IntoResponse {
    if parse_id(&job_id).is_none() {
        return not_found();
    }
    let output_dir = &state.config().storage.output_dir;
    if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
        return internal_error(format!("could not create output dir: {}", e));
    }

    let html_path = output_dir.join(format!("{}.html", job_id));
    if let Err(e) = tokio::fs::write(&html_path, &submission.edited_html).await {
        return internal_error(format!("could not save edited HTML: {}", e));
    }

    let document = convert::bridge::html_to_document(&submission.edited_html);
    let json = match serde_json::to_string_pretty(&document) {
        Ok(json) => json,
        Err(e) => return internal_error(format!("could not derive JSON: {}", e)),
    };
    let json_path = output_dir.join(format!("{}.json", job_id));
    if let Err(e) = tokio::fs::write(&json_path, json).await {
        return internal_error(format!("could not save JSON: {}", e));
    }

    info!(job_id = %job_id, "edited replica saved");
    Html(format!(
        r#"Changes saved! <a href="/compare/{}">Go back</a>"#,
        job_id
    ))
    .into_response()
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn not_found() -> axum::response::Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody::not_found())).into_response()
}

fn incomplete(status: JobStatus) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody::rejection(format!(
            "Conversion not completed. Status: {}",
            status.as_str()
        ))),
    )
        .into_response()
}

fn internal_error(message: String) -> axum::response::Response {
    warn!(error = %message, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::rejection(message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::convert::ConversionJob;

    fn app(state: AppState) -> Router {
        router().with_state(state)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn progress_unknown_job_is_not_found() {
        let state = AppState::new(Config::default());
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/progress/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_string(response).await;
        assert!(body.contains("not_found"));
        assert!(body.contains("Job not found"));
    }

    #[tokio::test]
    async fn progress_reports_job_snapshot() {
        let state = AppState::new(Config::default());
        let id = Uuid::new_v4();
        state.jobs().insert(ConversionJob::new(id)).await;

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/progress/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(r#""status":"starting""#));
        assert!(body.contains(r#""progress":0"#));
    }

    #[tokio::test]
    async fn result_consumes_while_compare_does_not() {
        let state = AppState::new(Config::default());
        let id = Uuid::new_v4();
        state.jobs().insert(ConversionJob::new(id)).await;
        state
            .jobs()
            .update(id, |job| {
                job.complete("<html>done</html>".to_string(), "done".to_string())
            })
            .await;

        // Read-only view twice
        for _ in 0..2 {
            let response = app(state.clone())
                .oneshot(
                    Request::builder()
                        .uri(format!("/compare/{}", id))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // Consuming view once
        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/result/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<html>done</html>");

        // Gone afterwards
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/result/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn result_of_running_job_is_bad_request() {
        let state = AppState::new(Config::default());
        let id = Uuid::new_v4();
        state.jobs().insert(ConversionJob::new(id)).await;

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/result/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("not completed"));
    }

    #[tokio::test]
    async fn cancel_flags_running_jobs() {
        let state = AppState::new(Config::default());
        let id = Uuid::new_v4();
        state.jobs().insert(ConversionJob::new(id)).await;

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/convert/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(state.jobs().cancel_requested(id).await);
    }
}
