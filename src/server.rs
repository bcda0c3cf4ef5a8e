//!
//! slugdrop HTTP server
//! --------------------
//! Thin axum adapter over `LinkManager`. Handlers parse the request, hand the
//! work to the blocking pool (secret verification and disk I/O are blocking)
//! and render `AppError` as `{"status":"error","error":code,"message":...}` with
//! the mapped status.
//!
//! Routes:
//! - `GET /` health probe.
//! - `POST /api/links` multipart upload: `slug`, `days`, `pw`, repeated `files`.
//! - `GET /api/links/{slug}` resolve a live link.
//! - `DELETE /api/links/{slug}` revoke; secret in `x-upload-secret`.
//! - `GET /download/{slug}/{filename}` one stored file.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::lifecycle::LinkManager;
use crate::packager::UploadEntry;
use crate::sweeper::Sweeper;

pub const SECRET_HEADER: &str = "x-upload-secret";

/// Room for multipart framing and the text fields on top of the file bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

const CSP: &str = "default-src 'none'; frame-ancestors 'none'; base-uri 'none'; form-action 'self'";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LinkManager>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_retryable() {
            warn!(target: "http", code = self.code_str(), "{self}");
        } else if self.is_validation() {
            debug!(target: "http", code = self.code_str(), "rejected: {self}");
        }
        let body = json!({"status": "error", "error": self.code_str(), "message": self.to_string()});
        (status, Json(body)).into_response()
    }
}

async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| AppError::io(format!("worker failed: {e}")))?
}

async fn secure_headers(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    let h = res.headers_mut();
    h.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    h.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    h.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    h.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP));
    res
}

/// Build the router; exposed so tests can serve it on an ephemeral port.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.manager.policy().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/", get(|| async { "slugdrop ok" }))
        .route("/api/links", post(create_link))
        .route("/api/links/{slug}", get(resolve_link).delete(revoke_link))
        .route("/download/{slug}/{filename}", get(download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(secure_headers))
        .with_state(state)
}

fn multipart_error(e: axum::extract::multipart::MultipartError, max: u64) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { size: max.saturating_add(1), max }
    } else {
        AppError::BadRequest(e.body_text())
    }
}

async fn create_link(State(state): State<AppState>, mut multipart: Multipart) -> Result<impl IntoResponse, AppError> {
    let max = state.manager.policy().max_upload_bytes;
    let (mut slug, mut days, mut pw) = (None, None, None);
    let mut batch = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, max))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "slug" => slug = Some(field.text().await.map_err(|e| multipart_error(e, max))?),
            "days" => days = Some(field.text().await.map_err(|e| multipart_error(e, max))?),
            "pw" => pw = Some(field.text().await.map_err(|e| multipart_error(e, max))?),
            "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, max))?;
                // Browsers send an empty part when no file was picked.
                if file_name.is_empty() && bytes.is_empty() { continue; }
                batch.push(UploadEntry::new(file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }
    let pw = pw.ok_or(AppError::AuthFailure)?;
    let slug = slug.map(|s| s.trim().to_string()).ok_or_else(|| AppError::BadRequest("missing field 'slug'".into()))?;
    let days: i64 = days
        .ok_or_else(|| AppError::BadRequest("missing field 'days'".into()))?
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("'days' must be an integer".into()))?;

    let mgr = state.manager.clone();
    let link = blocking(move || mgr.submit_upload(&slug, days, batch, &pw)).await?;
    let url = format!("/api/links/{}", link.slug);
    Ok((StatusCode::CREATED, Json(json!({"status": "ok", "link": link, "url": url}))))
}

async fn resolve_link(State(state): State<AppState>, Path(slug): Path<String>) -> Result<impl IntoResponse, AppError> {
    let mgr = state.manager.clone();
    let resolved = blocking(move || mgr.resolve(&slug)).await?;
    Ok(Json(resolved))
}

async fn revoke_link(State(state): State<AppState>, Path(slug): Path<String>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    let pw = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(AppError::AuthFailure)?;
    let mgr = state.manager.clone();
    let report = blocking(move || mgr.revoke(&slug, &pw)).await?;
    Ok(Json(json!({"status": "ok", "files_removed": report.files_removed})))
}

pub(crate) fn content_type_for(filename: &str) -> &'static str {
    let ext = filename.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => "application/octet-stream",
    }
}

/// `attachment; filename="..."` with anything outside printable ASCII, and quotes
/// or backslashes, replaced by `_`.
pub(crate) fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

async fn download(State(state): State<AppState>, Path((slug, filename)): Path<(String, String)>) -> Result<Response, AppError> {
    let mgr = state.manager.clone();
    let name = filename.clone();
    let bytes = blocking(move || mgr.fetch_stored_file(&slug, &name)).await?;
    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&filename))), (header::CONTENT_DISPOSITION, disposition)],
        bytes,
    )
        .into_response())
}

fn log_startup(settings: &Settings) {
    let cwd = std::env::current_dir().ok();
    info!(target: "startup", "slugdrop starting. cwd={:?}, {}", cwd, settings.summary());
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: tokio::net::TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// Start the HTTP server and the sweeper; returns after Ctrl-C once both have stopped.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    log_startup(&settings);
    let manager = Arc::new(LinkManager::from_settings(&settings)?);
    let sweeper = Sweeper::new(manager.clone(), Duration::from_secs(settings.sweep_interval_secs)).spawn();

    let addr: SocketAddr = format!("0.0.0.0:{}", settings.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    info!(target: "startup", "Starting server on {}", addr);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(target: "startup", "cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
        info!(target: "startup", "shutdown requested");
    };
    let served = serve_on(listener, AppState { manager }, shutdown).await;
    sweeper.stop().await;
    served
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.PDF"), "application/pdf");
        assert_eq!(content_type_for("x_folders_2.zip"), "application/zip");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn disposition_is_header_safe() {
        assert_eq!(content_disposition("report 1.pdf"), "attachment; filename=\"report 1.pdf\"");
        assert_eq!(content_disposition("a\"b\\c.txt"), "attachment; filename=\"a_b_c.txt\"");
        assert_eq!(content_disposition("caf\u{e9}.txt"), "attachment; filename=\"caf_.txt\"");
    }

    #[test]
    fn errors_render_with_mapped_status() {
        let res = AppError::Expired("demo1".into()).into_response();
        assert_eq!(res.status(), StatusCode::GONE);
        let res = AppError::SlugInUse("demo1".into()).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
