//! Unified application error model and mapping helpers.
//! One enum covers every outcome the link lifecycle can report, from validation
//! rejections through expected control-flow branches (`SlugInUse`, `NotFound`,
//! `Expired`) to storage failures. Frontends map it to protocol codes via
//! `code_str()` and `http_status()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid upload secret")]
    AuthFailure,
    #[error("invalid slug '{0}': use letters, digits, '-' and '_' only")]
    InvalidSlug(String),
    #[error("expiry must be between 1 and {max} days, got {days}")]
    InvalidExpiry { days: i64, max: u32 },
    #[error("at least one file required")]
    EmptyUpload,
    #[error("file type not allowed: {0}")]
    DisallowedType(String),
    #[error("unsafe file name: {0}")]
    UnsafePath(String),
    #[error("too many files: {count} (max {max} per upload)")]
    TooManyFiles { count: usize, max: usize },
    #[error("upload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: u64, max: u64 },
    #[error("malformed request: {0}")]
    BadRequest(String),
    #[error("slug '{0}' is already in use and not expired")]
    SlugInUse(String),
    #[error("link not found: {0}")]
    NotFound(String),
    #[error("link expired: {0}")]
    Expired(String),
    #[error("storage failure: {0}")]
    Io(String),
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::AuthFailure => "auth_failure",
            AppError::InvalidSlug(_) => "invalid_slug",
            AppError::InvalidExpiry { .. } => "invalid_expiry",
            AppError::EmptyUpload => "empty_upload",
            AppError::DisallowedType(_) => "disallowed_type",
            AppError::UnsafePath(_) => "unsafe_path",
            AppError::TooManyFiles { .. } => "too_many_files",
            AppError::PayloadTooLarge { .. } => "payload_too_large",
            AppError::BadRequest(_) => "bad_request",
            AppError::SlugInUse(_) => "slug_in_use",
            AppError::NotFound(_) => "not_found",
            AppError::Expired(_) => "expired",
            AppError::Io(_) => "io_failure",
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::AuthFailure => 401,
            AppError::InvalidSlug(_)
            | AppError::InvalidExpiry { .. }
            | AppError::EmptyUpload
            | AppError::DisallowedType(_)
            | AppError::UnsafePath(_)
            | AppError::TooManyFiles { .. }
            | AppError::BadRequest(_) => 400,
            AppError::PayloadTooLarge { .. } => 413,
            AppError::SlugInUse(_) => 409,
            AppError::NotFound(_) => 404,
            AppError::Expired(_) => 410,
            AppError::Io(_) => 503,
        }
    }

    /// Only storage failures are worth retrying unchanged; everything else is a
    /// property of the request or of the slug's current state.
    pub fn is_retryable(&self) -> bool { matches!(self, AppError::Io(_)) }

    /// Validation rejections: detected before anything is committed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidSlug(_)
                | AppError::InvalidExpiry { .. }
                | AppError::EmptyUpload
                | AppError::DisallowedType(_)
                | AppError::UnsafePath(_)
                | AppError::TooManyFiles { .. }
                | AppError::PayloadTooLarge { .. }
        )
    }

    pub fn io<S: Into<String>>(msg: S) -> Self { AppError::Io(msg.into()) }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self { AppError::Io(err.to_string()) }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self { AppError::Io(format!("link store: {err}")) }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self { AppError::Io(format!("archive: {err}")) }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self { AppError::Io(format!("encoding: {err}")) }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
