use super::*;

#[test]
fn http_status_mapping() {
    assert_eq!(AppError::AuthFailure.http_status(), 401);
    assert_eq!(AppError::InvalidSlug("a/b".into()).http_status(), 400);
    assert_eq!(AppError::InvalidExpiry { days: 9, max: 7 }.http_status(), 400);
    assert_eq!(AppError::EmptyUpload.http_status(), 400);
    assert_eq!(AppError::DisallowedType("x.exe".into()).http_status(), 400);
    assert_eq!(AppError::UnsafePath("../x".into()).http_status(), 400);
    assert_eq!(AppError::TooManyFiles { count: 51, max: 50 }.http_status(), 400);
    assert_eq!(AppError::PayloadTooLarge { size: 2, max: 1 }.http_status(), 413);
    assert_eq!(AppError::SlugInUse("demo".into()).http_status(), 409);
    assert_eq!(AppError::NotFound("demo".into()).http_status(), 404);
    assert_eq!(AppError::Expired("demo".into()).http_status(), 410);
    assert_eq!(AppError::io("disk").http_status(), 503);
}

#[test]
fn codes_are_stable() {
    assert_eq!(AppError::SlugInUse("x".into()).code_str(), "slug_in_use");
    assert_eq!(AppError::Io("x".into()).code_str(), "io_failure");
    assert_eq!(AppError::PayloadTooLarge { size: 2, max: 1 }.code_str(), "payload_too_large");
}

#[test]
fn only_io_is_retryable() {
    assert!(AppError::io("disk full").is_retryable());
    assert!(!AppError::SlugInUse("x".into()).is_retryable());
    assert!(!AppError::AuthFailure.is_retryable());
}

#[test]
fn control_flow_outcomes_are_not_validation() {
    assert!(AppError::UnsafePath("..".into()).is_validation());
    assert!(!AppError::SlugInUse("x".into()).is_validation());
    assert!(!AppError::Expired("x".into()).is_validation());
    assert!(!AppError::NotFound("x".into()).is_validation());
}

#[test]
fn io_errors_convert() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
    assert!(matches!(err, AppError::Io(_)));
    assert!(err.to_string().contains("nope"));
}
