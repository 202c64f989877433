//! Error types for storage, QR rendering, and request handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure reading or writing the link mapping.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize link mapping: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A git invocation exited unsuccessfully or could not be spawned.
    #[error("`git {command}` failed: {message}")]
    Git { command: String, message: String },
}

/// Failure producing a QR image.
#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to write QR image: {0}")]
    Io(#[from] std::io::Error),
}

/// Error surfaced by a request handler. Always rendered as a 500; the detail
/// goes to the log, not the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Qr(#[from] QrError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
    }
}
