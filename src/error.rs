//! Unified application error model and mapping helpers.
//! Every failure reported by the collection store, the file gateway and the HTTP layer
//! is an `AppError`: a machine-distinguishable kind plus a stable code and a message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AppError {
    NotFound { code: String, message: String },
    AlreadyExists { code: String, message: String },
    InvalidPath { code: String, message: String },
    InvalidInput { code: String, message: String },
    #[serde(rename = "IOFailure")]
    Io { code: String, message: String },
    ConcurrencyConflict { code: String, message: String },
    Unauthorized { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::NotFound { code, .. }
            | AppError::AlreadyExists { code, .. }
            | AppError::InvalidPath { code, .. }
            | AppError::InvalidInput { code, .. }
            | AppError::Io { code, .. }
            | AppError::ConcurrencyConflict { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::NotFound { message, .. }
            | AppError::AlreadyExists { message, .. }
            | AppError::InvalidPath { message, .. }
            | AppError::InvalidInput { message, .. }
            | AppError::Io { message, .. }
            | AppError::ConcurrencyConflict { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    /// Kind string clients branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "NotFound",
            AppError::AlreadyExists { .. } => "AlreadyExists",
            AppError::InvalidPath { .. } => "InvalidPath",
            AppError::InvalidInput { .. } => "InvalidInput",
            AppError::Io { .. } => "IOFailure",
            AppError::ConcurrencyConflict { .. } => "ConcurrencyConflict",
            AppError::Unauthorized { .. } => "Unauthorized",
            AppError::Internal { .. } => "Internal",
        }
    }

    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn already_exists<S: Into<String>>(code: S, msg: S) -> Self { AppError::AlreadyExists { code: code.into(), message: msg.into() } }
    pub fn invalid_path<S: Into<String>>(code: S, msg: S) -> Self { AppError::InvalidPath { code: code.into(), message: msg.into() } }
    pub fn invalid_input<S: Into<String>>(code: S, msg: S) -> Self { AppError::InvalidInput { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::ConcurrencyConflict { code: code.into(), message: msg.into() } }
    pub fn unauthorized<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unauthorized { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::NotFound { .. } => 404,
            AppError::AlreadyExists { .. } => 409,
            AppError::InvalidPath { .. } => 400,
            AppError::InvalidInput { .. } => 400,
            AppError::Io { .. } => 500,
            AppError::ConcurrencyConflict { .. } => 409,
            AppError::Unauthorized { .. } => 401,
            AppError::Internal { .. } => 500,
        }
    }

    /// Wrap an I/O error that happened while performing `op`.
    pub fn from_io(op: &str, err: &std::io::Error) -> Self {
        AppError::Io { code: "io_error".into(), message: format!("{op}: {err}") }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { code: "io_error".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput { code: "invalid_json".into(), message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "status": "error",
            "kind": self.kind(),
            "code": self.code_str(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
