//! Errors - エラー型と分類
//!
//! 呼び出し側は `ApiError` を網羅的に match して分岐します
//! （"not found" / "connection lost" / "too many requests" など）。
//!
//! - `ValidationError`: ネットワークに出る前に入力を拒否
//! - `UpstreamError`: 非 2xx のレスポンスを受け取った
//! - `TransportError`: 使えるレスポンスが得られなかった（timeout, 接続失敗, リトライ枯渇）

use serde::Deserialize;
use thiserror::Error;

/// A parsed non-2xx response from the upstream. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    message: String,
    status_code: u16,
    details: Option<String>,
}

/// Error body shape used by the upstream: `{"error": "...", "details": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>, status_code: u16, details: Option<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            details,
        }
    }

    /// Build from a received response.
    ///
    /// A body that is not JSON (or is empty, or lacks `error`) falls back to
    /// the HTTP status text.
    pub fn from_response(status_code: u16, status_text: &str, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<ErrorBody>(body).ok();
        let (error, details) = match parsed {
            Some(b) => (b.error, b.details),
            None => (None, None),
        };

        let message = error
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("API Error: {status_text}"));
        let details = details.filter(|d| !d.is_empty());

        Self::new(message, status_code, details)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

/// No usable response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Caller-supplied input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Closed set of failures surfaced by the client, helpers and coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("upstream error (status {}): {}", .0.status_code(), .0.message())]
    Upstream(#[from] UpstreamError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// ErrorKind は UI 側が分岐するための粗い分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    TooManyRequests,
    Rejected,
    ServerError,
    ConnectionLost,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::InvalidInput,
            ApiError::Upstream(e) => match e.status_code() {
                404 => ErrorKind::NotFound,
                429 => ErrorKind::TooManyRequests,
                400..=499 => ErrorKind::Rejected,
                _ => ErrorKind::ServerError,
            },
            ApiError::Transport(_) => ErrorKind::ConnectionLost,
        }
    }

    /// HTTP status of the upstream response, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Upstream(e) => Some(e.status_code()),
            ApiError::Validation(_) | ApiError::Transport(_) => None,
        }
    }
}
