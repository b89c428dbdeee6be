//! Attempt outcome: the tagged result of one timed attempt.
//!
//! The retry loop is driven by matching on [`AttemptOutcome`]; failures are
//! only turned into an `ApiError` at the client's outer boundary.

use std::fmt;

use crate::domain::{ApiError, TransportError, UpstreamError};
use crate::ports::HttpResponse;

/// Why an attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    Upstream(UpstreamError),
    Transport(TransportError),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Upstream(e) => write!(f, "HTTP {}: {}", e.status_code(), e.message()),
            FailureCause::Transport(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl From<FailureCause> for ApiError {
    fn from(cause: FailureCause) -> Self {
        match cause {
            FailureCause::Upstream(e) => ApiError::Upstream(e),
            FailureCause::Transport(e) => ApiError::Transport(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(HttpResponse),
    RetryableFailure(FailureCause),
    TerminalFailure(FailureCause),
}

/// Classification of a received status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Terminal,
    Retryable,
}

/// `[200,400)` success; `[400,500)` except 429 terminal; everything else
/// (429, 5xx, and statuses outside `[200,600)`) retryable.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=399 => StatusClass::Success,
        429 => StatusClass::Retryable,
        400..=499 => StatusClass::Terminal,
        _ => StatusClass::Retryable,
    }
}

impl AttemptOutcome {
    pub fn from_response(response: HttpResponse) -> Self {
        match classify_status(response.status) {
            StatusClass::Success => AttemptOutcome::Success(response),
            StatusClass::Terminal => AttemptOutcome::TerminalFailure(upstream_cause(&response)),
            StatusClass::Retryable => AttemptOutcome::RetryableFailure(upstream_cause(&response)),
        }
    }

    /// No response was obtained; always worth another try.
    pub fn from_transport(error: TransportError) -> Self {
        AttemptOutcome::RetryableFailure(FailureCause::Transport(error))
    }
}

fn upstream_cause(response: &HttpResponse) -> FailureCause {
    FailureCause::Upstream(UpstreamError::from_response(
        response.status,
        response.status_text(),
        &response.body,
    ))
}
