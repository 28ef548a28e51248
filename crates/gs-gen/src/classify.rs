//! Maps raw upstream failures onto the small set of categories the
//! presentation layer knows how to explain.
//!
//! Structured signals (HTTP status, transport failure) are consulted at
//! their own rung of the ladder, so a message that also carries text
//! markers still lands on the same category it would by text alone.

use crate::service::UpstreamError;
use serde::Serialize;

const LOGIN_REQUIRED_INDICATORS: &[&str] = &["key_required", "api_key_missing"];

const RATE_LIMIT_INDICATORS: &[&str] = &["429", "quota", "too many requests"];

const INVALID_CREDENTIAL_STATUS_INDICATORS: &[&str] = &["400"];

const INVALID_CREDENTIAL_INDICATORS: &[&str] = &["key", "invalid"];

const CONTENT_POLICY_INDICATORS: &[&str] = &["safety", "blocked", "policy"];

const NETWORK_INDICATORS: &[&str] = &["failed to fetch", "fetch", "network"];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    LoginRequired,
    RateLimited,
    InvalidCredential,
    ContentPolicyViolation,
    NetworkError,
    /// Video job exceeded its attempt bound or deadline.
    Timeout,
    /// Video job abandoned through its cancellation token.
    Cancelled,
    Generic,
}

impl ErrorCategory {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::LoginRequired => "LOGIN_REQUIRED",
            ErrorCategory::RateLimited => "RATE_LIMITED",
            ErrorCategory::InvalidCredential => "INVALID_CREDENTIAL",
            ErrorCategory::ContentPolicyViolation => "CONTENT_POLICY_VIOLATION",
            ErrorCategory::NetworkError => "NETWORK_ERROR",
            ErrorCategory::Timeout => "TIMEOUT",
            ErrorCategory::Cancelled => "CANCELLED",
            ErrorCategory::Generic => "GENERIC",
        }
    }

    /// Key of the display string shown for this category.
    pub fn message_key(&self) -> &'static str {
        match self {
            ErrorCategory::LoginRequired => "loginRequired",
            ErrorCategory::RateLimited => "errorRateLimit",
            ErrorCategory::InvalidCredential => "errorInvalidKey",
            ErrorCategory::ContentPolicyViolation => "errorContentPolicy",
            ErrorCategory::NetworkError => "errorNetwork",
            ErrorCategory::Timeout => "errorTimeout",
            ErrorCategory::Cancelled => "errorCancelled",
            ErrorCategory::Generic => "errorGeneric",
        }
    }

    /// Whether a user-initiated retry is likely to help. Nothing retries automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::RateLimited | ErrorCategory::NetworkError | ErrorCategory::Timeout
        )
    }

    /// Short label for terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::LoginRequired => "Login Required",
            ErrorCategory::RateLimited => "Rate Limited",
            ErrorCategory::InvalidCredential => "Invalid API Key",
            ErrorCategory::ContentPolicyViolation => "Blocked by Content Policy",
            ErrorCategory::NetworkError => "Network Error",
            ErrorCategory::Timeout => "Timed Out",
            ErrorCategory::Cancelled => "Cancelled",
            ErrorCategory::Generic => "Generation Failed",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A failure after classification: the stable category plus the raw message for logs.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{category}: {message}")]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn login_required() -> Self {
        Self::new(ErrorCategory::LoginRequired, "KEY_REQUIRED")
    }
}

impl From<UpstreamError> for ClassifiedError {
    fn from(err: UpstreamError) -> Self {
        Self::new(classify(&err), err.to_string())
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Classifies a bare failure message.
pub fn classify_message(message: &str) -> ErrorCategory {
    classify_signals(message, None, false, true)
}

pub fn classify(err: &UpstreamError) -> ErrorCategory {
    if matches!(err, UpstreamError::CredentialMissing) {
        return ErrorCategory::LoginRequired;
    }
    classify_signals(
        &err.to_string(),
        err.status(),
        err.is_transport(),
        !err.is_local(),
    )
}

/// `credential_rung` is false for failures produced while decoding a
/// response; those skip the invalid-credential check.
fn classify_signals(
    message: &str,
    status: Option<u16>,
    transport: bool,
    credential_rung: bool,
) -> ErrorCategory {
    let lower = message.to_lowercase();

    if contains_any(&lower, LOGIN_REQUIRED_INDICATORS) {
        return ErrorCategory::LoginRequired;
    }

    if status == Some(429) || contains_any(&lower, RATE_LIMIT_INDICATORS) {
        return ErrorCategory::RateLimited;
    }

    let bad_request =
        status == Some(400) || contains_any(&lower, INVALID_CREDENTIAL_STATUS_INDICATORS);
    if credential_rung
        && (matches!(status, Some(401) | Some(403))
            || (bad_request && contains_any(&lower, INVALID_CREDENTIAL_INDICATORS)))
    {
        return ErrorCategory::InvalidCredential;
    }

    if contains_any(&lower, CONTENT_POLICY_INDICATORS) {
        return ErrorCategory::ContentPolicyViolation;
    }

    if transport || contains_any(&lower, NETWORK_INDICATORS) {
        return ErrorCategory::NetworkError;
    }

    ErrorCategory::Generic
}
