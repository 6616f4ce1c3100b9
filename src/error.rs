//! Error types for wb_price_sync

use std::fmt;

use thiserror::Error;

/// A single missing or malformed configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub key: String,
    pub reason: String,
}

impl ConfigIssue {
    pub fn new(key: &str, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}

/// Unified error type for wb_price_sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// One or more configuration keys are missing or malformed
    #[error("Configuration error: {}", format_issues(.0))]
    Config(Vec<ConfigIssue>),
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code, with the response body for diagnosis
    #[error("HTTP error {status} from {endpoint}: {body}")]
    HttpStatus {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },
    /// Marketplace answered, but the answer is unusable
    #[error("Marketplace error: {0}")]
    Marketplace(String),
    /// Failed to parse JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// File or socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
    /// IMAP server rejected a command or spoke something unexpected
    #[error("IMAP error: {0}")]
    Imap(String),
    /// No mailbox message matched the search criteria
    #[error("Message not found: {0}")]
    MessageNotFound(String),
    /// Unusable input file content
    #[error("Data error in {file}: {reason}")]
    Data { file: String, reason: String },
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl SyncError {
    pub fn config(key: &str, reason: impl Into<String>) -> Self {
        SyncError::Config(vec![ConfigIssue::new(key, reason)])
    }

    pub fn data(file: impl fmt::Display, reason: impl Into<String>) -> Self {
        SyncError::Data {
            file: file.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request may succeed: timeouts, refused
    /// connections, throttling and server-side failures.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Network(e) => e.is_timeout() || e.is_connect(),
            SyncError::HttpStatus { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            // socket read timeouts surface as WouldBlock on Unix
            SyncError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Whether the remote side was unreachable, as opposed to reachable but
    /// rejecting the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SyncError::Network(_) | SyncError::Io(_))
    }
}

impl From<calamine::Error> for SyncError {
    fn from(err: calamine::Error) -> Self {
        SyncError::Spreadsheet(err.to_string())
    }
}

impl From<tempfile::PersistError> for SyncError {
    fn from(err: tempfile::PersistError) -> Self {
        SyncError::Io(err.error)
    }
}

/// Result alias for wb_price_sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
