use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Result code the signing authority returns once a session has been open too long.
pub const SESSION_EXPIRED_CODE: i64 = -22411;

/// Steps offered to the operator when certificate data cannot be parsed.
pub const PARSE_FIELD_REMEDIATION: [&str; 4] = [
    "Log out and log back in to refresh your session",
    "Revoke all existing certificates and create new ones",
    "Check for updates to this application",
    "Report this issue to the developers with the error details",
];

#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("Remote provisioning error: {0}")]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    ParseField(#[from] ParseFieldError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Update error: {0}")]
    Update(String),
}

impl ProvisioningError {
    /// True for failures the application can keep running through.
    pub fn is_known_issue(&self) -> bool {
        matches!(self, ProvisioningError::ParseField(e) if e.known_issue)
    }
}

/// What went wrong talking to the signing authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Transport,
    Api { code: String },
    MalformedField { field: String },
    SessionExpired,
    Decode,
}

/// A failure reported by a [`ProvisioningClient`](crate::remote::ProvisioningClient).
///
/// Cloneable so a single failed fetch can be handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transport, message)
    }

    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Api { code: code.into() }, message)
    }

    pub fn malformed_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            RemoteErrorKind::MalformedField {
                field: field.into(),
            },
            message,
        )
    }
}

/// A certificate listing the authority returned but that could not be parsed.
///
/// The authority intermittently sends certificates whose device identifier is
/// malformed. This is a known upstream issue and is not fatal to the application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ParseFieldError {
    #[source]
    pub source: RemoteError,
    pub remediation: Vec<String>,
    pub known_issue: bool,
}

impl ParseFieldError {
    pub fn new(source: RemoteError) -> Self {
        Self {
            source,
            remediation: PARSE_FIELD_REMEDIATION.iter().map(|s| s.to_string()).collect(),
            known_issue: true,
        }
    }

    /// The message the authority reported.
    pub fn message(&self) -> &str {
        &self.source.message
    }
}

impl fmt::Display for ParseFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Failed to parse certificates from the signing authority. This may be due to an API format change."
        )?;
        writeln!(f)?;
        writeln!(f, "Error details: {}", self.source.message)?;
        writeln!(f)?;
        write!(f, "Possible solutions:")?;
        for (i, step) in self.remediation.iter().enumerate() {
            write!(f, "\n{}. {step}", i + 1)?;
        }
        Ok(())
    }
}

/// Error body returned by the signing authority gateway.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub result_code: Option<serde_json::Value>,
    #[serde(default, alias = "message")]
    pub user_string: Option<String>,
}

impl ApiErrorResponse {
    pub(crate) fn into_remote_error(self, status: u16) -> RemoteError {
        let code = match self.result_code {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) => s,
            _ => status.to_string(),
        };
        let message = self
            .user_string
            .unwrap_or_else(|| format!("request failed with status {status}"));

        if code.parse::<i64>() == Ok(SESSION_EXPIRED_CODE) {
            return RemoteError::new(
                RemoteErrorKind::SessionExpired,
                format!("Session timed out, please log in again: {message}"),
            );
        }
        RemoteError::api(code, message)
    }
}
