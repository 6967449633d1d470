use tracing::warn;

use crate::error::{ParseFieldError, ProvisioningError, RemoteError, RemoteErrorKind};
use crate::model::certificate::MACHINE_ID_FIELD;

/// Substrings that mark a failure as a malformed device identifier when the
/// client did not report a structured [`RemoteErrorKind::MalformedField`].
pub const DEFAULT_MALFORMED_FIELD_MARKERS: [&str; 3] = ["machineId", "machineld", "Parse"];

/// Sorts remote failures into parse-field failures and everything else.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    markers: Vec<String>,
}

impl ErrorClassifier {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    /// A structured [`RemoteErrorKind::MalformedField`] counts only when it names
    /// the device identifier. Markers apply to unstructured failures.
    pub fn is_malformed_field(&self, err: &RemoteError) -> bool {
        match &err.kind {
            RemoteErrorKind::MalformedField { field } => field == MACHINE_ID_FIELD,
            _ => self.markers.iter().any(|m| err.message.contains(m.as_str())),
        }
    }

    pub fn classify(&self, err: RemoteError) -> ProvisioningError {
        if self.is_malformed_field(&err) {
            warn!(error = %err, "malformed certificate field in authority response");
            ProvisioningError::ParseField(ParseFieldError::new(err))
        } else {
            ProvisioningError::Remote(err)
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_MALFORMED_FIELD_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        )
    }
}
