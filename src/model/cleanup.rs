use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of one bulk cleanup run.
///
/// Counts only include sub-operations that completed. A result with a
/// non-empty `errors` list is a partial failure, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    pub certificates_revoked: u32,
    pub app_ids_deleted: u32,
    pub errors: Vec<String>,
}

impl CleanupResult {
    pub fn is_partial_failure(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Display for CleanupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} certificates revoked, {} App IDs deleted",
            self.certificates_revoked, self.app_ids_deleted
        )?;
        if !self.errors.is_empty() {
            write!(f, ", {} errors:", self.errors.len())?;
            for err in &self.errors {
                write!(f, "\n- {err}")?;
            }
        }
        Ok(())
    }
}
