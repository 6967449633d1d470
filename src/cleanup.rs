//! Irreversible bulk cleanup: revoke every certificate and delete every App ID.
//!
//! There is no dry-run. Callers must have the user's explicit confirmation
//! before calling [`CleanupOrchestrator::run_cleanup`].

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cert::store::CertificateCache;
use crate::error::{ProvisioningError, RemoteError};
use crate::model::certificate::UNKNOWN_CERTIFICATE_NAME;
use crate::model::cleanup::CleanupResult;
use crate::remote::ProvisioningClient;

pub struct CleanupOrchestrator {
    client: Arc<dyn ProvisioningClient>,
    cache: CertificateCache,
}

impl CleanupOrchestrator {
    pub(crate) fn new(client: Arc<dyn ProvisioningClient>, cache: CertificateCache) -> Self {
        Self { client, cache }
    }

    /// Revoke all certificates and delete all App IDs.
    ///
    /// Returns `Err` only when nothing could be done. Individual failures are
    /// listed in [`CleanupResult::errors`]. The certificate cache is invalidated
    /// either way.
    pub async fn run_cleanup(&self) -> Result<CleanupResult, ProvisioningError> {
        info!("starting cleanup of all certificates and App IDs");
        let outcome = self.client.cleanup_all().await;
        self.cache.invalidate();

        match outcome {
            Ok(result) => {
                info!(
                    certificates_revoked = result.certificates_revoked,
                    app_ids_deleted = result.app_ids_deleted,
                    errors = result.errors.len(),
                    "cleanup completed"
                );
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "cleanup failed");
                Err(e.into())
            }
        }
    }
}

/// Outcome of one cleanup sub-operation.
enum ItemOutcome {
    Revoked,
    Deleted,
    Failed(String),
}

impl CleanupResult {
    fn record(mut self, outcome: ItemOutcome) -> Self {
        match outcome {
            ItemOutcome::Revoked => self.certificates_revoked += 1,
            ItemOutcome::Deleted => self.app_ids_deleted += 1,
            ItemOutcome::Failed(message) => self.errors.push(message),
        }
        self
    }
}

/// Walk both collections item by item, folding every outcome into one result.
///
/// A failed listing is recorded and the other collection is still processed.
/// Only when both listings fail is the first listing error returned.
pub(crate) async fn sweep<C>(client: &C) -> Result<CleanupResult, RemoteError>
where
    C: ProvisioningClient + ?Sized,
{
    let mut result = CleanupResult::default();
    let mut unreachable = None;

    match client.list_certificates().await {
        Ok(certificates) => {
            info!(count = certificates.len(), "revoking certificates");
            for cert in certificates {
                let name = cert
                    .name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| UNKNOWN_CERTIFICATE_NAME.to_string());
                let outcome = match cert.serial_number.filter(|s| !s.is_empty()) {
                    Some(serial) => match client.revoke_certificate(&serial).await {
                        Ok(()) => {
                            debug!(name = %name, serial = %serial, "certificate revoked");
                            ItemOutcome::Revoked
                        }
                        Err(e) => {
                            error!(name = %name, serial = %serial, error = %e, "failed to revoke certificate");
                            ItemOutcome::Failed(format!(
                                "Failed to revoke certificate {name} ({serial}): {e}"
                            ))
                        }
                    },
                    None => {
                        warn!(name = %name, "certificate has no serial number, skipping");
                        ItemOutcome::Failed(format!(
                            "Skipped certificate {name}: missing serial number"
                        ))
                    }
                };
                result = result.record(outcome);
            }
        }
        Err(e) => {
            error!(error = %e, "failed to list certificates for cleanup");
            result
                .errors
                .push(format!("Failed to list certificates: {e}"));
            unreachable = Some(e);
        }
    }

    match client.list_app_ids().await {
        Ok(app_ids) => {
            info!(count = app_ids.len(), "deleting App IDs");
            for app_id in app_ids {
                let outcome = match client.delete_app_id(&app_id.app_id_id).await {
                    Ok(()) => {
                        debug!(name = %app_id.name, identifier = %app_id.identifier, "App ID deleted");
                        ItemOutcome::Deleted
                    }
                    Err(e) => {
                        error!(name = %app_id.name, error = %e, "failed to delete App ID");
                        ItemOutcome::Failed(format!(
                            "Failed to delete App ID {} ({}): {e}",
                            app_id.name, app_id.identifier
                        ))
                    }
                };
                result = result.record(outcome);
            }
        }
        Err(e) => {
            error!(error = %e, "failed to list App IDs for cleanup");
            if let Some(first) = unreachable {
                return Err(first);
            }
            result.errors.push(format!("Failed to list App IDs: {e}"));
        }
    }

    Ok(result)
}
