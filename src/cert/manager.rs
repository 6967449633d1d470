use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cert::classify::ErrorClassifier;
use crate::cert::store::CertificateCache;
use crate::cleanup::CleanupOrchestrator;
use crate::config::ManagerConfig;
use crate::error::ProvisioningError;
use crate::model::certificate::Certificate;
use crate::remote::ProvisioningClient;

/// Entry point for listing and revoking developer certificates.
///
/// Owns the certificate cache; callers only see normalized certificates and
/// classified errors.
pub struct CertificateLifecycleManager {
    client: Arc<dyn ProvisioningClient>,
    cache: CertificateCache,
    classifier: ErrorClassifier,
}

impl CertificateLifecycleManager {
    pub fn new(client: Arc<dyn ProvisioningClient>) -> Self {
        Self::with_config(client, ManagerConfig::default())
    }

    pub fn with_config(client: Arc<dyn ProvisioningClient>, config: ManagerConfig) -> Self {
        Self {
            cache: CertificateCache::new(Arc::clone(&client), config.cache_ttl),
            classifier: ErrorClassifier::new(config.malformed_field_markers),
            client,
        }
    }

    /// Certificates in the order the authority listed them.
    ///
    /// Served from cache unless the entry is stale or `force_refresh` is set.
    /// Fails with [`ProvisioningError::ParseField`] when the listing contained a
    /// malformed device identifier, otherwise with [`ProvisioningError::Remote`].
    pub async fn load(&self, force_refresh: bool) -> Result<Vec<Certificate>, ProvisioningError> {
        let certificates = self
            .cache
            .get(force_refresh)
            .await
            .map_err(|e| self.classifier.classify(e))?;
        debug!(count = certificates.len(), force_refresh, "certificates loaded");
        Ok(certificates.to_vec())
    }

    /// Revoke the certificate with `serial_number` and reload the listing.
    ///
    /// Nothing is removed locally until the authority confirms the revoke.
    pub async fn revoke(&self, serial_number: &str) -> Result<(), ProvisioningError> {
        info!(serial = %serial_number, "revoking certificate");
        self.client.revoke_certificate(serial_number).await?;
        self.cache.invalidate();
        info!(serial = %serial_number, "certificate revoked");

        // The revoke is already confirmed; a failed reload only means the next
        // load fetches again.
        if let Err(e) = self.load(true).await {
            warn!(serial = %serial_number, error = %e, "reload after revoke failed");
        }
        Ok(())
    }

    /// The last fetched certificates, even if stale.
    pub fn cached(&self) -> Option<Vec<Certificate>> {
        self.cache.snapshot().map(|certs| certs.to_vec())
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Bulk cleanup bound to this manager's client and cache.
    pub fn cleanup_orchestrator(&self) -> CleanupOrchestrator {
        CleanupOrchestrator::new(Arc::clone(&self.client), self.cache.clone())
    }
}
