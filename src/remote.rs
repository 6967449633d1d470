use async_trait::async_trait;

use crate::cleanup::sweep;
use crate::error::RemoteError;
use crate::model::app_id::AppId;
use crate::model::certificate::RawCertificate;
use crate::model::cleanup::CleanupResult;

/// Operations the signing authority exposes.
///
/// Implementations own their transport, authentication, timeouts and retries.
#[async_trait]
pub trait ProvisioningClient: Send + Sync + 'static {
    async fn list_certificates(&self) -> Result<Vec<RawCertificate>, RemoteError>;

    async fn revoke_certificate(&self, serial_number: &str) -> Result<(), RemoteError>;

    async fn list_app_ids(&self) -> Result<Vec<AppId>, RemoteError>;

    async fn delete_app_id(&self, app_id_id: &str) -> Result<(), RemoteError>;

    /// Revoke every certificate and delete every App ID.
    ///
    /// Per-item failures land in [`CleanupResult::errors`]; `Err` means the
    /// authority could not be reached at all. The default walks both
    /// collections item by item; override it when the authority offers a
    /// bulk endpoint.
    async fn cleanup_all(&self) -> Result<CleanupResult, RemoteError> {
        sweep(self).await
    }
}
