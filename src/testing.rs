//! Scripted in-memory signing authority for unit tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::RemoteError;
use crate::model::app_id::AppId;
use crate::model::certificate::RawCertificate;
use crate::remote::ProvisioningClient;

pub(crate) fn raw_cert(name: &str, serial: &str) -> RawCertificate {
    RawCertificate {
        name: Some(name.to_string()),
        certificate_id: Some(format!("CERT-{serial}")),
        serial_number: Some(serial.to_string()),
        machine_name: Some("build-mac".to_string()),
        machine_id: Some(format!("MACHINE-{serial}")),
    }
}

pub(crate) fn app_id(id: &str) -> AppId {
    AppId {
        app_id_id: id.to_string(),
        identifier: format!("com.example.{id}"),
        name: format!("App {id}"),
    }
}

/// Behaves like the authority: revoked certificates and deleted App IDs
/// disappear from later listings.
#[derive(Default)]
pub(crate) struct FakeClient {
    certificates: Mutex<Vec<RawCertificate>>,
    app_ids: Mutex<Vec<AppId>>,
    list_error: Mutex<Option<RemoteError>>,
    app_id_list_error: Mutex<Option<RemoteError>>,
    failing_serials: Mutex<HashSet<String>>,
    failing_app_ids: Mutex<HashSet<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    panic_listing: AtomicBool,
    pub list_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakeClient {
    pub(crate) fn with_certificates(certificates: Vec<RawCertificate>) -> Self {
        let client = Self::default();
        *client.certificates.lock() = certificates;
        client
    }

    pub(crate) fn set_certificates(&self, certificates: Vec<RawCertificate>) {
        *self.certificates.lock() = certificates;
    }

    pub(crate) fn set_app_ids(&self, app_ids: Vec<AppId>) {
        *self.app_ids.lock() = app_ids;
    }

    pub(crate) fn fail_listing(&self, error: Option<RemoteError>) {
        *self.list_error.lock() = error;
    }

    pub(crate) fn fail_app_id_listing(&self, error: Option<RemoteError>) {
        *self.app_id_list_error.lock() = error;
    }

    pub(crate) fn fail_revoke(&self, serial: &str) {
        self.failing_serials.lock().insert(serial.to_string());
    }

    pub(crate) fn fail_delete(&self, app_id_id: &str) {
        self.failing_app_ids.lock().insert(app_id_id.to_string());
    }

    /// Hold certificate listings until [`FakeClient::release_listing`] is called.
    pub(crate) fn gate_listing(&self) {
        *self.gate.lock() = Some(Arc::new(Notify::new()));
    }

    pub(crate) fn release_listing(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.notify_one();
        }
    }

    /// Make the next certificate listing panic instead of returning.
    pub(crate) fn panic_next_listing(&self) {
        self.panic_listing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvisioningClient for FakeClient {
    async fn list_certificates(&self) -> Result<Vec<RawCertificate>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.panic_listing.swap(false, Ordering::SeqCst) {
            panic!("certificate listing blew up");
        }
        if let Some(err) = self.list_error.lock().clone() {
            return Err(err);
        }
        Ok(self.certificates.lock().clone())
    }

    async fn revoke_certificate(&self, serial_number: &str) -> Result<(), RemoteError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_serials.lock().contains(serial_number) {
            return Err(RemoteError::api("9401", format!("cannot revoke {serial_number}")));
        }
        self.certificates
            .lock()
            .retain(|c| c.serial_number.as_deref() != Some(serial_number));
        Ok(())
    }

    async fn list_app_ids(&self) -> Result<Vec<AppId>, RemoteError> {
        if let Some(err) = self.app_id_list_error.lock().clone() {
            return Err(err);
        }
        Ok(self.app_ids.lock().clone())
    }

    async fn delete_app_id(&self, app_id_id: &str) -> Result<(), RemoteError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_app_ids.lock().contains(app_id_id) {
            return Err(RemoteError::api("9402", format!("cannot delete {app_id_id}")));
        }
        self.app_ids.lock().retain(|a| a.app_id_id != app_id_id);
        Ok(())
    }
}
