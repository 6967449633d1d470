pub mod api;
pub mod cert;
pub mod cleanup;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use cert::manager::CertificateLifecycleManager;
pub use cleanup::CleanupOrchestrator;
pub use client::HttpProvisioningClient;
pub use config::{ClientConfig, ClientConfigBuilder, ManagerConfig, ManagerConfigBuilder};
pub use error::{ParseFieldError, ProvisioningError, RemoteError, RemoteErrorKind};
pub use model::certificate::Certificate;
pub use model::cleanup::CleanupResult;
pub use remote::ProvisioningClient;
pub use update::{UpdateCoordinator, UpdateSource};
