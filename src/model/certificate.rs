use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Placeholder shown for certificates the authority returned without a name.
pub const UNKNOWN_CERTIFICATE_NAME: &str = "Unknown Certificate";
/// Placeholder for a missing machine name or machine identifier.
pub const UNKNOWN_MACHINE: &str = "unknown";

/// Wire name of the device identifier the authority intermittently sends malformed.
pub const MACHINE_ID_FIELD: &str = "machineId";

/// A certificate as the signing authority reports it. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCertificate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub certificate_id: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub machine_name: Option<String>,
    #[serde(default)]
    pub machine_id: Option<String>,
}

/// A developer signing certificate with its identifying fields present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub name: String,
    pub certificate_id: String,
    pub serial_number: String,
    pub machine_name: String,
    pub machine_id: String,
}

impl Certificate {
    /// Normalize a raw record.
    ///
    /// Missing display fields fall back to placeholders. Returns `None` when the
    /// certificate id or serial number is missing, since such a record can be
    /// neither displayed meaningfully nor revoked.
    pub fn normalize(raw: RawCertificate) -> Option<Self> {
        let name = non_empty(raw.name).unwrap_or_else(|| {
            warn!("certificate has empty name, using default");
            UNKNOWN_CERTIFICATE_NAME.to_string()
        });

        let Some(certificate_id) = non_empty(raw.certificate_id) else {
            warn!(name = %name, "filtering out certificate without certificate id");
            return None;
        };
        let Some(serial_number) = non_empty(raw.serial_number) else {
            warn!(name = %name, "filtering out certificate without serial number");
            return None;
        };

        let machine_id = non_empty(raw.machine_id).unwrap_or_else(|| {
            debug!(name = %name, "certificate has empty machine id");
            UNKNOWN_MACHINE.to_string()
        });
        let machine_name = non_empty(raw.machine_name).unwrap_or_else(|| UNKNOWN_MACHINE.to_string());

        Some(Self {
            name,
            certificate_id,
            serial_number,
            machine_name,
            machine_id,
        })
    }
}

/// Normalize a whole listing, preserving the order the authority returned.
pub fn normalize_all(raw: Vec<RawCertificate>) -> Vec<Certificate> {
    raw.into_iter().filter_map(Certificate::normalize).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
