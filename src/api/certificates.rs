use serde_json::Value;
use tracing::{debug, info};

use crate::client::{HttpProvisioningClient, encode_path_segment};
use crate::error::{RemoteError, RemoteErrorKind};
use crate::model::certificate::{MACHINE_ID_FIELD, RawCertificate};

const CERTIFICATE_FIELDS: [&str; 5] = [
    MACHINE_ID_FIELD,
    "serialNumber",
    "certificateId",
    "name",
    "machineName",
];

impl HttpProvisioningClient {
    /// List development certificates for the team.
    ///
    /// GET /teams/{team}/certificates
    pub async fn fetch_certificates(&self) -> Result<Vec<RawCertificate>, RemoteError> {
        let body = self.get_text(&self.team_path("/certificates")).await?;
        let certs = decode_certificates(&body)?;
        info!(count = certs.len(), team = %self.team_id(), "fetched certificates");
        Ok(certs)
    }

    /// Revoke a development certificate by serial number.
    ///
    /// POST /teams/{team}/certificates/{serial}/revoke
    pub async fn revoke(&self, serial_number: &str) -> Result<(), RemoteError> {
        let path = self.team_path(&format!(
            "/certificates/{}/revoke",
            encode_path_segment(serial_number)
        ));
        self.send_no_content(reqwest::Method::POST, &path).await?;
        debug!(serial = %serial_number, "revoke accepted");
        Ok(())
    }
}

/// Decode a certificate listing body.
///
/// A wrongly typed device identifier is reported as a malformed field. Any
/// other wrongly typed field is a plain decode failure naming that field.
pub(crate) fn decode_certificates(body: &str) -> Result<Vec<RawCertificate>, RemoteError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        RemoteError::new(RemoteErrorKind::Decode, format!("decode certificates: {e}"))
    })?;

    let items = value
        .get("certificates")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            RemoteError::new(
                RemoteErrorKind::Decode,
                "decode certificates: missing `certificates` array",
            )
        })?;

    items
        .iter()
        .map(|item| {
            serde_json::from_value::<RawCertificate>(item.clone()).map_err(|e| {
                match mistyped_field(item) {
                    Some(field) if field == MACHINE_ID_FIELD => RemoteError::malformed_field(
                        field,
                        format!("Parse error in certificate field `{field}`: {e}"),
                    ),
                    Some(field) => RemoteError::new(
                        RemoteErrorKind::Decode,
                        format!("decode certificate: field `{field}` has the wrong type: {e}"),
                    ),
                    None => RemoteError::new(
                        RemoteErrorKind::Decode,
                        format!("decode certificate: {e}"),
                    ),
                }
            })
        })
        .collect()
}

fn mistyped_field(item: &Value) -> Option<&'static str> {
    CERTIFICATE_FIELDS.into_iter().find(|field| {
        item.get(field)
            .is_some_and(|v| !(v.is_string() || v.is_null()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_certificates() {
        let body = r#"{"certificates":[
            {"name":"Dev","certificateId":"C1","serialNumber":"S1","machineName":"mac","machineId":"M1"},
            {"certificateId":"C2","serialNumber":"S2","machineId":null}
        ]}"#;
        let certs = decode_certificates(body).unwrap();
        assert_eq!(certs.len(), 2);
        assert_eq!(certs[0].machine_id.as_deref(), Some("M1"));
        assert!(certs[1].machine_id.is_none());
        assert!(certs[1].name.is_none());
    }

    #[test]
    fn test_decode_reports_malformed_machine_id() {
        let body = r#"{"certificates":[{"certificateId":"C1","serialNumber":"S1","machineId":{"raw":7}}]}"#;
        let err = decode_certificates(body).unwrap_err();
        assert_eq!(
            err.kind,
            RemoteErrorKind::MalformedField {
                field: "machineId".into()
            }
        );
        assert!(err.message.contains("machineId"));
    }

    #[test]
    fn test_decode_mistyped_serial_is_plain_decode_error() {
        let body = r#"{"certificates":[{"certificateId":"C1","serialNumber":7,"machineId":"M1"}]}"#;
        let err = decode_certificates(body).unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Decode);
        assert!(err.message.contains("serialNumber"));
    }

    #[test]
    fn test_decode_rejects_missing_array() {
        let err = decode_certificates(r#"{"items":[]}"#).unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Decode);

        let err = decode_certificates("not json").unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Decode);
    }

    #[test]
    fn test_decode_non_object_entry() {
        let err = decode_certificates(r#"{"certificates":[42]}"#).unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Decode);
    }
}
