use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ApiErrorResponse, RemoteError, RemoteErrorKind};
use crate::model::app_id::AppId;
use crate::model::certificate::RawCertificate;
use crate::remote::ProvisioningClient;

/// [`ProvisioningClient`] backed by the signing authority's JSON gateway.
///
/// No timeout is applied here; configure one on the `reqwest::Client` passed
/// through [`ClientConfig`].
pub struct HttpProvisioningClient {
    pub(crate) config: ClientConfig,
    pub(crate) http: reqwest::Client,
}

impl HttpProvisioningClient {
    pub fn new(config: ClientConfig) -> Self {
        let http = config.http_client.clone().unwrap_or_default();
        Self { config, http }
    }

    pub fn team_id(&self) -> &str {
        &self.config.team_id
    }

    /// Path under the configured team, e.g. `/teams/ABC/certificates`.
    pub(crate) fn team_path(&self, suffix: &str) -> String {
        format!("/teams/{}{suffix}", encode_path_segment(&self.config.team_id))
    }

    /// Send a GET request and return the raw body of a successful response.
    pub(crate) async fn get_text(&self, path: &str) -> Result<String, RemoteError> {
        let resp = self.do_request(Method::GET, path).await?;
        read_body(resp).await
    }

    /// Send a request whose successful response carries no body of interest.
    pub(crate) async fn send_no_content(&self, method: Method, path: &str) -> Result<(), RemoteError> {
        let resp = self.do_request(method, path).await?;
        read_body(resp).await.map(|_| ())
    }

    async fn do_request(&self, method: Method, path: &str) -> Result<reqwest::Response, RemoteError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(%method, path, request_id = %request_id, "sending provisioning request");

        let url = format!("{}{path}", self.config.base_url);
        self.http
            .request(method, &url)
            .bearer_auth(&self.config.session_token)
            .header("Accept", "application/json")
            .header("User-Agent", &self.config.user_agent)
            .header("X-Request-Id", &request_id)
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("HTTP request failed: {e}")))
    }
}

#[async_trait]
impl ProvisioningClient for HttpProvisioningClient {
    async fn list_certificates(&self) -> Result<Vec<RawCertificate>, RemoteError> {
        self.fetch_certificates().await
    }

    async fn revoke_certificate(&self, serial_number: &str) -> Result<(), RemoteError> {
        self.revoke(serial_number).await
    }

    async fn list_app_ids(&self) -> Result<Vec<AppId>, RemoteError> {
        self.fetch_app_ids().await
    }

    async fn delete_app_id(&self, app_id_id: &str) -> Result<(), RemoteError> {
        self.delete(app_id_id).await
    }
}

async fn read_body(resp: reqwest::Response) -> Result<String, RemoteError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| RemoteError::transport(format!("read response body: {e}")))?;

    if !status.is_success() {
        return Err(parse_api_error(status.as_u16(), &body));
    }
    Ok(body)
}

pub(crate) fn parse_api_error(status: u16, body: &str) -> RemoteError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(err_resp) => err_resp.into_remote_error(status),
        Err(_) => RemoteError::new(
            RemoteErrorKind::Api {
                code: "UNKNOWN".into(),
            },
            format!("status={status}, body={body}"),
        ),
    }
}

/// Percent-encode a string so it is safe to use as a URL path segment.
pub(crate) fn encode_path_segment(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}
