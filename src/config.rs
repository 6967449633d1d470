use std::time::Duration;

use crate::cert::classify::DEFAULT_MALFORMED_FIELD_MARKERS;
use crate::error::ProvisioningError;

const DEFAULT_BASE_URL: &str = "https://developerservices.example.com/v1";
const DEFAULT_USER_AGENT: &str = concat!("devcert/", env!("CARGO_PKG_VERSION"));
/// Certificate listings are served from cache for this long.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub struct ClientConfig {
    pub team_id: String,
    pub session_token: String,
    pub http_client: Option<reqwest::Client>,
    pub base_url: String,
    pub user_agent: String,
}

pub struct ClientConfigBuilder {
    team_id: Option<String>,
    session_token: Option<String>,
    http_client: Option<reqwest::Client>,
    base_url: Option<String>,
    user_agent: Option<String>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            team_id: None,
            session_token: None,
            http_client: None,
            base_url: None,
            user_agent: None,
        }
    }
}

impl ClientConfigBuilder {
    pub fn team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<ClientConfig, ProvisioningError> {
        let team_id = self
            .team_id
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProvisioningError::Config("team_id is required".into()))?;
        let session_token = self
            .session_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProvisioningError::Config("session_token is required".into()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ProvisioningError::Config(format!(
                "base_url must be an http(s) URL, got {base_url}"
            )));
        }

        Ok(ClientConfig {
            team_id,
            session_token,
            http_client: self.http_client,
            base_url,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

/// Settings for [`CertificateLifecycleManager`](crate::cert::manager::CertificateLifecycleManager).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub cache_ttl: Duration,
    /// Message substrings that identify a malformed device identifier.
    pub malformed_field_markers: Vec<String>,
}

impl ManagerConfig {
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            malformed_field_markers: DEFAULT_MALFORMED_FIELD_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct ManagerConfigBuilder {
    cache_ttl: Option<Duration>,
    malformed_field_markers: Option<Vec<String>>,
}

impl ManagerConfigBuilder {
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn malformed_field_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.malformed_field_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<ManagerConfig, ProvisioningError> {
        let defaults = ManagerConfig::default();

        let cache_ttl = self.cache_ttl.unwrap_or(defaults.cache_ttl);
        if cache_ttl.is_zero() {
            return Err(ProvisioningError::Config(
                "cache_ttl must be greater than zero".into(),
            ));
        }

        let malformed_field_markers = self
            .malformed_field_markers
            .unwrap_or(defaults.malformed_field_markers);
        if malformed_field_markers.iter().all(|m| m.is_empty()) {
            return Err(ProvisioningError::Config(
                "at least one malformed field marker is required".into(),
            ));
        }

        Ok(ManagerConfig {
            cache_ttl,
            malformed_field_markers: malformed_field_markers
                .into_iter()
                .filter(|m| !m.is_empty())
                .collect(),
        })
    }
}
