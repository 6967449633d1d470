use serde::{Deserialize, Serialize};

/// An application bundle identity registered with the signing authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppId {
    pub app_id_id: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAppIdsResponse {
    #[serde(default)]
    pub app_ids: Vec<AppId>,
}
