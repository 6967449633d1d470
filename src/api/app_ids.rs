use tracing::{debug, info};

use crate::client::{HttpProvisioningClient, encode_path_segment};
use crate::error::{RemoteError, RemoteErrorKind};
use crate::model::app_id::{AppId, ListAppIdsResponse};

impl HttpProvisioningClient {
    /// List App IDs registered for the team.
    ///
    /// GET /teams/{team}/app-ids
    pub async fn fetch_app_ids(&self) -> Result<Vec<AppId>, RemoteError> {
        let body = self.get_text(&self.team_path("/app-ids")).await?;
        let resp: ListAppIdsResponse = serde_json::from_str(&body).map_err(|e| {
            RemoteError::new(RemoteErrorKind::Decode, format!("decode App IDs: {e}"))
        })?;
        info!(count = resp.app_ids.len(), team = %self.team_id(), "fetched App IDs");
        Ok(resp.app_ids)
    }

    /// Delete an App ID.
    ///
    /// DELETE /teams/{team}/app-ids/{app_id_id}
    pub async fn delete(&self, app_id_id: &str) -> Result<(), RemoteError> {
        let path = self.team_path(&format!("/app-ids/{}", encode_path_segment(app_id_id)));
        self.send_no_content(reqwest::Method::DELETE, &path).await?;
        debug!(app_id = %app_id_id, "App ID deleted");
        Ok(())
    }
}
