use crate::{
    error::Result,
    models::workspace::{MeContextResponse, WorkspaceContext},
};

use super::ApiClient;

/// `GET /me/context`: every workspace membership of the token's user.
pub async fn fetch_context(api: &ApiClient, token: &str) -> Result<Vec<WorkspaceContext>> {
    let body: MeContextResponse = api.get_json("/me/context", token).await?;
    Ok(body.workspaces)
}
