use uuid::Uuid;

use crate::{error::Result, models::company::Company};

use super::ApiClient;

pub async fn get_company(api: &ApiClient, token: &str, company_id: Uuid) -> Result<Company> {
    api.get_json(&format!("/companies/{}", company_id), token)
        .await
}

pub async fn list_workspace_companies(
    api: &ApiClient,
    token: &str,
    workspace_id: Uuid,
) -> Result<Vec<Company>> {
    api.get_json(&format!("/workspaces/{}/companies", workspace_id), token)
        .await
}
