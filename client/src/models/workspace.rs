use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::company::Company;
use crate::auth::Role;

/// Lifecycle of a workspace, independent of any single company in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceStatus {
    Active,
    Pending,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub status: WorkspaceStatus,
    #[serde(default)]
    pub companies: Vec<Company>,
}

/// One workspace membership of the signed-in user.
///
/// The backend nests the workspace row under the `workspaces` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceContext {
    pub workspace_id: Uuid,
    pub role: Role,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "workspaces")]
    pub workspace: Workspace,
}

impl WorkspaceContext {
    pub fn company(&self, company_id: Uuid) -> Option<&Company> {
        self.workspace.companies.iter().find(|c| c.id == company_id)
    }
}

/// Body of `GET /me/context`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeContextResponse {
    pub workspaces: Vec<WorkspaceContext>,
}
