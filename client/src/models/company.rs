use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Approval state of a payroll company. Only `Approved` companies expose their modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyStatus {
    Pending,
    Approved,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub status: CompanyStatus,
    #[serde(default)]
    pub workspace_id: Option<Uuid>,
}

impl Company {
    pub fn is_approved(&self) -> bool {
        self.status == CompanyStatus::Approved
    }
}
