pub mod storage;
pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{
    session::Session,
    user::{UpdateUserRequest, User},
};

/// Permission level of a user within one workspace. Client-side gating only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Viewer,
}

impl Role {
    pub fn can_view_reports(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    pub fn can_manage_settings(&self) -> bool {
        self.is_admin()
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Capabilities the store needs from the third-party auth service.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for a session. Rejections map to `StoreError::Authentication`.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// The persisted session, refreshed if it has expired. `None` when there is none
    /// or it can no longer be refreshed.
    async fn get_session(&self) -> Result<Option<Session>>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    async fn sign_out(&self, access_token: &str) -> Result<()>;

    async fn update_user(&self, access_token: &str, req: &UpdateUserRequest) -> Result<User>;
}
