use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Authenticated principal as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl User {
    /// Name to show in the header: username, then full name, then email.
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata
            .username
            .as_deref()
            .or(self.user_metadata.full_name.as_deref())
            .or(self.email.as_deref())
    }
}

/// Free-form profile metadata. Unknown keys are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Profile fields a signed-in user may change. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 3, max = 32, message = "must be 3 to 32 characters"))]
    pub username: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none() && self.username.is_none()
    }
}
