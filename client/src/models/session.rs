use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::user::User;

/// Seconds before `expires_at` at which a session is already treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Read-only copy of the auth backend's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now.unix_timestamp() + EXPIRY_MARGIN_SECS >= self.expires_at
    }
}
