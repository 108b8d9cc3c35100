//! `AuthBackend` over the Supabase GoTrue REST API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, StatusCode};
use serde::Deserialize;
use time::OffsetDateTime;

use super::{
    storage::{FileSessionStorage, MemorySessionStorage, SessionStorage},
    AuthBackend,
};
use crate::{
    api::{bearer, check_status, error_message, read_json},
    config::Config,
    error::{Result, StoreError},
    models::{
        session::Session,
        user::{UpdateUserRequest, User},
    },
};

pub struct SupabaseAuth {
    http: reqwest::Client,
    url: String,
    anon_key: String,
    storage: Arc<dyn SessionStorage>,
    storage_key: String,
}

/// Token endpoint payload. Older GoTrue versions omit `expires_at`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

fn default_token_type() -> String {
    "bearer".into()
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp() + self.expires_in);
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            expires_at,
            user: self.user,
        }
    }
}

impl SupabaseAuth {
    pub fn new(
        url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self> {
        let url = url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            storage_key: storage_key_for(&url),
            http,
            url,
            anon_key: anon_key.into(),
            storage,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let storage: Arc<dyn SessionStorage> = match &cfg.session_dir {
            Some(dir) => Arc::new(FileSessionStorage::new(dir.clone())),
            None => Arc::new(MemorySessionStorage::new()),
        };
        Self::new(
            cfg.supabase_url.clone(),
            cfg.supabase_anon_key.clone(),
            cfg.request_timeout,
            storage,
        )
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }

    fn load_persisted(&self) -> Result<Option<Session>> {
        let Some(raw) = self.storage.get_item(&self.storage_key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Discarding unreadable persisted session: {}", e);
                self.storage.remove_item(&self.storage_key)?;
                Ok(None)
            }
        }
    }

    fn persist(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        self.storage.set_item(&self.storage_key, &raw)
    }

    fn clear_persisted(&self) -> Result<()> {
        self.storage.remove_item(&self.storage_key)
    }

    async fn token_request(&self, grant_type: &str, body: serde_json::Value) -> Result<Session> {
        let resp = self
            .http
            .post(format!("{}?grant_type={}", self.endpoint("token"), grant_type))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        // Only a rejected grant is an auth failure. Rate limits and timeouts
        // fall through to `read_json` and stay transient `Api` errors.
        let status = resp.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Authentication(
                error_message(&body).unwrap_or_else(|| status.to_string()),
            ));
        }

        let token: TokenResponse = read_json(resp).await?;
        let session = token.into_session();
        self.persist(&session)?;
        Ok(session)
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.token_request(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn get_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.load_persisted()? else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        tracing::info!("Persisted session expired, refreshing");
        match self.refresh_session(&session.refresh_token).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(e) if e.is_unauthorized() => {
                tracing::warn!("Session refresh rejected: {}", e);
                self.clear_persisted()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        self.token_request(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        // Local sign-out always happens, even when the server call fails.
        self.clear_persisted()?;

        let resp = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, bearer(access_token))
            .send()
            .await?;

        // An already-invalid token means the server-side session is gone too.
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => check_status(resp).await.map(|_| ()),
        }
    }

    async fn update_user(&self, access_token: &str, req: &UpdateUserRequest) -> Result<User> {
        let mut body = serde_json::Map::new();
        if let Some(email) = &req.email {
            body.insert("email".into(), email.clone().into());
        }
        if let Some(password) = &req.password {
            body.insert("password".into(), password.clone().into());
        }
        if let Some(username) = &req.username {
            body.insert("data".into(), serde_json::json!({ "username": username }));
        }

        let resp = self
            .http
            .put(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, bearer(access_token))
            .json(&body)
            .send()
            .await?;
        let user: User = read_json(resp).await?;

        if let Some(mut session) = self.load_persisted()? {
            if session.access_token == access_token {
                session.user = user.clone();
                self.persist(&session)?;
            }
        }

        Ok(user)
    }
}

/// `sb-<project-ref>-auth-token`, where the project ref is the first label of the host.
pub fn storage_key_for(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let host = without_scheme
        .split(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or_default();
    let project_ref = host.split('.').next().unwrap_or_default();
    format!("sb-{}-auth-token", project_ref)
}
