//! The process-wide session/workspace store.
//!
//! Every screen reads who is signed in, which token to send and which
//! workspace it is working in from here. Writers replace the whole
//! [`StoreState`]. Each context load carries a generation number and each
//! session change bumps an epoch, so neither a superseded context response
//! nor a stale session restore is ever applied.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::{watch, Mutex};
use uuid::Uuid;
use validator::Validate;

use crate::{
    access::{self, Access, Module},
    api::{self, ApiClient},
    auth::AuthBackend,
    error::{Result, StoreError},
    models::{
        session::Session,
        user::{UpdateUserRequest, User},
    },
    state::{StorePhase, StoreState},
};

#[derive(Clone)]
pub struct WorkspaceStore {
    inner: Arc<Inner>,
}

struct Inner {
    auth: Arc<dyn AuthBackend>,
    api: ApiClient,
    state: watch::Sender<StoreState>,
    generation: AtomicU64,
    session_epoch: AtomicU64,
    check_lock: Mutex<()>,
}

impl WorkspaceStore {
    pub fn new(auth: Arc<dyn AuthBackend>, api: ApiClient) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            inner: Arc::new(Inner {
                auth,
                api,
                state,
                generation: AtomicU64::new(0),
                session_epoch: AtomicU64::new(0),
                check_lock: Mutex::new(()),
            }),
        }
    }

    /// Construct the store and restore any persisted session.
    pub async fn init(auth: Arc<dyn AuthBackend>, api: ApiClient) -> Self {
        let store = Self::new(auth, api);
        store.check_user().await;
        store
    }

    /// Drop all in-memory state and cancel in-flight context loads. The
    /// persisted session is left alone, so the next `init` restores it.
    pub fn teardown(&self) {
        tracing::debug!("Tearing down workspace store");
        self.reset(None);
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn snapshot(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    pub fn phase(&self) -> StorePhase {
        self.inner.state.borrow().phase()
    }

    pub fn is_workspace_active(&self) -> bool {
        self.inner.state.borrow().is_workspace_active()
    }

    pub fn is_workspace_pending(&self) -> bool {
        self.inner.state.borrow().is_workspace_pending()
    }

    pub fn is_workspace_suspended(&self) -> bool {
        self.inner.state.borrow().is_workspace_suspended()
    }

    pub fn access(&self, company_id: Uuid, module: Module) -> Access {
        access::evaluate(&self.inner.state.borrow(), company_id, module)
    }

    /// The current access token, read at call time. Callers fetch it right
    /// before each request and never keep it.
    pub fn bearer_token(&self) -> Result<String> {
        let state = self.inner.state.borrow();
        let session = state.session.as_ref().ok_or(StoreError::MissingSession)?;
        if session.is_expired() {
            return Err(StoreError::SessionExpired);
        }
        Ok(session.access_token.clone())
    }

    /// Restore an existing session on startup. Concurrent calls run one at a
    /// time. A restore overtaken by `login`, `logout` or `teardown` is dropped.
    pub async fn check_user(&self) -> StorePhase {
        let _guard = self.inner.check_lock.lock().await;
        let epoch = self.inner.session_epoch.load(Ordering::SeqCst);

        let applied = match self.inner.auth.get_session().await {
            Ok(Some(session)) => {
                let user_id = session.user.id;
                let applied = self.apply_session(session, Some(epoch));
                if applied {
                    tracing::info!(user_id = %user_id, "Restored session");
                    self.load_context().await;
                }
                applied
            }
            Ok(None) => {
                tracing::debug!("No existing session");
                self.reset(Some(epoch))
            }
            Err(e) => {
                tracing::warn!("Session restore failed: {}", e);
                self.reset(Some(epoch))
            }
        };
        if !applied {
            tracing::debug!("Discarding session restore superseded by a newer session change");
        }

        self.phase()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let email = email.trim();
        let outcome = if email.is_empty() || password.is_empty() {
            Err(StoreError::Authentication("Email and password are required".into()))
        } else {
            self.inner.auth.sign_in_with_password(email, password).await
        };

        match outcome {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "Signed in");
                self.apply_session(session, None);
                self.load_context().await;
                Ok(())
            }
            Err(e) => {
                let message = e.user_message();
                tracing::warn!("Sign-in failed: {}", message);
                self.inner
                    .state
                    .send_modify(|state| state.error = Some(message.clone()));
                Err(StoreError::Authentication(message))
            }
        }
    }

    /// Replace the workspace context from `GET /me/context`.
    ///
    /// Failures are logged and recorded in `context_error`; the last good
    /// context stays in place. Without a session this does nothing.
    pub async fn load_context(&self) {
        if let Err(StoreError::MissingSession) = self.fetch_and_apply_context().await {
            tracing::debug!("Skipping context load: no session");
        }
    }

    /// User-triggered retry of a failed context load. Unlike `load_context`,
    /// this request's own failure is returned to the caller.
    pub async fn retry_context(&self) -> Result<()> {
        self.fetch_and_apply_context().await
    }

    async fn fetch_and_apply_context(&self) -> Result<()> {
        let (user_id, token) = {
            let state = self.inner.state.borrow();
            let session = state.session.as_ref().ok_or(StoreError::MissingSession)?;
            (session.user.id, session.access_token.clone())
        };
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = api::context::fetch_context(&self.inner.api, &token).await;

        self.inner.state.send_if_modified(|state| {
            let current_user = state.session.as_ref().map(|s| s.user.id);
            if self.inner.generation.load(Ordering::SeqCst) != generation
                || current_user != Some(user_id)
            {
                tracing::debug!(generation, "Discarding superseded context response");
                return false;
            }

            match &result {
                Ok(workspaces) => {
                    tracing::info!(count = workspaces.len(), "Loaded workspace context");
                    state.set_context(workspaces.clone());
                }
                Err(e) => {
                    tracing::warn!("Context load failed, keeping previous context: {}", e);
                    state.context_error = Some(e.user_message());
                }
            }
            true
        });

        result.map(|_| ())
    }

    /// Sign out and clear everything in one step. A backend failure is
    /// returned after the local state has already been reset.
    pub async fn logout(&self) -> Result<()> {
        let token = self
            .inner
            .state
            .borrow()
            .session
            .as_ref()
            .map(|s| s.access_token.clone());

        let outcome = match token {
            Some(token) => self.inner.auth.sign_out(&token).await,
            None => Ok(()),
        };
        self.reset(None);
        tracing::info!("Signed out");

        outcome.map_err(|e| {
            tracing::warn!("Sign-out call failed: {}", e);
            StoreError::SignOut(e.user_message())
        })
    }

    /// Exchange the refresh token. A rejected refresh means the session is
    /// gone, and the store returns to `Unauthenticated`.
    pub async fn refresh_session(&self) -> Result<()> {
        let (user_id, refresh_token) = {
            let state = self.inner.state.borrow();
            let session = state.session.as_ref().ok_or(StoreError::MissingSession)?;
            (session.user.id, session.refresh_token.clone())
        };

        match self.inner.auth.refresh_session(&refresh_token).await {
            Ok(session) => {
                self.inner.state.send_if_modified(|state| {
                    if state.session.as_ref().map(|s| s.user.id) != Some(user_id) {
                        return false;
                    }
                    self.inner.session_epoch.fetch_add(1, Ordering::SeqCst);
                    state.user = Some(session.user.clone());
                    state.session = Some(session);
                    true
                });
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!("Session lost: {}", e);
                self.reset(None);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Session refresh failed, keeping session: {}", e);
                Err(e)
            }
        }
    }

    pub async fn update_profile(&self, req: UpdateUserRequest) -> Result<User> {
        req.validate()?;
        let token = self.bearer_token()?;
        if req.is_empty() {
            return self
                .inner
                .state
                .borrow()
                .user
                .clone()
                .ok_or(StoreError::MissingSession);
        }

        let user = self.inner.auth.update_user(&token, &req).await?;
        self.inner.state.send_if_modified(|state| {
            if state.user.as_ref().map(|u| u.id) != Some(user.id) {
                return false;
            }
            state.user = Some(user.clone());
            if let Some(session) = state.session.as_mut() {
                session.user = user.clone();
            }
            true
        });
        Ok(user)
    }

    /// Make another of the user's workspaces active until the next context load.
    pub fn select_workspace(&self, workspace_id: Uuid) -> bool {
        let mut found = false;
        self.inner.state.send_if_modified(|state| {
            let Some(ctx) = state
                .workspaces
                .iter()
                .find(|ctx| ctx.workspace_id == workspace_id)
                .cloned()
            else {
                return false;
            };
            found = true;
            if state.active_workspace.as_ref() == Some(&ctx) {
                return false;
            }
            state.active_workspace = Some(ctx);
            true
        });
        found
    }

    /// Install a new session. The context survives only if it belongs to the
    /// same user. With `since`, nothing happens if the session changed after
    /// that epoch.
    fn apply_session(&self, session: Session, since: Option<u64>) -> bool {
        self.inner.state.send_if_modified(|state| {
            if !self.claim_epoch(since) {
                return false;
            }
            let same_user = state.user.as_ref().map(|u| u.id) == Some(session.user.id);
            let mut next = if same_user {
                state.context_only()
            } else {
                StoreState::default()
            };
            next.user = Some(session.user.clone());
            next.session = Some(session);
            *state = next;
            true
        })
    }

    fn reset(&self, since: Option<u64>) -> bool {
        self.inner.state.send_if_modified(|state| {
            if !self.claim_epoch(since) {
                return false;
            }
            *state = StoreState::default();
            true
        })
    }

    /// Start a new session epoch and cancel in-flight context loads. Runs
    /// under the state lock, so the epoch check and the write are atomic.
    fn claim_epoch(&self, since: Option<u64>) -> bool {
        if let Some(epoch) = since {
            if self.inner.session_epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
        }
        self.inner.session_epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        true
    }
}
