use uuid::Uuid;

use crate::{
    auth::Role,
    models::{
        company::Company,
        session::Session,
        user::User,
        workspace::{WorkspaceContext, WorkspaceStatus},
    },
};

/// Where the store is in its login lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    Unauthenticated,
    /// Signed in, but no context load has succeeded yet.
    NoContext,
    WithContext,
}

/// One consistent snapshot of the session/workspace store.
///
/// The store only ever replaces this value as a whole, so a reader holding a
/// snapshot never sees a session from one login next to workspaces from another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub workspaces: Vec<WorkspaceContext>,
    pub active_workspace: Option<WorkspaceContext>,
    pub context_loaded: bool,
    /// Last login failure, verbatim from the auth backend.
    pub error: Option<String>,
    /// Last swallowed context-load failure. Cleared by the next successful load.
    pub context_error: Option<String>,
}

impl StoreState {
    pub fn phase(&self) -> StorePhase {
        match (&self.session, self.context_loaded) {
            (None, _) => StorePhase::Unauthenticated,
            (Some(_), false) => StorePhase::NoContext,
            (Some(_), true) => StorePhase::WithContext,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_workspace_active(&self) -> bool {
        self.workspace_status() == Some(WorkspaceStatus::Active)
    }

    pub fn is_workspace_pending(&self) -> bool {
        self.workspace_status() == Some(WorkspaceStatus::Pending)
    }

    pub fn is_workspace_suspended(&self) -> bool {
        self.workspace_status() == Some(WorkspaceStatus::Suspended)
    }

    pub fn workspace_status(&self) -> Option<WorkspaceStatus> {
        self.active_workspace.as_ref().map(|ctx| ctx.workspace.status)
    }

    pub fn role(&self) -> Option<Role> {
        self.active_workspace.as_ref().map(|ctx| ctx.role)
    }

    /// Company lookup, scoped to the active workspace.
    pub fn company(&self, company_id: Uuid) -> Option<&Company> {
        self.active_workspace.as_ref()?.company(company_id)
    }

    /// Replace the context with a fresh backend response. The first workspace becomes active.
    pub(crate) fn set_context(&mut self, workspaces: Vec<WorkspaceContext>) {
        self.active_workspace = workspaces.first().cloned();
        self.workspaces = workspaces;
        self.context_loaded = true;
        self.context_error = None;
    }

    /// Keep everything that belongs to the user, dropping the login fields.
    pub(crate) fn context_only(&self) -> StoreState {
        StoreState {
            workspaces: self.workspaces.clone(),
            active_workspace: self.active_workspace.clone(),
            context_loaded: self.context_loaded,
            context_error: self.context_error.clone(),
            ..StoreState::default()
        }
    }
}
