//! Module gating for company screens.
//!
//! Decisions come only from the active workspace and the selected company's
//! status. A denied screen renders the banner instead of failing.

use uuid::Uuid;

use crate::{
    auth::Role,
    models::{company::CompanyStatus, workspace::WorkspaceStatus},
    state::StoreState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Employees,
    Payroll,
    Reports,
    Settings,
}

impl Module {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Module::Employees | Module::Payroll => true,
            Module::Reports => role.can_view_reports(),
            Module::Settings => role.can_manage_settings(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    NoWorkspace,
    WorkspaceInactive(WorkspaceStatus),
    CompanyNotFound,
    CompanyInactive(CompanyStatus),
    RoleDenied(Role),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allowed)
    }

    /// Explanatory banner text, `None` when access is allowed.
    pub fn banner(&self) -> Option<&'static str> {
        match self {
            Access::Allowed => None,
            Access::NoWorkspace => Some("You are not a member of any workspace yet."),
            Access::WorkspaceInactive(WorkspaceStatus::Pending) => {
                Some("This workspace is awaiting activation.")
            }
            Access::WorkspaceInactive(_) => Some("This workspace has been suspended."),
            Access::CompanyNotFound => Some("This company is not part of your workspace."),
            Access::CompanyInactive(CompanyStatus::Pending) => {
                Some("This company is pending approval. Its modules will unlock once approved.")
            }
            Access::CompanyInactive(_) => Some("This company has been suspended."),
            Access::RoleDenied(_) => Some("Your role does not have access to this section."),
        }
    }
}

pub fn evaluate(state: &StoreState, company_id: Uuid, module: Module) -> Access {
    let Some(ctx) = state.active_workspace.as_ref() else {
        return Access::NoWorkspace;
    };
    if ctx.workspace.status != WorkspaceStatus::Active {
        return Access::WorkspaceInactive(ctx.workspace.status);
    }
    let Some(company) = ctx.company(company_id) else {
        return Access::CompanyNotFound;
    };
    if !company.is_approved() {
        return Access::CompanyInactive(company.status);
    }
    if !module.permits(ctx.role) {
        return Access::RoleDenied(ctx.role);
    }
    Access::Allowed
}
