pub mod access;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;

pub use access::{Access, Module};
pub use error::{Result, StoreError};
pub use state::{StorePhase, StoreState};
pub use store::WorkspaceStore;
