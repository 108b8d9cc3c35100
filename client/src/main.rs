use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wagedesk_client::{
    api::ApiClient,
    auth::supabase::SupabaseAuth,
    config::Config,
    Module, WorkspaceStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (dev convenience)
    let _ = dotenvy::dotenv();

    // Tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env()?;

    let auth = Arc::new(SupabaseAuth::from_config(&cfg)?);
    let api = ApiClient::from_config(&cfg)?;
    let store = WorkspaceStore::init(auth, api).await;

    if !store.snapshot().is_authenticated() {
        match (std::env::var("WAGEDESK_EMAIL"), std::env::var("WAGEDESK_PASSWORD")) {
            (Ok(email), Ok(password)) => {
                if let Err(e) = store.login(&email, &password).await {
                    anyhow::bail!("Sign-in failed: {}", e);
                }
            }
            _ => {
                tracing::info!("No saved session; set WAGEDESK_EMAIL and WAGEDESK_PASSWORD to sign in");
                return Ok(());
            }
        }
    }

    let state = store.snapshot();
    let user = state
        .user
        .as_ref()
        .and_then(|u| u.display_name())
        .unwrap_or("unknown user");
    println!("Signed in as {}", user);

    if let Some(err) = &state.context_error {
        println!("Could not load workspaces: {}", err);
    }

    let Some(ctx) = &state.active_workspace else {
        println!("No workspaces");
        return Ok(());
    };
    println!(
        "Workspace: {} ({:?}, role {:?}, {} memberships)",
        ctx.workspace.name,
        ctx.workspace.status,
        ctx.role,
        state.workspaces.len()
    );

    for company in &ctx.workspace.companies {
        let gates: Vec<String> = [Module::Employees, Module::Payroll, Module::Reports, Module::Settings]
            .into_iter()
            .map(|module| match store.access(company.id, module).banner() {
                None => format!("{:?}: ok", module),
                Some(banner) => format!("{:?}: {}", module, banner),
            })
            .collect();
        println!("  {} [{:?}]", company.name, company.status);
        for gate in gates {
            println!("    {}", gate);
        }
    }

    Ok(())
}
