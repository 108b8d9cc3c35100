use std::{path::PathBuf, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub request_timeout: Duration,
    /// Directory for the persisted auth session. In-memory only when unset.
    pub session_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let timeout_secs: u64 = get("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a number")?;
        if timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        let supabase_anon_key = get("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?;
        if supabase_anon_key.trim().is_empty() {
            anyhow::bail!("SUPABASE_ANON_KEY is empty");
        }

        Ok(Self {
            api_base_url: trim_url(get("API_BASE_URL").context("API_BASE_URL must be set")?),
            supabase_url: trim_url(get("SUPABASE_URL").context("SUPABASE_URL must be set")?),
            supabase_anon_key,
            request_timeout: Duration::from_secs(timeout_secs),
            session_dir: get("SESSION_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn trim_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
