use anyhow::Context as _;
use clap::Args;
use hydro_core::config::parse_keys;
use hydro_core::{Engine, HydroConfig, TrackerConfig};
use jira_client::JiraClient;
use std::path::PathBuf;
use std::sync::Arc;

/// Tracker connection flags, each with an environment fallback.
#[derive(Args, Debug, Clone)]
pub struct TrackerArgs {
    /// Tracker base URL, e.g. https://example.atlassian.net
    #[arg(long, global = true, env = "JIRA_BASE_URL", hide_env_values = true)]
    pub base_url: Option<String>,

    #[arg(long, global = true, env = "JIRA_EMAIL", hide_env_values = true)]
    pub email: Option<String>,

    #[arg(long, global = true, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Project scoping every search
    #[arg(long, global = true, env = "JIRA_PROJECT_KEY")]
    pub project: Option<String>,

    /// Comma-separated issue keys listed when no keys are requested
    #[arg(long, global = true, env = "JIRA_ISSUE_KEYS")]
    pub issue_keys: Option<String>,

    /// Vocabulary file (YAML); defaults apply when it does not exist
    #[arg(long, global = true, env = "HYDRO_VOCABULARY", default_value = "hydro.yaml")]
    pub vocabulary: PathBuf,
}

impl TrackerArgs {
    fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            base_url: self.base_url.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
            api_token: self.api_token.clone().unwrap_or_default(),
            project_key: self.project.clone().filter(|p| !p.trim().is_empty()),
            issue_keys: parse_keys(self.issue_keys.as_deref().unwrap_or_default()),
        }
    }

    /// Load configuration and connect an engine to the tracker.
    pub fn engine(&self) -> anyhow::Result<Arc<Engine>> {
        let config = HydroConfig::load(self.tracker_config(), Some(&self.vocabulary))
            .with_context(|| format!("loading {}", self.vocabulary.display()))?;
        let client = JiraClient::new(&config.tracker)?;
        tracing::debug!(base_url = %config.tracker.base_url(), "tracker client ready");
        Ok(Arc::new(Engine::new(Arc::new(client), &config)))
    }
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}
