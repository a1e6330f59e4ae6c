//! Scaffolding shared by every adapter.

use tracing::Span;

use super::GitApi;
use super::GitApiError;
use crate::config::RepoConfig;

/// Branch assumed for [`GitBase::branch_or_fallback`] when none is configured.
pub const FALLBACK_BRANCH: &str = "main";

/// Config and logging handle common to all adapters. Does no I/O.
#[derive(Debug)]
pub struct GitBase {
    provider: &'static str,
    config: RepoConfig,
    span: Span,
}

impl GitBase {
    pub fn new(provider: &'static str, config: RepoConfig) -> Self {
        let span = tracing::debug_span!(
            "git_api",
            provider,
            owner = %config.owner,
            repo = %config.repo,
        );
        Self {
            provider,
            config,
            span,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Span every operation of this adapter runs in.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// The configured branch, if any.
    pub fn branch(&self) -> Option<&str> {
        self.config.branch.as_deref()
    }

    pub fn branch_or_fallback(&self) -> &str {
        self.branch().unwrap_or(FALLBACK_BRANCH)
    }

    /// The configured branch, or whatever `api` reports as the default.
    pub async fn branch_or_default<A: GitApi>(&self, api: &A) -> Result<String, GitApiError> {
        match self.branch() {
            Some(branch) => Ok(branch.to_string()),
            None => api.get_default_branch().await,
        }
    }

    /// `<username> via ibm-garage-cloud cli`, sent with every request.
    pub fn user_agent(&self) -> String {
        format!("{} via ibm-garage-cloud cli", self.config.username)
    }

    pub fn not_implemented(&self, operation: &'static str) -> GitApiError {
        GitApiError::NotImplemented {
            provider: self.provider,
            operation,
        }
    }
}
