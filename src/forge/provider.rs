//! Provider selection.
//!
//! `GitProvider` is an enum over the concrete adapters rather than a trait
//! object, so the async methods need no boxing. The variant is picked once in
//! [`GitProvider::new`] and never changes.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::Instrument;
use tracing::Span;

use super::CreatePullRequestOptions;
use super::CreateWebhookOptions;
use super::FileDescriptor;
use super::GitApi;
use super::GitApiError;
use super::MergePullRequestOptions;
use super::PullRequest;
use super::WebhookEventMap;
use super::bitbucket::BitbucketAdapter;
use super::github::GitHubAdapter;
use super::github::GitHubFlavor;
use super::gitlab::GitLabAdapter;
use crate::config::RepoConfig;

/// Supported hosting providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "github-enterprise", alias = "ghe")]
    GitHubEnterprise,
    #[serde(rename = "gitlab")]
    GitLab,
    #[serde(rename = "bitbucket")]
    Bitbucket,
}

impl ProviderKind {
    /// Guess the provider from a server host name.
    ///
    /// Unknown hosts are assumed to be GitHub Enterprise installations.
    pub fn detect(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        let name = host.split(':').next().unwrap_or_default();
        match name {
            "github.com" | "www.github.com" => Self::GitHub,
            "bitbucket.org" | "www.bitbucket.org" => Self::Bitbucket,
            _ if name.contains("gitlab") => Self::GitLab,
            _ => Self::GitHubEnterprise,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitHubEnterprise => "github-enterprise",
            Self::GitLab => "gitlab",
            Self::Bitbucket => "bitbucket",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "github-enterprise" | "ghe" => Ok(Self::GitHubEnterprise),
            "gitlab" => Ok(Self::GitLab),
            "bitbucket" => Ok(Self::Bitbucket),
            other => Err(format!(
                "unknown provider '{other}' (expected github, github-enterprise, gitlab or bitbucket)"
            )),
        }
    }
}

/// Concrete adapter for one repository (enum dispatch).
#[derive(Debug)]
pub enum GitProvider {
    GitHub(GitHubAdapter),
    GitLab(GitLabAdapter),
    Bitbucket(BitbucketAdapter),
}

impl GitProvider {
    /// Construct the adapter for `kind`.
    pub fn new(kind: ProviderKind, config: RepoConfig) -> Result<Self, GitApiError> {
        Ok(match kind {
            ProviderKind::GitHub => {
                Self::GitHub(GitHubAdapter::new(GitHubFlavor::Cloud, config)?)
            }
            ProviderKind::GitHubEnterprise => {
                Self::GitHub(GitHubAdapter::new(GitHubFlavor::Enterprise, config)?)
            }
            ProviderKind::GitLab => Self::GitLab(GitLabAdapter::new(config)?),
            ProviderKind::Bitbucket => Self::Bitbucket(BitbucketAdapter::new(config)?),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::GitHub(a) => match a.flavor() {
                GitHubFlavor::Cloud => ProviderKind::GitHub,
                GitHubFlavor::Enterprise => ProviderKind::GitHubEnterprise,
            },
            Self::GitLab(_) => ProviderKind::GitLab,
            Self::Bitbucket(_) => ProviderKind::Bitbucket,
        }
    }

    pub fn config(&self) -> &RepoConfig {
        match self {
            Self::GitHub(a) => a.base().config(),
            Self::GitLab(a) => a.base().config(),
            Self::Bitbucket(a) => a.base().config(),
        }
    }

    fn span(&self) -> Span {
        match self {
            Self::GitHub(a) => a.base().span(),
            Self::GitLab(a) => a.base().span(),
            Self::Bitbucket(a) => a.base().span(),
        }
    }
}

impl GitApi for GitProvider {
    fn base_url(&self) -> String {
        match self {
            Self::GitHub(a) => a.base_url(),
            Self::GitLab(a) => a.base_url(),
            Self::Bitbucket(a) => a.base_url(),
        }
    }

    async fn list_files(&self) -> Result<Vec<FileDescriptor>, GitApiError> {
        async {
            match self {
                Self::GitHub(a) => a.list_files().await,
                Self::GitLab(a) => a.list_files().await,
                Self::Bitbucket(a) => a.list_files().await,
            }
        }
        .instrument(self.span())
        .await
    }

    async fn get_file_contents(&self, file: &FileDescriptor) -> Result<Vec<u8>, GitApiError> {
        async {
            match self {
                Self::GitHub(a) => a.get_file_contents(file).await,
                Self::GitLab(a) => a.get_file_contents(file).await,
                Self::Bitbucket(a) => a.get_file_contents(file).await,
            }
        }
        .instrument(self.span())
        .await
    }

    async fn get_default_branch(&self) -> Result<String, GitApiError> {
        async {
            match self {
                Self::GitHub(a) => a.get_default_branch().await,
                Self::GitLab(a) => a.get_default_branch().await,
                Self::Bitbucket(a) => a.get_default_branch().await,
            }
        }
        .instrument(self.span())
        .await
    }

    async fn get_pull_request(&self, pull_number: u64) -> Result<PullRequest, GitApiError> {
        async {
            match self {
                Self::GitHub(a) => a.get_pull_request(pull_number).await,
                Self::GitLab(a) => a.get_pull_request(pull_number).await,
                Self::Bitbucket(a) => a.get_pull_request(pull_number).await,
            }
        }
        .instrument(self.span())
        .await
    }

    async fn create_pull_request(
        &self,
        options: CreatePullRequestOptions,
    ) -> Result<PullRequest, GitApiError> {
        async {
            match self {
                Self::GitHub(a) => a.create_pull_request(options).await,
                Self::GitLab(a) => a.create_pull_request(options).await,
                Self::Bitbucket(a) => a.create_pull_request(options).await,
            }
        }
        .instrument(self.span())
        .await
    }

    async fn merge_pull_request(
        &self,
        options: MergePullRequestOptions,
    ) -> Result<String, GitApiError> {
        async {
            match self {
                Self::GitHub(a) => a.merge_pull_request(options).await,
                Self::GitLab(a) => a.merge_pull_request(options).await,
                Self::Bitbucket(a) => a.merge_pull_request(options).await,
            }
        }
        .instrument(self.span())
        .await
    }

    async fn update_pull_request_branch(&self, pull_number: u64) -> Result<String, GitApiError> {
        async {
            match self {
                Self::GitHub(a) => a.update_pull_request_branch(pull_number).await,
                Self::GitLab(a) => a.update_pull_request_branch(pull_number).await,
                Self::Bitbucket(a) => a.update_pull_request_branch(pull_number).await,
            }
        }
        .instrument(self.span())
        .await
    }

    async fn create_webhook(&self, options: CreateWebhookOptions) -> Result<String, GitApiError> {
        async {
            match self {
                Self::GitHub(a) => a.create_webhook(options).await,
                Self::GitLab(a) => a.create_webhook(options).await,
                Self::Bitbucket(a) => a.create_webhook(options).await,
            }
        }
        .instrument(self.span())
        .await
    }

    fn git_ref(&self) -> String {
        match self {
            Self::GitHub(a) => a.git_ref(),
            Self::GitLab(a) => a.git_ref(),
            Self::Bitbucket(a) => a.git_ref(),
        }
    }

    fn events(&self) -> &'static WebhookEventMap {
        match self {
            Self::GitHub(a) => a.events(),
            Self::GitLab(a) => a.events(),
            Self::Bitbucket(a) => a.events(),
        }
    }
}
