//! The `GitApi` contract and its vendor adapters.
//!
//! All hosting-provider interaction (GitHub, GitLab, Bitbucket) goes through
//! the `GitApi` trait. Callers never import vendor-specific types directly;
//! they build a [`GitProvider`] once and talk to the trait from then on.

pub mod base;
pub mod bitbucket;
pub mod events;
pub mod github;
pub mod gitlab;
pub mod provider;
pub mod transport;

use miette::Diagnostic;
use thiserror::Error;

pub use self::events::GitEvent;
pub use self::events::GitHeader;
pub use self::events::WebhookEventMap;
pub use self::provider::GitProvider;
pub use self::provider::ProviderKind;

/// Errors from hosting-provider operations.
#[derive(Debug, Error, Diagnostic)]
pub enum GitApiError {
    /// The selected provider does not support this operation.
    #[error("{operation} is not implemented for {provider}")]
    NotImplemented {
        provider: &'static str,
        operation: &'static str,
    },

    /// Webhook creation found a hook with the same URL already registered.
    #[error("webhook already exists")]
    #[diagnostic(help("The repository is already wired up; this is usually safe to ignore"))]
    WebhookAlreadyExists,

    /// Any other webhook creation failure.
    #[error("failed to create webhook")]
    UnknownWebhook {
        #[source]
        source: Box<GitApiError>,
    },

    /// The vendor API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        status: http::StatusCode,
        message: String,
        body: String,
        /// Seconds from the `Retry-After` header, when the vendor sent one.
        retry_after: Option<u64>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode file contents: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("repository reports no default branch")]
    NoDefaultBranch,

    #[error("{provider} needs a host in the repository config")]
    #[diagnostic(help("Pass the server host name, e.g. `github.example.com`"))]
    MissingHost { provider: &'static str },

    #[error("no webhook url or jenkins url given")]
    #[diagnostic(help("Set either a webhook url or a jenkins url plus job name"))]
    MissingWebhookUrl,

    #[error("not a valid jenkins url: {url}")]
    InvalidJenkinsUrl { url: String },
}

/// A file entry, forge-agnostic.
///
/// `url` is returned by some vendors pre-built (absolute, sometimes
/// pre-authorized) and must be used as-is when present. Descriptors are only
/// meaningful to the adapter that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: String,
    pub url: Option<String>,
}

/// A pull request snapshot, forge-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub pull_number: u64,
    pub source_branch: String,
    pub target_branch: String,
}

/// Parameters for creating a pull request.
#[derive(Debug, Clone, Default)]
pub struct CreatePullRequestOptions {
    pub title: String,
    pub source_branch: String,
    pub target_branch: String,
    pub maintainer_can_modify: bool,
    pub draft: bool,
}

/// Parameters for merging a pull request.
#[derive(Debug, Clone)]
pub struct MergePullRequestOptions {
    pub pull_number: u64,
    pub title: String,
    pub message: String,
    /// Vendor merge strategy token (`merge`, `squash`, `rebase`, ...), passed
    /// through uninterpreted.
    pub method: String,
}

/// Parameters for registering a webhook.
///
/// `webhook_url` always wins. Otherwise each adapter derives the hook URL from
/// the Jenkins fields in its own way.
#[derive(Debug, Clone, Default)]
pub struct CreateWebhookOptions {
    pub webhook_url: Option<String>,
    pub jenkins_url: Option<String>,
    pub jenkins_user: Option<String>,
    pub jenkins_password: Option<String>,
    pub job_name: Option<String>,
}

/// Trait for interacting with a Git hosting provider.
///
/// All methods return forge-agnostic types. Implementations handle the
/// translation to/from vendor-specific APIs. Implementations hold no mutable
/// state, so one instance can serve concurrent calls.
pub trait GitApi: Send + Sync {
    /// Vendor API root for this repository. Pure function of the config.
    fn base_url(&self) -> String;

    /// List file (not directory) entries at the root of the configured
    /// branch. Only the vendor's first page is returned.
    fn list_files(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<FileDescriptor>, GitApiError>> + Send;

    /// Fetch the decoded contents of a file.
    fn get_file_contents(
        &self,
        file: &FileDescriptor,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, GitApiError>> + Send;

    /// Get the repository's default branch name.
    fn get_default_branch(
        &self,
    ) -> impl std::future::Future<Output = Result<String, GitApiError>> + Send;

    /// Get a pull request by number.
    fn get_pull_request(
        &self,
        pull_number: u64,
    ) -> impl std::future::Future<Output = Result<PullRequest, GitApiError>> + Send;

    /// Create a new pull request.
    fn create_pull_request(
        &self,
        options: CreatePullRequestOptions,
    ) -> impl std::future::Future<Output = Result<PullRequest, GitApiError>> + Send;

    /// Merge a pull request, returning the vendor's status message.
    fn merge_pull_request(
        &self,
        options: MergePullRequestOptions,
    ) -> impl std::future::Future<Output = Result<String, GitApiError>> + Send;

    /// Bring a pull request's branch up to date with its base, returning the
    /// vendor's status message.
    fn update_pull_request_branch(
        &self,
        pull_number: u64,
    ) -> impl std::future::Future<Output = Result<String, GitApiError>> + Send;

    /// Register a push webhook, returning the created hook id.
    fn create_webhook(
        &self,
        options: CreateWebhookOptions,
    ) -> impl std::future::Future<Output = Result<String, GitApiError>> + Send;

    /// The ref this adapter expects in inbound push payloads for the
    /// configured branch.
    fn git_ref(&self) -> String;

    /// Static webhook naming and payload path table for this vendor.
    fn events(&self) -> &'static WebhookEventMap;

    fn ref_path(&self) -> &'static str {
        self.events().ref_path
    }

    fn revision_path(&self) -> &'static str {
        self.events().revision_path
    }

    fn repository_url_path(&self) -> &'static str {
        self.events().repository_url_path
    }

    fn repository_name_path(&self) -> &'static str {
        self.events().repository_name_path
    }

    /// Vendor header name for a canonical header.
    fn header(&self, header: GitHeader) -> &'static str {
        self.events().header(header)
    }

    /// Vendor event name for a canonical event.
    fn event_name(&self, event: GitEvent) -> &'static str {
        self.events().event_name(event)
    }
}
