//! GitHub and GitHub Enterprise implementation of the `GitApi` trait.
//!
//! Both flavors share everything except the API root. Pull-request calls run
//! under [`RetryPolicy`] to ride out GitHub's secondary rate limit.

use http::header::ACCEPT;
use http::header::USER_AGENT;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::CreatePullRequestOptions;
use super::CreateWebhookOptions;
use super::FileDescriptor;
use super::GitApi;
use super::GitApiError;
use super::MergePullRequestOptions;
use super::PullRequest;
use super::WebhookEventMap;
use super::base::GitBase;
use super::events::GITHUB_EVENTS;
use super::transport::check_status;
use super::transport::classify_webhook_error;
use super::transport::decode_base64;
use super::transport::encode_path;
use super::transport::read_json;
use super::transport::trim_trailing_slash;
use crate::config::RepoConfig;
use crate::retry::RetryPolicy;
use crate::retry::Sleeper;
use crate::retry::TokioSleeper;

const GITHUB_API: &str = "https://api.github.com";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const JENKINS_HOOK_SUFFIX: &str = "/github-webhook/";

/// Which GitHub the adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubFlavor {
    /// github.com
    Cloud,
    /// A GitHub Enterprise Server at the configured host.
    Enterprise,
}

/// GitHub implementation of the `GitApi` trait.
#[derive(Debug)]
pub struct GitHubAdapter<S = TokioSleeper> {
    base: GitBase,
    flavor: GitHubFlavor,
    client: Client,
    retry: RetryPolicy<S>,
}

impl GitHubAdapter {
    /// Create an adapter that backs off on the tokio timer.
    pub fn new(flavor: GitHubFlavor, config: RepoConfig) -> Result<Self, GitApiError> {
        Self::with_sleeper(flavor, config, TokioSleeper)
    }
}

impl<S: Sleeper> GitHubAdapter<S> {
    /// Create an adapter with a custom backoff sleeper.
    pub fn with_sleeper(
        flavor: GitHubFlavor,
        config: RepoConfig,
        sleeper: S,
    ) -> Result<Self, GitApiError> {
        let provider = match flavor {
            GitHubFlavor::Cloud => "GitHub",
            GitHubFlavor::Enterprise => "GitHub Enterprise",
        };
        if flavor == GitHubFlavor::Enterprise && config.host.is_none() {
            return Err(GitApiError::MissingHost { provider });
        }

        Ok(Self {
            base: GitBase::new(provider, config),
            flavor,
            client: Client::builder().build()?,
            retry: RetryPolicy::new(sleeper),
        })
    }

    pub fn flavor(&self) -> GitHubFlavor {
        self.flavor
    }

    pub fn base(&self) -> &GitBase {
        &self.base
    }

    /// Attach credentials, client identifier and media type.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let config = self.base.config();
        request
            .basic_auth(&config.username, Some(&config.password))
            .header(USER_AGENT, self.base.user_agent())
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
    }

    async fn get(&self, url: &str) -> Result<Response, GitApiError> {
        debug!(url, "GET");
        let response = self.authorize(self.client.get(url)).send().await?;
        check_status(response).await
    }

    async fn post<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<Response, GitApiError> {
        debug!(url, "POST");
        let response = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn put<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<Response, GitApiError> {
        debug!(url, "PUT");
        let response = self
            .authorize(self.client.put(url))
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn fetch_pull_request(&self, pull_number: u64) -> Result<PullRequest, GitApiError> {
        let url = format!("{}/pulls/{pull_number}", self.base_url());
        let pull: PullResponse = read_json(self.get(&url).await?).await?;
        Ok(pull.into())
    }

    async fn send_create_pull_request(
        &self,
        options: &CreatePullRequestOptions,
    ) -> Result<PullRequest, GitApiError> {
        let url = format!("{}/pulls", self.base_url());
        let body = CreatePullBody {
            title: &options.title,
            head: &options.source_branch,
            base: &options.target_branch,
            maintainer_can_modify: options.maintainer_can_modify,
            draft: options.draft,
        };
        let pull: PullResponse = read_json(self.post(&url, &body).await?).await?;
        Ok(pull.into())
    }

    async fn send_merge_pull_request(
        &self,
        options: &MergePullRequestOptions,
    ) -> Result<String, GitApiError> {
        let url = format!("{}/pulls/{}/merge", self.base_url(), options.pull_number);
        let body = MergeBody {
            commit_title: &options.title,
            commit_message: &options.message,
            merge_method: &options.method,
        };
        let result: MessageResponse = read_json(self.put(&url, &body).await?).await?;
        Ok(result.message)
    }

    async fn send_update_pull_request_branch(
        &self,
        pull_number: u64,
    ) -> Result<String, GitApiError> {
        let url = format!("{}/pulls/{pull_number}/update-branch", self.base_url());
        let result: MessageResponse =
            read_json(self.put(&url, &serde_json::json!({})).await?).await?;
        Ok(result.message)
    }
}

impl<S: Sleeper> GitApi for GitHubAdapter<S> {
    fn base_url(&self) -> String {
        let config = self.base.config();
        let api_root = match self.flavor {
            GitHubFlavor::Cloud => GITHUB_API.to_string(),
            GitHubFlavor::Enterprise => format!(
                "{}://{}/api/v3",
                config.protocol,
                config.host.as_deref().unwrap_or_default()
            ),
        };
        format!("{api_root}/repos/{}/{}", config.owner, config.repo)
    }

    async fn list_files(&self) -> Result<Vec<FileDescriptor>, GitApiError> {
        let branch = self.base.branch_or_default(self).await?;
        let url = format!(
            "{}/git/trees/{}",
            self.base_url(),
            urlencoding::encode(&branch)
        );
        let tree: TreeResponse = read_json(self.get(&url).await?).await?;
        Ok(blob_files(tree))
    }

    async fn get_file_contents(&self, file: &FileDescriptor) -> Result<Vec<u8>, GitApiError> {
        let url = match &file.url {
            Some(url) => url.clone(),
            None => {
                let branch = self.base.branch_or_default(self).await?;
                format!(
                    "{}/contents/{}?ref={}",
                    self.base_url(),
                    encode_path(&file.path),
                    urlencoding::encode(&branch)
                )
            }
        };
        let content: ContentResponse = read_json(self.get(&url).await?).await?;
        decode_base64(&content.content)
    }

    async fn get_default_branch(&self) -> Result<String, GitApiError> {
        let repo: RepoResponse = read_json(self.get(&self.base_url()).await?).await?;
        repo.default_branch.ok_or(GitApiError::NoDefaultBranch)
    }

    async fn get_pull_request(&self, pull_number: u64) -> Result<PullRequest, GitApiError> {
        self.retry
            .run("get_pull_request", || self.fetch_pull_request(pull_number))
            .await
    }

    async fn create_pull_request(
        &self,
        options: CreatePullRequestOptions,
    ) -> Result<PullRequest, GitApiError> {
        self.retry
            .run("create_pull_request", || self.send_create_pull_request(&options))
            .await
    }

    async fn merge_pull_request(
        &self,
        options: MergePullRequestOptions,
    ) -> Result<String, GitApiError> {
        self.retry
            .run("merge_pull_request", || self.send_merge_pull_request(&options))
            .await
    }

    async fn update_pull_request_branch(&self, pull_number: u64) -> Result<String, GitApiError> {
        self.retry
            .run("update_pull_request_branch", || {
                self.send_update_pull_request_branch(pull_number)
            })
            .await
    }

    async fn create_webhook(&self, options: CreateWebhookOptions) -> Result<String, GitApiError> {
        let hook_url = webhook_url(&options)?;
        let url = format!("{}/hooks", self.base_url());
        let body = CreateHookBody {
            name: "web",
            active: true,
            events: &["push"],
            config: HookConfig {
                url: &hook_url,
                content_type: "json",
                insecure_ssl: "0",
            },
        };

        let response = self
            .post(&url, &body)
            .await
            .map_err(classify_webhook_error)?;
        let hook: HookResponse = read_json(response).await.map_err(classify_webhook_error)?;
        Ok(hook.id.to_string())
    }

    fn git_ref(&self) -> String {
        format!("refs/heads/{}", self.base.branch_or_fallback())
    }

    fn events(&self) -> &'static WebhookEventMap {
        &GITHUB_EVENTS
    }
}

/// The hook URL: explicit, or Jenkins' GitHub plugin endpoint.
fn webhook_url(options: &CreateWebhookOptions) -> Result<String, GitApiError> {
    if let Some(url) = &options.webhook_url {
        return Ok(url.clone());
    }
    let jenkins_url = options
        .jenkins_url
        .as_deref()
        .ok_or(GitApiError::MissingWebhookUrl)?;
    Ok(format!(
        "{}{JENKINS_HOOK_SUFFIX}",
        trim_trailing_slash(jenkins_url)
    ))
}

fn blob_files(tree: TreeResponse) -> Vec<FileDescriptor> {
    tree.tree
        .into_iter()
        .filter(|entry| entry.kind == "blob")
        .map(|entry| FileDescriptor {
            path: entry.path,
            url: entry.url,
        })
        .collect()
}

// -- Wire types --

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    head: PullRef,
    base: PullRef,
}

#[derive(Debug, Deserialize)]
struct PullRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<PullResponse> for PullRequest {
    fn from(pull: PullResponse) -> Self {
        PullRequest {
            pull_number: pull.number,
            source_branch: pull.head.ref_name,
            target_branch: pull.base.ref_name,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreatePullBody<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    maintainer_can_modify: bool,
    draft: bool,
}

#[derive(Debug, Serialize)]
struct MergeBody<'a> {
    commit_title: &'a str,
    commit_message: &'a str,
    merge_method: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct CreateHookBody<'a> {
    name: &'a str,
    active: bool,
    events: &'a [&'a str],
    config: HookConfig<'a>,
}

#[derive(Debug, Serialize)]
struct HookConfig<'a> {
    url: &'a str,
    content_type: &'a str,
    insecure_ssl: &'a str,
}

#[derive(Debug, Deserialize)]
struct HookResponse {
    id: u64,
}
