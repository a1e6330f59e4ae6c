//! GitLab implementation of the `GitApi` trait.
//!
//! Covers repository introspection and webhooks. Merge requests are not
//! supported and fail with `NotImplemented`. No rate-limit retry is applied.

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
use super::events::GITLAB_EVENTS;
use super::transport::check_status;
use super::transport::classify_webhook_error;
use super::transport::decode_base64;
use super::transport::read_json;
use crate::config::RepoConfig;

const GITLAB_HOST: &str = "gitlab.com";
const PRIVATE_TOKEN_HEADER: &str = "Private-Token";
const DEFAULT_JENKINS_URL: &str = "https://jenkins.local/";
const TREE_PAGE_SIZE: u32 = 1000;
/// Tree paths come back with this prefix, which the files endpoint rejects.
const TREE_PATH_PREFIX: &str = "files/";

/// GitLab implementation of the `GitApi` trait.
#[derive(Debug)]
pub struct GitLabAdapter {
    base: GitBase,
    client: Client,
}

impl GitLabAdapter {
    pub fn new(config: RepoConfig) -> Result<Self, GitApiError> {
        Ok(Self {
            base: GitBase::new("GitLab", config),
            client: Client::builder().build()?,
        })
    }

    pub fn base(&self) -> &GitBase {
        &self.base
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(PRIVATE_TOKEN_HEADER, &self.base.config().password)
            .header(USER_AGENT, self.base.user_agent())
            .header(ACCEPT, "application/json")
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

    fn file_url(&self, path: &str, branch: &str) -> String {
        format!(
            "{}/repository/files/{}?ref={}",
            self.base_url(),
            urlencoding::encode(path),
            urlencoding::encode(branch)
        )
    }
}

impl GitApi for GitLabAdapter {
    fn base_url(&self) -> String {
        let config = self.base.config();
        let host = config.host.as_deref().unwrap_or(GITLAB_HOST);
        let project = config.full_name();
        let project = urlencoding::encode(&project);
        format!(
            "{}://{host}/api/v4/projects/{}",
            config.protocol,
            urlencoding::encode(&project)
        )
    }

    async fn list_files(&self) -> Result<Vec<FileDescriptor>, GitApiError> {
        let branch = self.base.branch_or_default(self).await?;
        let url = format!(
            "{}/repository/tree?ref={}&per_page={TREE_PAGE_SIZE}",
            self.base_url(),
            urlencoding::encode(&branch)
        );
        let entries: Vec<TreeEntry> = read_json(self.get(&url).await?).await?;

        Ok(blob_paths(entries)
            .into_iter()
            .map(|path| FileDescriptor {
                url: Some(self.file_url(&path, &branch)),
                path,
            })
            .collect())
    }

    async fn get_file_contents(&self, file: &FileDescriptor) -> Result<Vec<u8>, GitApiError> {
        let url = match &file.url {
            Some(url) => url.clone(),
            None => {
                let branch = self.base.branch_or_default(self).await?;
                self.file_url(&file.path, &branch)
            }
        };
        let content: ContentResponse = read_json(self.get(&url).await?).await?;
        decode_base64(&content.content)
    }

    async fn get_default_branch(&self) -> Result<String, GitApiError> {
        let url = format!("{}/repository/branches", self.base_url());
        let branches: Vec<Branch> = read_json(self.get(&url).await?).await?;
        select_default_branch(branches)
    }

    async fn get_pull_request(&self, _pull_number: u64) -> Result<PullRequest, GitApiError> {
        Err(self.base.not_implemented("get_pull_request"))
    }

    async fn create_pull_request(
        &self,
        _options: CreatePullRequestOptions,
    ) -> Result<PullRequest, GitApiError> {
        Err(self.base.not_implemented("create_pull_request"))
    }

    async fn merge_pull_request(
        &self,
        _options: MergePullRequestOptions,
    ) -> Result<String, GitApiError> {
        Err(self.base.not_implemented("merge_pull_request"))
    }

    async fn update_pull_request_branch(&self, _pull_number: u64) -> Result<String, GitApiError> {
        Err(self.base.not_implemented("update_pull_request_branch"))
    }

    async fn create_webhook(&self, options: CreateWebhookOptions) -> Result<String, GitApiError> {
        let target = webhook_target(&options)?;
        let url = format!("{}/hooks", self.base_url());
        let body = CreateHookBody {
            id: self.base.config().full_name(),
            url: &target.url,
            push_events: true,
            enable_ssl_verification: target.verify_ssl,
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
        &GITLAB_EVENTS
    }
}

/// Blob paths from a tree listing, with the `files/` prefix removed.
fn blob_paths(entries: Vec<TreeEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|entry| entry.kind == "blob")
        .map(|entry| match entry.path.strip_prefix(TREE_PATH_PREFIX) {
            Some(stripped) => stripped.to_string(),
            None => entry.path,
        })
        .collect()
}

/// The first branch flagged as default.
fn select_default_branch(branches: Vec<Branch>) -> Result<String, GitApiError> {
    branches
        .into_iter()
        .find(|branch| branch.default)
        .map(|branch| branch.name)
        .ok_or(GitApiError::NoDefaultBranch)
}

#[derive(Debug, PartialEq, Eq)]
struct WebhookTarget {
    url: String,
    verify_ssl: bool,
}

/// The hook URL: explicit, or the Jenkins GitLab plugin's project endpoint
/// with any Jenkins credentials embedded.
fn webhook_target(options: &CreateWebhookOptions) -> Result<WebhookTarget, GitApiError> {
    if let Some(url) = &options.webhook_url {
        return Ok(WebhookTarget {
            url: url.clone(),
            verify_ssl: url.starts_with("https://"),
        });
    }

    let jenkins_url = options.jenkins_url.as_deref().unwrap_or(DEFAULT_JENKINS_URL);
    let (protocol, host) = split_jenkins_url(jenkins_url)?;
    let job_name = options
        .job_name
        .as_deref()
        .ok_or(GitApiError::MissingWebhookUrl)?;

    let credentials = match (&options.jenkins_user, &options.jenkins_password) {
        (Some(user), Some(password)) => format!(
            "{}:{}@",
            urlencoding::encode(user),
            urlencoding::encode(password)
        ),
        _ => String::new(),
    };

    Ok(WebhookTarget {
        url: format!("{protocol}://{credentials}{host}/project/{job_name}"),
        verify_ssl: protocol == "https",
    })
}

/// Split `http(s)://host[/path]/` into protocol and the rest, trailing slash
/// removed.
fn split_jenkins_url(url: &str) -> Result<(&str, &str), GitApiError> {
    let invalid = || GitApiError::InvalidJenkinsUrl {
        url: url.to_string(),
    };
    let (protocol, rest) = url.split_once("://").ok_or_else(invalid)?;
    if protocol != "http" && protocol != "https" {
        return Err(invalid());
    }
    let host = rest.trim_end_matches('/');
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((protocol, host))
}

// -- Wire types --

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Branch {
    name: String,
    #[serde(default)]
    default: bool,
}

#[derive(Debug, Serialize)]
struct CreateHookBody<'a> {
    id: String,
    url: &'a str,
    push_events: bool,
    enable_ssl_verification: bool,
}

#[derive(Debug, Deserialize)]
struct HookResponse {
    id: u64,
}
