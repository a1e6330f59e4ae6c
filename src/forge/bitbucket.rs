//! Bitbucket Cloud implementation of the `GitApi` trait.
//!
//! Pull requests are not supported and fail with `NotImplemented`. File
//! listing reads a single page of the source tree root.

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
use super::events::BITBUCKET_EVENTS;
use super::transport::check_status;
use super::transport::classify_webhook_error;
use super::transport::encode_path;
use super::transport::read_json;
use super::transport::trim_trailing_slash;
use crate::config::RepoConfig;

const BITBUCKET_API: &str = "https://api.bitbucket.org/2.0";
const SRC_PAGE_SIZE: u32 = 100;
const JENKINS_HOOK_SUFFIX: &str = "/bitbucket-hook/";

/// Bitbucket implementation of the `GitApi` trait.
#[derive(Debug)]
pub struct BitbucketAdapter {
    base: GitBase,
    api_root: String,
    client: Client,
}

impl BitbucketAdapter {
    pub fn new(config: RepoConfig) -> Result<Self, GitApiError> {
        Ok(Self {
            base: GitBase::new("Bitbucket", config),
            api_root: BITBUCKET_API.to_string(),
            client: Client::builder().build()?,
        })
    }

    /// Point the adapter at another API root, e.g. a proxy.
    #[must_use]
    pub fn with_api_root(mut self, api_root: &str) -> Self {
        self.api_root = trim_trailing_slash(api_root).to_string();
        self
    }

    pub fn base(&self) -> &GitBase {
        &self.base
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let config = self.base.config();
        request
            .basic_auth(&config.username, Some(&config.password))
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
}

impl GitApi for BitbucketAdapter {
    fn base_url(&self) -> String {
        let config = self.base.config();
        format!(
            "{}/repositories/{}/{}",
            self.api_root, config.owner, config.repo
        )
    }

    async fn list_files(&self) -> Result<Vec<FileDescriptor>, GitApiError> {
        let branch = self.base.branch_or_default(self).await?;
        let url = format!(
            "{}/src/{}/?pagelen={SRC_PAGE_SIZE}",
            self.base_url(),
            urlencoding::encode(&branch)
        );
        let page: SrcPage = read_json(self.get(&url).await?).await?;
        Ok(commit_files(page))
    }

    async fn get_file_contents(&self, file: &FileDescriptor) -> Result<Vec<u8>, GitApiError> {
        let url = match &file.url {
            Some(url) => url.clone(),
            None => {
                let branch = self.base.branch_or_default(self).await?;
                format!(
                    "{}/src/{}/{}",
                    self.base_url(),
                    urlencoding::encode(&branch),
                    encode_path(&file.path)
                )
            }
        };
        // The src endpoint serves file bodies raw.
        let bytes = self.get(&url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn get_default_branch(&self) -> Result<String, GitApiError> {
        let url = format!("{}/branching-model", self.base_url());
        let model: BranchingModel = read_json(self.get(&url).await?).await?;
        model.development_branch().ok_or(GitApiError::NoDefaultBranch)
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
        let hook_url = webhook_url(&options)?;
        let url = format!("{}/hooks", self.base_url());
        let body = CreateHookBody {
            description: "Webhook",
            url: &hook_url,
            active: true,
            events: &["repo:push"],
        };

        let response = self
            .post(&url, &body)
            .await
            .map_err(classify_webhook_error)?;
        let hook: HookResponse = read_json(response).await.map_err(classify_webhook_error)?;
        Ok(hook.uuid)
    }

    fn git_ref(&self) -> String {
        self.base.branch_or_fallback().to_string()
    }

    fn events(&self) -> &'static WebhookEventMap {
        &BITBUCKET_EVENTS
    }
}

/// The hook URL: explicit, or Jenkins' Bitbucket plugin endpoint.
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

fn commit_files(page: SrcPage) -> Vec<FileDescriptor> {
    page.values
        .into_iter()
        .filter(|entry| entry.kind == "commit_file")
        .map(|entry| FileDescriptor {
            path: entry.path,
            url: entry.links.and_then(|links| links.self_link).map(|l| l.href),
        })
        .collect()
}

// -- Wire types --

#[derive(Debug, Deserialize)]
struct SrcPage {
    values: Vec<SrcEntry>,
}

#[derive(Debug, Deserialize)]
struct SrcEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    links: Option<SrcLinks>,
}

#[derive(Debug, Deserialize)]
struct SrcLinks {
    #[serde(rename = "self")]
    self_link: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct BranchingModel {
    development: Option<DevelopmentBranch>,
}

#[derive(Debug, Deserialize)]
struct DevelopmentBranch {
    name: Option<String>,
    branch: Option<NamedBranch>,
}

#[derive(Debug, Deserialize)]
struct NamedBranch {
    name: String,
}

impl BranchingModel {
    /// The resolved development branch, else its configured name.
    fn development_branch(self) -> Option<String> {
        let development = self.development?;
        development
            .branch
            .map(|branch| branch.name)
            .or(development.name)
    }
}

#[derive(Debug, Serialize)]
struct CreateHookBody<'a> {
    description: &'a str,
    url: &'a str,
    active: bool,
    events: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct HookResponse {
    uuid: String,
}

#[cfg(test)]
mod tests {
    use http::Method;
    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::forge::GitEvent;
    use crate::forge::GitHeader;
    use crate::testing::Canned;
    use crate::testing::StubServer;

    fn adapter(branch: Option<&str>) -> BitbucketAdapter {
        BitbucketAdapter::new(RepoConfig {
            owner: "workspace".into(),
            repo: "widget".into(),
            protocol: "https".into(),
            host: None,
            username: "carol".into(),
            password: "app-password".into(),
            branch: branch.map(String::from),
        })
        .unwrap()
    }

    #[test]
    fn base_url() {
        assert_eq!(
            adapter(None).base_url(),
            "https://api.bitbucket.org/2.0/repositories/workspace/widget"
        );
    }

    #[test]
    fn src_listing_keeps_only_files() {
        let page: SrcPage = serde_json::from_str(
            r#"{
                "pagelen": 100,
                "values": [
                    {"path": "README.md", "type": "commit_file",
                     "links": {"self": {"href": "https://api.bitbucket.org/2.0/repositories/workspace/widget/src/abc/README.md"}}},
                    {"path": "src", "type": "commit_directory",
                     "links": {"self": {"href": "https://api.bitbucket.org/2.0/repositories/workspace/widget/src/abc/src/"}}},
                    {"path": "pom.xml", "type": "commit_file"}
                ],
                "page": 1
            }"#,
        )
        .unwrap();

        assert_eq!(
            commit_files(page),
            [
                FileDescriptor {
                    path: "README.md".into(),
                    url: Some(
                        "https://api.bitbucket.org/2.0/repositories/workspace/widget/src/abc/README.md"
                            .into()
                    ),
                },
                FileDescriptor {
                    path: "pom.xml".into(),
                    url: None,
                },
            ]
        );
    }

    #[test]
    fn branching_model_prefers_resolved_branch() {
        let model: BranchingModel = serde_json::from_str(
            r#"{"development": {"name": null, "use_mainbranch": true, "branch": {"name": "master"}}}"#,
        )
        .unwrap();
        assert_eq!(model.development_branch().as_deref(), Some("master"));
    }

    #[test]
    fn branching_model_falls_back_to_name() {
        let model: BranchingModel =
            serde_json::from_str(r#"{"development": {"name": "develop"}}"#).unwrap();
        assert_eq!(model.development_branch().as_deref(), Some("develop"));
    }

    #[test]
    fn branching_model_without_development() {
        let model: BranchingModel = serde_json::from_str("{}").unwrap();
        assert_eq!(model.development_branch(), None);
    }

    #[test]
    fn webhook_url_from_jenkins() {
        let options = CreateWebhookOptions {
            jenkins_url: Some("https://jenkins.example.com".into()),
            ..Default::default()
        };
        assert_eq!(
            webhook_url(&options).unwrap(),
            "https://jenkins.example.com/bitbucket-hook/"
        );
    }

    #[test]
    fn create_hook_body_shape() {
        let body = CreateHookBody {
            description: "Webhook",
            url: "https://hooks.example.com",
            active: true,
            events: &["repo:push"],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "description": "Webhook",
                "url": "https://hooks.example.com",
                "active": true,
                "events": ["repo:push"]
            })
        );
    }

    #[tokio::test]
    async fn pull_requests_are_not_implemented() {
        let bitbucket = adapter(Some("main"));
        for err in [
            bitbucket.get_pull_request(3).await.unwrap_err(),
            bitbucket
                .create_pull_request(CreatePullRequestOptions::default())
                .await
                .unwrap_err(),
            bitbucket.update_pull_request_branch(3).await.unwrap_err(),
        ] {
            assert!(matches!(
                err,
                GitApiError::NotImplemented {
                    provider: "Bitbucket",
                    ..
                }
            ));
        }

        let err = bitbucket
            .merge_pull_request(MergePullRequestOptions {
                pull_number: 3,
                title: "t".into(),
                message: "m".into(),
                method: "squash".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "merge_pull_request is not implemented for Bitbucket"
        );
    }

    #[test]
    fn git_ref_is_bare_branch() {
        assert_eq!(adapter(Some("main")).git_ref(), "main");
    }

    #[test]
    fn payload_paths() {
        let bitbucket = adapter(None);
        assert_eq!(bitbucket.ref_path(), "body.push.changes[0].new.name");
        assert_eq!(
            bitbucket.revision_path(),
            "body.push.changes[0].new.target.hash"
        );
        assert_eq!(
            bitbucket.repository_url_path(),
            "body.repository.links.html.href"
        );
        assert_eq!(bitbucket.repository_name_path(), "body.repository.full_name");
        assert_eq!(bitbucket.header(GitHeader::Event), "X-Event-Key");
        assert_eq!(
            bitbucket.event_name(GitEvent::PullRequest),
            "pullrequest:created"
        );
    }

    // -- Against a local server --

    fn served(server: &StubServer, branch: Option<&str>) -> BitbucketAdapter {
        BitbucketAdapter::new(server.config("workspace", "widget", branch))
            .unwrap()
            .with_api_root(&format!("{}/", server.url()))
    }

    #[test]
    fn api_root_override_drops_trailing_slash() {
        let bitbucket = adapter(None).with_api_root("http://proxy.local/2.0/");
        assert_eq!(
            bitbucket.base_url(),
            "http://proxy.local/2.0/repositories/workspace/widget"
        );
    }

    #[tokio::test]
    async fn list_files_resolves_default_branch_and_keeps_files() {
        let server = StubServer::start([
            Canned::json(
                200,
                &json!({"development": {"name": null, "branch": {"name": "feature/x"}}}),
            ),
            Canned::json(
                200,
                &json!({
                    "values": [
                        {"path": "README.md", "type": "commit_file",
                         "links": {"self": {"href": "http://raw/README.md"}}},
                        {"path": "src", "type": "commit_directory"}
                    ]
                }),
            ),
        ])
        .await;
        let bitbucket = served(&server, None);

        let files = bitbucket.list_files().await.unwrap();

        assert_eq!(
            files,
            [FileDescriptor {
                path: "README.md".into(),
                url: Some("http://raw/README.md".into()),
            }]
        );
        let requests = server.requests();
        assert_eq!(
            requests[0].uri,
            "/repositories/workspace/widget/branching-model"
        );
        assert_eq!(
            requests[1].uri,
            "/repositories/workspace/widget/src/feature%2Fx/?pagelen=100"
        );
        assert_eq!(
            requests[1].header("authorization"),
            Some("Basic dGVzdGVyOnNlY3JldA==")
        );
    }

    #[tokio::test]
    async fn file_contents_are_returned_raw() {
        let server = StubServer::start([Canned::text(200, "<project/>\n")]).await;
        let bitbucket = served(&server, Some("main"));

        let contents = bitbucket
            .get_file_contents(&FileDescriptor {
                path: "build/pom.xml".into(),
                url: None,
            })
            .await
            .unwrap();

        assert_eq!(contents, b"<project/>\n");
        assert_eq!(
            server.requests()[0].uri,
            "/repositories/workspace/widget/src/main/build/pom.xml"
        );
    }

    #[tokio::test]
    async fn create_webhook_returns_uuid() {
        let server = StubServer::start([Canned::json(
            201,
            &json!({"uuid": "{5c1f}", "url": "https://jenkins.example.com/bitbucket-hook/"}),
        )])
        .await;
        let bitbucket = served(&server, Some("main"));

        let id = bitbucket
            .create_webhook(CreateWebhookOptions {
                jenkins_url: Some("https://jenkins.example.com/".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(id, "{5c1f}");
        let request = &server.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.uri, "/repositories/workspace/widget/hooks");
        assert_eq!(
            request.json()["url"],
            "https://jenkins.example.com/bitbucket-hook/"
        );
    }

    #[tokio::test]
    async fn existing_hook_is_reported_as_such() {
        let server = StubServer::start([Canned::json(
            400,
            &json!({"type": "error", "error": {"message": "Hook already exists"}}),
        )])
        .await;
        let bitbucket = served(&server, Some("main"));

        let err = bitbucket
            .create_webhook(CreateWebhookOptions {
                webhook_url: Some("https://hooks.example.com/bb".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GitApiError::WebhookAlreadyExists));
    }

    #[tokio::test]
    async fn other_hook_failures_keep_their_cause() {
        let server = StubServer::start([Canned::json(
            403,
            &json!({"type": "error", "error": {"message": "Forbidden"}}),
        )])
        .await;
        let bitbucket = served(&server, Some("main"));

        let err = bitbucket
            .create_webhook(CreateWebhookOptions {
                webhook_url: Some("https://hooks.example.com/bb".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        let GitApiError::UnknownWebhook { source } = err else {
            panic!("expected UnknownWebhook, got {err:?}");
        };
        assert!(matches!(
            *source,
            GitApiError::Api { status, ref message, .. }
                if status == StatusCode::FORBIDDEN && message == "Forbidden"
        ));
    }
}
