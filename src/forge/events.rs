//! Webhook naming tables.
//!
//! Each vendor names its event header and events differently, and nests ref,
//! revision and repository identity in different places of the push payload.
//! The tables here translate canonical identifiers into the vendor's literals
//! and hand out dot-paths (e.g. `body.repository.full_name`) that the webhook
//! listener applies to its own decoded payload. Nothing here parses JSON.

use std::fmt;

/// Provider-agnostic webhook header identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitHeader {
    /// The header carrying the event type.
    Event,
}

impl GitHeader {
    pub const ALL: [GitHeader; 1] = [GitHeader::Event];
}

impl fmt::Display for GitHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
        }
    }
}

/// Provider-agnostic webhook event identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitEvent {
    Push,
    PullRequest,
}

impl GitEvent {
    pub const ALL: [GitEvent; 2] = [GitEvent::Push, GitEvent::PullRequest];
}

impl fmt::Display for GitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::PullRequest => write!(f, "pullRequest"),
        }
    }
}

/// One vendor's webhook header names, event names and payload dot-paths.
#[derive(Debug)]
pub struct WebhookEventMap {
    pub event_header: &'static str,
    pub push_event: &'static str,
    pub pull_request_event: &'static str,
    pub ref_path: &'static str,
    pub revision_path: &'static str,
    pub repository_url_path: &'static str,
    pub repository_name_path: &'static str,
}

impl WebhookEventMap {
    pub fn header(&self, header: GitHeader) -> &'static str {
        match header {
            GitHeader::Event => self.event_header,
        }
    }

    pub fn event_name(&self, event: GitEvent) -> &'static str {
        match event {
            GitEvent::Push => self.push_event,
            GitEvent::PullRequest => self.pull_request_event,
        }
    }
}

pub static GITHUB_EVENTS: WebhookEventMap = WebhookEventMap {
    event_header: "X-GitHub-Event",
    push_event: "push",
    pull_request_event: "pull_request",
    ref_path: "body.ref",
    revision_path: "body.head_commit.id",
    repository_url_path: "body.repository.url",
    repository_name_path: "body.repository.full_name",
};

pub static GITLAB_EVENTS: WebhookEventMap = WebhookEventMap {
    event_header: "X-GitLab-Event",
    push_event: "Push Hook",
    pull_request_event: "Merge Request Hook",
    ref_path: "body.ref",
    revision_path: "body.checkout_sha",
    repository_url_path: "body.repository.git_http_url",
    repository_name_path: "body.project.path_with_namespace",
};

pub static BITBUCKET_EVENTS: WebhookEventMap = WebhookEventMap {
    event_header: "X-Event-Key",
    push_event: "repo:push",
    pull_request_event: "pullrequest:created",
    ref_path: "body.push.changes[0].new.name",
    revision_path: "body.push.changes[0].new.target.hash",
    repository_url_path: "body.repository.links.html.href",
    repository_name_path: "body.repository.full_name",
};
