//! One contract over the GitHub, GitLab and Bitbucket REST APIs.
//!
//! Build a [`RepoConfig`], pick a [`ProviderKind`], construct a
//! [`GitProvider`] and use it through the [`GitApi`] trait: list and read
//! files, resolve the default branch, drive pull requests, register webhooks,
//! and look up the vendor names and payload paths needed to interpret inbound
//! webhook deliveries.

pub mod auth;
pub mod config;
pub mod error;
pub mod forge;
pub mod retry;

#[cfg(test)]
mod testing;

pub use crate::config::RepoConfig;
pub use crate::error::AppError;
pub use crate::forge::CreatePullRequestOptions;
pub use crate::forge::CreateWebhookOptions;
pub use crate::forge::FileDescriptor;
pub use crate::forge::GitApi;
pub use crate::forge::GitApiError;
pub use crate::forge::GitEvent;
pub use crate::forge::GitHeader;
pub use crate::forge::GitProvider;
pub use crate::forge::MergePullRequestOptions;
pub use crate::forge::ProviderKind;
pub use crate::forge::PullRequest;
