pub mod pr;
pub mod webhook;

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use gitapi::ProviderKind;

use crate::cli::pr::PrArgs;
use crate::cli::webhook::WebhookArgs;

/// gitapi: one interface to GitHub, GitLab and Bitbucket repositories.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Log requests and retries to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which repository to talk to, and as whom.
#[derive(Debug, Args)]
pub struct RepoArgs {
    /// Repository URL, e.g. `https://github.com/owner/repo`.
    #[arg(long, env = "GITAPI_URL", global = true)]
    pub url: Option<String>,

    /// Hosting provider. Detected from the URL host when omitted.
    #[arg(long, env = "GITAPI_PROVIDER", global = true)]
    pub provider: Option<ProviderKind>,

    /// User name for basic auth and the User-Agent header.
    #[arg(long, env = "GITAPI_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password, app password or access token.
    #[arg(long, env = "GITAPI_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Branch to operate on. Defaults to the repository's default branch.
    #[arg(long, env = "GITAPI_BRANCH", global = true)]
    pub branch: Option<String>,

    /// Config file. Defaults to the per-user gitapi config, if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the API base URL and push ref for the repository.
    Info,
    /// List files at the root of the branch.
    Files,
    /// Print a file's contents.
    Cat {
        /// Path as printed by `files`.
        path: String,
    },
    /// Print the repository's default branch.
    DefaultBranch,
    /// Work with pull requests.
    Pr(PrArgs),
    /// Work with webhooks.
    Webhook(WebhookArgs),
}
