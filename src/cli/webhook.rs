use clap::Args;
use clap::Subcommand;

/// Arguments for the `webhook` subcommand.
#[derive(Debug, Args)]
pub struct WebhookArgs {
    #[command(subcommand)]
    pub command: WebhookCommands,
}

#[derive(Debug, Subcommand)]
pub enum WebhookCommands {
    /// Register a push webhook.
    Create {
        /// Hook URL. Takes precedence over the Jenkins options.
        #[arg(long = "hook-url", id = "hook_url")]
        hook_url: Option<String>,
        /// Jenkins server to derive the hook URL from.
        #[arg(long)]
        jenkins_url: Option<String>,
        #[arg(long)]
        jenkins_user: Option<String>,
        #[arg(long, env = "GITAPI_JENKINS_PASSWORD", hide_env_values = true)]
        jenkins_password: Option<String>,
        /// Jenkins job triggered by the hook.
        #[arg(long)]
        job_name: Option<String>,
    },
    /// Print the provider's webhook header, event names and payload paths.
    Names,
}
