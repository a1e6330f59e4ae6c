use clap::Args;
use clap::Subcommand;

/// Arguments for the `pr` subcommand.
#[derive(Debug, Args)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommands,
}

#[derive(Debug, Subcommand)]
pub enum PrCommands {
    /// Show a pull request's branches.
    Get {
        number: u64,
    },
    /// Open a pull request.
    Create {
        #[arg(long)]
        title: String,
        /// Branch with the changes.
        #[arg(long)]
        source: String,
        /// Branch to merge into.
        #[arg(long)]
        target: String,
        /// Let maintainers push to the source branch.
        #[arg(long)]
        maintainer_can_modify: bool,
        /// Create the pull request as a draft.
        #[arg(long)]
        draft: bool,
    },
    /// Merge a pull request.
    Merge {
        number: u64,
        /// Merge commit title.
        #[arg(long, default_value = "")]
        title: String,
        /// Merge commit message.
        #[arg(long, default_value = "")]
        message: String,
        /// Merge strategy, passed to the provider as-is.
        #[arg(long, default_value = "merge")]
        method: String,
    },
    /// Update a pull request's branch with its base.
    UpdateBranch {
        number: u64,
    },
}
