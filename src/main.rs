mod cli;

use std::io::Write;

use clap::Parser;
use gitapi::AppError;
use gitapi::CreatePullRequestOptions;
use gitapi::CreateWebhookOptions;
use gitapi::FileDescriptor;
use gitapi::GitApi;
use gitapi::GitApiError;
use gitapi::GitEvent;
use gitapi::GitHeader;
use gitapi::GitProvider;
use gitapi::MergePullRequestOptions;
use gitapi::ProviderKind;
use gitapi::RepoConfig;
use gitapi::auth;
use gitapi::config::ConfigError;
use gitapi::config::ConfigFile;
use gitapi::config::remote::parse_git_url;
use miette::IntoDiagnostic;
use miette::Result;
use miette::WrapErr;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::RepoArgs;
use crate::cli::pr::PrCommands;
use crate::cli::webhook::WebhookCommands;

const DEFAULT_USERNAME: &str = "gitapi";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let provider = build_provider(&cli.repo)
        .await
        .wrap_err("failed to set up repository access")?;

    match cli.command {
        Commands::Info => show_info(&provider),
        Commands::Files => {
            let files = provider
                .list_files()
                .await
                .wrap_err("failed to list files")?;
            for file in files {
                println!("{}", file.path);
            }
        }
        Commands::Cat { path } => cat_file(&provider, path).await?,
        Commands::DefaultBranch => {
            let branch = provider
                .get_default_branch()
                .await
                .wrap_err("failed to resolve default branch")?;
            println!("{branch}");
        }
        Commands::Pr(args) => run_pr(&provider, args.command).await?,
        Commands::Webhook(args) => match args.command {
            WebhookCommands::Create {
                hook_url,
                jenkins_url,
                jenkins_user,
                jenkins_password,
                job_name,
            } => {
                let options = CreateWebhookOptions {
                    webhook_url: hook_url,
                    jenkins_url,
                    jenkins_user,
                    jenkins_password,
                    job_name,
                };
                create_webhook(&provider, options).await?;
            }
            WebhookCommands::Names => show_webhook_names(&provider),
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "gitapi=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Assemble a `RepoConfig` from flags, environment and config file, and
/// construct the matching adapter.
async fn build_provider(args: &RepoArgs) -> Result<GitProvider, AppError> {
    let file = ConfigFile::load(args.config.as_deref())?;

    let url = args
        .url
        .clone()
        .or(file.url)
        .ok_or(ConfigError::MissingField { field: "url" })?;
    let git_url = parse_git_url(&url).ok_or(ConfigError::InvalidUrl { url: url.clone() })?;
    let kind = args
        .provider
        .or(file.provider)
        .unwrap_or_else(|| ProviderKind::detect(&git_url.host));

    let token =
        auth::resolve_token(kind, &git_url.host, args.token.clone().or(file.token)).await?;
    tracing::info!(provider = %kind, source = %token.source, "resolved credentials");

    let username = args
        .username
        .clone()
        .or(file.username)
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
    let branch = args.branch.clone().or(file.branch);

    let config = RepoConfig::from_git_url(git_url, username, token.token, branch);
    Ok(GitProvider::new(kind, config)?)
}

fn show_info(provider: &GitProvider) {
    println!("Provider: {}", provider.kind());
    println!("Repository: {}", provider.config().full_name());
    println!("API base URL: {}", provider.base_url());
    println!("Push ref: {}", provider.git_ref());
}

/// Print a file, reusing the listing's descriptor so vendor-supplied URLs
/// are honored.
async fn cat_file(provider: &GitProvider, path: String) -> Result<()> {
    let files = provider
        .list_files()
        .await
        .wrap_err("failed to list files")?;
    let descriptor = files
        .into_iter()
        .find(|f| f.path == path)
        .unwrap_or(FileDescriptor { path, url: None });

    let contents = provider
        .get_file_contents(&descriptor)
        .await
        .wrap_err_with(|| format!("failed to read {}", descriptor.path))?;
    std::io::stdout().write_all(&contents).into_diagnostic()?;
    Ok(())
}

async fn run_pr(provider: &GitProvider, command: PrCommands) -> Result<()> {
    match command {
        PrCommands::Get { number } => {
            let pr = provider
                .get_pull_request(number)
                .await
                .wrap_err_with(|| format!("failed to get pull request #{number}"))?;
            println!("#{}: {} -> {}", pr.pull_number, pr.source_branch, pr.target_branch);
        }
        PrCommands::Create {
            title,
            source,
            target,
            maintainer_can_modify,
            draft,
        } => {
            let pr = provider
                .create_pull_request(CreatePullRequestOptions {
                    title,
                    source_branch: source,
                    target_branch: target,
                    maintainer_can_modify,
                    draft,
                })
                .await
                .wrap_err("failed to create pull request")?;
            println!("Created #{}", pr.pull_number);
        }
        PrCommands::Merge {
            number,
            title,
            message,
            method,
        } => {
            let status = provider
                .merge_pull_request(MergePullRequestOptions {
                    pull_number: number,
                    title,
                    message,
                    method,
                })
                .await
                .wrap_err_with(|| format!("failed to merge pull request #{number}"))?;
            println!("{status}");
        }
        PrCommands::UpdateBranch { number } => {
            let status = provider
                .update_pull_request_branch(number)
                .await
                .wrap_err_with(|| format!("failed to update pull request #{number}"))?;
            println!("{status}");
        }
    }
    Ok(())
}

async fn create_webhook(provider: &GitProvider, options: CreateWebhookOptions) -> Result<()> {
    match provider.create_webhook(options).await {
        Ok(id) => println!("Created webhook {id}"),
        Err(GitApiError::WebhookAlreadyExists) => println!("Webhook already exists"),
        Err(e) => return Err(e).wrap_err("failed to create webhook"),
    }
    Ok(())
}

fn show_webhook_names(provider: &GitProvider) {
    for header in GitHeader::ALL {
        println!("header {header}: {}", provider.header(header));
    }
    for event in GitEvent::ALL {
        println!("event {event}: {}", provider.event_name(event));
    }
    println!("ref: {}", provider.ref_path());
    println!("revision: {}", provider.revision_path());
    println!("repository url: {}", provider.repository_url_path());
    println!("repository name: {}", provider.repository_name_path());
}
