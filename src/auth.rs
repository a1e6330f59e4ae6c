//! Credential resolution.
//!
//! Resolves the password/token for a provider in priority order:
//! 1. an explicitly supplied token (flag, `GITAPI_TOKEN` or config file)
//! 2. `gh auth token` (GitHub and GitHub Enterprise only)
//! 3. the provider's conventional environment variables

use miette::Diagnostic;
use thiserror::Error;

use crate::forge::ProviderKind;

/// How the token was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Passed in by the caller.
    Explicit,
    /// From `gh auth token`.
    GitHubCli,
    /// From the named environment variable.
    Env(&'static str),
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "command line or config file"),
            Self::GitHubCli => write!(f, "GitHub CLI (gh auth token)"),
            Self::Env(name) => write!(f, "{name} environment variable"),
        }
    }
}

/// A resolved credential with its source.
#[derive(Clone)]
pub struct AuthToken {
    pub token: String,
    pub source: TokenSource,
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Errors from credential resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    #[error("no {provider} credentials found")]
    #[diagnostic(help("Pass --token, set GITAPI_TOKEN, or set {hint}"))]
    NoAuthFound {
        provider: ProviderKind,
        hint: String,
    },

    #[error("failed to run `gh auth token`: {0}")]
    GhCliError(std::io::Error),
}

/// Environment variables consulted for each provider, in order.
pub fn token_env_vars(provider: ProviderKind) -> &'static [&'static str] {
    match provider {
        ProviderKind::GitHub | ProviderKind::GitHubEnterprise => &["GITHUB_TOKEN", "GH_TOKEN"],
        ProviderKind::GitLab => &["GITLAB_TOKEN"],
        ProviderKind::Bitbucket => &["BITBUCKET_APP_PASSWORD"],
    }
}

/// Resolve a credential for `provider` on `host`.
///
/// This does NOT validate the token against the provider's API.
pub async fn resolve_token(
    provider: ProviderKind,
    host: &str,
    explicit: Option<String>,
) -> Result<AuthToken, AuthError> {
    // 1. Caller-supplied
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
        return Ok(AuthToken {
            token,
            source: TokenSource::Explicit,
        });
    }

    // 2. `gh auth token`
    if matches!(
        provider,
        ProviderKind::GitHub | ProviderKind::GitHubEnterprise
    ) && let Some(token) = try_gh_cli(host).await?
    {
        return Ok(AuthToken {
            token,
            source: TokenSource::GitHubCli,
        });
    }

    // 3. Environment
    for &name in token_env_vars(provider) {
        if let Ok(token) = std::env::var(name)
            && !token.is_empty()
        {
            return Ok(AuthToken {
                token,
                source: TokenSource::Env(name),
            });
        }
    }

    Err(AuthError::NoAuthFound {
        provider,
        hint: token_env_vars(provider).join(" or "),
    })
}

/// Try to get a token from the GitHub CLI.
///
/// Returns `Ok(None)` if gh is not installed or not authenticated.
/// Returns `Err` only for unexpected I/O failures.
async fn try_gh_cli(host: &str) -> Result<Option<String>, AuthError> {
    let result = tokio::process::Command::new("gh")
        .args(["auth", "token", "--hostname", host])
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => {
            let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if token.is_empty() {
                Ok(None)
            } else {
                Ok(Some(token))
            }
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AuthError::GhCliError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_source_display_github_cli() {
        assert_eq!(
            TokenSource::GitHubCli.to_string(),
            "GitHub CLI (gh auth token)"
        );
    }

    #[test]
    fn token_source_display_env() {
        assert_eq!(
            TokenSource::Env("GITLAB_TOKEN").to_string(),
            "GITLAB_TOKEN environment variable"
        );
    }

    #[test]
    fn env_vars_per_provider() {
        assert_eq!(
            token_env_vars(ProviderKind::GitHubEnterprise),
            ["GITHUB_TOKEN", "GH_TOKEN"]
        );
        assert_eq!(token_env_vars(ProviderKind::GitLab), ["GITLAB_TOKEN"]);
        assert_eq!(
            token_env_vars(ProviderKind::Bitbucket),
            ["BITBUCKET_APP_PASSWORD"]
        );
    }

    #[tokio::test]
    async fn explicit_token_wins() {
        let token = resolve_token(ProviderKind::GitLab, "gitlab.com", Some("glpat-x".into()))
            .await
            .unwrap();
        assert_eq!(token.token, "glpat-x");
        assert_eq!(token.source, TokenSource::Explicit);
    }

    #[test]
    fn debug_redacts_token() {
        let token = AuthToken {
            token: "hunter2".into(),
            source: TokenSource::Explicit,
        };
        assert!(!format!("{token:?}").contains("hunter2"));
    }

    #[test]
    fn no_auth_found_is_actionable() {
        let err = AuthError::NoAuthFound {
            provider: ProviderKind::Bitbucket,
            hint: token_env_vars(ProviderKind::Bitbucket).join(" or "),
        };
        assert!(err.to_string().contains("no bitbucket credentials found"));
        let help = miette::Diagnostic::help(&err).expect("NoAuthFound should have diagnostic help");
        let help_text = help.to_string();
        assert!(help_text.contains("--token"));
        assert!(help_text.contains("BITBUCKET_APP_PASSWORD"));
    }
}
