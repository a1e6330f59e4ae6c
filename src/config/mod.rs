//! Repository configuration.
//!
//! `RepoConfig` is the immutable value every adapter is built from. The
//! optional TOML file and remote URL parsing here are conveniences for the
//! binary; library callers can build a `RepoConfig` directly.

pub mod remote;

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::forge::ProviderKind;

use self::remote::GitUrl;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors from loading configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("not a repository url: {url}")]
    #[diagnostic(help("Expected e.g. `https://github.com/owner/repo` or `git@host:owner/repo.git`"))]
    InvalidUrl { url: String },

    #[error("missing {field}")]
    #[diagnostic(help("Pass --{field} or set it in the config file"))]
    MissingField { field: &'static str },
}

/// Connection details for one repository.
///
/// Immutable after construction; each adapter owns its copy.
#[derive(Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub owner: String,
    pub repo: String,
    /// `http` or `https`.
    pub protocol: String,
    /// Server host, only needed for self-hosted providers.
    pub host: Option<String>,
    pub username: String,
    /// Password, app password or token, depending on the provider.
    pub password: String,
    /// Branch to operate on. `None` means the provider's default branch.
    pub branch: Option<String>,
}

impl RepoConfig {
    /// Build a config for the repository a remote URL points at.
    pub fn from_git_url(
        url: GitUrl,
        username: String,
        password: String,
        branch: Option<String>,
    ) -> Self {
        Self {
            owner: url.owner,
            repo: url.repo,
            protocol: url.protocol,
            host: Some(url.host),
            username,
            password,
            branch,
        }
    }

    /// `owner/repo`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Debug for RepoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("branch", &self.branch)
            .finish()
    }
}

/// On-disk configuration. Every field is optional; command-line flags and
/// environment variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub provider: Option<ProviderKind>,
    pub username: Option<String>,
    pub token: Option<String>,
    pub branch: Option<String>,
}

impl ConfigFile {
    /// Load the config file.
    ///
    /// An explicit `path` must exist. Without one, the per-user config file is
    /// read if present and an empty config is returned otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `<config_dir>/gitapi/config.toml` for the current user, if the platform
/// has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "gitapi")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_url() -> GitUrl {
        GitUrl {
            protocol: "https".into(),
            host: "github.com".into(),
            owner: "octo".into(),
            repo: "widgets".into(),
        }
    }

    #[test]
    fn from_git_url_copies_location() {
        let config = RepoConfig::from_git_url(
            sample_url(),
            "alice".into(),
            "s3cret".into(),
            Some("main".into()),
        );
        assert_eq!(config.owner, "octo");
        assert_eq!(config.repo, "widgets");
        assert_eq!(config.host.as_deref(), Some("github.com"));
        assert_eq!(config.branch.as_deref(), Some("main"));
        assert_eq!(config.full_name(), "octo/widgets");
    }

    #[test]
    fn debug_redacts_password() {
        let config =
            RepoConfig::from_git_url(sample_url(), "alice".into(), "s3cret".into(), None);
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn parse_config_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            url = "https://gitlab.com/group/project"
            provider = "gitlab"
            username = "bob"
            branch = "develop"
            "#,
        )
        .unwrap();
        assert_eq!(file.provider, Some(ProviderKind::GitLab));
        assert_eq!(file.username.as_deref(), Some("bob"));
        assert_eq!(file.token, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str("colour = \"blue\"");
        assert!(result.is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ConfigFile::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
