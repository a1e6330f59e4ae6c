//! Git remote URL parsing.

/// A parsed repository location on some hosting provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitUrl {
    /// `http` or `https`. SSH remotes map to `https`, the API protocol.
    pub protocol: String,
    pub host: String,
    /// Owner path. May contain `/` for GitLab subgroups.
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for GitUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.repo)
    }
}

/// Parse protocol, host, owner and repo from a remote URL.
///
/// Supports:
/// - HTTPS/HTTP: `https://host/owner/repo.git`, optionally with `user@`
/// - SCP-style SSH: `git@host:owner/repo.git`
/// - SSH URLs: `ssh://git@host/owner/repo.git`
/// - With or without `.git` suffix
///
/// Returns `None` when the URL has no owner or repo segment.
pub fn parse_git_url(url: &str) -> Option<GitUrl> {
    let url = url.trim();

    if let Some(rest) = url.strip_prefix("ssh://") {
        let (host, path) = rest.split_once('/')?;
        return build("https", strip_userinfo(host), path);
    }

    for protocol in ["https", "http"] {
        if let Some(rest) = url
            .strip_prefix(protocol)
            .and_then(|r| r.strip_prefix("://"))
        {
            let (host, path) = rest.split_once('/')?;
            return build(protocol, strip_userinfo(host), path);
        }
    }

    // SCP-style: git@host:owner/repo.git
    let (authority, path) = url.split_once(':')?;
    if authority.contains('/') {
        return None;
    }
    build("https", strip_userinfo(authority), path)
}

fn strip_userinfo(authority: &str) -> &str {
    authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host)
}

fn build(protocol: &str, host: &str, path: &str) -> Option<GitUrl> {
    if host.is_empty() {
        return None;
    }

    let path = path.strip_suffix('/').unwrap_or(path);
    let path = path.strip_suffix(".git").unwrap_or(path);

    let (owner, repo) = path.rsplit_once('/')?;
    if owner.is_empty() || repo.is_empty() || owner.split('/').any(str::is_empty) {
        return None;
    }

    Some(GitUrl {
        protocol: protocol.to_string(),
        host: host.to_string(),
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}
