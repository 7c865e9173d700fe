use crate::github::RepoReference;
use tracing::debug;
use url::Url;

const ALLOWED_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

/// Resolve user input into a repository reference.
///
/// Accepts `owner/repo` shorthand or a github.com URL with or without a
/// scheme, trailing slashes or a `.git` suffix. Extra path segments (branch,
/// subdirectory) are ignored. Anything else yields `None`.
pub fn resolve(input: &str) -> Option<RepoReference> {
    let input = input.trim();

    if !input.contains("://") {
        let parts: Vec<&str> = input.split('/').collect();
        if parts.len() == 2 && parts.iter().all(|p| !p.is_empty()) {
            return RepoReference::new(parts[0], parts[1]);
        }
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let trimmed = with_scheme.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(e) => {
            debug!(input, error = %e, "reference is not a valid URL");
            return None;
        }
    };

    let host = parsed.host_str()?;
    if !ALLOWED_HOSTS.contains(&host) {
        debug!(input, host, "reference host is not github.com");
        return None;
    }

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    RepoReference::new(owner, repo)
}
