pub mod fetch;
pub mod reference;

use serde::Serialize;
use serde_json::Value;

/// Normalized GitHub repository reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoReference {
    owner: String,
    repo: String,
}

impl RepoReference {
    /// Build a reference from two path segments. Returns `None` if either is
    /// empty, a dot segment, or contains a path separator.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Option<Self> {
        let owner = owner.into();
        let repo = repo.into();
        let valid = |s: &str| !s.is_empty() && s != "." && s != ".." && !s.contains('/');
        if valid(&owner) && valid(&repo) {
            Some(Self { owner, repo })
        } else {
            None
        }
    }

    /// Repository owner/organization
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Browser URL for the repository
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }

}

impl std::fmt::Display for RepoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Everything fetched from GitHub for one analysis request
#[derive(Debug, Clone)]
pub struct RepositoryData {
    /// Reference the data was fetched for
    pub reference: RepoReference,
    /// Repository metadata exactly as GitHub returned it
    pub metadata: Value,
    /// Raw README text, empty when unavailable
    pub readme: String,
}

impl RepositoryData {
    /// `full_name` from the metadata, falling back to `owner/repo`
    pub fn full_name(&self) -> String {
        self.metadata
            .get("full_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.reference.to_string())
    }

    /// Non-empty description from the metadata
    pub fn description(&self) -> Option<&str> {
        self.metadata
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_rejects_bad_segments() {
        assert!(RepoReference::new("", "repo").is_none());
        assert!(RepoReference::new("owner", "").is_none());
        assert!(RepoReference::new("own/er", "repo").is_none());
        assert!(RepoReference::new("foo", "..").is_none());
        assert!(RepoReference::new(".", "bar").is_none());
        assert!(RepoReference::new("foo", "..bar").is_some());
        assert!(RepoReference::new("owner", "repo").is_some());
    }

    #[test]
    fn test_reference_urls() {
        let reference = RepoReference::new("rust-lang", "rust").unwrap();
        assert_eq!(reference.html_url(), "https://github.com/rust-lang/rust");
        assert_eq!(reference.to_string(), "rust-lang/rust");
    }

    #[test]
    fn test_repository_data_accessors() {
        let data = RepositoryData {
            reference: RepoReference::new("foo", "bar").unwrap(),
            metadata: json!({"full_name": "Foo/Bar", "description": "  "}),
            readme: String::new(),
        };
        assert_eq!(data.full_name(), "Foo/Bar");
        assert!(data.description().is_none());

        let bare = RepositoryData {
            reference: RepoReference::new("foo", "bar").unwrap(),
            metadata: json!({"description": null}),
            readme: String::new(),
        };
        assert_eq!(bare.full_name(), "foo/bar");
        assert!(bare.description().is_none());
    }
}
