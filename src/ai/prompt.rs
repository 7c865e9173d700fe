use crate::github::RepositoryData;

/// Maximum README characters embedded in a prompt
pub const MAX_README_CHARS: usize = 30_000;

/// Generate the analysis prompt for a repository
pub fn build_prompt(repo: &RepositoryData) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "Analyze this GitHub repository and provide the following information in valid JSON format:\n\n",
    );
    prompt.push_str("{\n");
    prompt.push_str(
        "  \"summary\": \"concise summary of the project's purpose (1-2 paragraphs)\",\n",
    );
    prompt.push_str("  \"features\": [\"array\", \"of\", \"key\", \"features\"],\n");
    prompt.push_str("  \"useCases\": [\"array\", \"of\", \"use\", \"cases\"],\n");
    prompt.push_str("  \"stats\": {\n");
    prompt.push_str("    \"notableStatistics\": \"text description\"\n");
    prompt.push_str("  }\n");
    prompt.push_str("}\n\n");

    prompt.push_str(&format!("Repository: {}\n", repo.full_name()));

    if let Some(description) = repo.description() {
        prompt.push_str(&format!("Description: {}\n", description));
    }

    if !repo.readme.is_empty() {
        prompt.push_str(&format!(
            "Readme Content: {}\n",
            truncate_chars(&repo.readme, MAX_README_CHARS)
        ));
    }

    prompt
}

/// First `max` characters of `text`, never splitting a code point
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepoReference;
    use serde_json::json;

    fn create_test_repo(metadata: serde_json::Value, readme: &str) -> RepositoryData {
        RepositoryData {
            reference: RepoReference::new("test", "repo").unwrap(),
            metadata,
            readme: readme.to_string(),
        }
    }

    #[test]
    fn test_build_prompt_full() {
        let repo = create_test_repo(
            json!({"full_name": "test/repo", "description": "Does things"}),
            "# Test\nReadme body",
        );
        let prompt = build_prompt(&repo);

        assert!(prompt.contains("valid JSON format"));
        assert!(prompt.contains("\"useCases\""));
        assert!(prompt.contains("\"notableStatistics\""));
        assert!(prompt.contains("Repository: test/repo"));
        assert!(prompt.contains("Description: Does things"));
        assert!(prompt.contains("Readme Content: # Test\nReadme body"));
    }

    #[test]
    fn test_build_prompt_omits_empty_parts() {
        let repo = create_test_repo(json!({"full_name": "test/repo", "description": null}), "");
        let prompt = build_prompt(&repo);

        assert!(prompt.contains("Repository: test/repo"));
        assert!(!prompt.contains("Description:"));
        assert!(!prompt.contains("Readme Content:"));
    }

    #[test]
    fn test_readme_is_truncated() {
        let readme = "é".repeat(MAX_README_CHARS + 500);
        let repo = create_test_repo(json!({"full_name": "test/repo"}), &readme);
        let prompt = build_prompt(&repo);

        let embedded = prompt.split("Readme Content: ").nth(1).unwrap().trim_end();
        assert_eq!(embedded.chars().count(), MAX_README_CHARS);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 3), "hi");
        assert_eq!(truncate_chars("ñañ", 2), "ña");
    }
}
