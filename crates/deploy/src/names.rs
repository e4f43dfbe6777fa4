//! Namespace identity derivation.
//!
//! The same sanitized slug names the Kubernetes namespace, the workload
//! labels, and the image tag, so it must be deterministic and DNS-safe.

use url::Url;

use crate::error::DeployError;

/// Derive the namespace identity for a repository URL.
///
/// Takes the lowercase basename of the URL path, strips a trailing `.git`,
/// replaces every character outside `[a-z0-9.-]` with a hyphen, and trims
/// `-`/`.` from both ends so the result starts and ends alphanumeric, as
/// Kubernetes resource names must.
///
/// # Errors
///
/// Returns [`DeployError::Validation`] if the URL cannot be parsed or the
/// sanitized result is empty or contains no alphanumeric character.
pub fn namespace_identity(repo_url: &str) -> Result<String, DeployError> {
    let url = Url::parse(repo_url)
        .map_err(|e| DeployError::Validation(format!("invalid repository URL: {e}")))?;

    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let basename = basename.strip_suffix(".git").unwrap_or(basename);

    let slug: String = basename
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches(|c| c == '-' || c == '.').to_string();

    if slug.is_empty() || !slug.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(DeployError::Validation(format!(
            "repository URL `{repo_url}` does not yield a usable resource name"
        )));
    }

    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_git_suffix_and_lowercases() {
        assert_eq!(
            namespace_identity("https://github.com/acme/Widget.git").unwrap(),
            "widget"
        );
    }

    #[test]
    fn replaces_disallowed_characters_with_hyphens() {
        assert_eq!(
            namespace_identity("https://github.com/acme/My_App%20v2.git").unwrap(),
            "my-app-20v2"
        );
    }

    #[test]
    fn output_is_always_dns_safe() {
        let urls = [
            "https://github.com/acme/widget.git",
            "https://gitlab.com/team/Some_Project",
            "https://example.com/x/UPPER.CASE.git",
            "https://example.com/a/b/deep-path-repo",
            "https://github.com/acme/_widget.git",
        ];
        for url in urls {
            let slug = namespace_identity(url).unwrap();
            assert!(!slug.is_empty());
            assert!(
                slug.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'),
                "slug {slug} from {url} carries disallowed characters"
            );
            assert!(
                slug.starts_with(|c: char| c.is_ascii_alphanumeric())
                    && slug.ends_with(|c: char| c.is_ascii_alphanumeric()),
                "slug {slug} from {url} has a non-alphanumeric boundary"
            );
        }
    }

    #[test]
    fn boundary_characters_are_trimmed() {
        // A basename starting or ending with a sanitized-away character must
        // not yield a slug kubectl would reject.
        assert_eq!(
            namespace_identity("https://github.com/acme/_widget.git").unwrap(),
            "widget"
        );
        assert_eq!(
            namespace_identity("https://github.com/acme/widget_.git").unwrap(),
            "widget"
        );
        assert_eq!(
            namespace_identity("https://github.com/acme/.widget-").unwrap(),
            "widget"
        );
    }

    #[test]
    fn deterministic_across_calls() {
        let url = "https://github.com/acme/widget.git";
        assert_eq!(
            namespace_identity(url).unwrap(),
            namespace_identity(url).unwrap()
        );
    }

    #[test]
    fn degenerate_basename_is_a_validation_error() {
        assert!(matches!(
            namespace_identity("https://github.com/acme/___.git"),
            Err(DeployError::Validation(_))
        ));
        assert!(matches!(
            namespace_identity("not a url"),
            Err(DeployError::Validation(_))
        ));
    }
}
