use serde::{Deserialize, Serialize};

/// One remote project as the checkout picker sees it.
///
/// Equality and hashing cover all four fields, so a `HashSet` of records
/// collapses exact duplicates returned by overlapping API pages.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub(crate) struct ProjectRecord {
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) ssh_url: String,
    pub(crate) http_url: String,
}

#[cfg(test)]
impl ProjectRecord {
    pub(crate) fn new(name: &str, namespace: &str, ssh_url: &str, http_url: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ssh_url: ssh_url.to_string(),
            http_url: http_url.to_string(),
        }
    }
}

/// Browser URL for a project, derived from its HTTP clone URL.
pub(crate) fn web_url_from_http(http_url: &str) -> String {
    http_url
        .strip_suffix(".git")
        .unwrap_or(http_url)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn records_with_equal_fields_collapse_in_a_set() {
        let mut set = HashSet::new();
        set.insert(ProjectRecord::new(
            "repo1",
            "teamA",
            "git@x:teamA/repo1.git",
            "https://x/teamA/repo1.git",
        ));
        set.insert(ProjectRecord::new(
            "repo1",
            "teamA",
            "git@x:teamA/repo1.git",
            "https://x/teamA/repo1.git",
        ));
        set.insert(ProjectRecord::new(
            "repo1",
            "teamB",
            "git@x:teamB/repo1.git",
            "https://x/teamB/repo1.git",
        ));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn web_url_strips_git_suffix() {
        assert_eq!(
            web_url_from_http("https://x/teamA/repo1.git"),
            "https://x/teamA/repo1"
        );
        assert_eq!(web_url_from_http("https://x/teamA/repo1"), "https://x/teamA/repo1");
    }
}
