use std::collections::HashSet;

use serde::Deserialize;

use crate::{config::Server, error::RefreshError, project::ProjectRecord};

#[derive(Clone, Debug, Deserialize)]
struct GitLabNamespace {
    full_path: String,
}

#[derive(Clone, Debug, Deserialize)]
struct GitLabProject {
    name: String,
    namespace: GitLabNamespace,
    ssh_url_to_repo: String,
    http_url_to_repo: String,
}

impl From<GitLabProject> for ProjectRecord {
    fn from(project: GitLabProject) -> Self {
        ProjectRecord {
            name: project.name,
            namespace: project.namespace.full_path,
            ssh_url: project.ssh_url_to_repo,
            http_url: project.http_url_to_repo,
        }
    }
}

/// Lists every project the token's user is a member of.
pub(crate) fn fetch_member_projects(
    server: &Server,
    per_page: u16,
) -> Result<HashSet<ProjectRecord>, RefreshError> {
    let client = reqwest::blocking::Client::new();
    let url = format!("{}/api/v4/projects", server.url);
    let mut page = 1usize;
    let mut all = HashSet::new();

    loop {
        let query: Vec<(&str, String)> = vec![
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
            ("membership", "true".to_string()),
            ("simple", "true".to_string()),
        ];

        let resp = client
            .get(&url)
            .header("PRIVATE-TOKEN", &server.token)
            .query(&query)
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RefreshError::from_status(status.as_u16()));
        }

        let next_page = resp
            .headers()
            .get("x-next-page")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .trim()
            .to_string();

        let body = resp.bytes()?;
        all.extend(parse_projects(&body)?);

        if next_page.is_empty() {
            break;
        }

        page = next_page
            .parse()
            .map_err(|_| RefreshError::Decode(format!("invalid x-next-page header: {next_page}")))?;
    }

    tracing::debug!(server = %server.url, pages = page, projects = all.len(), "fetched projects");
    Ok(all)
}

fn parse_projects(body: &[u8]) -> Result<Vec<ProjectRecord>, RefreshError> {
    let projects: Vec<GitLabProject> =
        serde_json::from_slice(body).map_err(|err| RefreshError::Decode(err.to_string()))?;
    Ok(projects.into_iter().map(ProjectRecord::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_projects_maps_clone_urls_and_namespace_path() {
        let body = br#"[
            {
                "id": 7,
                "name": "api",
                "path_with_namespace": "platform/backend/api",
                "namespace": {"id": 3, "name": "backend", "full_path": "platform/backend"},
                "ssh_url_to_repo": "git@gitlab.example.com:platform/backend/api.git",
                "http_url_to_repo": "https://gitlab.example.com/platform/backend/api.git"
            }
        ]"#;

        let projects = parse_projects(body).expect("parse");
        assert_eq!(
            projects,
            vec![ProjectRecord::new(
                "api",
                "platform/backend",
                "git@gitlab.example.com:platform/backend/api.git",
                "https://gitlab.example.com/platform/backend/api.git",
            )]
        );
    }

    #[test]
    fn parse_projects_rejects_unexpected_shape() {
        let err = parse_projects(br#"{"message": "401 Unauthorized"}"#).expect_err("should fail");
        assert!(matches!(err, RefreshError::Decode(_)));
    }
}
