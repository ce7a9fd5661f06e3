use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

const APP_DIR: &str = "gitlab-checkout";

/// A GitLab instance the picker can list projects from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Server {
    pub(crate) url: String,
    pub(crate) token: String,
}

impl Server {
    pub(crate) fn new(url: &str, token: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub(crate) fn display_name(&self) -> &str {
        let url = self.url.as_str();
        url.strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) servers: Vec<Server>,
    pub(crate) per_page: u16,
    pub(crate) cache_dir: PathBuf,
    pub(crate) cache_ttl: Duration,
    pub(crate) clone_dir: Option<PathBuf>,
    pub(crate) log_path: PathBuf,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_env_reader(|key| env::var(key).ok())
    }

    pub(crate) fn from_env_reader<F>(reader: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut servers = Vec::new();
        if let Some(token) = read_env_optional(&reader, "GITLAB_TOKEN") {
            let url = read_env_optional(&reader, "GITLAB_URL")
                .unwrap_or_else(|| "https://gitlab.com".to_string());
            servers.push(Server::new(&url, &token));
        }

        let servers_path = read_env_optional(&reader, "GITLAB_SERVERS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_servers_path);
        for server in load_servers_file(&servers_path)? {
            if !servers.iter().any(|known| known.url == server.url) {
                servers.push(server);
            }
        }
        if servers.is_empty() {
            anyhow::bail!(
                "no GitLab server configured: set GITLAB_TOKEN or list servers in {}",
                servers_path.display()
            );
        }

        let per_page = read_env_u16_optional(&reader, "GITLAB_PER_PAGE")?.unwrap_or(100);
        let cache_ttl_seconds =
            read_env_u64_optional(&reader, "GITLAB_CACHE_TTL_SECONDS")?.unwrap_or(300);
        let cache_dir = read_env_optional(&reader, "GITLAB_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_dir);
        let clone_dir = read_env_optional(&reader, "GITLAB_CLONE_DIR").map(PathBuf::from);
        let log_path = read_env_optional(&reader, "GITLAB_CHECKOUT_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| cache_dir.join("gitlab-checkout.log"));

        Ok(Self {
            servers,
            per_page,
            cache_dir,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            clone_dir,
            log_path,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    url: String,
    token: String,
}

fn load_servers_file(path: &Path) -> Result<Vec<Server>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read servers file {}", path.display()))?;
    let entries: Vec<ServerEntry> = serde_json::from_slice(&data)
        .with_context(|| format!("invalid servers file {}", path.display()))?;
    Ok(entries
        .into_iter()
        .filter(|entry| !entry.url.trim().is_empty())
        .map(|entry| Server::new(&entry.url, &entry.token))
        .collect())
}

fn read_env_optional<F>(reader: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    reader(key).filter(|value| !value.trim().is_empty())
}

fn read_env_u16_optional<F>(reader: &F, key: &str) -> Result<Option<u16>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = read_env_optional(reader, key) else {
        return Ok(None);
    };
    let parsed = value
        .parse::<u16>()
        .map_err(|_| anyhow::anyhow!("invalid integer for {key}: {value}"))?;
    if parsed == 0 {
        anyhow::bail!("{key} must be greater than zero");
    }
    Ok(Some(parsed))
}

fn read_env_u64_optional<F>(reader: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = read_env_optional(reader, key) else {
        return Ok(None);
    };
    let parsed = value
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("invalid integer for {key}: {value}"))?;
    Ok(Some(parsed))
}

fn default_servers_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(APP_DIR).join("servers.json")
}

fn default_cache_dir() -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_with(
        pairs: Vec<(&'static str, String)>,
    ) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
        }
    }

    fn missing_servers_file(dir: &tempfile::TempDir) -> String {
        dir.path().join("servers.json").display().to_string()
    }

    #[test]
    fn config_from_env_reader_defaults_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::from_env_reader(reader_with(vec![
            ("GITLAB_TOKEN", "token".to_string()),
            ("GITLAB_SERVERS_PATH", missing_servers_file(&dir)),
        ]))
        .expect("config should load");

        assert_eq!(config.servers, vec![Server::new("https://gitlab.com", "token")]);
        assert_eq!(config.per_page, 100);
        assert_eq!(config.cache_ttl.as_secs(), 300);
        assert!(config.cache_dir.ends_with(APP_DIR));
        assert!(config.log_path.ends_with(PathBuf::from(APP_DIR).join("gitlab-checkout.log")));
        assert!(config.clone_dir.is_none());
    }

    #[test]
    fn config_from_env_reader_fails_without_any_server() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = Config::from_env_reader(reader_with(vec![(
            "GITLAB_SERVERS_PATH",
            missing_servers_file(&dir),
        )]));
        let err = result.expect_err("config should fail");
        assert!(err.to_string().contains("no GitLab server configured"));
    }

    #[test]
    fn config_from_env_reader_merges_servers_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("servers.json");
        std::fs::write(
            &path,
            r#"[
                {"url": "https://gitlab.example.com/", "token": "dup"},
                {"url": "https://git.internal", "token": "internal"}
            ]"#,
        )
        .expect("write servers");

        let config = Config::from_env_reader(reader_with(vec![
            ("GITLAB_URL", "https://gitlab.example.com".to_string()),
            ("GITLAB_TOKEN", "primary".to_string()),
            ("GITLAB_SERVERS_PATH", path.display().to_string()),
        ]))
        .expect("config should load");

        assert_eq!(
            config.servers,
            vec![
                Server::new("https://gitlab.example.com", "primary"),
                Server::new("https://git.internal", "internal"),
            ]
        );
    }

    #[test]
    fn config_from_env_reader_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::from_env_reader(reader_with(vec![
            ("GITLAB_TOKEN", "token".to_string()),
            ("GITLAB_SERVERS_PATH", missing_servers_file(&dir)),
            ("GITLAB_PER_PAGE", "50".to_string()),
            ("GITLAB_CACHE_TTL_SECONDS", "120".to_string()),
            ("GITLAB_CACHE_DIR", "/tmp/gitlab-checkout-cache".to_string()),
            ("GITLAB_CLONE_DIR", "/tmp/src".to_string()),
            ("GITLAB_CHECKOUT_LOG", "/tmp/checkout.log".to_string()),
        ]))
        .expect("config should load");

        assert_eq!(config.per_page, 50);
        assert_eq!(config.cache_ttl.as_secs(), 120);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/gitlab-checkout-cache"));
        assert_eq!(config.clone_dir, Some(PathBuf::from("/tmp/src")));
        assert_eq!(config.log_path, PathBuf::from("/tmp/checkout.log"));
    }

    #[test]
    fn config_from_env_reader_rejects_invalid_integer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = Config::from_env_reader(reader_with(vec![
            ("GITLAB_TOKEN", "token".to_string()),
            ("GITLAB_SERVERS_PATH", missing_servers_file(&dir)),
            ("GITLAB_PER_PAGE", "lots".to_string()),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn config_from_env_reader_rejects_corrupt_servers_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("servers.json");
        std::fs::write(&path, "not json").expect("write servers");

        let result = Config::from_env_reader(reader_with(vec![
            ("GITLAB_TOKEN", "token".to_string()),
            ("GITLAB_SERVERS_PATH", path.display().to_string()),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn server_display_name_strips_scheme() {
        assert_eq!(
            Server::new("https://gitlab.com/", "t").display_name(),
            "gitlab.com"
        );
        assert_eq!(
            Server::new("http://git.local:8080", "t").display_name(),
            "git.local:8080"
        );
    }
}
