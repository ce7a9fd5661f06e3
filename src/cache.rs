use std::{
    collections::HashSet,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{config::Server, project::ProjectRecord};

#[derive(Debug, Deserialize, Serialize)]
struct CacheData {
    created_at: u64,
    server: String,
    projects: Vec<ProjectRecord>,
}

/// Per-server project lists on disk, one JSON file per server URL.
#[derive(Clone, Debug)]
pub(crate) struct CacheStore {
    dir: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    pub(crate) fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    pub(crate) fn path_for(&self, server: &Server) -> PathBuf {
        self.dir.join(format!("projects-{}.json", cache_key(&server.url)))
    }

    /// Cached projects for `server`, or `None` when missing, unreadable or expired.
    pub(crate) fn load(&self, server: &Server) -> Result<Option<HashSet<ProjectRecord>>> {
        let path = self.path_for(server);
        if !path.exists() {
            return Ok(None);
        }
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(_) => return Ok(None),
        };
        let cache: CacheData = match serde_json::from_slice(&data) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring corrupt project cache");
                return Ok(None);
            }
        };
        if cache.server != server.url {
            return Ok(None);
        }
        if cache_is_valid(cache.created_at, self.ttl, SystemTime::now()) {
            Ok(Some(cache.projects.into_iter().collect()))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn store(&self, server: &Server, projects: &HashSet<ProjectRecord>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut sorted: Vec<ProjectRecord> = projects.iter().cloned().collect();
        sorted.sort();
        let cache = CacheData {
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            server: server.url.clone(),
            projects: sorted,
        };
        let data = serde_json::to_vec_pretty(&cache)?;
        std::fs::write(self.path_for(server), data)?;
        Ok(())
    }
}

fn cache_is_valid(created_at: u64, ttl: Duration, now: SystemTime) -> bool {
    let Ok(now) = now.duration_since(UNIX_EPOCH) else {
        return false;
    };
    let now = now.as_secs();
    let ttl = ttl.as_secs();
    now.saturating_sub(created_at) <= ttl
}

fn cache_key(url: &str) -> String {
    url.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}
