use std::collections::HashSet;

use crate::{
    cache::CacheStore,
    config::{Config, Server},
    error::RefreshError,
    gitlab,
    project::ProjectRecord,
};

/// Loads the project set for a server. Runs on the refresh worker, never the UI thread.
pub(crate) trait ProjectSource: Send + Sync {
    fn reload_projects(&self, server: &Server) -> Result<HashSet<ProjectRecord>, RefreshError>;
}

/// Configured servers plus the project cache that backs them.
pub(crate) struct Session {
    servers: Vec<Server>,
    cache: CacheStore,
    per_page: u16,
}

impl Session {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            servers: config.servers.clone(),
            cache: CacheStore::new(config.cache_dir.clone(), config.cache_ttl),
            per_page: config.per_page,
        }
    }

    pub(crate) fn all_servers(&self) -> &[Server] {
        &self.servers
    }

    /// Previously loaded projects for `server`; `None` means not loaded yet.
    pub(crate) fn projects(&self, server: &Server) -> Option<HashSet<ProjectRecord>> {
        match self.cache.load(server) {
            Ok(projects) => {
                if projects.is_some() {
                    tracing::debug!(server = %server.url, "project cache hit");
                }
                projects
            }
            Err(err) => {
                tracing::warn!(server = %server.url, error = %err, "project cache unavailable");
                None
            }
        }
    }
}

impl ProjectSource for Session {
    fn reload_projects(&self, server: &Server) -> Result<HashSet<ProjectRecord>, RefreshError> {
        let projects = gitlab::fetch_member_projects(server, self.per_page)?;
        if let Err(err) = self.cache.store(server, &projects) {
            tracing::warn!(server = %server.url, error = %err, "failed to write project cache");
        }
        Ok(projects)
    }
}
