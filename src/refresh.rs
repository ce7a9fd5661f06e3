use std::{
    collections::HashSet,
    sync::{Arc, mpsc},
    thread,
};

use crate::{config::Server, error::RefreshError, project::ProjectRecord, session::ProjectSource};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Background execution context for blocking refresh work.
pub(crate) trait Spawner {
    fn spawn(&self, job: Job);
}

pub(crate) struct ThreadSpawner;

impl Spawner for ThreadSpawner {
    fn spawn(&self, job: Job) {
        thread::spawn(job);
    }
}

#[derive(Debug)]
pub(crate) enum RefreshState {
    Idle,
    Loading { server: Server },
    Ready { server: Server, projects: HashSet<ProjectRecord> },
    Failed { server: Server, error: RefreshError },
}

/// What `poll` applied, if anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefreshOutcome {
    Ready,
    Failed,
}

struct Pending {
    server: Server,
    receiver: mpsc::Receiver<Result<HashSet<ProjectRecord>, RefreshError>>,
}

/// Drives project reloads off the UI thread.
///
/// Every request gets its own channel. Issuing a new request drops the
/// receiver of the previous one, so a slower earlier fetch can never
/// overwrite the result of a later request.
pub(crate) struct RefreshController {
    source: Arc<dyn ProjectSource>,
    spawner: Box<dyn Spawner>,
    state: RefreshState,
    pending: Option<Pending>,
}

impl RefreshController {
    pub(crate) fn new(source: Arc<dyn ProjectSource>, spawner: Box<dyn Spawner>) -> Self {
        Self {
            source,
            spawner,
            state: RefreshState::Idle,
            pending: None,
        }
    }

    pub(crate) fn state(&self) -> &RefreshState {
        &self.state
    }

    pub(crate) fn is_loading(&self) -> bool {
        matches!(self.state, RefreshState::Loading { .. })
    }

    /// Starts a reload for `server`. `None` leaves the controller untouched.
    pub(crate) fn request_refresh(&mut self, server: Option<&Server>) {
        let Some(server) = server else {
            tracing::debug!("refresh requested without a server, ignoring");
            return;
        };

        let (sender, receiver) = mpsc::channel();
        let superseded = self.pending.replace(Pending {
            server: server.clone(),
            receiver,
        });
        if let Some(previous) = superseded {
            tracing::info!(
                previous = %previous.server.url,
                next = %server.url,
                "superseding in-flight refresh"
            );
        }
        self.state = RefreshState::Loading {
            server: server.clone(),
        };
        tracing::info!(server = %server.url, "refreshing projects");

        let source = Arc::clone(&self.source);
        let job_server = server.clone();
        self.spawner.spawn(Box::new(move || {
            let result = source.reload_projects(&job_server);
            if sender.send(result).is_err() {
                tracing::debug!(server = %job_server.url, "discarding superseded refresh result");
            }
        }));
    }

    /// Applies a finished reload, if one arrived. Call from the UI thread.
    pub(crate) fn poll(&mut self) -> Option<RefreshOutcome> {
        let pending = self.pending.as_ref()?;
        let result = match pending.receiver.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => Err(RefreshError::Interrupted),
        };
        let Pending { server, .. } = self.pending.take()?;

        match result {
            Ok(projects) => {
                tracing::info!(server = %server.url, projects = projects.len(), "refresh finished");
                self.state = RefreshState::Ready { server, projects };
                Some(RefreshOutcome::Ready)
            }
            Err(error) => {
                tracing::warn!(server = %server.url, error = %error, "refresh failed");
                self.state = RefreshState::Failed { server, error };
                Some(RefreshOutcome::Failed)
            }
        }
    }
}
