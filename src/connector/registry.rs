/// In-memory registry of connected cluster sessions
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::{Error, Result};
use crate::k8s::ClusterApi;

/// Snapshot of cluster metadata captured at connect time; never refreshed
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusterInfo {
    pub name: String,
    pub region: String,
    pub version: Option<String>,
    pub status: Option<String>,
    pub endpoint: Option<String>,
}

/// A live, authenticated cluster session
#[derive(Clone)]
pub struct ClusterSession {
    pub id: String,
    pub info: ClusterInfo,
    pub api: Arc<dyn ClusterApi>,
}

/// Registry listing entry
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionSummary {
    pub connection_id: String,
    pub cluster_info: ClusterInfo,
}

/// Stable identifier of a (region, cluster) pair
pub fn connection_id(region: &str, cluster_name: &str) -> String {
    format!("{}_{}", region, cluster_name)
}

/// Process-wide connection registry
///
/// Entries keep their original position when overwritten. The lock is only
/// held for map operations, never across network calls.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: Mutex<Vec<ClusterSession>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<ClusterSession>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite; returns true when an existing entry was replaced
    pub fn put(&self, session: ClusterSession) -> bool {
        let mut entries = self.entries();
        match entries.iter_mut().find(|entry| entry.id == session.id) {
            Some(existing) => {
                debug!("Replacing connection {}", session.id);
                *existing = session;
                true
            }
            None => {
                debug!("Registering connection {}", session.id);
                entries.push(session);
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<ClusterSession> {
        self.entries()
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    /// Remove an entry, returning the cluster info it held
    pub fn remove(&self, id: &str) -> Result<ClusterInfo> {
        let mut entries = self.entries();
        let index = entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(Error::NotFound)?;
        Ok(entries.remove(index).info)
    }

    pub fn list(&self) -> Vec<ConnectionSummary> {
        self.entries()
            .iter()
            .map(|entry| ConnectionSummary {
                connection_id: entry.id.clone(),
                cluster_info: entry.info.clone(),
            })
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
