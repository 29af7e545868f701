//! Directory of open bridge connections.
//!
//! Each connection task owns its loop and state. The registry only holds a
//! descriptor per connection for lookup and for the status resource.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    WebSocket,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub id: String,
    pub transport: Transport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub requests: u64,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionInfo>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; it is removed again when the guard drops.
    pub fn open(self: &Arc<Self>, transport: Transport, peer: Option<String>) -> ConnectionGuard {
        let id = uuid::Uuid::new_v4().to_string();
        self.connections.insert(
            id.clone(),
            ConnectionInfo {
                id: id.clone(),
                transport,
                peer: peer.clone(),
                connected_at: Utc::now(),
                requests: 0,
            },
        );
        tracing::info!(
            connection = %id,
            transport = ?transport,
            peer = peer.as_deref().unwrap_or("-"),
            active = self.connections.len(),
            "bridge connection opened"
        );
        ConnectionGuard {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn get(&self, id: &str) -> Option<ConnectionInfo> {
        self.connections.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Descriptors ordered by connect time.
    pub fn snapshot(&self) -> Vec<ConnectionInfo> {
        let mut all: Vec<ConnectionInfo> =
            self.connections.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by_key(|info| info.connected_at);
        all
    }
}

/// Registration handle held by a connection task.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: String,
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn record_request(&self) {
        if let Some(mut entry) = self.registry.connections.get_mut(&self.id) {
            entry.requests += 1;
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let removed = self.registry.connections.remove(&self.id);
        let requests = removed.map(|(_, info)| info.requests).unwrap_or_default();
        tracing::info!(connection = %self.id, requests, "bridge connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_lifecycle() {
        let registry = Arc::new(ConnectionRegistry::new());
        let guard = registry.open(Transport::Stdio, None);
        guard.record_request();
        guard.record_request();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(guard.id()).unwrap().requests, 2);

        drop(guard);
        assert!(registry.is_empty());
    }
}
