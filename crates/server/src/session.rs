//! Session tracking for the streamable HTTP transport

use shared::Implementation;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Sessions unused for this long are dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// An initialized client session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub client: Option<Implementation>,
    pub protocol_version: String,
    pub created_at: Instant,
    pub last_seen: Instant,
}

impl Session {
    fn is_expired(&self, idle_timeout: Duration) -> bool {
        self.last_seen.elapsed() >= idle_timeout
    }
}

/// In-memory session store keyed by `Mcp-Session-Id`.
///
/// Clients that never send DELETE leave their session behind; such sessions
/// expire after `idle_timeout` without requests and are pruned whenever a new
/// session is created.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Create a session and return its id
    pub async fn create(&self, client: Option<Implementation>, protocol_version: impl Into<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Instant::now();
        let session = Session {
            id: id.clone(),
            client,
            protocol_version: protocol_version.into(),
            created_at: now,
            last_seen: now,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.idle_timeout));
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "pruned idle sessions");
        }
        sessions.insert(id.clone(), session);
        id
    }

    /// Mark a session as used; false when it is unknown or has expired
    pub async fn touch(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if !session.is_expired(self.idle_timeout) => {
                session.last_seen = Instant::now();
                true
            }
            Some(_) => {
                sessions.remove(id);
                false
            }
            None => false,
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(id)
            .is_some_and(|s| !s.is_expired(self.idle_timeout))
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(id)
            .filter(|s| !s.is_expired(self.idle_timeout))
            .cloned()
    }

    /// Terminate a session; false when it did not exist
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
