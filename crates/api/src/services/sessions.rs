//! In-memory registry of edit sessions.
//!
//! Each session owns one `GeofenceConsole` drawing onto a recording map
//! surface; the browser replays the recorded surface commands on its map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use domain::models::geofence::SkippedRecord;
use domain::models::Geofence;
use domain::services::{
    EditState, FormState, GeofenceConsole, RecordingMapSurface, ShapeMetrics, SurfaceCommand,
};
use shared::pagination::PageInfo;

use crate::middleware::metrics::record_active_sessions;

pub type Console = GeofenceConsole<RecordingMapSurface>;

/// A session shared between concurrent requests.
pub type SharedSession = Arc<Mutex<ConsoleSession>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("Session limit of {0} reached")]
    Full(usize),
}

/// One browser console and its editor.
pub struct ConsoleSession {
    pub id: Uuid,
    pub console: Console,
    pub created_at: DateTime<Utc>,
    last_seen: Instant,
}

impl ConsoleSession {
    pub fn new(console: Console) -> Self {
        Self {
            id: Uuid::new_v4(),
            console,
            created_at: Utc::now(),
            last_seen: Instant::now(),
        }
    }

    /// Time since the browser last received a view.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Snapshot of the session, draining the pending surface commands.
    pub fn view(&mut self) -> SessionView {
        self.last_seen = Instant::now();
        let commands = self.console.surface_mut().take_commands();
        let editor = self.console.editor();
        let workspace = self.console.workspace();

        SessionView {
            session_id: self.id,
            state: editor.state(),
            editing_id: editor.editing_id().map(str::to_string),
            form: editor.form().clone(),
            metrics: editor.metrics(),
            error: editor.last_error().map(str::to_string),
            geofences: workspace.geofences().to_vec(),
            skipped: workspace.skipped().to_vec(),
            pagination: self.console.pagination().cloned(),
            search: self.console.search_text().map(str::to_string),
            commands,
            outcome: None,
        }
    }
}

/// What the browser receives after every session call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: EditState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing_id: Option<String>,
    pub form: FormState,
    pub metrics: ShapeMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub geofences: Vec<Geofence>,
    pub skipped: Vec<SkippedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub commands: Vec<SurfaceCommand>,
    /// How a synchronization event was handled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
}

/// Bounded registry of open sessions.
///
/// Sessions idle for longer than `idle_timeout` are closed whenever a new
/// session is admitted, so abandoned browser tabs do not hold slots forever.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            idle_timeout,
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Fails fast before a session is built.
    pub async fn ensure_capacity(&self) -> Result<(), SessionError> {
        if self.sessions.read().await.len() < self.max_sessions {
            return Ok(());
        }

        let mut sessions = self.sessions.write().await;
        self.evict_idle_locked(&mut sessions);
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::Full(self.max_sessions));
        }
        Ok(())
    }

    pub async fn insert(&self, session: ConsoleSession) -> Result<SharedSession, SessionError> {
        let mut sessions = self.sessions.write().await;
        self.evict_idle_locked(&mut sessions);
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::Full(self.max_sessions));
        }

        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        sessions.insert(id, shared.clone());
        record_active_sessions(sessions.len());
        info!(session_id = %id, active = sessions.len(), "Edit session opened");
        Ok(shared)
    }

    /// Closes every session idle past the timeout. Returns how many were closed.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.evict_idle_locked(&mut sessions)
    }

    // Sessions locked by an in-flight request are in use and never idle.
    fn evict_idle_locked(&self, sessions: &mut HashMap<Uuid, SharedSession>) -> usize {
        let before = sessions.len();
        sessions.retain(|id, shared| {
            let Ok(mut session) = shared.try_lock() else {
                return true;
            };
            let idle = session.idle_for();
            if idle < self.idle_timeout {
                return true;
            }

            session.console.close();
            info!(
                session_id = %id,
                idle_secs = idle.as_secs(),
                age_secs = (Utc::now() - session.created_at).num_seconds(),
                "Idle edit session closed"
            );
            false
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            record_active_sessions(sessions.len());
        }
        evicted
    }

    pub async fn get(&self, id: Uuid) -> Result<SharedSession, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn remove(&self, id: Uuid) -> Result<SharedSession, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.remove(&id).ok_or(SessionError::NotFound(id))?;
        record_active_sessions(sessions.len());
        info!(session_id = %id, active = sessions.len(), "Edit session closed");
        Ok(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::{EditorSettings, MockGeofenceStore, NoopGeocoder};

    const IDLE: Duration = Duration::from_secs(1800);

    #[test]
    fn test_new_registry_is_empty() {
        let registry = SessionRegistry::new(4, IDLE);
        assert!(tokio_test::block_on(registry.is_empty()));
        assert_eq!(registry.max_sessions(), 4);
    }

    fn session() -> ConsoleSession {
        ConsoleSession::new(GeofenceConsole::new(
            RecordingMapSurface::new(),
            EditorSettings::default(),
            Arc::new(MockGeofenceStore::new()),
            Arc::new(NoopGeocoder),
        ))
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let registry = SessionRegistry::new(2, IDLE);
        let shared = registry.insert(session()).await.unwrap();
        let id = shared.lock().await.id;

        assert!(registry.get(id).await.is_ok());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_registry_is_bounded() {
        let registry = SessionRegistry::new(1, IDLE);
        registry.insert(session()).await.unwrap();

        assert_eq!(registry.ensure_capacity().await, Err(SessionError::Full(1)));
        assert!(matches!(
            registry.insert(session()).await,
            Err(SessionError::Full(1))
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = SessionRegistry::new(1, IDLE);
        let shared = registry.insert(session()).await.unwrap();
        let id = shared.lock().await.id;

        registry.remove(id).await.unwrap();
        assert!(registry.is_empty().await);
        assert_eq!(registry.get(id).await.err(), Some(SessionError::NotFound(id)));
        assert!(registry.ensure_capacity().await.is_ok());
    }

    #[tokio::test]
    async fn test_idle_session_is_evicted_for_new_one() {
        let registry = SessionRegistry::new(1, Duration::from_millis(20));
        let abandoned = registry.insert(session()).await.unwrap();
        abandoned
            .lock()
            .await
            .console
            .start_drawing(domain::models::ShapeType::Circle, None)
            .unwrap();
        let abandoned_id = abandoned.lock().await.id;

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(registry.ensure_capacity().await.is_ok());
        let admitted = registry.insert(session()).await.unwrap();
        let admitted_id = admitted.lock().await.id;

        assert_eq!(registry.len().await, 1);
        assert!(registry.get(admitted_id).await.is_ok());
        assert_eq!(
            registry.get(abandoned_id).await.err(),
            Some(SessionError::NotFound(abandoned_id))
        );

        let closed = abandoned.lock().await;
        assert_eq!(closed.console.editor().state(), EditState::Idle);
        assert_eq!(closed.console.surface().overlay_count(), 0);
    }

    #[tokio::test]
    async fn test_active_session_is_kept() {
        let registry = SessionRegistry::new(1, Duration::from_millis(20));
        let shared = registry.insert(session()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        shared.lock().await.view();

        assert_eq!(registry.evict_idle().await, 0);
        assert!(matches!(
            registry.insert(session()).await,
            Err(SessionError::Full(1))
        ));
    }

    #[tokio::test]
    async fn test_locked_session_is_not_evicted() {
        let registry = SessionRegistry::new(1, Duration::ZERO);
        let shared = registry.insert(session()).await.unwrap();

        let _in_flight = shared.lock().await;
        assert_eq!(registry.evict_idle().await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_view_drains_commands() {
        let mut session = session();
        session
            .console
            .start_drawing(domain::models::ShapeType::Circle, None)
            .unwrap();

        let first = session.view();
        assert_eq!(first.state, EditState::Drawing);
        assert!(!first.commands.is_empty());

        let second = session.view();
        assert!(second.commands.is_empty());
    }
}
