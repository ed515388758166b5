use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{MoodImage, PortfolioDirection, ProfileField, UserProfile};

/// Where a session is in its generation cycle.
///
/// Idle → Analyzing → GeneratingImages → Complete, with Error reachable from
/// either in-flight step. Complete and Error hold until the next reset or trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Analyzing,
    GeneratingImages {
        direction: PortfolioDirection,
    },
    Complete {
        direction: PortfolioDirection,
        mood_image: Option<MoodImage>,
    },
    Error {
        message: String,
    },
}

impl GenerationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, GenerationState::Analyzing | GenerationState::GeneratingImages { .. })
    }

    pub fn direction(&self) -> Option<&PortfolioDirection> {
        match self {
            GenerationState::GeneratingImages { direction } | GenerationState::Complete { direction, .. } => Some(direction),
            _ => None,
        }
    }

    pub fn mood_image(&self) -> Option<&MoodImage> {
        match self {
            GenerationState::Complete { mood_image, .. } => mood_image.as_ref(),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::Analyzing => "analyzing",
            GenerationState::GeneratingImages { .. } => "generating_images",
            GenerationState::Complete { .. } => "complete",
            GenerationState::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub profile: UserProfile,
    pub state: GenerationState,
    /// Bumped on every trigger and reset; results tagged with an older epoch are dropped.
    pub epoch: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    fn new(profile: UserProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            profile,
            state: GenerationState::Idle,
            epoch: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the session as written. Callers that leave it unchanged must not call this.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.state.is_in_flight() && now.signed_duration_since(self.updated_at).to_std().is_ok_and(|idle| idle > ttl)
    }
}

/// All live sessions. Cheap to clone; clones share the same map.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session seeded with the starter profile and returns a snapshot of it.
    pub fn create(&self) -> Session {
        self.create_with(UserProfile::starter())
    }

    pub fn create_with(&self, profile: UserProfile) -> Session {
        let session = Session::new(profile);
        self.inner.write().insert(session.id, session.clone());
        tracing::info!(session = %session.id, "🆕 Session created");
        session
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Session> {
        self.inner.read().get(&id).cloned()
    }

    /// Writes one profile field. Returns `None` for unknown sessions.
    pub fn update_profile_field(&self, id: Uuid, field: ProfileField, value: String) -> Option<Session> {
        let mut guard = self.inner.write();
        let session = guard.get_mut(&id)?;
        session.profile.set(field, value);
        session.touch();
        Some(session.clone())
    }

    /// Runs `f` against the session under the write lock. `f` calls
    /// [`Session::touch`] itself when it writes.
    ///
    /// Generation state is only written through here, and only by the pipeline.
    pub(crate) fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut guard = self.inner.write();
        let session = guard.get_mut(&id)?;
        Some(f(session))
    }

    /// Drops sessions that are not in flight and were last written more than `ttl` ago.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let now = Utc::now();
        let mut guard = self.inner.write();
        let before = guard.len();
        guard.retain(|_, session| !session.expired(now, ttl));
        before - guard.len()
    }

    /// Spawns the periodic sweep that keeps the store bounded.
    pub fn spawn_sweeper(&self, ttl: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        let period = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let evicted = store.evict_idle(ttl);
                if evicted > 0 {
                    tracing::info!(evicted, "🧹 Evicted idle sessions");
                }
            }
        })
    }
}
