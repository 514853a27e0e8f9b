use dispatch_core::map::{DEFAULT_CENTER, OVERVIEW_ZOOM, PICKER_ZOOM};
use dispatch_core::model::GeoPoint;
use dispatch_core::places::PlaceResolver;
use dispatch_core::session::Session;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapSettings {
    pub center: GeoPoint,
    pub picker_zoom: u8,
    pub overview_zoom: u8,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            picker_zoom: PICKER_ZOOM,
            overview_zoom: OVERVIEW_ZOOM,
        }
    }
}

/// How long an untouched session is kept, and how many are kept at most.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(30 * 60),
            max_sessions: 1_000,
        }
    }
}

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// Sessions keyed by the id carried in the session cookie. Each session is
/// locked for the duration of one request. Sessions idle for longer than
/// `idle_ttl` are dropped, and the least recently used one is dropped when a
/// new session would exceed `max_sessions`.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
    seed: Option<fn(&mut Session)>,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(seed: Option<fn(&mut Session)>, limits: SessionLimits) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            seed,
            limits,
        }
    }

    /// Returns the session for `id`, or a fresh one (with a new id) when the
    /// id is missing or unknown. The flag is true for fresh sessions.
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SessionHandle, bool) {
        self.get_or_create_at(id, Instant::now())
    }

    fn get_or_create_at(&self, id: Option<Uuid>, now: Instant) -> (Uuid, SessionHandle, bool) {
        let mut sessions = self.entries();
        if let Some(id) = id {
            if let Some(handle) = touch(&mut sessions, id, now, self.limits.idle_ttl) {
                return (id, handle, false);
            }
        }

        evict_idle(&mut sessions, now, self.limits.idle_ttl);
        while sessions.len() >= self.limits.max_sessions.max(1) {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
            debug!(session = %oldest, "session evicted at capacity");
        }

        let id = Uuid::new_v4();
        let handle = Arc::new(tokio::sync::Mutex::new(self.fresh_session()));
        sessions.insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                last_seen: now,
            },
        );
        debug!(session = %id, "session started");
        (id, handle, true)
    }

    /// Existing session for `id`, refreshed as recently used. Never creates.
    pub fn get(&self, id: Option<Uuid>) -> Option<SessionHandle> {
        id.and_then(|id| touch(&mut self.entries(), id, Instant::now(), self.limits.idle_ttl))
    }

    /// A session that is not stored, for reads made without a known cookie.
    pub fn detached(&self) -> SessionHandle {
        Arc::new(tokio::sync::Mutex::new(self.fresh_session()))
    }

    /// Drops sessions idle for longer than the configured TTL and returns how
    /// many were removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        evict_idle(&mut self.entries(), now, self.limits.idle_ttl)
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_session(&self) -> Session {
        let mut session = Session::new();
        if let Some(seed) = self.seed {
            seed(&mut session);
        }
        session
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a live session as used; a session past its TTL counts as gone.
fn touch(
    sessions: &mut HashMap<Uuid, SessionEntry>,
    id: Uuid,
    now: Instant,
    ttl: Duration,
) -> Option<SessionHandle> {
    let entry = sessions.get_mut(&id)?;
    if now.saturating_duration_since(entry.last_seen) > ttl {
        sessions.remove(&id);
        return None;
    }
    entry.last_seen = now;
    Some(entry.handle.clone())
}

fn evict_idle(sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= ttl);
    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!(evicted, "idle sessions evicted");
    }
    evicted
}

pub struct AppState {
    pub sessions: SessionStore,
    pub places: Arc<PlaceResolver>,
    pub map: MapSettings,
}
