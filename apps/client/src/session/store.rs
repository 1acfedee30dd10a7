//! SessionStore: the single owner of the authenticated identity.
//!
//! Nothing else reads or writes the persisted `user`/`token` slots. Every change
//! is published on a watch channel so the route guard and the controllers can
//! react to logins, logouts and server-side invalidation.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::ClientError;
use crate::models::session::{Session, User};
use crate::session::storage::SlotStorage;

pub const USER_SLOT: &str = "user";
pub const TOKEN_SLOT: &str = "token";

/// Stringified absent values that older clients persisted instead of nothing.
const ABSENT_SENTINELS: &[&str] = &["undefined", "null"];

/// Why the snapshot last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Initializing,
    Restored,
    LoggedIn,
    LoggedOut,
    /// The service rejected the token (HTTP 401).
    Invalidated,
    TornDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Option<Session>,
    /// True until `restore()` has completed. No access decision may be taken meanwhile.
    pub loading: bool,
    pub change: SessionChange,
}

impl SessionSnapshot {
    fn initializing() -> Self {
        Self {
            session: None,
            loading: true,
            change: SessionChange::Initializing,
        }
    }
}

pub struct SessionStore {
    storage: Arc<dyn SlotStorage>,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// Creates a store in the loading state. Call [`SessionStore::init`] next.
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());
        Self { storage, state }
    }

    /// Restores any persisted session and ends the loading phase.
    pub fn init(&self) -> Option<Session> {
        let session = self.restore();
        match &session {
            Some(s) => info!("Restored session for {}", s.email),
            None => info!("No persisted session"),
        }
        session
    }

    /// Drops the in-memory session and returns to the loading state.
    /// Persisted slots are kept; the next `init()` picks them up again.
    pub fn teardown(&self) {
        self.publish(None, true, SessionChange::TornDown);
    }

    /// Reads the persisted slots. Anything short of a complete, parsable pair
    /// yields no session and wipes both slots. Never fails.
    pub fn restore(&self) -> Option<Session> {
        let user = self.read_slot(USER_SLOT);
        let token = self.read_slot(TOKEN_SLOT);

        let session = match (user, token) {
            (Some(user), Some(token)) => match serde_json::from_str::<User>(&user) {
                Ok(user) => Some(Session::new(user, token)),
                Err(e) => {
                    warn!("Persisted user could not be parsed, clearing session: {e}");
                    None
                }
            },
            _ => None,
        };

        if session.is_none() {
            self.clear_slots();
        }

        self.publish(session.clone(), false, SessionChange::Restored);
        session
    }

    /// Persists and activates a session, replacing any existing one.
    pub fn login(&self, user: User, token: String) -> Result<Session, ClientError> {
        let user_json = serde_json::to_string(&user)?;
        self.storage.write(USER_SLOT, &user_json)?;
        self.storage.write(TOKEN_SLOT, &token)?;

        let session = Session::new(user, token);
        info!("Logged in as {}", session.email);
        self.publish(Some(session.clone()), false, SessionChange::LoggedIn);
        Ok(session)
    }

    /// Clears everything, whether or not a session was active.
    pub fn logout(&self) {
        self.clear_slots();
        self.publish(None, false, SessionChange::LoggedOut);
        info!("Logged out");
    }

    /// Authorization-failure path: clears like `logout()` but tells observers why.
    pub fn invalidate(&self) {
        self.clear_slots();
        self.publish(None, false, SessionChange::Invalidated);
        warn!("Session invalidated by the service");
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().session.as_ref().map(|s| s.token.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    fn read_slot(&self, slot: &str) -> Option<String> {
        match self.storage.read(slot) {
            Ok(Some(value)) => {
                let trimmed = value.trim();
                if trimmed.is_empty() || ABSENT_SENTINELS.contains(&trimmed) {
                    debug!("Slot '{slot}' holds an absent-value marker");
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Could not read session slot '{slot}': {e}");
                None
            }
        }
    }

    fn clear_slots(&self) {
        for slot in [USER_SLOT, TOKEN_SLOT] {
            if let Err(e) = self.storage.remove(slot) {
                warn!("Could not clear session slot '{slot}': {e}");
            }
        }
    }

    fn publish(&self, session: Option<Session>, loading: bool, change: SessionChange) {
        self.state.send_replace(SessionSnapshot {
            session,
            loading,
            change,
        });
    }
}
