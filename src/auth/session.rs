//! Session holder and optional session persistence
//!
//! The holder is the only shared state in the client: every sub-client
//! reads it, and only sign-in/sign-up/sign-out and category refreshes
//! write it. Screen-style callers can trigger overlapping category
//! fetches; each fetch takes a ticket from [`SessionHolder::begin_categories_refresh`]
//! and a stale response (older ticket) is discarded instead of
//! overwriting a newer one.

use std::sync::{Arc, Mutex, RwLock};

use crate::auth::types::{CategoryRef, Session, Subscription};
use crate::error::Error;

#[derive(Default)]
struct HolderState {
    session: Option<Session>,
    /// Ticket handed to the most recently started categories fetch
    issued_ticket: u64,
    /// Ticket of the most recently applied categories response
    applied_ticket: u64,
}

/// Process-wide holder for the current session.
#[derive(Clone, Default)]
pub struct SessionHolder {
    inner: Arc<RwLock<HolderState>>,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current session, if signed in.
    pub fn get(&self) -> Option<Session> {
        let guard = self.inner.read().unwrap();
        guard.session.clone()
    }

    /// Install a freshly built session, invalidating any in-flight
    /// category refresh started against the previous one.
    pub fn set(&self, session: Session) {
        let mut guard = self.inner.write().unwrap();
        guard.session = Some(session);
        guard.issued_ticket += 1;
        guard.applied_ticket = guard.issued_ticket;
    }

    /// Clear the session. Nothing from the old session survives into the
    /// next sign-in; category data and tickets are reset together.
    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap();
        guard.session = None;
        guard.issued_ticket += 1;
        guard.applied_ticket = guard.issued_ticket;
    }

    /// Replace the bearer token pair after a refresh.
    pub fn update_tokens(&self, id_token: &str, refresh_token: &str) {
        let mut guard = self.inner.write().unwrap();
        if let Some(session) = guard.session.as_mut() {
            session.id_token = id_token.to_string();
            session.refresh_token = refresh_token.to_string();
        }
    }

    /// Take a ticket for a categories fetch that is about to start.
    pub fn begin_categories_refresh(&self) -> u64 {
        let mut guard = self.inner.write().unwrap();
        guard.issued_ticket += 1;
        guard.issued_ticket
    }

    /// Apply a categories response. Returns `false` when the response is
    /// stale (a newer response or a session change already landed) and
    /// was discarded.
    pub fn apply_categories(
        &self,
        ticket: u64,
        subscribed: Vec<Subscription>,
        non_subscribed: Vec<CategoryRef>,
    ) -> bool {
        let mut guard = self.inner.write().unwrap();
        if ticket <= guard.applied_ticket {
            tracing::debug!(ticket, applied = guard.applied_ticket, "stale categories response discarded");
            return false;
        }
        let Some(session) = guard.session.as_mut() else {
            return false;
        };
        session.subscribed = subscribed;
        session.non_subscribed = non_subscribed;
        guard.applied_ticket = ticket;
        true
    }
}

/// On-device key-value persistence for the session snapshot.
///
/// The backing store is an external collaborator; the crate ships an
/// in-memory implementation for tests and embeds callers can provide
/// their own (keychain, shared preferences, a file).
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, Error>;
    fn save(&self, session: &Session) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

/// In-memory session store.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, Error> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn save(&self, session: &Session) -> Result<(), Error> {
        *self.slot.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn session() -> Session {
        Session {
            email: "test@example.com".to_string(),
            id_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            created_at: "2024-01-01".to_string(),
            contact_bar_image: "bar.png".to_string(),
            subscribed: vec![],
            non_subscribed: vec![],
        }
    }

    fn subscription(id: i64) -> Subscription {
        Subscription {
            id,
            category_name: "Tax Professional".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2099, 1, 1).unwrap(),
        }
    }

    #[test]
    fn clear_removes_everything() {
        let holder = SessionHolder::new();
        holder.set(session());
        assert!(holder.get().is_some());

        holder.clear();
        assert!(holder.get().is_none());
    }

    #[test]
    fn stale_categories_response_is_discarded() {
        let holder = SessionHolder::new();
        holder.set(session());

        let first = holder.begin_categories_refresh();
        let second = holder.begin_categories_refresh();

        // Newer response lands first
        assert!(holder.apply_categories(second, vec![subscription(1), subscription(2)], vec![]));
        // Older response must not overwrite it
        assert!(!holder.apply_categories(first, vec![subscription(9)], vec![]));

        let current = holder.get().unwrap();
        assert_eq!(current.subscribed.len(), 2);
        assert_eq!(current.subscribed[0].id, 1);
    }

    #[test]
    fn categories_response_for_old_session_is_discarded() {
        let holder = SessionHolder::new();
        holder.set(session());
        let ticket = holder.begin_categories_refresh();

        // Sign-out then sign-in again before the response lands
        holder.clear();
        holder.set(session());

        assert!(!holder.apply_categories(ticket, vec![subscription(1)], vec![]));
        assert!(holder.get().unwrap().subscribed.is_empty());
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemorySessionStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().email, "test@example.com");

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
