//! Per-upload session state.
//!
//! Every upload creates a [`Session`] holding the extracted document, its
//! requirements list, and its vector index. Chat requests name a session id
//! or default to the most recent upload, so concurrent clients working on
//! different documents no longer clobber each other.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::index::VectorIndex;
use crate::requirements::RequirementsList;

/// Metadata for the document backing a session.
#[derive(Debug, Clone)]
pub struct SessionDocument {
    /// Hex SHA-256 fingerprint of the uploaded bytes.
    pub fingerprint: String,
    pub page_count: usize,
    pub text_chars: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// One uploaded document plus its derived chat state.
pub struct Session {
    pub id: Uuid,
    pub document: SessionDocument,
    /// Replaced wholesale by successful edit operations.
    pub requirements: RwLock<RequirementsList>,
    pub index: VectorIndex,
}

impl Session {
    pub fn new(document: SessionDocument, requirements: RequirementsList, index: VectorIndex) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            requirements: RwLock::new(requirements),
            index,
        }
    }
}

/// Process-wide registry of sessions, keyed by id, with a most-recent
/// pointer for clients that do not track session ids.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    latest: RwLock<Option<Uuid>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        let id = session.id;
        self.sessions.write().unwrap().insert(id, session.clone());
        *self.latest.write().unwrap() = Some(id);
        session
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.read().unwrap().get(&id).cloned()
    }

    pub fn latest(&self) -> Option<Arc<Session>> {
        let id = (*self.latest.read().unwrap())?;
        self.get(id)
    }

    /// Look up an explicit session id, or fall back to the latest upload.
    pub fn resolve(&self, id: Option<Uuid>) -> Option<Arc<Session>> {
        match id {
            Some(id) => self.get(id),
            None => self.latest(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            SessionDocument {
                fingerprint: "abc".to_string(),
                page_count: 1,
                text_chars: 10,
                uploaded_at: Utc::now(),
            },
            RequirementsList::new(),
            VectorIndex::new(),
        )
    }

    #[test]
    fn insert_updates_latest() {
        let store = SessionStore::new();
        assert!(store.latest().is_none());

        let first = store.insert(session());
        assert_eq!(store.latest().unwrap().id, first.id);

        let second = store.insert(session());
        assert_eq!(store.latest().unwrap().id, second.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn resolve_prefers_explicit_id() {
        let store = SessionStore::new();
        let first = store.insert(session());
        store.insert(session());

        let resolved = store.resolve(Some(first.id)).unwrap();
        assert_eq!(resolved.id, first.id);
    }

    #[test]
    fn resolve_unknown_id_is_none() {
        let store = SessionStore::new();
        store.insert(session());
        assert!(store.resolve(Some(Uuid::new_v4())).is_none());
    }
}
