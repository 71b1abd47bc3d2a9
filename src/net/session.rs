//! Session identity and reconnection tokens
//!
//! The core receives already-authenticated identities from the upstream
//! collaborator; what lives here is the per-connection session record and
//! the opaque resume token a client presents to reclaim its seat within
//! the reconnection grace window.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use hashbrown::HashMap;

use crate::game::state::SessionId;

/// Opaque reconnection token. CSPRNG-generated, compared in full.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken([u8; 32]);

impl SessionToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn try_from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Some(Self(bytes))
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::generate()
    }
}

/// An active (or grace-period) session.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub token: SessionToken,
    pub display_name: String,
    /// Room this session last occupied, for resume routing.
    pub room_id: Option<uuid::Uuid>,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl Session {
    pub fn new(session_id: SessionId, display_name: String) -> Self {
        let now = Instant::now();
        Self {
            session_id,
            token: SessionToken::generate(),
            display_name,
            room_id: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Token-indexed registry used to resolve resume tokens back to sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    by_token: HashMap<SessionToken, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session and hand back its resume token.
    pub fn register(&mut self, session_id: SessionId, display_name: String) -> SessionToken {
        let session = Session::new(session_id, display_name);
        let token = session.token.clone();
        self.by_token.insert(token.clone(), session);
        token
    }

    /// Resolve a presented token to the session it was minted for.
    pub fn resolve(&mut self, token: &SessionToken) -> Option<&mut Session> {
        self.by_token.get_mut(token)
    }

    pub fn remove(&mut self, token: &SessionToken) -> Option<Session> {
        self.by_token.remove(token)
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}
