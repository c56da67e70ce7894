//! Per-session verification state.
//!
//! Each session keeps its resume point as opaque bincode bytes, exactly as
//! it would sit in a database row. A session sits behind its own async lock
//! so that submissions for one session verify strictly in order while other
//! sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use sim_core::config::SimConfig;
use sim_core::segment::VerifierSession;

use crate::error::{Result, ServerError};

/// Stored state of one session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Session seed.
    pub seed: u32,
    /// `VerifierSession` as bincode.
    pub resume: Vec<u8>,
    /// Segments accepted so far.
    pub segments_accepted: u32,
    /// Segments rejected so far.
    pub segments_rejected: u32,
}

impl SessionRecord {
    /// Fresh record at tick 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the loadout is invalid.
    pub fn open(seed: u32, config: &SimConfig) -> Result<Self> {
        let session = VerifierSession::new(seed, config)?;
        Ok(Self {
            seed,
            resume: session.to_bytes()?,
            segments_accepted: 0,
            segments_rejected: 0,
        })
    }

    /// Decode the resume point.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes are corrupt.
    pub fn session(&self) -> Result<VerifierSession> {
        Ok(VerifierSession::from_bytes(&self.resume)?)
    }

    /// Replace the resume point after an accepted segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be encoded.
    pub fn accept(&mut self, session: &VerifierSession) -> Result<()> {
        self.resume = session.to_bytes()?;
        self.segments_accepted += 1;
        Ok(())
    }

    /// Count a rejected segment. The resume point is left untouched.
    pub fn reject(&mut self) {
        self.segments_rejected += 1;
    }
}

/// Handle to one session's record.
pub type SessionHandle = Arc<tokio::sync::Mutex<SessionRecord>>;

/// All open sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::SessionExists`] if the id is taken, or an
    /// engine error for an invalid loadout.
    pub fn open(&self, session_id: &str, seed: u32, config: &SimConfig) -> Result<()> {
        let record = SessionRecord::open(seed, config)?;
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(session_id) {
            return Err(ServerError::SessionExists(session_id.to_string()));
        }
        sessions.insert(
            session_id.to_string(),
            Arc::new(tokio::sync::Mutex::new(record)),
        );
        Ok(())
    }

    /// Handle to a session.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UnknownSession`] if it is not open.
    pub fn get(&self, session_id: &str) -> Result<SessionHandle> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or_else(|| ServerError::UnknownSession(session_id.to_string()))
    }

    /// Remove a session, returning its handle.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UnknownSession`] if it is not open.
    pub fn close(&self, session_id: &str) -> Result<SessionHandle> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .ok_or_else(|| ServerError::UnknownSession(session_id.to_string()))
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
