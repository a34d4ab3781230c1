//! Session persistence behind the ledger.
//!
//! Each store serializes `spin` and `cash_out` per session token: the load,
//! the ledger transition and the write-back happen while holding that
//! session's lock, so two concurrent spins can never both pass the gate on
//! the same balance. Different sessions never wait on each other.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use fruitslot_core::{
    CashOutReceipt, EngineParams, LedgerError, RandomSource, Session, SessionToken, SpinOutcome,
};
use fruitslot_shared::SpinLogEntry;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::warn;

/// Attempts at finding an unused token before giving up on a create.
pub const MAX_TOKEN_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found")]
    NotFound,
    #[error("session token already in use")]
    TokenTaken,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("session {0} changed underneath the update")]
    Conflict(SessionToken),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a brand new session. Fails with [`StoreError::TokenTaken`] if the
    /// token already exists.
    async fn insert(&self, session: &Session) -> Result<()>;

    async fn get(&self, token: &SessionToken) -> Result<Option<Session>>;

    /// Gate, spin and commit atomically for one session. The spin is recorded
    /// in the audit log alongside the new balance.
    async fn spin(
        &self,
        token: &SessionToken,
        params: &EngineParams,
        rng: &mut (dyn RandomSource + Send),
    ) -> Result<(Session, SpinOutcome)>;

    async fn cash_out(&self, token: &SessionToken) -> Result<(Session, CashOutReceipt)>;

    /// Newest first.
    async fn recent_spins(&self, limit: usize) -> Result<Vec<SpinLogEntry>>;

    /// Opens a session with the starting balance, regenerating the token on
    /// collision.
    async fn create(&self) -> Result<Session> {
        let mut session = Session::create();
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            match self.insert(&session).await {
                Ok(()) => return Ok(session),
                Err(StoreError::TokenTaken) => {
                    warn!(attempt, "session token collision, regenerating");
                    session = session.with_fresh_token();
                }
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::DuplicateToken {
            attempts: MAX_TOKEN_ATTEMPTS,
        }
        .into())
    }
}

pub(crate) fn log_entry(id: i64, session: &Session, outcome: &SpinOutcome) -> SpinLogEntry {
    SpinLogEntry {
        id,
        ts: Utc::now(),
        session_token: session.token().clone(),
        result: outcome.symbols.to_vec(),
        win: outcome.is_win,
        reward: outcome.reward,
        rerolled: outcome.rerolled,
        credits_after: session.credits(),
    }
}

/// One async mutex per session token. An entry exists only while some task
/// holds or waits on it, so tokens that name no session leave nothing behind.
#[derive(Default)]
pub(crate) struct KeyedLocks {
    inner: Mutex<HashMap<SessionToken, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) async fn lock(&self, token: &SessionToken) -> KeyedGuard<'_> {
        let slot = {
            let mut map = self.inner.lock();
            map.entry(token.clone()).or_default().clone()
        };
        KeyedGuard {
            locks: self,
            token: token.clone(),
            guard: Some(slot.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Held for the duration of one session operation.
pub(crate) struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    token: SessionToken,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        // release first so the map holds the last reference when nobody waits
        self.guard.take();
        let mut map = self.locks.inner.lock();
        if map
            .get(&self.token)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            map.remove(&self.token);
        }
    }
}
