use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use fruitslot_core::{
    play, CashOutReceipt, EngineParams, RandomSource, Session, SessionToken, SpinOutcome,
};
use fruitslot_shared::SpinLogEntry;
use parking_lot::{Mutex, RwLock};

use super::{log_entry, Result, SessionStore, StoreError};

/// Process-local store. Each session sits behind its own async mutex, the map
/// lock is only held long enough to find it.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionToken, Arc<tokio::sync::Mutex<Session>>>>,
    spins: Mutex<Vec<SpinLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, token: &SessionToken) -> Result<Arc<tokio::sync::Mutex<Session>>> {
        self.sessions
            .read()
            .get(token)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn record(&self, session: &Session, outcome: &SpinOutcome) {
        let mut spins = self.spins.lock();
        let id = spins.len() as i64 + 1;
        spins.push(log_entry(id, session, outcome));
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(session.token()) {
            return Err(StoreError::TokenTaken);
        }
        sessions.insert(
            session.token().clone(),
            Arc::new(tokio::sync::Mutex::new(session.clone())),
        );
        Ok(())
    }

    async fn get(&self, token: &SessionToken) -> Result<Option<Session>> {
        let slot = match self.slot(token) {
            Ok(slot) => slot,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let session = slot.lock().await.clone();
        Ok(Some(session))
    }

    async fn spin(
        &self,
        token: &SessionToken,
        params: &EngineParams,
        mut rng: &mut (dyn RandomSource + Send),
    ) -> Result<(Session, SpinOutcome)> {
        let slot = self.slot(token)?;
        let mut current = slot.lock().await;
        let (next, outcome) = play(&current, params, &mut rng)?;
        *current = next.clone();
        self.record(&next, &outcome);
        Ok((next, outcome))
    }

    async fn cash_out(&self, token: &SessionToken) -> Result<(Session, CashOutReceipt)> {
        let slot = self.slot(token)?;
        let mut current = slot.lock().await;
        let (next, receipt) = current.cash_out()?;
        *current = next.clone();
        Ok((next, receipt))
    }

    async fn recent_spins(&self, limit: usize) -> Result<Vec<SpinLogEntry>> {
        let spins = self.spins.lock();
        Ok(spins.iter().rev().take(limit).cloned().collect())
    }
}
