use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fruitslot_core::{
    play, symbols::reels_from_codes, symbols::reels_to_codes, CashOutReceipt, EngineParams,
    RandomSource, Session, SessionToken, SpinOutcome,
};
use fruitslot_shared::SpinLogEntry;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::{debug, info};

use super::{KeyedLocks, Result, SessionStore, StoreError};

// DB schema is defined in migrations (see migrations/ folder)

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    session_token: String,
    credits: i64,
    cashed_out: bool,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct SpinRow {
    id: i64,
    ts: String,
    session_token: String,
    result: String,
    win: bool,
    reward: i64,
    rerolled: bool,
    credits_after: i64,
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

fn parse_token(raw: &str) -> Result<SessionToken> {
    SessionToken::from_str(raw).map_err(|_| StoreError::Corrupt(format!("token {raw:?}")))
}

fn to_u64(v: i64, what: &str) -> Result<u64> {
    u64::try_from(v).map_err(|_| StoreError::Corrupt(format!("{what} {v}")))
}

fn to_i64(v: u64) -> Result<i64> {
    i64::try_from(v).map_err(|_| StoreError::Corrupt(format!("credits {v} exceed storage range")))
}

impl TryFrom<SessionRow> for Session {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Session::restore(
            parse_token(&row.session_token)?,
            to_u64(row.credits, "credits")?,
            row.cashed_out,
            parse_ts(&row.created_at)?,
            parse_ts(&row.updated_at)?,
        ))
    }
}

impl TryFrom<SpinRow> for SpinLogEntry {
    type Error = StoreError;

    fn try_from(row: SpinRow) -> Result<Self> {
        let reels = reels_from_codes(&row.result)
            .ok_or_else(|| StoreError::Corrupt(format!("reels {:?}", row.result)))?;
        Ok(SpinLogEntry {
            id: row.id,
            ts: parse_ts(&row.ts)?,
            session_token: parse_token(&row.session_token)?,
            result: reels.to_vec(),
            win: row.win,
            reward: u32::try_from(row.reward)
                .map_err(|_| StoreError::Corrupt(format!("reward {}", row.reward)))?,
            rerolled: row.rerolled,
            credits_after: to_u64(row.credits_after, "credits_after")?,
        })
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
    locks: KeyedLocks,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database. Pinned to one connection that never
    /// expires, since every sqlite connection to `:memory:` is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("session store migrations applied");
        Ok(Self {
            pool,
            locks: KeyedLocks::default(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load(&self, token: &SessionToken) -> Result<Session> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT session_token, credits, cashed_out, created_at, updated_at FROM game_sessions WHERE session_token = ?",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound)?.try_into()
    }

    /// Oldest first, for exports.
    pub async fn all_spins(&self) -> Result<Vec<SpinLogEntry>> {
        let rows = sqlx::query_as::<_, SpinRow>(
            "SELECT id, ts, session_token, result, win, reward, rerolled, credits_after FROM spins ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SpinLogEntry::try_from).collect()
    }

    /// A conditional update matched no row: another writer moved the session
    /// after it was read. Re-reads it so a gate the session no longer passes
    /// is reported as the ledger error rather than a conflict.
    async fn lost_update(
        &self,
        token: &SessionToken,
        gate: fn(&Session) -> fruitslot_core::error::Result<()>,
    ) -> StoreError {
        match self.load(token).await {
            Ok(latest) => match gate(&latest) {
                Err(e) => e.into(),
                Ok(()) => StoreError::Conflict(token.clone()),
            },
            Err(e) => e,
        }
    }
}

fn cash_out_gate(session: &Session) -> fruitslot_core::error::Result<()> {
    session.cash_out().map(|_| ())
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn insert(&self, session: &Session) -> Result<()> {
        let res = sqlx::query(
            "INSERT INTO game_sessions (session_token, credits, cashed_out, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.token().as_str())
        .bind(to_i64(session.credits())?)
        .bind(session.cashed_out())
        .bind(session.created_at().to_rfc3339())
        .bind(session.updated_at().to_rfc3339())
        .execute(&self.pool)
        .await;
        match res {
            Ok(_) => {
                debug!(token = %session.token(), "session created");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::TokenTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, token: &SessionToken) -> Result<Option<Session>> {
        match self.load(token).await {
            Ok(session) => Ok(Some(session)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn spin(
        &self,
        token: &SessionToken,
        params: &EngineParams,
        mut rng: &mut (dyn RandomSource + Send),
    ) -> Result<(Session, SpinOutcome)> {
        let _guard = self.locks.lock(token).await;
        let current = self.load(token).await?;
        let (next, outcome) = play(&current, params, &mut rng)?;

        // The conditional update is the commit point: it only lands if no other
        // process moved the row since it was read.
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE game_sessions SET credits = ?, updated_at = ? WHERE session_token = ? AND credits = ? AND cashed_out = 0",
        )
        .bind(to_i64(next.credits())?)
        .bind(next.updated_at().to_rfc3339())
        .bind(token.as_str())
        .bind(to_i64(current.credits())?)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            drop(tx);
            return Err(self.lost_update(token, Session::ensure_can_play).await);
        }
        sqlx::query(
            "INSERT INTO spins (ts, session_token, result, win, reward, rerolled, credits_after) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(token.as_str())
        .bind(reels_to_codes(&outcome.symbols))
        .bind(outcome.is_win)
        .bind(i64::from(outcome.reward))
        .bind(outcome.rerolled)
        .bind(to_i64(next.credits())?)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok((next, outcome))
    }

    async fn cash_out(&self, token: &SessionToken) -> Result<(Session, CashOutReceipt)> {
        let _guard = self.locks.lock(token).await;
        let current = self.load(token).await?;
        let (next, receipt) = current.cash_out()?;
        let updated = sqlx::query(
            "UPDATE game_sessions SET cashed_out = 1, updated_at = ? WHERE session_token = ? AND cashed_out = 0",
        )
        .bind(next.updated_at().to_rfc3339())
        .bind(token.as_str())
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(self.lost_update(token, cash_out_gate).await);
        }
        Ok((next, receipt))
    }

    async fn recent_spins(&self, limit: usize) -> Result<Vec<SpinLogEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, SpinRow>(
            "SELECT id, ts, session_token, result, win, reward, rerolled, credits_after FROM spins ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SpinLogEntry::try_from).collect()
    }
}
