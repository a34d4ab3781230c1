//! Session ledger: balance, identity and the one-way cash-out transition.
//!
//! Every transition borrows the current state and hands back a new one, so a
//! store can run it inside whatever critical section it owns and only commit
//! on success. A rejected transition never produces a partially updated session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{self, EngineParams, SpinOutcome},
    error::{LedgerError, Result},
    rng::RandomSource,
    token::SessionToken,
};

pub const STARTING_CREDITS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    CashedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: SessionToken,
    credits: u64,
    cashed_out: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashOutReceipt {
    pub credits_cashed: u64,
}

impl Session {
    pub fn create() -> Self {
        Self::with_credits(STARTING_CREDITS)
    }

    /// Fresh active session holding `credits`.
    pub fn with_credits(credits: u64) -> Self {
        let now = Utc::now();
        Self {
            token: SessionToken::generate(),
            credits,
            cashed_out: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a session from storage.
    pub fn restore(
        token: SessionToken,
        credits: u64,
        cashed_out: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            credits,
            cashed_out,
            created_at,
            updated_at,
        }
    }

    /// Same session under a new token, for retrying after a collision.
    pub fn with_fresh_token(mut self) -> Self {
        self.token = SessionToken::generate();
        self
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn credits(&self) -> u64 {
        self.credits
    }

    pub fn cashed_out(&self) -> bool {
        self.cashed_out
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn state(&self) -> SessionState {
        if self.cashed_out {
            SessionState::CashedOut
        } else {
            SessionState::Active
        }
    }

    pub fn can_play(&self) -> bool {
        !self.cashed_out && self.credits >= 1
    }

    /// Like [`Session::can_play`] but says why not.
    pub fn ensure_can_play(&self) -> Result<()> {
        if self.cashed_out {
            return Err(LedgerError::AlreadyCashedOut);
        }
        if self.credits < 1 {
            return Err(LedgerError::InsufficientCredits);
        }
        Ok(())
    }

    pub fn apply_spin(&self, outcome: &SpinOutcome) -> Result<Session> {
        self.ensure_can_play()?;
        let credits = self
            .credits
            .checked_add_signed(outcome.credit_delta)
            .ok_or(LedgerError::NegativeBalance {
                credits: self.credits,
                delta: outcome.credit_delta,
            })?;
        Ok(Session {
            credits,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    /// Freezes the balance. The stored credits stay as they are: they are what
    /// the player is owed.
    pub fn cash_out(&self) -> Result<(Session, CashOutReceipt)> {
        if self.cashed_out {
            return Err(LedgerError::AlreadyCashedOut);
        }
        let next = Session {
            cashed_out: true,
            updated_at: Utc::now(),
            ..self.clone()
        };
        let receipt = CashOutReceipt {
            credits_cashed: self.credits,
        };
        Ok((next, receipt))
    }
}

/// Gate, spin and commit in one step. Ineligible sessions are turned away
/// before any symbols are drawn.
pub fn play(
    session: &Session,
    params: &EngineParams,
    rng: &mut impl RandomSource,
) -> Result<(Session, SpinOutcome)> {
    session.ensure_can_play()?;
    let outcome = engine::spin(session.credits(), params, rng);
    let next = session.apply_spin(&outcome)?;
    Ok((next, outcome))
}
