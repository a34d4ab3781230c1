use chrono::{DateTime, Utc};
use fruitslot_core::{Session, SessionToken, SpinOutcome, Symbol};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionResponse {
    pub session_token: SessionToken,
    pub credits: u64,
    pub cashed_out: bool,
}

impl From<&Session> for SessionResponse {
    fn from(s: &Session) -> Self {
        Self {
            session_token: s.token().clone(),
            credits: s.credits(),
            cashed_out: s.cashed_out(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RollResponse {
    pub result: Vec<Symbol>,
    pub win: bool,
    pub reward: u32,
    pub credits: u64, // balance after the spin
}

impl RollResponse {
    pub fn new(outcome: &SpinOutcome, credits: u64) -> Self {
        Self {
            result: outcome.symbols.to_vec(),
            win: outcome.is_win,
            reward: outcome.reward,
            credits,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CashOutResponse {
    pub message: String,
    pub credits_cashed: u64,
    pub session_token: SessionToken,
}

impl CashOutResponse {
    pub fn new(credits_cashed: u64, session_token: SessionToken) -> Self {
        Self {
            message: "Successfully cashed out".to_string(),
            credits_cashed,
            session_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinLogEntry {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub session_token: SessionToken,
    pub result: Vec<Symbol>,
    pub win: bool,
    pub reward: u32,
    pub rerolled: bool,
    pub credits_after: u64,
}

/// Failures the API reports to clients. The display text is the `error` field
/// of the JSON body.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Session not found")]
    NotFound,
    #[error("Session has been cashed out")]
    CashedOut,
    #[error("Insufficient credits")]
    InsufficientCredits,
    #[error("Session already cashed out")]
    AlreadyCashedOut,
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}
