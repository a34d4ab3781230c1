use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Rejections raised by session transitions. None of these are faults: the
/// caller gets a definitive answer for that call and the session is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("session has been cashed out")]
    AlreadyCashedOut,
    #[error("insufficient credits")]
    InsufficientCredits,
    #[error("balance would go negative: {credits} credits, delta {delta}")]
    NegativeBalance { credits: u64, delta: i64 },
    #[error("session token collided {attempts} times")]
    DuplicateToken { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("reroll probability {probability} at balance {min_balance} is outside [0, 1]")]
    InvalidRerollTier { min_balance: u64, probability: f64 },
    #[error("reroll tiers share a threshold")]
    DuplicateThreshold,
}
