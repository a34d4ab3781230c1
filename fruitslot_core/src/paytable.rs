use crate::{error::ConfigError, symbols::Symbol};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaytableEntry {
    pub symbol: Symbol,
    pub reward: u32, // gross credits for three of a kind
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paytable(pub Vec<PaytableEntry>);

impl Paytable {
    pub fn standard() -> Self {
        Self(vec![
            PaytableEntry {
                symbol: Symbol::Cherry,
                reward: 10,
            },
            PaytableEntry {
                symbol: Symbol::Lemon,
                reward: 20,
            },
            PaytableEntry {
                symbol: Symbol::Orange,
                reward: 30,
            },
            PaytableEntry {
                symbol: Symbol::Watermelon,
                reward: 40,
            },
        ])
    }

    pub fn reward_for(&self, symbol: Symbol) -> u32 {
        self.0
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| e.reward)
            .unwrap_or(0)
    }
}

impl Default for Paytable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Reroll probability applying from `min_balance` upward, until the next tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerollTier {
    pub min_balance: u64,
    pub probability: f64,
}

/// Threshold table mapping a pre-spin balance to the chance that a winning
/// draw is thrown away and drawn again. Tiers are kept sorted by `min_balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerollPolicy {
    tiers: Vec<RerollTier>,
}

impl RerollPolicy {
    pub const MEDIUM_THRESHOLD: u64 = 40;
    pub const HIGH_THRESHOLD: u64 = 60;
    pub const MEDIUM_CHANCE: f64 = 0.30;
    pub const HIGH_CHANCE: f64 = 0.60;

    pub fn new(mut tiers: Vec<RerollTier>) -> Result<Self, ConfigError> {
        for tier in &tiers {
            if !(0.0..=1.0).contains(&tier.probability) {
                return Err(ConfigError::InvalidRerollTier {
                    min_balance: tier.min_balance,
                    probability: tier.probability,
                });
            }
        }
        tiers.sort_by_key(|t| t.min_balance);
        if tiers.windows(2).any(|w| w[0].min_balance == w[1].min_balance) {
            return Err(ConfigError::DuplicateThreshold);
        }
        Ok(Self { tiers })
    }

    /// 0% below 40, 30% from 40 through 60, 60% above 60.
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                RerollTier {
                    min_balance: 0,
                    probability: 0.0,
                },
                RerollTier {
                    min_balance: Self::MEDIUM_THRESHOLD,
                    probability: Self::MEDIUM_CHANCE,
                },
                RerollTier {
                    min_balance: Self::HIGH_THRESHOLD + 1,
                    probability: Self::HIGH_CHANCE,
                },
            ],
        }
    }

    /// Never rerolls.
    pub fn honest() -> Self {
        Self { tiers: Vec::new() }
    }

    pub fn tiers(&self) -> &[RerollTier] {
        &self.tiers
    }

    pub fn probability_for(&self, balance: u64) -> f64 {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_balance <= balance)
            .map(|t| t.probability)
            .unwrap_or(0.0)
    }
}

impl Default for RerollPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
