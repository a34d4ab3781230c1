use serde::{Deserialize, Serialize};

use crate::{
    paytable::{Paytable, RerollPolicy},
    rng::RandomSource,
    symbols::{is_winning, Reels, Symbol},
};

/// Credits consumed by one spin.
pub const SPIN_COST: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineParams {
    pub paytable: Paytable,
    pub reroll: RerollPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub symbols: Reels,
    pub is_win: bool,
    pub reward: u32,
    pub credit_delta: i64,
    /// A winning first draw was discarded by the house reroll.
    pub rerolled: bool,
}

impl SpinOutcome {
    fn settle(symbols: Reels, rerolled: bool, paytable: &Paytable) -> Self {
        let is_win = is_winning(&symbols);
        let reward = if is_win {
            paytable.reward_for(symbols[0])
        } else {
            0
        };
        Self {
            symbols,
            is_win,
            reward,
            credit_delta: i64::from(reward) - SPIN_COST,
            rerolled,
        }
    }
}

pub fn draw_reels(rng: &mut impl RandomSource) -> Reels {
    [
        Symbol::from_unit(rng.next_unit()),
        Symbol::from_unit(rng.next_unit()),
        Symbol::from_unit(rng.next_unit()),
    ]
}

/// Decides whether a winning first draw gets thrown away. Consumes one value
/// from `rng` regardless of the tier so draw sequences stay aligned.
pub fn should_reroll(balance: u64, policy: &RerollPolicy, rng: &mut impl RandomSource) -> bool {
    let p = policy.probability_for(balance);
    rng.next_unit() < p
}

/// One spin at the given pre-spin balance. Eligibility is the caller's job: the
/// engine always spins and never touches a balance, it only reports the delta.
///
/// A winning draw may be redrawn once under the reroll policy. Whatever the
/// redraw produces is final, a second win included.
pub fn spin(balance: u64, params: &EngineParams, rng: &mut impl RandomSource) -> SpinOutcome {
    let first = draw_reels(rng);
    if is_winning(&first) && should_reroll(balance, &params.reroll, rng) {
        let second = draw_reels(rng);
        return SpinOutcome::settle(second, true, &params.paytable);
    }
    SpinOutcome::settle(first, false, &params.paytable)
}
