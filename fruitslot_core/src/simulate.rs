use serde::{Deserialize, Serialize};

use crate::{
    engine::{EngineParams, SPIN_COST},
    ledger::{play, Session},
    rng::RandomSource,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub spins: u64,
    pub wins: u64,
    pub rerolls: u64,
    pub total_wagered: u64,
    pub total_paid: u64,
    pub final_balance: u64,
}

impl SimulationReport {
    /// Return to player: paid out per credit wagered.
    pub fn rtp(&self) -> f64 {
        if self.total_wagered == 0 {
            0.0
        } else {
            self.total_paid as f64 / self.total_wagered as f64
        }
    }

    pub fn merge(&mut self, other: &SimulationReport) {
        self.spins += other.spins;
        self.wins += other.wins;
        self.rerolls += other.rerolls;
        self.total_wagered += other.total_wagered;
        self.total_paid += other.total_paid;
        self.final_balance += other.final_balance;
    }
}

/// Plays one session from `start_balance` through the ledger until it can no
/// longer play or `max_spins` is reached.
pub fn simulate(
    start_balance: u64,
    max_spins: u64,
    params: &EngineParams,
    rng: &mut impl RandomSource,
) -> SimulationReport {
    let mut session = Session::with_credits(start_balance);
    let mut report = SimulationReport::default();
    while report.spins < max_spins {
        let Ok((next, outcome)) = play(&session, params, rng) else {
            break;
        };
        report.spins += 1;
        report.total_wagered += SPIN_COST as u64;
        report.total_paid += u64::from(outcome.reward);
        report.wins += u64::from(outcome.is_win);
        report.rerolls += u64::from(outcome.rerolled);
        session = next;
    }
    report.final_balance = session.credits();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        paytable::RerollPolicy,
        rng::{EntropyRng, ScriptedRng},
    };

    #[test]
    fn losing_streak_stops_at_zero() {
        let mut rng = ScriptedRng::new([0.1, 0.3, 0.6]).unwrap();
        let report = simulate(10, 1_000, &EngineParams::default(), &mut rng);
        assert_eq!(report.spins, 10);
        assert_eq!(report.wins, 0);
        assert_eq!(report.final_balance, 0);
        assert_eq!(report.rtp(), 0.0);
    }

    #[test]
    fn spin_cap_is_respected() {
        let mut rng = ScriptedRng::new([0.9]).unwrap();
        let report = simulate(10, 3, &EngineParams::default(), &mut rng);
        assert_eq!(report.spins, 3);
        assert_eq!(report.wins, 3);
        assert_eq!(report.final_balance, 10 + 3 * 39);
    }

    #[test]
    fn balance_accounting_matches() {
        let mut rng = EntropyRng::seeded(7);
        let report = simulate(10, 5_000, &EngineParams::default(), &mut rng);
        assert_eq!(
            report.final_balance + report.total_wagered,
            10 + report.total_paid
        );
    }

    #[test]
    fn honest_policy_has_no_rerolls() {
        let params = EngineParams {
            reroll: RerollPolicy::honest(),
            ..EngineParams::default()
        };
        let mut rng = EntropyRng::seeded(3);
        let report = simulate(100, 2_000, &params, &mut rng);
        assert_eq!(report.rerolls, 0);
    }
}
