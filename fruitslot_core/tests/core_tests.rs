use fruitslot_core::{
    play, simulate, spin, EngineParams, EntropyRng, LedgerError, RandomSource, ScriptedRng,
    SeededRng, Session, Symbol,
};

/// Fraction of first-draw wins that the house threw away at `balance`.
fn discard_rate(balance: u64, trials: usize, seed: u64) -> f64 {
    let params = EngineParams::default();
    let mut rng = EntropyRng::seeded(seed);
    let mut first_wins = 0u64;
    let mut discarded = 0u64;
    for _ in 0..trials {
        let out = spin(balance, &params, &mut rng);
        if out.rerolled {
            discarded += 1;
            first_wins += 1;
        } else if out.is_win {
            first_wins += 1;
        }
    }
    assert!(first_wins > 1_000, "too few wins to judge: {first_wins}");
    discarded as f64 / first_wins as f64
}

#[test]
fn seeded_rng_repeatable() {
    let mut rng1 = SeededRng::new("s", "c", 42);
    let mut rng2 = SeededRng::new("s", "c", 42);
    let a: Vec<f64> = (0..10).map(|_| rng1.next_unit()).collect();
    let b: Vec<f64> = (0..10).map(|_| rng2.next_unit()).collect();
    assert_eq!(a, b);
}

#[test]
fn symbols_come_from_alphabet() {
    let params = EngineParams::default();
    let mut rng = SeededRng::new("server", "client", 7);
    for _ in 0..500 {
        let out = spin(10, &params, &mut rng);
        assert_eq!(out.symbols.len(), 3);
        assert!(out.symbols.iter().all(|s| Symbol::ALL.contains(s)));
    }
}

#[test]
fn no_discards_below_forty() {
    assert_eq!(discard_rate(39, 50_000, 1), 0.0);
}

#[test]
fn about_thirty_percent_discarded_between_forty_and_sixty() {
    let rate = discard_rate(50, 200_000, 2);
    assert!((rate - 0.30).abs() < 0.03, "rate {rate}");
}

#[test]
fn about_sixty_percent_discarded_above_sixty() {
    let rate = discard_rate(61, 200_000, 3);
    assert!((rate - 0.60).abs() < 0.03, "rate {rate}");
}

#[test]
fn win_rate_is_one_in_sixteen_when_honest() {
    let params = EngineParams::default();
    let mut rng = EntropyRng::seeded(4);
    let trials = 160_000;
    let wins = (0..trials)
        .filter(|_| spin(0, &params, &mut rng).is_win)
        .count();
    let rate = wins as f64 / trials as f64;
    assert!((rate - 1.0 / 16.0).abs() < 0.005, "rate {rate}");
}

#[test]
fn balance_never_negative_across_sessions() {
    let params = EngineParams::default();
    let mut rng = EntropyRng::seeded(5);
    for _ in 0..200 {
        let mut session = Session::create();
        for _ in 0..2_000 {
            match play(&session, &params, &mut rng) {
                Ok((next, out)) => {
                    let expected = session.credits() as i64 + out.credit_delta;
                    assert_eq!(next.credits() as i64, expected);
                    session = next;
                }
                Err(e) => {
                    assert_eq!(e, LedgerError::InsufficientCredits);
                    assert_eq!(session.credits(), 0);
                    break;
                }
            }
        }
    }
}

#[test]
fn full_session_walkthrough() {
    let params = EngineParams::default();
    let session = Session::create();
    assert_eq!(session.credits(), 10);
    assert!(!session.cashed_out());

    let mut lose = ScriptedRng::new([0.1, 0.3, 0.6]).unwrap();
    let (session, out) = play(&session, &params, &mut lose).unwrap();
    assert!(!out.is_win);
    assert_eq!(session.credits(), 9);

    let (session, receipt) = session.cash_out().unwrap();
    assert_eq!(receipt.credits_cashed, 9);
    assert!(session.cashed_out());

    let mut win = ScriptedRng::new([0.9]).unwrap();
    assert_eq!(
        play(&session, &params, &mut win).unwrap_err(),
        LedgerError::AlreadyCashedOut
    );
    assert_eq!(session.cash_out().unwrap_err(), LedgerError::AlreadyCashedOut);
    assert_eq!(session.credits(), 9);
}

#[test]
fn rtp_simulation_smoke() {
    let params = EngineParams::default();
    let mut rng = SeededRng::new("server", "client", 1);
    let report = simulate(10, 10_000, &params, &mut rng);
    assert!(report.spins > 0);
    let rtp = report.rtp();
    // honest rtp is 25/16; the reroll can only pull it down
    assert!((0.0..=1.6).contains(&rtp), "rtp {rtp}");
}
