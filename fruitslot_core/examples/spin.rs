use fruitslot_core::{play, EngineParams, SeededRng, Session};

fn main() {
    // Example session: spin five times, then cash out
    let mut rng = SeededRng::new("example-server-seed", "example-client-seed", 1);
    let params = EngineParams::default();
    let mut session = Session::create();
    for _ in 0..5 {
        match play(&session, &params, &mut rng) {
            Ok((next, outcome)) => {
                println!(
                    "symbols={:?} win={} reward={} credits={}",
                    outcome.symbols,
                    outcome.is_win,
                    outcome.reward,
                    next.credits()
                );
                session = next;
            }
            Err(e) => {
                println!("stopped: {e}");
                break;
            }
        }
    }
    match session.cash_out() {
        Ok((_, receipt)) => println!("cashed out {} credits", receipt.credits_cashed),
        Err(e) => println!("cash out failed: {e}"),
    }
}
