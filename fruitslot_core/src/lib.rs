pub mod engine;
pub mod error;
pub mod ledger;
pub mod paytable;
pub mod rng;
pub mod simulate;
pub mod symbols;
pub mod token;

pub use crate::engine::{draw_reels, should_reroll, spin, EngineParams, SpinOutcome, SPIN_COST};
pub use crate::error::{ConfigError, LedgerError};
pub use crate::ledger::{play, CashOutReceipt, Session, SessionState, STARTING_CREDITS};
pub use crate::paytable::{Paytable, PaytableEntry, RerollPolicy, RerollTier};
pub use crate::rng::{derive_hash_hex, EntropyRng, RandomSource, ScriptedRng, SeededRng};
pub use crate::simulate::{simulate, SimulationReport};
pub use crate::symbols::{is_winning, Reels, Symbol};
pub use crate::token::{MalformedToken, SessionToken};
