pub mod config;
pub mod routes;
pub mod store;

pub use crate::config::ServerConfig;
pub use crate::routes::{router, AppState, HttpError, RngFactory};
pub use crate::store::{MemoryStore, SessionStore, SqliteStore, StoreError};
