//! letterchain-server - HTTP boundary for the LetterChain game
//!
//! Wires the pure rule engine from `letterchain-core` to the outside
//! world: axum handlers, SQLite-backed stores implementing the core
//! traits, TOML configuration, and the binary entry point.

pub mod client_ip;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod store;

pub use config::ServerConfig;
pub use error::ApiError;
pub use handlers::router;
pub use state::AppState;
