//! # Tradelog Database Crate
//!
//! This crate is the application's record store: trades, narratives,
//! watchlist items and journal pages, kept in a single embedded SQLite file.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** all SQL and row mapping lives here. The rest of the
//!   application sees `core-types` records and a `DbRepository`.
//! - **Explicit handle:** the repository is constructed once by the caller and
//!   passed where it is needed; there is no global connection.
//! - **Embedded migrations:** the schema ships inside the binary and is applied
//!   on startup with `run_migrations`.
//!
//! ## Public API
//!
//! - `connect` / `connect_in_memory`: open a connection pool.
//! - `run_migrations`: bring the schema up to date.
//! - `DbRepository`: the data access methods.
//! - `TradeFilter`: filters for listing trades.
//! - `DbError`: the errors returned from this crate.

pub mod connection;
pub mod error;
pub mod repository;

pub use connection::{connect, connect_in_memory, run_migrations};
pub use error::DbError;
pub use repository::{DbRepository, TradeFilter};
