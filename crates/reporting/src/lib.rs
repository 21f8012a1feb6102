//! # Tradelog Reporting
//!
//! Turns records and statistics into something a person reads: terminal
//! tables for the CLI and a self-contained HTML dashboard.
//!
//! Rendering functions are pure and return `String`s. The only I/O in this
//! crate is `write_dashboard`.

pub mod error;
pub mod format;
pub mod html;
pub mod tables;

pub use error::ReportError;
pub use html::{DashboardData, render_dashboard, write_dashboard};
pub use tables::{
    groups_table, journal_table, journal_view, narratives_table, streaks_table, summary_table,
    trade_detail, trades_table, watchlist_table,
};
