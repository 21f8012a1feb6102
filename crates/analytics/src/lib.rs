//! # Tradelog Analytics Engine
//!
//! Performance statistics over a trader's closed trades: win rate, profit
//! factor, per-setup and per-weekday breakdowns, streaks and the equity curve.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** This crate has no knowledge of the database or the CLI.
//!   It depends only on `core-types`.
//! - **Stateless calculation:** `StatsEngine` holds no data. It takes a slice
//!   of trades and returns an owned report, which makes it safe to call
//!   repeatedly and easy to test.
//! - **Round at the edge:** sums are carried at full `Decimal` precision and
//!   rounded to cents (half away from zero) only when a report is built.
//!
//! ## Public API
//!
//! - `StatsEngine`: the calculation entry points.
//! - `Summary`, `GroupSummary`, `Streaks`, `EquityPoint`: the report types.
//! - `ProfitFactor`: finite ratio or the infinite sentinel.
//! - `AnalyticsError`: precondition violations on the input.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::StatsEngine;
pub use error::AnalyticsError;
pub use report::{
    CurrentStreak, EquityPoint, GroupSummary, ProfitFactor, StreakKind, Streaks, Summary,
    TradeRef, round_output,
};
