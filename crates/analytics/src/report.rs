use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Rounds a value for output: 2 decimal places, midpoint away from zero.
///
/// Only applied when a result struct is built; sums stay at full precision.
pub fn round_output(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Gross winnings over gross losses.
///
/// With winnings and no losses the ratio is unbounded, which is kept as a
/// distinct variant instead of a large number so renderers can show "∞".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    Finite(Decimal),
    Infinite,
}

impl ProfitFactor {
    pub fn is_infinite(&self) -> bool {
        matches!(self, ProfitFactor::Infinite)
    }
}

impl Default for ProfitFactor {
    fn default() -> Self {
        ProfitFactor::Finite(Decimal::ZERO)
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Finite(value) => write!(f, "{:.2}", value),
            ProfitFactor::Infinite => f.write_str("∞"),
        }
    }
}

/// A pointer back to a specific trade, used for best/worst results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRef {
    pub id: Uuid,
    pub ticker: String,
    pub pnl: Decimal,
}

/// Aggregate performance over a set of closed trades.
///
/// This is the output of `StatsEngine::compute_summary` and the main data
/// transfer object consumed by the reporting layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub scratches: usize,
    pub win_rate: Decimal,

    pub total_pnl: Decimal,
    pub gross_profit: Decimal,
    /// Positive magnitude of the summed losses.
    pub gross_loss: Decimal,
    pub avg_winner: Decimal,
    /// Positive magnitude.
    pub avg_loser: Decimal,
    pub profit_factor: ProfitFactor,

    pub best_trade: Option<TradeRef>,
    pub worst_trade: Option<TradeRef>,

    #[serde(with = "humantime_serde")]
    pub avg_holding_period: Option<Duration>,
}

/// Win-rate and P&L figures for one bucket of a breakdown (a setup tag or a weekday).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub label: String,
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub scratches: usize,
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
    pub avg_winner: Decimal,
    pub avg_loser: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    Win,
    Loss,
    Scratch,
    None,
}

impl StreakKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakKind::Win => "win",
            StreakKind::Loss => "loss",
            StreakKind::Scratch => "scratch",
            StreakKind::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStreak {
    pub kind: StreakKind,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    pub current: CurrentStreak,
    pub best_win_streak: usize,
    pub worst_loss_streak: usize,
}

/// One day on the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub daily_pnl: Decimal,
    pub cumulative_pnl: Decimal,
    pub trade_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_output(dec!(2.345)), dec!(2.35));
        assert_eq!(round_output(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round_output(dec!(2.344)), dec!(2.34));
    }

    #[test]
    fn infinite_profit_factor_displays_as_symbol() {
        assert_eq!(ProfitFactor::Infinite.to_string(), "∞");
        assert_eq!(ProfitFactor::Finite(dec!(3)).to_string(), "3.00");
        assert_eq!(ProfitFactor::default(), ProfitFactor::Finite(Decimal::ZERO));
    }
}
