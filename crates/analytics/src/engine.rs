use crate::error::AnalyticsError;
use crate::report::{
    CurrentStreak, EquityPoint, GroupSummary, ProfitFactor, StreakKind, Streaks, Summary,
    TradeRef, round_output,
};
use chrono::{Datelike, NaiveDate, Weekday};
use core_types::Trade;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// A stateless calculator for deriving performance metrics from closed trades.
///
/// Every operation borrows its input and returns an owned result; nothing is
/// cached between calls, so repeated calls on the same slice give identical
/// output. Callers filter the trades (closed only, paper flag, ticker, date
/// window) before handing them in.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatsEngine {}

impl StatsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the headline summary: counts, win rate, P&L totals and
    /// averages, profit factor, best/worst trade and average holding period.
    pub fn compute_summary(&self, trades: &[Trade]) -> Result<Summary, AnalyticsError> {
        let mut tally = Tally::default();
        let mut best: Option<(&Trade, Decimal)> = None;
        let mut worst: Option<(&Trade, Decimal)> = None;
        let mut held_secs: i64 = 0;
        let mut held_count: i64 = 0;

        for trade in trades {
            let pnl = realized_pnl(trade)?;
            tally.add(pnl);

            // Strict comparisons keep the first trade on ties.
            if best.is_none_or(|(_, b)| pnl > b) {
                best = Some((trade, pnl));
            }
            if worst.is_none_or(|(_, w)| pnl < w) {
                worst = Some((trade, pnl));
            }
            if let Some(exit) = trade.exit_time {
                held_secs += (exit - trade.entry_time).num_seconds().max(0);
                held_count += 1;
            }
        }

        let profit_factor = if tally.gross_loss < Decimal::ZERO {
            ProfitFactor::Finite(round_output(tally.gross_profit / tally.gross_loss.abs()))
        } else if tally.gross_profit > Decimal::ZERO {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Finite(Decimal::ZERO)
        };

        let avg_holding_period = (held_count > 0)
            .then(|| Duration::from_secs((held_secs / held_count) as u64));

        Ok(Summary {
            total_trades: tally.count,
            winners: tally.winners,
            losers: tally.losers,
            scratches: tally.scratches,
            win_rate: tally.win_rate(),
            total_pnl: round_output(tally.total()),
            gross_profit: round_output(tally.gross_profit),
            gross_loss: round_output(tally.gross_loss.abs()),
            avg_winner: tally.avg_winner(),
            avg_loser: tally.avg_loser(),
            profit_factor,
            best_trade: best.map(|(t, pnl)| trade_ref(t, pnl)),
            worst_trade: worst.map(|(t, pnl)| trade_ref(t, pnl)),
            avg_holding_period,
        })
    }

    /// Breaks results down by setup tag. Untagged trades land in "other".
    ///
    /// Groups are ordered by descending total P&L. The sort is stable, so
    /// groups with equal totals keep the order in which their tag was first
    /// seen in the input.
    pub fn group_by_setup(&self, trades: &[Trade]) -> Result<Vec<GroupSummary>, AnalyticsError> {
        let mut index: HashMap<&'static str, usize> = HashMap::new();
        let mut buckets: Vec<(&'static str, Tally)> = Vec::new();

        for trade in trades {
            let pnl = realized_pnl(trade)?;
            let label = trade.setup_label();
            let slot = *index.entry(label).or_insert_with(|| {
                buckets.push((label, Tally::default()));
                buckets.len() - 1
            });
            buckets[slot].1.add(pnl);
        }

        let mut groups: Vec<GroupSummary> = buckets
            .into_iter()
            .map(|(label, tally)| tally.into_group(label))
            .collect();
        groups.sort_by(|a, b| b.total_pnl.cmp(&a.total_pnl));
        Ok(groups)
    }

    /// Breaks results down by the weekday of entry, Monday through Friday.
    ///
    /// Trades entered on a weekend are dropped. Only weekdays that have at
    /// least one trade are returned, in calendar order.
    pub fn group_by_weekday(&self, trades: &[Trade]) -> Result<Vec<GroupSummary>, AnalyticsError> {
        const WEEKDAYS: [Weekday; 5] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ];
        let mut tallies: [Tally; 5] = Default::default();
        let mut dropped = 0usize;

        for trade in trades {
            let pnl = realized_pnl(trade)?;
            match trade.entry_time.weekday() {
                Weekday::Sat | Weekday::Sun => dropped += 1,
                day => tallies[day.num_days_from_monday() as usize].add(pnl),
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Ignoring weekend-dated trades in weekday breakdown.");
        }

        Ok(WEEKDAYS
            .iter()
            .zip(tallies)
            .filter(|(_, tally)| tally.count > 0)
            .map(|(day, tally)| tally.into_group(weekday_name(*day)))
            .collect())
    }

    /// Computes the current streak and the longest win and loss runs.
    ///
    /// `trades` must be ordered by entry time, most recent first. The current
    /// streak is read from the front; the longest runs are found by walking
    /// the slice backwards (oldest to newest). A scratch is its own class: it
    /// ends a win or loss run and resets both running counters.
    pub fn compute_streaks(&self, trades: &[Trade]) -> Result<Streaks, AnalyticsError> {
        if let Some(position) = trades
            .windows(2)
            .position(|w| w[0].entry_time < w[1].entry_time)
        {
            return Err(AnalyticsError::UnsortedInput { position: position + 1 });
        }

        let kinds = trades
            .iter()
            .map(|t| realized_pnl(t).map(classify))
            .collect::<Result<Vec<_>, _>>()?;

        let current = match kinds.first() {
            None => CurrentStreak { kind: StreakKind::None, count: 0 },
            Some(&first) => CurrentStreak {
                kind: first,
                count: kinds.iter().take_while(|&&k| k == first).count(),
            },
        };

        let mut best_win_streak = 0;
        let mut worst_loss_streak = 0;
        let mut wins = 0;
        let mut losses = 0;
        for kind in kinds.iter().rev() {
            match kind {
                StreakKind::Win => {
                    wins += 1;
                    losses = 0;
                }
                StreakKind::Loss => {
                    losses += 1;
                    wins = 0;
                }
                _ => {
                    wins = 0;
                    losses = 0;
                }
            }
            best_win_streak = best_win_streak.max(wins);
            worst_loss_streak = worst_loss_streak.max(losses);
        }

        Ok(Streaks {
            current,
            best_win_streak,
            worst_loss_streak,
        })
    }

    /// Daily realized P&L and its running total, keyed by exit date.
    pub fn equity_curve(&self, trades: &[Trade]) -> Result<Vec<EquityPoint>, AnalyticsError> {
        let mut days: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();

        for trade in trades {
            let pnl = realized_pnl(trade)?;
            let date = trade.exit_time.unwrap_or(trade.entry_time).date_naive();
            let day = days.entry(date).or_insert((Decimal::ZERO, 0));
            day.0 += pnl;
            day.1 += 1;
        }

        let mut cumulative = Decimal::ZERO;
        Ok(days
            .into_iter()
            .map(|(date, (daily, count))| {
                cumulative += daily;
                EquityPoint {
                    date,
                    daily_pnl: round_output(daily),
                    cumulative_pnl: round_output(cumulative),
                    trade_count: count,
                }
            })
            .collect())
    }
}

/// Running sums for one group of trades. Kept at full precision; rounding
/// happens in the accessors that produce output values.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    count: usize,
    winners: usize,
    losers: usize,
    scratches: usize,
    gross_profit: Decimal,
    /// Sum of the negative P&Ls (zero or negative).
    gross_loss: Decimal,
}

impl Tally {
    fn add(&mut self, pnl: Decimal) {
        self.count += 1;
        match classify(pnl) {
            StreakKind::Win => {
                self.winners += 1;
                self.gross_profit += pnl;
            }
            StreakKind::Loss => {
                self.losers += 1;
                self.gross_loss += pnl;
            }
            _ => self.scratches += 1,
        }
    }

    fn total(&self) -> Decimal {
        self.gross_profit + self.gross_loss
    }

    fn win_rate(&self) -> Decimal {
        if self.count == 0 {
            return Decimal::ZERO;
        }
        round_output(Decimal::from(self.winners) / Decimal::from(self.count) * Decimal::ONE_HUNDRED)
    }

    fn avg_winner(&self) -> Decimal {
        if self.winners == 0 {
            return Decimal::ZERO;
        }
        round_output(self.gross_profit / Decimal::from(self.winners))
    }

    fn avg_loser(&self) -> Decimal {
        if self.losers == 0 {
            return Decimal::ZERO;
        }
        round_output(self.gross_loss.abs() / Decimal::from(self.losers))
    }

    fn into_group(self, label: &str) -> GroupSummary {
        GroupSummary {
            label: label.to_string(),
            total_trades: self.count,
            winners: self.winners,
            losers: self.losers,
            scratches: self.scratches,
            win_rate: self.win_rate(),
            total_pnl: round_output(self.total()),
            avg_winner: self.avg_winner(),
            avg_loser: self.avg_loser(),
        }
    }
}

fn realized_pnl(trade: &Trade) -> Result<Decimal, AnalyticsError> {
    match (trade.is_closed(), trade.pnl) {
        (true, Some(pnl)) => Ok(pnl),
        _ => Err(AnalyticsError::OpenTrade(trade.id)),
    }
}

fn classify(pnl: Decimal) -> StreakKind {
    if pnl > Decimal::ZERO {
        StreakKind::Win
    } else if pnl < Decimal::ZERO {
        StreakKind::Loss
    } else {
        StreakKind::Scratch
    }
}

fn trade_ref(trade: &Trade, pnl: Decimal) -> TradeRef {
    TradeRef {
        id: trade.id,
        ticker: trade.ticker.clone(),
        pnl: round_output(pnl),
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
