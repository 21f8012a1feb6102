use crate::format::{money, percent, price, signed_money};
use analytics::{GroupSummary, Streaks, Summary};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use core_types::{JournalEntry, Narrative, Trade, WatchlistItem, short_id};
use rust_decimal::Decimal;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn pnl_cell(value: Decimal) -> Cell {
    let cell = Cell::new(signed_money(value)).set_alignment(CellAlignment::Right);
    if value > Decimal::ZERO {
        cell.fg(Color::Green)
    } else if value < Decimal::ZERO {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

fn right(text: impl ToString) -> Cell {
    Cell::new(text.to_string()).set_alignment(CellAlignment::Right)
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

// ==============================================================================
// Trades
// ==============================================================================

pub fn trades_table(trades: &[Trade]) -> String {
    let mut table = new_table(vec![
        "ID", "Entered", "Ticker", "Dir", "Instrument", "Size", "Entry", "Exit", "P&L", "Setup", "Status",
    ]);
    for trade in trades {
        let status = if trade.is_paper {
            format!("{} (paper)", trade.status)
        } else {
            trade.status.to_string()
        };
        table.add_row(vec![
            Cell::new(trade.short_id()),
            Cell::new(trade.entry_time.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(&trade.ticker),
            Cell::new(trade.direction.as_str()),
            Cell::new(trade.instrument.as_str()),
            right(trade.size),
            right(price(trade.entry_price)),
            right(trade.exit_price.map(price).unwrap_or_else(|| "-".to_string())),
            match trade.pnl {
                Some(pnl) => pnl_cell(pnl),
                None => right("-"),
            },
            Cell::new(trade.setup_label()),
            Cell::new(status),
        ]);
    }
    table.to_string()
}

/// Every field of a single trade, one per row.
pub fn trade_detail(trade: &Trade) -> String {
    let mut table = new_table(vec!["Field", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("ID", trade.id.to_string()),
        ("Ticker", trade.ticker.clone()),
        ("Direction", trade.direction.to_string()),
        ("Instrument", trade.instrument.to_string()),
        ("Size", trade.size.to_string()),
        ("Entry price", price(trade.entry_price)),
        ("Entered", trade.entry_time.to_rfc3339()),
        ("Exit price", trade.exit_price.map(price).unwrap_or_else(|| "-".to_string())),
        ("Exited", trade.exit_time.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())),
        ("Cost basis", money(trade.cost_basis)),
        ("Proceeds", trade.proceeds.map(money).unwrap_or_else(|| "-".to_string())),
        ("P&L", trade.pnl.map(signed_money).unwrap_or_else(|| "open".to_string())),
        ("Setup", trade.setup_label().to_string()),
        ("Status", trade.status.to_string()),
        ("Paper", if trade.is_paper { "yes" } else { "no" }.to_string()),
        ("Notes", or_dash(trade.notes.as_deref())),
        ("Lessons", or_dash(trade.lessons.as_deref())),
    ];
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value]);
    }
    table.to_string()
}

// ==============================================================================
// Statistics
// ==============================================================================

pub fn summary_table(summary: &Summary) -> String {
    let mut table = new_table(vec!["Metric", "Value"]);
    let best = summary
        .best_trade
        .as_ref()
        .map(|t| format!("{} {}", t.ticker, signed_money(t.pnl)))
        .unwrap_or_else(|| "-".to_string());
    let worst = summary
        .worst_trade
        .as_ref()
        .map(|t| format!("{} {}", t.ticker, signed_money(t.pnl)))
        .unwrap_or_else(|| "-".to_string());
    let holding = summary
        .avg_holding_period
        .map(format_duration)
        .unwrap_or_else(|| "-".to_string());

    table.add_row(vec![Cell::new("Trades"), right(summary.total_trades)]);
    table.add_row(vec![
        Cell::new("Wins / Losses / Scratches"),
        right(format!("{} / {} / {}", summary.winners, summary.losers, summary.scratches)),
    ]);
    table.add_row(vec![Cell::new("Win rate"), right(percent(summary.win_rate))]);
    table.add_row(vec![Cell::new("Total P&L"), pnl_cell(summary.total_pnl)]);
    table.add_row(vec![Cell::new("Gross profit"), right(money(summary.gross_profit))]);
    table.add_row(vec![Cell::new("Gross loss"), right(money(summary.gross_loss))]);
    table.add_row(vec![Cell::new("Avg winner"), right(money(summary.avg_winner))]);
    table.add_row(vec![Cell::new("Avg loser"), right(money(summary.avg_loser))]);
    table.add_row(vec![Cell::new("Profit factor"), right(summary.profit_factor)]);
    table.add_row(vec![Cell::new("Best trade"), right(best)]);
    table.add_row(vec![Cell::new("Worst trade"), right(worst)]);
    table.add_row(vec![Cell::new("Avg holding period"), right(holding)]);
    table.to_string()
}

/// A per-setup or per-weekday breakdown. `dimension` names the first column.
pub fn groups_table(dimension: &str, groups: &[GroupSummary]) -> String {
    let mut table = new_table(vec![
        dimension, "Trades", "W", "L", "S", "Win rate", "Avg win", "Avg loss", "Total P&L",
    ]);
    for group in groups {
        table.add_row(vec![
            Cell::new(&group.label),
            right(group.total_trades),
            right(group.winners),
            right(group.losers),
            right(group.scratches),
            right(percent(group.win_rate)),
            right(money(group.avg_winner)),
            right(money(group.avg_loser)),
            pnl_cell(group.total_pnl),
        ]);
    }
    table.to_string()
}

pub fn streaks_table(streaks: &Streaks) -> String {
    let mut table = new_table(vec!["Streak", "Value"]);
    table.add_row(vec![
        Cell::new("Current"),
        right(format!("{} x{}", streaks.current.kind.as_str(), streaks.current.count)),
    ]);
    table.add_row(vec![Cell::new("Best win streak"), right(streaks.best_win_streak)]);
    table.add_row(vec![Cell::new("Worst loss streak"), right(streaks.worst_loss_streak)]);
    table.to_string()
}

/// Holding time truncated to minutes, or to hours once it spans days.
pub(crate) fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let unit = if secs >= 86_400 { 3_600 } else { 60 };
    humantime::format_duration(std::time::Duration::from_secs(secs - secs % unit)).to_string()
}

// ==============================================================================
// Narratives, watchlist, journal
// ==============================================================================

pub fn narratives_table(narratives: &[Narrative]) -> String {
    let mut table = new_table(vec![
        "ID", "Created", "Ticker", "Bias", "Status", "Key levels", "Invalidation", "Thesis",
    ]);
    for narrative in narratives {
        let levels = narrative
            .key_levels
            .iter()
            .map(|l| price(*l))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(short_id(&narrative.id)),
            Cell::new(narrative.created_at.format("%Y-%m-%d").to_string()),
            Cell::new(&narrative.ticker),
            Cell::new(narrative.direction.as_str()),
            Cell::new(narrative.status.as_str()),
            Cell::new(if levels.is_empty() { "-".to_string() } else { levels }),
            right(narrative.invalidation_price.map(price).unwrap_or_else(|| "-".to_string())),
            Cell::new(&narrative.thesis),
        ]);
    }
    table.to_string()
}

pub fn watchlist_table(items: &[WatchlistItem]) -> String {
    let mut table = new_table(vec!["ID", "P", "Ticker", "Bias", "Setup", "Status"]);
    for item in items {
        table.add_row(vec![
            Cell::new(short_id(&item.id)),
            right(item.priority),
            Cell::new(&item.ticker),
            Cell::new(item.bias.as_str()),
            Cell::new(or_dash(Some(&item.setup))),
            Cell::new(item.status.as_str()),
        ]);
    }
    table.to_string()
}

/// One journal page laid out section by section.
pub fn journal_view(entry: &JournalEntry) -> String {
    let mut table = new_table(vec!["Section", "Notes"]);
    table.add_row(vec!["Date".to_string(), entry.date.format("%A %Y-%m-%d").to_string()]);
    table.add_row(vec!["Grade".to_string(), entry.grade.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string())]);
    table.add_row(vec!["Premarket plan".to_string(), or_dash(entry.premarket_plan.as_deref())]);
    table.add_row(vec!["Market context".to_string(), or_dash(entry.market_context.as_deref())]);
    table.add_row(vec!["Postmarket review".to_string(), or_dash(entry.postmarket_review.as_deref())]);
    table.to_string()
}

pub fn journal_table(entries: &[JournalEntry]) -> String {
    let mut table = new_table(vec!["Date", "Grade", "Plan", "Review"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.date.to_string()),
            Cell::new(entry.grade.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(if entry.premarket_plan.is_some() { "yes" } else { "no" }),
            Cell::new(if entry.postmarket_review.is_some() { "yes" } else { "no" }),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::{CurrentStreak, ProfitFactor, StreakKind, TradeRef};
    use chrono::{TimeZone, Utc};
    use core_types::{Direction, Instrument, NewTrade, SetupType};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn closed_trade() -> Trade {
        let mut trade = Trade::open(NewTrade {
            ticker: "SPY".to_string(),
            direction: Direction::Long,
            instrument: Instrument::ZeroDteCalls,
            entry_price: dec!(1.10),
            size: 3,
            setup_type: Some(SetupType::VwapReclaim),
            entry_time: Utc.with_ymd_and_hms(2024, 3, 4, 14, 31, 0).unwrap(),
            is_paper: true,
            notes: None,
        })
        .unwrap();
        trade
            .close(dec!(1.60), Utc.with_ymd_and_hms(2024, 3, 4, 15, 2, 0).unwrap())
            .unwrap();
        trade
    }

    #[test]
    fn trade_list_shows_pnl_and_paper_flag() {
        let rendered = trades_table(&[closed_trade()]);
        assert!(rendered.contains("SPY"));
        assert!(rendered.contains("0dte-calls"));
        assert!(rendered.contains("+$150.00"));
        assert!(rendered.contains("(paper)"));
        assert!(rendered.contains("vwap-reclaim"));
    }

    #[test]
    fn summary_renders_infinite_profit_factor_as_symbol() {
        let summary = Summary {
            total_trades: 2,
            winners: 2,
            win_rate: dec!(100),
            total_pnl: dec!(30),
            gross_profit: dec!(30),
            avg_winner: dec!(15),
            profit_factor: ProfitFactor::Infinite,
            best_trade: Some(TradeRef { id: uuid::Uuid::new_v4(), ticker: "NVDA".into(), pnl: dec!(20) }),
            avg_holding_period: Some(Duration::from_secs(5_400)),
            ..Default::default()
        };
        let rendered = summary_table(&summary);
        assert!(rendered.contains('∞'));
        assert!(rendered.contains("100.00%"));
        assert!(rendered.contains("NVDA +$20.00"));
        assert!(rendered.contains("1h 30m"));
    }

    #[test]
    fn streaks_and_groups_render() {
        let streaks = Streaks {
            current: CurrentStreak { kind: StreakKind::Loss, count: 2 },
            best_win_streak: 4,
            worst_loss_streak: 3,
        };
        assert!(streaks_table(&streaks).contains("loss x2"));

        let group = GroupSummary {
            label: "breakout".to_string(),
            total_trades: 2,
            winners: 1,
            losers: 1,
            scratches: 0,
            win_rate: dec!(50),
            total_pnl: dec!(6),
            avg_winner: dec!(10),
            avg_loser: dec!(4),
        };
        let rendered = groups_table("Setup", &[group]);
        assert!(rendered.contains("Setup"));
        assert!(rendered.contains("breakout"));
        assert!(rendered.contains("50.00%"));
    }

    #[test]
    fn durations_drop_noise_below_the_shown_unit() {
        assert_eq!(format_duration(Duration::from_secs(45 * 60 + 17)), "45m");
        assert_eq!(format_duration(Duration::from_secs(5_400)), "1h 30m");
        assert_eq!(format_duration(Duration::from_secs(26 * 3_600 + 59 * 60)), "1day 2h");
    }
}
