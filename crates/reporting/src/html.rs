use crate::error::ReportError;
use crate::format::{escape_html, money, percent, price, signed_money};
use crate::tables::format_duration;
use analytics::{EquityPoint, GroupSummary, Streaks, Summary};
use chrono::{DateTime, Utc};
use core_types::{Narrative, Trade, WatchlistItem};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::path::Path;

const CHART_WIDTH: f64 = 760.0;
const CHART_HEIGHT: f64 = 180.0;
const CHART_PAD: f64 = 10.0;

/// Everything the dashboard shows. The caller gathers it from the store and
/// the statistics engine; rendering does no I/O.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub title: String,
    pub window_label: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub setups: Vec<GroupSummary>,
    pub weekdays: Vec<GroupSummary>,
    pub streaks: Streaks,
    pub equity: Vec<EquityPoint>,
    pub recent_trades: Vec<Trade>,
    pub narratives: Vec<Narrative>,
    pub watchlist: Vec<WatchlistItem>,
}

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; background: #0f1419; color: #d9dee3; margin: 0; padding: 24px; }
h1 { margin: 0 0 4px; font-size: 24px; }
h2 { font-size: 16px; margin: 28px 0 8px; color: #9fb0c0; text-transform: uppercase; letter-spacing: .05em; }
.muted { color: #6c7a89; font-size: 13px; }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(150px, 1fr)); gap: 12px; margin-top: 16px; }
.card { background: #1a2129; border-radius: 8px; padding: 12px 14px; }
.card .label { font-size: 12px; color: #6c7a89; }
.card .value { font-size: 20px; margin-top: 4px; }
table { border-collapse: collapse; width: 100%; font-size: 13px; }
th, td { padding: 6px 8px; border-bottom: 1px solid #26303a; text-align: left; }
td.num, th.num { text-align: right; font-variant-numeric: tabular-nums; }
.pos { color: #3fb950; }
.neg { color: #f85149; }
svg { background: #1a2129; border-radius: 8px; }
"#;

/// Renders the dashboard as a single self-contained HTML page.
pub fn render_dashboard(data: &DashboardData) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&data.title)));
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
    html.push_str(&format!(
        "<h1>{}</h1>\n<div class=\"muted\">{}</div>\n",
        escape_html(&data.title),
        escape_html(&data.window_label)
    ));

    html.push_str(&summary_cards(&data.summary, &data.streaks));

    html.push_str("<h2>Equity curve</h2>\n");
    html.push_str(&equity_svg(&data.equity));

    html.push_str("<h2>By setup</h2>\n");
    html.push_str(&groups_section("Setup", &data.setups));
    html.push_str("<h2>By weekday</h2>\n");
    html.push_str(&groups_section("Weekday", &data.weekdays));

    html.push_str("<h2>Recent trades</h2>\n");
    html.push_str(&trades_section(&data.recent_trades));

    html.push_str("<h2>Active narratives</h2>\n");
    html.push_str(&narratives_section(&data.narratives));

    html.push_str("<h2>Today's watchlist</h2>\n");
    html.push_str(&watchlist_section(&data.watchlist));

    html.push_str(&format!(
        "<p class=\"muted\">Generated {}</p>\n</body>\n</html>\n",
        data.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    html
}

/// Writes a rendered page to `path`, creating parent directories as needed.
pub fn write_dashboard(path: &Path, html: &str) -> Result<(), ReportError> {
    let wrap = |source| ReportError::Write { path: path.display().to_string(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(path, html).map_err(wrap)?;
    tracing::info!(path = %path.display(), bytes = html.len(), "Dashboard written");
    Ok(())
}

fn pnl_class(value: Decimal) -> &'static str {
    if value > Decimal::ZERO {
        "pos"
    } else if value < Decimal::ZERO {
        "neg"
    } else {
        ""
    }
}

fn card(label: &str, value: &str, class: &str) -> String {
    format!(
        "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value {}\">{}</div></div>\n",
        label,
        class,
        escape_html(value)
    )
}

fn summary_cards(summary: &Summary, streaks: &Streaks) -> String {
    let mut out = String::from("<div class=\"cards\">\n");
    out.push_str(&card("Total P&amp;L", &signed_money(summary.total_pnl), pnl_class(summary.total_pnl)));
    out.push_str(&card("Trades", &summary.total_trades.to_string(), ""));
    out.push_str(&card("Win rate", &percent(summary.win_rate), ""));
    out.push_str(&card("Profit factor", &summary.profit_factor.to_string(), ""));
    out.push_str(&card("Avg winner", &money(summary.avg_winner), "pos"));
    out.push_str(&card("Avg loser", &money(summary.avg_loser), "neg"));
    if let Some(best) = &summary.best_trade {
        out.push_str(&card("Best trade", &format!("{} {}", best.ticker, signed_money(best.pnl)), "pos"));
    }
    if let Some(worst) = &summary.worst_trade {
        out.push_str(&card("Worst trade", &format!("{} {}", worst.ticker, signed_money(worst.pnl)), "neg"));
    }
    out.push_str(&card(
        "Current streak",
        &format!("{} x{}", streaks.current.kind.as_str(), streaks.current.count),
        "",
    ));
    out.push_str(&card("Best / worst run", &format!("{}W / {}L", streaks.best_win_streak, streaks.worst_loss_streak), ""));
    if let Some(held) = summary.avg_holding_period {
        out.push_str(&card("Avg hold", &format_duration(held), ""));
    }
    out.push_str("</div>\n");
    out
}

/// Plots cumulative P&L as an inline SVG polyline with a zero baseline.
fn equity_svg(points: &[EquityPoint]) -> String {
    if points.is_empty() {
        return "<p class=\"muted\">No closed trades in this window.</p>\n".to_string();
    }

    let values: Vec<f64> = points
        .iter()
        .map(|p| p.cumulative_pnl.to_f64().unwrap_or(0.0))
        .collect();
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let span = if max > min { max - min } else { 1.0 };

    let plot_w = CHART_WIDTH - 2.0 * CHART_PAD;
    let plot_h = CHART_HEIGHT - 2.0 * CHART_PAD;
    let x_at = |i: usize| {
        if values.len() == 1 {
            CHART_PAD + plot_w / 2.0
        } else {
            CHART_PAD + plot_w * i as f64 / (values.len() - 1) as f64
        }
    };
    let y_at = |v: f64| CHART_PAD + plot_h * (max - v) / span;

    let polyline = values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{:.1},{:.1}", x_at(i), y_at(*v)))
        .collect::<Vec<_>>()
        .join(" ");
    let last = points[points.len() - 1].cumulative_pnl;
    let stroke = if last < Decimal::ZERO { "#f85149" } else { "#3fb950" };
    let zero_y = y_at(0.0);

    format!(
        concat!(
            "<svg width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" role=\"img\" aria-label=\"Equity curve\">\n",
            "<line x1=\"{pad}\" y1=\"{zy:.1}\" x2=\"{xe}\" y2=\"{zy:.1}\" stroke=\"#3a4550\" stroke-dasharray=\"4 4\"/>\n",
            "<polyline fill=\"none\" stroke=\"{stroke}\" stroke-width=\"2\" points=\"{points}\"/>\n",
            "</svg>\n",
            "<div class=\"muted\">{from} to {to}: {total}</div>\n"
        ),
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
        pad = CHART_PAD,
        zy = zero_y,
        xe = CHART_WIDTH - CHART_PAD,
        stroke = stroke,
        points = polyline,
        from = points[0].date,
        to = points[points.len() - 1].date,
        total = signed_money(last),
    )
}

fn groups_section(dimension: &str, groups: &[GroupSummary]) -> String {
    if groups.is_empty() {
        return "<p class=\"muted\">Nothing to break down.</p>\n".to_string();
    }
    let mut out = format!(
        "<table>\n<tr><th>{}</th><th class=\"num\">Trades</th><th class=\"num\">Win rate</th>\
         <th class=\"num\">Avg win</th><th class=\"num\">Avg loss</th><th class=\"num\">Total P&amp;L</th></tr>\n",
        dimension
    );
    for group in groups {
        out.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{}</td><td class=\"num {}\">{}</td></tr>\n",
            escape_html(&group.label),
            group.total_trades,
            percent(group.win_rate),
            money(group.avg_winner),
            money(group.avg_loser),
            pnl_class(group.total_pnl),
            signed_money(group.total_pnl),
        ));
    }
    out.push_str("</table>\n");
    out
}

fn trades_section(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return "<p class=\"muted\">No trades recorded.</p>\n".to_string();
    }
    let mut out = String::from(
        "<table>\n<tr><th>Date</th><th>Ticker</th><th>Side</th><th>Instrument</th><th class=\"num\">Size</th>\
         <th class=\"num\">Entry</th><th class=\"num\">Exit</th><th class=\"num\">P&amp;L</th><th>Setup</th></tr>\n",
    );
    for trade in trades {
        let (pnl, class) = match trade.pnl {
            Some(pnl) => (signed_money(pnl), pnl_class(pnl)),
            None => ("open".to_string(), ""),
        };
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{}</td><td class=\"num {}\">{}</td><td>{}</td></tr>\n",
            trade.entry_time.format("%Y-%m-%d"),
            escape_html(&trade.ticker),
            trade.direction,
            trade.instrument,
            trade.size,
            price(trade.entry_price),
            trade.exit_price.map(price).unwrap_or_else(|| "-".to_string()),
            class,
            pnl,
            trade.setup_label(),
        ));
    }
    out.push_str("</table>\n");
    out
}

fn narratives_section(narratives: &[Narrative]) -> String {
    if narratives.is_empty() {
        return "<p class=\"muted\">No active narratives.</p>\n".to_string();
    }
    let mut out = String::from(
        "<table>\n<tr><th>Ticker</th><th>Bias</th><th>Thesis</th><th>Key levels</th><th class=\"num\">Invalidation</th></tr>\n",
    );
    for narrative in narratives {
        let levels = narrative
            .key_levels
            .iter()
            .map(|l| price(*l))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>\n",
            escape_html(&narrative.ticker),
            narrative.direction,
            escape_html(&narrative.thesis),
            levels,
            narrative.invalidation_price.map(price).unwrap_or_else(|| "-".to_string()),
        ));
    }
    out.push_str("</table>\n");
    out
}

fn watchlist_section(items: &[WatchlistItem]) -> String {
    if items.is_empty() {
        return "<p class=\"muted\">Watchlist is empty.</p>\n".to_string();
    }
    let mut out = String::from(
        "<table>\n<tr><th class=\"num\">P</th><th>Ticker</th><th>Bias</th><th>Setup</th><th>Status</th></tr>\n",
    );
    for item in items {
        out.push_str(&format!(
            "<tr><td class=\"num\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            item.priority,
            escape_html(&item.ticker),
            item.bias,
            escape_html(&item.setup),
            item.status,
        ));
    }
    out.push_str("</table>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::{CurrentStreak, ProfitFactor, StreakKind};
    use chrono::{NaiveDate, TimeZone};
    use core_types::Bias;
    use rust_decimal_macros::dec;

    fn data() -> DashboardData {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        DashboardData {
            title: "Desk <Journal>".to_string(),
            window_label: "Last 30 days".to_string(),
            generated_at: Utc.with_ymd_and_hms(2024, 3, 8, 21, 0, 0).unwrap(),
            summary: Summary {
                total_trades: 3,
                winners: 3,
                win_rate: dec!(100),
                total_pnl: dec!(1250),
                profit_factor: ProfitFactor::Infinite,
                ..Default::default()
            },
            setups: vec![],
            weekdays: vec![],
            streaks: Streaks {
                current: CurrentStreak { kind: StreakKind::Win, count: 3 },
                best_win_streak: 3,
                worst_loss_streak: 0,
            },
            equity: vec![
                EquityPoint { date, daily_pnl: dec!(-50), cumulative_pnl: dec!(-50), trade_count: 1 },
                EquityPoint {
                    date: date.succ_opt().unwrap(),
                    daily_pnl: dec!(1300),
                    cumulative_pnl: dec!(1250),
                    trade_count: 2,
                },
            ],
            recent_trades: vec![],
            narratives: vec![],
            watchlist: vec![
                WatchlistItem::new(date, "AMD", "<script>alert(1)</script>", Bias::Bull, 1).unwrap(),
            ],
        }
    }

    #[test]
    fn dashboard_is_a_complete_page() {
        let html = render_dashboard(&data());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("<title>Desk &lt;Journal&gt;</title>"));
        assert!(html.contains("+$1,250.00"));
        assert!(html.contains("Generated 2024-03-08 21:00 UTC"));
    }

    #[test]
    fn infinite_profit_factor_is_a_symbol_not_a_number() {
        let html = render_dashboard(&data());
        assert!(html.contains(">∞<"));
        assert!(!html.contains("inf<"));
    }

    #[test]
    fn user_text_is_escaped() {
        let html = render_dashboard(&data());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn equity_curve_plots_every_day() {
        let html = render_dashboard(&data());
        let points = html
            .split("points=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        assert_eq!(points.split(' ').count(), 2);
        assert!(html.contains("2024-03-04 to 2024-03-05"));
    }

    #[test]
    fn writes_into_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("dash.html");
        let html = render_dashboard(&data());
        write_dashboard(&path, &html).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), html);
    }

    #[test]
    fn empty_sections_render_placeholders() {
        let mut empty = data();
        empty.equity.clear();
        empty.watchlist.clear();
        let html = render_dashboard(&empty);
        assert!(html.contains("No closed trades in this window."));
        assert!(html.contains("Watchlist is empty."));
        assert!(html.contains("No active narratives."));
    }
}
