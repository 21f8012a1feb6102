use analytics::StatsEngine;
use anyhow::{Context, bail};
use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use configuration::{Config, init_tracing, load_config};
use core_types::{
    Bias, Direction, Grade, Instrument, JournalUpdate, Narrative, NarrativeStatus, NewTrade,
    SetupType, Trade, TradeStatus, WatchStatus, WatchlistItem, short_id,
};
use database::{DbRepository, TradeFilter, connect, run_migrations};
use reporting::format::signed_money;
use reporting::{DashboardData, render_dashboard, write_dashboard};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;

/// The main entry point for the trading journal.
#[tokio::main]
async fn main() -> ExitCode {
    // A .env file is optional; real environment variables win either way.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }

    // Held until exit so the file writer flushes.
    let _log_guard = match init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    let db_pool = connect(&config.database.path)
        .await
        .with_context(|| format!("Failed to open {}", config.database.path.display()))?;
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    let repo = DbRepository::new(db_pool);

    match command {
        Commands::Trade(cmd) => handle_trade(cmd, &repo).await,
        Commands::Stats(args) => handle_stats(args, &repo).await,
        Commands::Narrative(cmd) => handle_narrative(cmd, &repo).await,
        Commands::Watch(cmd) => handle_watch(cmd, &repo).await,
        Commands::Journal(cmd) => handle_journal(cmd, &repo).await,
        Commands::Dashboard(args) => handle_dashboard(args, &repo, &config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A personal trading journal: log trades, review performance, plan the day.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./tradelog.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and manage trades.
    #[command(subcommand)]
    Trade(TradeCommand),
    /// Performance statistics over closed trades.
    Stats(StatsArgs),
    /// Track trade theses per ticker.
    #[command(subcommand)]
    Narrative(NarrativeCommand),
    /// Manage the daily watchlist.
    #[command(subcommand)]
    Watch(WatchCommand),
    /// Pre- and post-market journal pages.
    #[command(subcommand)]
    Journal(JournalCommand),
    /// Write the HTML dashboard.
    Dashboard(DashboardArgs),
}

#[derive(Subcommand)]
enum TradeCommand {
    /// Open a new position.
    Open(OpenArgs),
    /// Close an open position.
    Close(CloseArgs),
    /// Add notes or lessons to a trade.
    Note(NoteArgs),
    /// Delete a trade.
    Delete {
        /// Trade id or a unique prefix of it.
        id: String,
    },
    /// List trades, newest first.
    List(ListArgs),
    /// Show one trade in full.
    Show {
        /// Trade id or a unique prefix of it.
        id: String,
    },
}

#[derive(Args)]
struct OpenArgs {
    #[arg(long)]
    ticker: String,
    /// long or short.
    #[arg(long)]
    direction: Direction,
    /// shares, calls, puts, 0dte-calls, 0dte-puts or csp.
    #[arg(long, default_value = "shares")]
    instrument: Instrument,
    /// Entry price per share or per option contract.
    #[arg(long)]
    price: Decimal,
    /// Shares or contracts.
    #[arg(long)]
    size: u32,
    #[arg(long)]
    setup: Option<SetupType>,
    /// Mark as a paper trade, excluded from real statistics.
    #[arg(long)]
    paper: bool,
    #[arg(long)]
    notes: Option<String>,
    /// Entry time (RFC 3339); defaults to now.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct CloseArgs {
    /// Trade id or a unique prefix of it.
    id: String,
    /// Exit price.
    #[arg(long)]
    price: Decimal,
    /// Exit time (RFC 3339); defaults to now.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
    #[arg(long)]
    lessons: Option<String>,
}

#[derive(Args)]
struct NoteArgs {
    /// Trade id or a unique prefix of it.
    id: String,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    lessons: Option<String>,
}

#[derive(Args)]
struct ListArgs {
    /// Only open positions.
    #[arg(long, conflicts_with = "closed")]
    open: bool,
    /// Only closed positions.
    #[arg(long)]
    closed: bool,
    #[arg(long)]
    ticker: Option<String>,
    /// Only trades entered in the last N days.
    #[arg(long)]
    days: Option<u32>,
    /// Show paper trades instead of real ones.
    #[arg(long)]
    paper: bool,
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Args)]
struct StatsArgs {
    /// Only trades entered in the last N days.
    #[arg(long)]
    days: Option<u32>,
    #[arg(long)]
    ticker: Option<String>,
    /// Analyse paper trades instead of real ones.
    #[arg(long)]
    paper: bool,
    #[arg(long)]
    by_setup: bool,
    #[arg(long)]
    by_weekday: bool,
    #[arg(long)]
    streaks: bool,
    /// Print every report as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum NarrativeCommand {
    /// Record a new thesis.
    Add {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        thesis: String,
        /// bull, bear or neutral.
        #[arg(long)]
        bias: Bias,
        /// A price level to watch; repeat for several.
        #[arg(long = "level")]
        levels: Vec<Decimal>,
        /// Price that invalidates the thesis.
        #[arg(long)]
        invalidation: Option<Decimal>,
    },
    /// List narratives; active ones unless a status is given.
    List {
        #[arg(long, conflicts_with = "all")]
        status: Option<NarrativeStatus>,
        /// Include every status.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Close out an active narrative.
    Resolve {
        /// Narrative id or a unique prefix of it.
        id: String,
        /// triggered, invalidated or expired.
        status: NarrativeStatus,
    },
}

#[derive(Subcommand)]
enum WatchCommand {
    /// Add a ticker to a day's watchlist.
    Add {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        setup: String,
        #[arg(long)]
        bias: Bias,
        /// 1 (highest) to 5.
        #[arg(long, default_value_t = 3)]
        priority: u8,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show a day's watchlist.
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record what happened to a watchlist item.
    Status {
        /// Item id or a unique prefix of it.
        id: String,
        /// watching, triggered, skipped or missed.
        status: WatchStatus,
    },
    /// Delete watchlist items dated before a day.
    Purge {
        /// Defaults to today, clearing every earlier day.
        #[arg(long)]
        before: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum JournalCommand {
    /// Write the pre-market plan.
    Pre {
        text: String,
        /// Market context for the day.
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Write the post-market review.
    Post {
        text: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Grade the day, A to F.
    Grade {
        grade: Grade,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show one day's page.
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List recent pages.
    List {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Args)]
struct DashboardArgs {
    /// Output file, overriding the configured path.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Only trades entered in the last N days.
    #[arg(long)]
    days: Option<u32>,
}

// ==============================================================================
// Trade Commands
// ==============================================================================

async fn handle_trade(cmd: TradeCommand, repo: &DbRepository) -> anyhow::Result<()> {
    match cmd {
        TradeCommand::Open(args) => {
            let trade = Trade::open(NewTrade {
                ticker: args.ticker,
                direction: args.direction,
                instrument: args.instrument,
                entry_price: args.price,
                size: args.size,
                setup_type: args.setup,
                entry_time: args.at.unwrap_or_else(Utc::now),
                is_paper: args.paper,
                notes: args.notes,
            })?;
            repo.insert_trade(&trade).await.context("Failed to save trade")?;
            tracing::info!(trade_id = %trade.id, ticker = %trade.ticker, "Opened trade");
            println!(
                "Opened {} {} {} x{} @ {} ({})",
                trade.short_id(),
                trade.direction,
                trade.ticker,
                trade.size,
                trade.entry_price,
                trade.instrument
            );
        }
        TradeCommand::Close(args) => {
            let mut trade = repo.find_trade(&args.id).await?;
            trade.close(args.price, args.at.unwrap_or_else(Utc::now))?;
            repo.close_trade(&trade).await.context("Failed to close trade")?;
            if args.lessons.is_some() {
                repo.annotate_trade(trade.id, None, args.lessons.as_deref()).await?;
            }
            let pnl = trade.pnl.unwrap_or_default();
            tracing::info!(trade_id = %trade.id, pnl = %pnl, "Closed trade");
            println!("Closed {} {}: {}", trade.short_id(), trade.ticker, signed_money(pnl));
        }
        TradeCommand::Note(args) => {
            if args.notes.is_none() && args.lessons.is_none() {
                bail!("Nothing to record: pass --notes and/or --lessons");
            }
            let trade = repo.find_trade(&args.id).await?;
            repo.annotate_trade(trade.id, args.notes.as_deref(), args.lessons.as_deref())
                .await?;
            println!("Updated {}", trade.short_id());
        }
        TradeCommand::Delete { id } => {
            let trade = repo.find_trade(&id).await?;
            repo.delete_trade(trade.id).await?;
            tracing::info!(trade_id = %trade.id, "Deleted trade");
            println!("Deleted {} {}", trade.short_id(), trade.ticker);
        }
        TradeCommand::List(args) => {
            let status = if args.open {
                Some(TradeStatus::Open)
            } else if args.closed {
                Some(TradeStatus::Closed)
            } else {
                None
            };
            let filter = TradeFilter {
                status,
                ticker: args.ticker,
                since: window_start(args.days, Utc::now())?,
                paper: Some(args.paper),
                limit: args.limit,
                ..Default::default()
            };
            let trades = repo.list_trades(&filter).await?;
            if trades.is_empty() {
                println!("No trades found.");
            } else {
                println!("{}", reporting::trades_table(&trades));
            }
        }
        TradeCommand::Show { id } => {
            let trade = repo.find_trade(&id).await?;
            println!("{}", reporting::trade_detail(&trade));
        }
    }
    Ok(())
}

// ==============================================================================
// Statistics
// ==============================================================================

/// Closed trades in the window, newest first; the order `compute_streaks` expects.
async fn closed_trades(
    repo: &DbRepository,
    days: Option<u32>,
    ticker: Option<String>,
    paper: bool,
) -> anyhow::Result<Vec<Trade>> {
    let filter = TradeFilter {
        ticker,
        since: window_start(days, Utc::now())?,
        paper: Some(paper),
        ..TradeFilter::closed_real()
    };
    repo.list_trades(&filter)
        .await
        .context("Failed to load closed trades")
}

async fn handle_stats(args: StatsArgs, repo: &DbRepository) -> anyhow::Result<()> {
    let trades = closed_trades(repo, args.days, args.ticker.clone(), args.paper).await?;
    tracing::debug!(count = trades.len(), "Loaded closed trades");

    let engine = StatsEngine::new();
    let summary = engine.compute_summary(&trades)?;
    let setups = if args.by_setup { Some(engine.group_by_setup(&trades)?) } else { None };
    let weekdays = if args.by_weekday { Some(engine.group_by_weekday(&trades)?) } else { None };
    let streaks = if args.streaks { Some(engine.compute_streaks(&trades)?) } else { None };

    if args.json {
        let report = serde_json::json!({
            "window": window_label(args.days, args.ticker.as_deref(), args.paper),
            "summary": summary,
            "by_setup": setups,
            "by_weekday": weekdays,
            "streaks": streaks,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", window_label(args.days, args.ticker.as_deref(), args.paper));
    if trades.is_empty() {
        println!("No closed trades in this window.");
        return Ok(());
    }
    println!("{}", reporting::summary_table(&summary));
    if let Some(setups) = setups {
        println!("{}", reporting::groups_table("Setup", &setups));
    }
    if let Some(weekdays) = weekdays {
        println!("{}", reporting::groups_table("Weekday", &weekdays));
    }
    if let Some(streaks) = streaks {
        println!("{}", reporting::streaks_table(&streaks));
    }
    Ok(())
}

/// The inclusive lower bound for a "last N days" window.
fn window_start(days: Option<u32>, now: DateTime<Utc>) -> anyhow::Result<Option<DateTime<Utc>>> {
    let Some(days) = days else {
        return Ok(None);
    };
    TimeDelta::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .map(Some)
        .with_context(|| format!("--days {} reaches past the earliest supported date", days))
}

fn window_label(days: Option<u32>, ticker: Option<&str>, paper: bool) -> String {
    let mut label = match days {
        Some(d) => format!("Last {} days", d),
        None => "All time".to_string(),
    };
    if let Some(ticker) = ticker {
        label.push_str(&format!(", {}", ticker.trim().to_ascii_uppercase()));
    }
    if paper {
        label.push_str(" (paper)");
    }
    label
}

// ==============================================================================
// Narratives, Watchlist and Journal
// ==============================================================================

async fn handle_narrative(cmd: NarrativeCommand, repo: &DbRepository) -> anyhow::Result<()> {
    match cmd {
        NarrativeCommand::Add { ticker, thesis, bias, levels, invalidation } => {
            let narrative = Narrative::new(&ticker, &thesis, bias, levels, invalidation, Utc::now())?;
            repo.insert_narrative(&narrative).await?;
            println!("Added narrative {} for {}", short_id(&narrative.id), narrative.ticker);
        }
        NarrativeCommand::List { status, all, ticker } => {
            let status = match (status, all) {
                (Some(status), _) => Some(status),
                (None, true) => None,
                (None, false) => Some(NarrativeStatus::Active),
            };
            let narratives = repo.list_narratives(status, ticker.as_deref()).await?;
            if narratives.is_empty() {
                println!("No narratives found.");
            } else {
                println!("{}", reporting::narratives_table(&narratives));
            }
        }
        NarrativeCommand::Resolve { id, status } => {
            let mut narrative = repo.find_narrative(&id).await?;
            narrative.resolve(status, Utc::now())?;
            repo.resolve_narrative(&narrative).await?;
            println!("{} narrative {} is now {}", narrative.ticker, short_id(&narrative.id), status);
        }
    }
    Ok(())
}

async fn handle_watch(cmd: WatchCommand, repo: &DbRepository) -> anyhow::Result<()> {
    match cmd {
        WatchCommand::Add { ticker, setup, bias, priority, date } => {
            let item = WatchlistItem::new(date.unwrap_or_else(today), &ticker, &setup, bias, priority)?;
            repo.insert_watch_item(&item).await?;
            println!("Watching {} on {} (P{})", item.ticker, item.date, item.priority);
        }
        WatchCommand::List { date } => {
            let date = date.unwrap_or_else(today);
            let items = repo.list_watchlist(date).await?;
            if items.is_empty() {
                println!("Watchlist for {} is empty.", date);
            } else {
                println!("{}", reporting::watchlist_table(&items));
            }
        }
        WatchCommand::Status { id, status } => {
            let id = repo.update_watch_status(&id, status).await?;
            println!("{} is now {}", short_id(&id), status);
        }
        WatchCommand::Purge { before } => {
            let before = before.unwrap_or_else(today);
            let removed = repo.purge_watchlist_before(before).await?;
            println!("Removed {} watchlist item(s) dated before {}", removed, before);
        }
    }
    Ok(())
}

async fn handle_journal(cmd: JournalCommand, repo: &DbRepository) -> anyhow::Result<()> {
    let (date, update) = match cmd {
        JournalCommand::Show { date } => {
            let date = date.unwrap_or_else(today);
            match repo.get_journal(date).await? {
                Some(entry) => println!("{}", reporting::journal_view(&entry)),
                None => println!("No journal page for {}.", date),
            }
            return Ok(());
        }
        JournalCommand::List { limit } => {
            let entries = repo.list_journal(limit).await?;
            if entries.is_empty() {
                println!("The journal is empty.");
            } else {
                println!("{}", reporting::journal_table(&entries));
            }
            return Ok(());
        }
        JournalCommand::Pre { text, context, date } => (
            date,
            JournalUpdate { premarket_plan: Some(text), market_context: context, ..Default::default() },
        ),
        JournalCommand::Post { text, date } => (
            date,
            JournalUpdate { postmarket_review: Some(text), ..Default::default() },
        ),
        JournalCommand::Grade { grade, date } => {
            (date, JournalUpdate { grade: Some(grade), ..Default::default() })
        }
    };

    let entry = repo
        .upsert_journal(date.unwrap_or_else(today), update, Utc::now())
        .await
        .context("Failed to save journal page")?;
    println!("{}", reporting::journal_view(&entry));
    Ok(())
}

// ==============================================================================
// Dashboard
// ==============================================================================

async fn handle_dashboard(
    args: DashboardArgs,
    repo: &DbRepository,
    config: &Config,
) -> anyhow::Result<()> {
    let trades = closed_trades(repo, args.days, None, false).await?;

    let engine = StatsEngine::new();
    let recent_filter = TradeFilter {
        paper: Some(false),
        limit: Some(config.report.recent_trades),
        ..Default::default()
    };

    let data = DashboardData {
        title: config.report.title.clone(),
        window_label: window_label(args.days, None, false),
        generated_at: Utc::now(),
        summary: engine.compute_summary(&trades)?,
        setups: engine.group_by_setup(&trades)?,
        weekdays: engine.group_by_weekday(&trades)?,
        streaks: engine.compute_streaks(&trades)?,
        equity: engine.equity_curve(&trades)?,
        recent_trades: repo.list_trades(&recent_filter).await?,
        narratives: repo.list_narratives(Some(NarrativeStatus::Active), None).await?,
        watchlist: repo.list_watchlist(today()).await?,
    };

    let out = args.out.unwrap_or_else(|| config.report.output.clone());
    write_dashboard(&out, &render_dashboard(&data))?;
    println!("Dashboard written to {}", out.display());
    Ok(())
}

// ==============================================================================
// Helpers
// ==============================================================================

/// The trader's calendar day.
fn today() -> NaiveDate {
    Local::now().date_naive()
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_start_counts_back_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(window_start(None, now).unwrap(), None);
        assert_eq!(
            window_start(Some(30), now).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn huge_day_windows_are_errors_not_panics() {
        let cli = Cli::try_parse_from(["tradelog", "stats", "--days", "4000000000"]).unwrap();
        let Commands::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert!(window_start(args.days, Utc::now()).is_err());
        assert!(window_start(Some(u32::MAX), Utc::now()).is_err());
    }

    #[test]
    fn purge_defaults_to_today() {
        let cli = Cli::try_parse_from(["tradelog", "watch", "purge"]).unwrap();
        assert!(matches!(cli.command, Commands::Watch(WatchCommand::Purge { before: None })));
        let cli = Cli::try_parse_from(["tradelog", "watch", "purge", "--before", "2024-03-01"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Watch(WatchCommand::Purge { before: Some(d) }) if d == NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        ));
    }

    #[test]
    fn window_label_describes_filters() {
        assert_eq!(window_label(None, None, false), "All time");
        assert_eq!(window_label(Some(7), Some(" spy "), true), "Last 7 days, SPY (paper)");
    }

    #[test]
    fn parses_trade_commands() {
        let cli = Cli::try_parse_from([
            "tradelog", "--db", "/tmp/j.db", "trade", "open", "--ticker", "aapl", "--direction",
            "long", "--instrument", "0dte-calls", "--price", "1.25", "--size", "2", "--setup",
            "gap-and-go",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/j.db")));
        match cli.command {
            Commands::Trade(TradeCommand::Open(args)) => {
                assert_eq!(args.instrument, Instrument::ZeroDteCalls);
                assert_eq!(args.setup, Some(SetupType::GapAndGo));
                assert_eq!(args.price, Decimal::new(125, 2));
                assert!(!args.paper);
            }
            _ => panic!("expected trade open"),
        }
    }

    #[test]
    fn rejects_conflicting_list_flags() {
        assert!(Cli::try_parse_from(["tradelog", "trade", "list", "--open", "--closed"]).is_err());
        assert!(Cli::try_parse_from(["tradelog", "stats", "--by-setup", "--streaks", "--json"]).is_ok());
    }

    #[test]
    fn rejects_unknown_labels() {
        assert!(Cli::try_parse_from(["tradelog", "journal", "grade", "E"]).is_err());
        assert!(
            Cli::try_parse_from(["tradelog", "watch", "status", "ab12", "forgotten"]).is_err()
        );
    }
}
