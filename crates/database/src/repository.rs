use crate::DbError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use core_types::{
    JournalEntry, JournalUpdate, Narrative, NarrativeStatus, Trade, TradeStatus, WatchStatus,
    WatchlistItem,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

const TRADE_COLUMNS: &str = "id, ticker, direction, instrument, entry_price, exit_price, size, \
    cost_basis, proceeds, pnl, setup_type, entry_time, exit_time, status, is_paper, notes, lessons";

const NARRATIVE_COLUMNS: &str =
    "id, ticker, thesis, direction, status, key_levels, invalidation_price, created_at, resolved_at";

const WATCHLIST_COLUMNS: &str = "id, date, ticker, setup, bias, priority, status";

const JOURNAL_COLUMNS: &str =
    "date, premarket_plan, postmarket_review, market_context, grade, updated_at";

/// Filters for `DbRepository::list_trades`. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub status: Option<TradeStatus>,
    pub ticker: Option<String>,
    /// Inclusive lower bound on entry time.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on entry time.
    pub until: Option<DateTime<Utc>>,
    /// `Some(false)` for real trades only, `Some(true)` for paper trades only.
    pub paper: Option<bool>,
    pub limit: Option<u32>,
}

impl TradeFilter {
    /// Closed, real-money trades: the input the statistics engine expects.
    pub fn closed_real() -> Self {
        Self {
            status: Some(TradeStatus::Closed),
            paper: Some(false),
            ..Default::default()
        }
    }
}

/// Record kinds that can be looked up by an id prefix.
#[derive(Debug, Clone, Copy)]
enum Table {
    Trades,
    Narratives,
    Watchlist,
}

impl Table {
    // Only these constant names are ever interpolated into SQL.
    fn name(&self) -> &'static str {
        match self {
            Table::Trades => "trades",
            Table::Narratives => "narratives",
            Table::Watchlist => "watchlist",
        }
    }

    fn record(&self) -> &'static str {
        match self {
            Table::Trades => "trade",
            Table::Narratives => "narrative",
            Table::Watchlist => "watchlist item",
        }
    }
}

/// The `DbRepository` provides a high-level, application-specific interface
/// to the journal database. It encapsulates all SQL queries and row mapping.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: SqlitePool,
}

impl DbRepository {
    /// Creates a new `DbRepository` over an open connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==========================================================================
    // Trades
    // ==========================================================================

    /// Saves a newly opened trade.
    pub async fn insert_trade(&self, trade: &Trade) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO trades ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRADE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(trade.id.to_string())
            .bind(&trade.ticker)
            .bind(trade.direction.as_str())
            .bind(trade.instrument.as_str())
            .bind(trade.entry_price.to_string())
            .bind(trade.exit_price.map(|p| p.to_string()))
            .bind(i64::from(trade.size))
            .bind(trade.cost_basis.to_string())
            .bind(trade.proceeds.map(|p| p.to_string()))
            .bind(trade.pnl.map(|p| p.to_string()))
            .bind(trade.setup_type.map(|s| s.as_str()))
            .bind(timestamp(&trade.entry_time))
            .bind(trade.exit_time.as_ref().map(timestamp))
            .bind(trade.status.as_str())
            .bind(trade.is_paper)
            .bind(trade.notes.as_deref())
            .bind(trade.lessons.as_deref())
            .execute(&self.pool)
            .await?;

        tracing::debug!(trade_id = %trade.id, ticker = %trade.ticker, "Inserted trade.");
        Ok(())
    }

    /// Fetches a single trade by its full id.
    pub async fn get_trade(&self, id: Uuid) -> Result<Trade, DbError> {
        let sql = format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(Table::Trades.record().to_string()))?;
        trade_from_row(&row)
    }

    /// Fetches a trade by a unique prefix of its id.
    pub async fn find_trade(&self, prefix: &str) -> Result<Trade, DbError> {
        let id = self.resolve_prefix(Table::Trades, prefix).await?;
        self.get_trade(id).await
    }

    /// Persists the close of a trade that has already been closed in memory.
    ///
    /// The update only matches a row that is still open, so a trade cannot be
    /// closed twice even if two invocations race.
    pub async fn close_trade(&self, trade: &Trade) -> Result<(), DbError> {
        let (Some(exit_price), Some(exit_time), Some(proceeds), Some(pnl)) =
            (trade.exit_price, trade.exit_time, trade.proceeds, trade.pnl)
        else {
            return Err(DbError::InvalidState(format!(
                "trade {} has no exit recorded",
                trade.id
            )));
        };

        let result = sqlx::query(
            r#"
            UPDATE trades
            SET exit_price = ?, exit_time = ?, cost_basis = ?, proceeds = ?, pnl = ?,
                status = 'closed', lessons = COALESCE(?, lessons)
            WHERE id = ? AND status = 'open'
            "#,
        )
        .bind(exit_price.to_string())
        .bind(timestamp(&exit_time))
        .bind(trade.cost_basis.to_string())
        .bind(proceeds.to_string())
        .bind(pnl.to_string())
        .bind(trade.lessons.as_deref())
        .bind(trade.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::InvalidState(format!(
                "trade {} is not open",
                trade.id
            )));
        }
        tracing::debug!(trade_id = %trade.id, pnl = %pnl, "Closed trade.");
        Ok(())
    }

    /// Updates the free-text annotations of a trade. `None` leaves a field as is.
    pub async fn annotate_trade(
        &self,
        id: Uuid,
        notes: Option<&str>,
        lessons: Option<&str>,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE trades SET notes = COALESCE(?, notes), lessons = COALESCE(?, lessons) WHERE id = ?",
        )
        .bind(notes)
        .bind(lessons)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(Table::Trades.record().to_string()));
        }
        Ok(())
    }

    pub async fn delete_trade(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM trades WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(Table::Trades.record().to_string()));
        }
        tracing::info!(trade_id = %id, "Deleted trade.");
        Ok(())
    }

    /// Lists trades matching `filter`, most recent entry first.
    pub async fn list_trades(&self, filter: &TradeFilter) -> Result<Vec<Trade>, DbError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM trades WHERE 1 = 1", TRADE_COLUMNS));

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(ticker) = &filter.ticker {
            qb.push(" AND ticker = ").push_bind(ticker.trim().to_ascii_uppercase());
        }
        if let Some(since) = &filter.since {
            qb.push(" AND entry_time >= ").push_bind(timestamp(since));
        }
        if let Some(until) = &filter.until {
            qb.push(" AND entry_time < ").push_bind(timestamp(until));
        }
        if let Some(paper) = filter.paper {
            qb.push(" AND is_paper = ").push_bind(paper);
        }
        qb.push(" ORDER BY entry_time DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(trade_from_row).collect()
    }

    // ==========================================================================
    // Narratives
    // ==========================================================================

    pub async fn insert_narrative(&self, narrative: &Narrative) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO narratives ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            NARRATIVE_COLUMNS
        );
        sqlx::query(&sql)
            .bind(narrative.id.to_string())
            .bind(&narrative.ticker)
            .bind(&narrative.thesis)
            .bind(narrative.direction.as_str())
            .bind(narrative.status.as_str())
            .bind(serde_json::to_string(&narrative.key_levels)?)
            .bind(narrative.invalidation_price.map(|p| p.to_string()))
            .bind(timestamp(&narrative.created_at))
            .bind(narrative.resolved_at.as_ref().map(timestamp))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_narrative(&self, prefix: &str) -> Result<Narrative, DbError> {
        let id = self.resolve_prefix(Table::Narratives, prefix).await?;
        let sql = format!("SELECT {} FROM narratives WHERE id = ?", NARRATIVE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        narrative_from_row(&row)
    }

    /// Lists narratives, newest first, optionally filtered by status and ticker.
    pub async fn list_narratives(
        &self,
        status: Option<NarrativeStatus>,
        ticker: Option<&str>,
    ) -> Result<Vec<Narrative>, DbError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM narratives WHERE 1 = 1", NARRATIVE_COLUMNS));
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(ticker) = ticker {
            qb.push(" AND ticker = ").push_bind(ticker.trim().to_ascii_uppercase());
        }
        qb.push(" ORDER BY created_at DESC, rowid DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(narrative_from_row).collect()
    }

    /// Persists a narrative's move to a terminal status. Only an active
    /// narrative row is updated.
    pub async fn resolve_narrative(&self, narrative: &Narrative) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE narratives SET status = ?, resolved_at = ? WHERE id = ? AND status = 'active'",
        )
        .bind(narrative.status.as_str())
        .bind(narrative.resolved_at.as_ref().map(timestamp))
        .bind(narrative.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::InvalidState(format!(
                "narrative {} is not active",
                narrative.id
            )));
        }
        Ok(())
    }

    // ==========================================================================
    // Watchlist
    // ==========================================================================

    pub async fn insert_watch_item(&self, item: &WatchlistItem) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO watchlist ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            WATCHLIST_COLUMNS
        );
        sqlx::query(&sql)
            .bind(item.id.to_string())
            .bind(item.date.to_string())
            .bind(&item.ticker)
            .bind(&item.setup)
            .bind(item.bias.as_str())
            .bind(i64::from(item.priority))
            .bind(item.status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The watchlist for one day, highest priority (1) first.
    pub async fn list_watchlist(&self, date: NaiveDate) -> Result<Vec<WatchlistItem>, DbError> {
        let sql = format!(
            "SELECT {} FROM watchlist WHERE date = ? ORDER BY priority ASC, rowid ASC",
            WATCHLIST_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(date.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(watch_item_from_row).collect()
    }

    pub async fn update_watch_status(&self, prefix: &str, status: WatchStatus) -> Result<Uuid, DbError> {
        let id = self.resolve_prefix(Table::Watchlist, prefix).await?;
        sqlx::query("UPDATE watchlist SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    /// Deletes watchlist items dated before `date`, returning how many were removed.
    pub async fn purge_watchlist_before(&self, date: NaiveDate) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM watchlist WHERE date < ?")
            .bind(date.to_string())
            .execute(&self.pool)
            .await?;
        tracing::info!(removed = result.rows_affected(), before = %date, "Purged watchlist.");
        Ok(result.rows_affected())
    }

    // ==========================================================================
    // Journal
    // ==========================================================================

    /// Creates the journal page for `date` on first write and merges later
    /// writes into it, keeping any field the update does not carry.
    pub async fn upsert_journal(
        &self,
        date: NaiveDate,
        update: JournalUpdate,
        at: DateTime<Utc>,
    ) -> Result<JournalEntry, DbError> {
        if update.is_empty() {
            return Err(DbError::InvalidState(format!(
                "journal write for {} carries no fields",
                date
            )));
        }

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {} FROM journal WHERE date = ?", JOURNAL_COLUMNS);
        let existing = sqlx::query(&sql)
            .bind(date.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let mut entry = match existing {
            Some(row) => journal_from_row(&row)?,
            None => JournalEntry::empty(date, at),
        };
        entry.apply(update, at);

        let sql = format!(
            "INSERT OR REPLACE INTO journal ({}) VALUES (?, ?, ?, ?, ?, ?)",
            JOURNAL_COLUMNS
        );
        sqlx::query(&sql)
            .bind(entry.date.to_string())
            .bind(entry.premarket_plan.as_deref())
            .bind(entry.postmarket_review.as_deref())
            .bind(entry.market_context.as_deref())
            .bind(entry.grade.map(|g| g.as_str()))
            .bind(timestamp(&entry.updated_at))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(entry)
    }

    pub async fn get_journal(&self, date: NaiveDate) -> Result<Option<JournalEntry>, DbError> {
        let sql = format!("SELECT {} FROM journal WHERE date = ?", JOURNAL_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(journal_from_row).transpose()
    }

    /// The most recent journal pages, newest first.
    pub async fn list_journal(&self, limit: u32) -> Result<Vec<JournalEntry>, DbError> {
        let sql = format!(
            "SELECT {} FROM journal ORDER BY date DESC LIMIT ?",
            JOURNAL_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(journal_from_row).collect()
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    /// Resolves a user-typed id prefix to exactly one record id.
    async fn resolve_prefix(&self, table: Table, prefix: &str) -> Result<Uuid, DbError> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return Err(DbError::NotFound(table.record().to_string()));
        }

        let sql = format!("SELECT id FROM {} WHERE id LIKE ? LIMIT 2", table.name());
        let ids: Vec<String> = sqlx::query_scalar(&sql)
            .bind(format!("{}%", prefix))
            .fetch_all(&self.pool)
            .await?;

        match ids.as_slice() {
            [] => Err(DbError::NotFound(table.record().to_string())),
            [id] => parse_value("id", id),
            _ => Err(DbError::Ambiguous(prefix)),
        }
    }
}

// ==============================================================================
// Row mapping
// ==============================================================================

/// Timestamps are stored as RFC 3339 text in UTC with second precision, which
/// sorts lexicographically in time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_value<T>(column: &'static str, raw: &str) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| DbError::Corrupt {
        column,
        reason: format!("'{}': {}", raw, e),
    })
}

fn parse_column<T>(row: &SqliteRow, column: &'static str) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(column)?;
    parse_value(column, &raw)
}

fn parse_optional<T>(row: &SqliteRow, column: &'static str) -> Result<Option<T>, DbError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|r| parse_value(column, &r)).transpose()
}

fn small_int<T: TryFrom<i64>>(row: &SqliteRow, column: &'static str) -> Result<T, DbError> {
    let raw: i64 = row.try_get(column)?;
    T::try_from(raw).map_err(|_| DbError::Corrupt {
        column,
        reason: format!("{} is out of range", raw),
    })
}

fn trade_from_row(row: &SqliteRow) -> Result<Trade, DbError> {
    Ok(Trade {
        id: parse_column(row, "id")?,
        ticker: row.try_get("ticker")?,
        direction: parse_column(row, "direction")?,
        instrument: parse_column(row, "instrument")?,
        entry_price: parse_column(row, "entry_price")?,
        exit_price: parse_optional(row, "exit_price")?,
        size: small_int(row, "size")?,
        cost_basis: parse_column(row, "cost_basis")?,
        proceeds: parse_optional(row, "proceeds")?,
        pnl: parse_optional(row, "pnl")?,
        setup_type: parse_optional(row, "setup_type")?,
        entry_time: parse_column(row, "entry_time")?,
        exit_time: parse_optional(row, "exit_time")?,
        status: parse_column(row, "status")?,
        is_paper: row.try_get("is_paper")?,
        notes: row.try_get("notes")?,
        lessons: row.try_get("lessons")?,
    })
}

fn narrative_from_row(row: &SqliteRow) -> Result<Narrative, DbError> {
    let key_levels: String = row.try_get("key_levels")?;
    Ok(Narrative {
        id: parse_column(row, "id")?,
        ticker: row.try_get("ticker")?,
        thesis: row.try_get("thesis")?,
        direction: parse_column(row, "direction")?,
        status: parse_column(row, "status")?,
        key_levels: serde_json::from_str::<Vec<Decimal>>(&key_levels)?,
        invalidation_price: parse_optional(row, "invalidation_price")?,
        created_at: parse_column(row, "created_at")?,
        resolved_at: parse_optional(row, "resolved_at")?,
    })
}

fn watch_item_from_row(row: &SqliteRow) -> Result<WatchlistItem, DbError> {
    Ok(WatchlistItem {
        id: parse_column(row, "id")?,
        date: parse_column(row, "date")?,
        ticker: row.try_get("ticker")?,
        setup: row.try_get("setup")?,
        bias: parse_column(row, "bias")?,
        priority: small_int(row, "priority")?,
        status: parse_column(row, "status")?,
    })
}

fn journal_from_row(row: &SqliteRow) -> Result<JournalEntry, DbError> {
    Ok(JournalEntry {
        date: parse_column(row, "date")?,
        premarket_plan: row.try_get("premarket_plan")?,
        postmarket_review: row.try_get("postmarket_review")?,
        market_context: row.try_get("market_context")?,
        grade: parse_optional(row, "grade")?,
        updated_at: parse_column(row, "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{connect_in_memory, run_migrations};
    use chrono::{Duration, TimeZone};
    use core_types::{Bias, Direction, Grade, Instrument, NewTrade, SetupType, short_id};
    use rust_decimal_macros::dec;

    async fn repo() -> DbRepository {
        let pool = connect_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        DbRepository::new(pool)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn open(ticker: &str, entry: DateTime<Utc>, paper: bool) -> Trade {
        Trade::open(NewTrade {
            ticker: ticker.to_string(),
            direction: Direction::Long,
            instrument: Instrument::Shares,
            entry_price: dec!(50.25),
            size: 10,
            setup_type: Some(SetupType::Pullback),
            entry_time: entry,
            is_paper: paper,
            notes: Some("first test".to_string()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn trade_round_trips_through_open_and_close() {
        let repo = repo().await;
        let mut trade = open("msft", at(4, 14), false);
        repo.insert_trade(&trade).await.unwrap();
        assert_eq!(repo.get_trade(trade.id).await.unwrap(), trade);

        trade.close(dec!(51.00), at(4, 15)).unwrap();
        trade.lessons = Some("held the trend".to_string());
        repo.close_trade(&trade).await.unwrap();

        let stored = repo.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Closed);
        assert_eq!(stored.pnl, Some(dec!(7.50)));
        assert_eq!(stored, trade);
    }

    #[tokio::test]
    async fn closing_twice_is_rejected_by_the_store() {
        let repo = repo().await;
        let mut trade = open("AAPL", at(4, 14), false);
        repo.insert_trade(&trade).await.unwrap();
        trade.close(dec!(49), at(4, 16)).unwrap();
        repo.close_trade(&trade).await.unwrap();

        let err = repo.close_trade(&trade).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState(_)));
    }

    #[tokio::test]
    async fn open_trade_cannot_be_persisted_as_closed() {
        let repo = repo().await;
        let trade = open("AAPL", at(4, 14), false);
        repo.insert_trade(&trade).await.unwrap();
        assert!(matches!(repo.close_trade(&trade).await, Err(DbError::InvalidState(_))));
    }

    #[tokio::test]
    async fn list_trades_applies_filters_newest_first() {
        let repo = repo().await;
        let mut older = open("SPY", at(4, 14), false);
        older.close(dec!(52), at(4, 15)).unwrap();
        let mut newer = open("SPY", at(6, 14), false);
        newer.close(dec!(48), at(6, 15)).unwrap();
        let still_open = open("QQQ", at(7, 14), false);
        let mut paper = open("SPY", at(5, 14), true);
        paper.close(dec!(60), at(5, 15)).unwrap();

        for trade in [&older, &newer, &still_open, &paper] {
            repo.insert_trade(trade).await.unwrap();
        }

        let closed = repo.list_trades(&TradeFilter::closed_real()).await.unwrap();
        let ids: Vec<Uuid> = closed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        let window = TradeFilter {
            since: Some(at(5, 0)),
            until: Some(at(7, 0)),
            ..Default::default()
        };
        let ids: Vec<Uuid> = repo.list_trades(&window).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![newer.id, paper.id]);

        let by_ticker = TradeFilter {
            ticker: Some("qqq".to_string()),
            status: Some(TradeStatus::Open),
            ..Default::default()
        };
        assert_eq!(repo.list_trades(&by_ticker).await.unwrap(), vec![still_open]);

        let limited = TradeFilter { limit: Some(1), ..Default::default() };
        assert_eq!(repo.list_trades(&limited).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn trades_are_found_by_unique_prefix() {
        let repo = repo().await;
        let trade = open("TSLA", at(4, 14), false);
        repo.insert_trade(&trade).await.unwrap();

        let found = repo.find_trade(&trade.short_id()).await.unwrap();
        assert_eq!(found.id, trade.id);
        assert!(matches!(repo.find_trade("zz%").await, Err(DbError::NotFound(_))));
        assert!(matches!(repo.find_trade("").await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn annotate_and_delete() {
        let repo = repo().await;
        let trade = open("AMD", at(4, 14), false);
        repo.insert_trade(&trade).await.unwrap();

        repo.annotate_trade(trade.id, None, Some("sized too big")).await.unwrap();
        let stored = repo.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.notes.as_deref(), Some("first test"));
        assert_eq!(stored.lessons.as_deref(), Some("sized too big"));

        repo.delete_trade(trade.id).await.unwrap();
        assert!(matches!(repo.get_trade(trade.id).await, Err(DbError::NotFound(_))));
        assert!(matches!(repo.delete_trade(trade.id).await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn narrative_lifecycle() {
        let repo = repo().await;
        let mut narrative = Narrative::new(
            "nvda",
            "Breaks 950 into earnings",
            Bias::Bull,
            vec![dec!(950), dec!(975.5)],
            Some(dec!(910)),
            at(4, 8),
        )
        .unwrap();
        repo.insert_narrative(&narrative).await.unwrap();

        let active = repo.list_narratives(Some(NarrativeStatus::Active), None).await.unwrap();
        assert_eq!(active, vec![narrative.clone()]);

        narrative.resolve(NarrativeStatus::Invalidated, at(5, 10)).unwrap();
        repo.resolve_narrative(&narrative).await.unwrap();
        assert!(matches!(repo.resolve_narrative(&narrative).await, Err(DbError::InvalidState(_))));

        let stored = repo.find_narrative(&short_id(&narrative.id)).await.unwrap();
        assert_eq!(stored.status, NarrativeStatus::Invalidated);
        assert_eq!(stored.key_levels, vec![dec!(950), dec!(975.5)]);
        assert!(repo.list_narratives(Some(NarrativeStatus::Active), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watchlist_is_scoped_to_a_day_and_purgeable() {
        let repo = repo().await;
        let today = at(6, 0).date_naive();
        let yesterday = today - Duration::days(1);

        let low = WatchlistItem::new(today, "aapl", "inside day", Bias::Bull, 3).unwrap();
        let high = WatchlistItem::new(today, "meta", "gap fill", Bias::Bear, 1).unwrap();
        let stale = WatchlistItem::new(yesterday, "spy", "range", Bias::Neutral, 2).unwrap();
        for item in [&low, &high, &stale] {
            repo.insert_watch_item(item).await.unwrap();
        }

        let tickers: Vec<String> = repo
            .list_watchlist(today)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.ticker)
            .collect();
        assert_eq!(tickers, vec!["META", "AAPL"]);

        repo.update_watch_status(&short_id(&high.id), WatchStatus::Triggered)
            .await
            .unwrap();
        assert_eq!(repo.list_watchlist(today).await.unwrap()[0].status, WatchStatus::Triggered);

        assert_eq!(repo.purge_watchlist_before(today).await.unwrap(), 1);
        assert!(repo.list_watchlist(yesterday).await.unwrap().is_empty());
        assert_eq!(repo.list_watchlist(today).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn journal_upsert_creates_then_merges() {
        let repo = repo().await;
        let date = at(4, 0).date_naive();
        assert!(repo.get_journal(date).await.unwrap().is_none());

        repo.upsert_journal(
            date,
            JournalUpdate { premarket_plan: Some("Only A+ setups".into()), ..Default::default() },
            at(4, 8),
        )
        .await
        .unwrap();
        let entry = repo
            .upsert_journal(
                date,
                JournalUpdate {
                    postmarket_review: Some("Followed the plan".into()),
                    grade: Some(Grade::A),
                    ..Default::default()
                },
                at(4, 17),
            )
            .await
            .unwrap();

        assert_eq!(entry.premarket_plan.as_deref(), Some("Only A+ setups"));
        assert_eq!(repo.get_journal(date).await.unwrap(), Some(entry));
        assert_eq!(repo.list_journal(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_journal_write_creates_no_page() {
        let repo = repo().await;
        let date = at(4, 0).date_naive();

        let result = repo.upsert_journal(date, JournalUpdate::default(), at(4, 8)).await;
        assert!(matches!(result, Err(DbError::InvalidState(_))));
        assert!(repo.get_journal(date).await.unwrap().is_none());
    }
}
