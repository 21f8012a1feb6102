use crate::enums::{
    Bias, Direction, Grade, Instrument, NarrativeStatus, SetupType, TradeStatus, WatchStatus,
};
use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// Trades
// ==============================================================================

/// A single discretionary or options trade.
///
/// A trade is created open (`pnl` is `None`) and closed exactly once, at which
/// point `exit_price`, `proceeds` and `pnl` become fixed. After closing, only
/// `notes` and `lessons` may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub ticker: String,
    pub direction: Direction,
    pub instrument: Instrument,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub size: u32,
    pub cost_basis: Decimal,
    pub proceeds: Option<Decimal>,
    pub pnl: Option<Decimal>,
    pub setup_type: Option<SetupType>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub status: TradeStatus,
    pub is_paper: bool,
    pub notes: Option<String>,
    pub lessons: Option<String>,
}

/// The user-supplied fields needed to open a trade.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub ticker: String,
    pub direction: Direction,
    pub instrument: Instrument,
    pub entry_price: Decimal,
    pub size: u32,
    pub setup_type: Option<SetupType>,
    pub entry_time: DateTime<Utc>,
    pub is_paper: bool,
    pub notes: Option<String>,
}

impl Trade {
    /// Opens a new trade, validating the inputs and computing the entry cost basis.
    pub fn open(new: NewTrade) -> Result<Self, CoreError> {
        let ticker = normalize_ticker(&new.ticker)?;

        if new.size == 0 {
            return Err(CoreError::InvalidInput(
                "size".to_string(),
                "must be a positive integer".to_string(),
            ));
        }
        if new.entry_price <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "entry_price".to_string(),
                format!("must be positive, got {}", new.entry_price),
            ));
        }
        if new.instrument == Instrument::Csp && new.direction != Direction::Short {
            return Err(CoreError::InvalidInput(
                "direction".to_string(),
                "a cash-secured put is always short".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            ticker,
            direction: new.direction,
            instrument: new.instrument,
            entry_price: new.entry_price,
            exit_price: None,
            size: new.size,
            cost_basis: notional(new.entry_price, new.size, new.instrument)?,
            proceeds: None,
            pnl: None,
            setup_type: new.setup_type,
            entry_time: new.entry_time,
            exit_time: None,
            status: TradeStatus::Open,
            is_paper: new.is_paper,
            notes: new.notes,
            lessons: None,
        })
    }

    /// Closes the trade at `exit_price`, fixing `proceeds`, `cost_basis` and `pnl`
    /// so that `pnl == proceeds - cost_basis`.
    ///
    /// A short position was opened by selling, so its proceeds are the entry
    /// notional and its cost basis is the buy-back notional.
    pub fn close(&mut self, exit_price: Decimal, exit_time: DateTime<Utc>) -> Result<(), CoreError> {
        if self.status == TradeStatus::Closed {
            return Err(CoreError::InvalidTransition(format!(
                "trade {} is already closed",
                self.id
            )));
        }
        if exit_price < Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "exit_price".to_string(),
                format!("must not be negative, got {}", exit_price),
            ));
        }
        if exit_time < self.entry_time {
            return Err(CoreError::InvalidInput(
                "exit_time".to_string(),
                format!("{} is before entry time {}", exit_time, self.entry_time),
            ));
        }

        let entry_notional = notional(self.entry_price, self.size, self.instrument)?;
        let exit_notional = notional(exit_price, self.size, self.instrument)?;
        let (cost_basis, proceeds) = match self.direction {
            Direction::Long => (entry_notional, exit_notional),
            Direction::Short => (exit_notional, entry_notional),
        };

        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        self.cost_basis = cost_basis;
        self.proceeds = Some(proceeds);
        self.pnl = Some(proceeds - cost_basis);
        self.status = TradeStatus::Closed;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// The label a trade is grouped under when breaking results down by setup.
    pub fn setup_label(&self) -> &'static str {
        self.setup_type.unwrap_or(SetupType::Other).as_str()
    }

    /// Short form of the id used on the command line.
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

/// The first eight hex digits of an id, accepted back as a lookup prefix.
pub fn short_id(id: &Uuid) -> String {
    let mut simple = id.simple().to_string();
    simple.truncate(8);
    simple
}

/// Price × size × contract multiplier.
pub fn notional(price: Decimal, size: u32, instrument: Instrument) -> Result<Decimal, CoreError> {
    price
        .checked_mul(Decimal::from(size))
        .and_then(|v| v.checked_mul(Decimal::from(instrument.multiplier())))
        .ok_or_else(|| {
            CoreError::InvalidInput(
                "price".to_string(),
                format!("{} x {} {} overflows", price, size, instrument),
            )
        })
}

fn normalize_ticker(raw: &str) -> Result<String, CoreError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() || !ticker.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '/') {
        return Err(CoreError::InvalidInput(
            "ticker".to_string(),
            format!("'{}' is not a valid symbol", raw),
        ));
    }
    Ok(ticker)
}

// ==============================================================================
// Narratives
// ==============================================================================

/// A market thesis for a ticker, tracked until it plays out or is invalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub id: Uuid,
    pub ticker: String,
    pub thesis: String,
    pub direction: Bias,
    pub status: NarrativeStatus,
    pub key_levels: Vec<Decimal>,
    pub invalidation_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Narrative {
    pub fn new(
        ticker: &str,
        thesis: &str,
        direction: Bias,
        key_levels: Vec<Decimal>,
        invalidation_price: Option<Decimal>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let thesis = thesis.trim();
        if thesis.is_empty() {
            return Err(CoreError::InvalidInput(
                "thesis".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            ticker: normalize_ticker(ticker)?,
            thesis: thesis.to_string(),
            direction,
            status: NarrativeStatus::Active,
            key_levels,
            invalidation_price,
            created_at,
            resolved_at: None,
        })
    }

    /// Moves an active narrative to a terminal status. This happens once.
    pub fn resolve(&mut self, status: NarrativeStatus, at: DateTime<Utc>) -> Result<(), CoreError> {
        if !status.is_terminal() {
            return Err(CoreError::InvalidTransition(
                "a narrative can only be resolved to a terminal status".to_string(),
            ));
        }
        if self.status.is_terminal() {
            return Err(CoreError::InvalidTransition(format!(
                "narrative {} is already {}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.resolved_at = Some(at);
        Ok(())
    }
}

// ==============================================================================
// Watchlist
// ==============================================================================

/// A ticker being watched on a given trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: Uuid,
    pub date: NaiveDate,
    pub ticker: String,
    pub setup: String,
    pub bias: Bias,
    pub priority: u8,
    pub status: WatchStatus,
}

impl WatchlistItem {
    pub const MIN_PRIORITY: u8 = 1;
    pub const MAX_PRIORITY: u8 = 5;

    pub fn new(date: NaiveDate, ticker: &str, setup: &str, bias: Bias, priority: u8) -> Result<Self, CoreError> {
        if !(Self::MIN_PRIORITY..=Self::MAX_PRIORITY).contains(&priority) {
            return Err(CoreError::InvalidInput(
                "priority".to_string(),
                format!(
                    "must be between {} and {}, got {}",
                    Self::MIN_PRIORITY,
                    Self::MAX_PRIORITY,
                    priority
                ),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            date,
            ticker: normalize_ticker(ticker)?,
            setup: setup.trim().to_string(),
            bias,
            priority,
            status: WatchStatus::Watching,
        })
    }
}

// ==============================================================================
// Journal
// ==============================================================================

/// The single journal page for a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub date: NaiveDate,
    pub premarket_plan: Option<String>,
    pub postmarket_review: Option<String>,
    pub market_context: Option<String>,
    pub grade: Option<Grade>,
    pub updated_at: DateTime<Utc>,
}

/// A partial write to a journal page. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JournalUpdate {
    pub premarket_plan: Option<String>,
    pub postmarket_review: Option<String>,
    pub market_context: Option<String>,
    pub grade: Option<Grade>,
}

impl JournalUpdate {
    pub fn is_empty(&self) -> bool {
        self.premarket_plan.is_none()
            && self.postmarket_review.is_none()
            && self.market_context.is_none()
            && self.grade.is_none()
    }
}

impl JournalEntry {
    pub fn empty(date: NaiveDate, at: DateTime<Utc>) -> Self {
        Self {
            date,
            premarket_plan: None,
            postmarket_review: None,
            market_context: None,
            grade: None,
            updated_at: at,
        }
    }

    /// Applies the fields present in `update`, keeping everything else.
    pub fn apply(&mut self, update: JournalUpdate, at: DateTime<Utc>) {
        if let Some(plan) = update.premarket_plan {
            self.premarket_plan = Some(plan);
        }
        if let Some(review) = update.postmarket_review {
            self.postmarket_review = Some(review);
        }
        if let Some(context) = update.market_context {
            self.market_context = Some(context);
        }
        if let Some(grade) = update.grade {
            self.grade = Some(grade);
        }
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, hour, 0, 0).unwrap()
    }

    fn new_trade(direction: Direction, instrument: Instrument, price: Decimal, size: u32) -> NewTrade {
        NewTrade {
            ticker: " spy ".to_string(),
            direction,
            instrument,
            entry_price: price,
            size,
            setup_type: Some(SetupType::Breakout),
            entry_time: at(14),
            is_paper: false,
            notes: None,
        }
    }

    #[test]
    fn open_trade_has_no_pnl() {
        let trade = Trade::open(new_trade(Direction::Long, Instrument::Shares, dec!(100.50), 10)).unwrap();
        assert_eq!(trade.ticker, "SPY");
        assert_eq!(trade.status, TradeStatus::Open);
        assert_eq!(trade.pnl, None);
        assert_eq!(trade.cost_basis, dec!(1005.00));
    }

    #[test]
    fn closing_a_long_option_applies_the_multiplier() {
        let mut trade = Trade::open(new_trade(Direction::Long, Instrument::Calls, dec!(1.20), 2)).unwrap();
        trade.close(dec!(1.75), at(15)).unwrap();

        assert_eq!(trade.cost_basis, dec!(240));
        assert_eq!(trade.proceeds, Some(dec!(350)));
        assert_eq!(trade.pnl, Some(dec!(110)));
        assert!(trade.is_closed());
    }

    #[test]
    fn closing_a_short_keeps_pnl_equal_to_proceeds_minus_cost() {
        let mut trade = Trade::open(new_trade(Direction::Short, Instrument::Csp, dec!(2.00), 1)).unwrap();
        trade.close(dec!(0.50), at(16)).unwrap();

        assert_eq!(trade.proceeds, Some(dec!(200)));
        assert_eq!(trade.cost_basis, dec!(50));
        assert_eq!(trade.pnl, Some(dec!(150)));
        assert_eq!(trade.pnl.unwrap(), trade.proceeds.unwrap() - trade.cost_basis);
    }

    #[test]
    fn a_trade_closes_only_once() {
        let mut trade = Trade::open(new_trade(Direction::Long, Instrument::Shares, dec!(10), 1)).unwrap();
        trade.close(dec!(11), at(15)).unwrap();
        let err = trade.close(dec!(12), at(16)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
        assert_eq!(trade.pnl, Some(dec!(1)));
    }

    #[test]
    fn rejects_invalid_open_inputs() {
        assert!(Trade::open(new_trade(Direction::Long, Instrument::Shares, dec!(10), 0)).is_err());
        assert!(Trade::open(new_trade(Direction::Long, Instrument::Shares, dec!(0), 1)).is_err());
        assert!(Trade::open(new_trade(Direction::Long, Instrument::Csp, dec!(1), 1)).is_err());

        let mut bad_ticker = new_trade(Direction::Long, Instrument::Shares, dec!(1), 1);
        bad_ticker.ticker = "  ".to_string();
        assert!(Trade::open(bad_ticker).is_err());
    }

    #[test]
    fn exit_before_entry_is_rejected() {
        let mut trade = Trade::open(new_trade(Direction::Long, Instrument::Shares, dec!(10), 1)).unwrap();
        assert!(trade.close(dec!(11), at(9)).is_err());
        assert_eq!(trade.status, TradeStatus::Open);
    }

    #[test]
    fn overflowing_notional_is_an_input_error() {
        let huge = new_trade(Direction::Long, Instrument::Calls, Decimal::MAX, 2);
        assert!(matches!(Trade::open(huge), Err(CoreError::InvalidInput(field, _)) if field == "price"));

        let mut trade = Trade::open(new_trade(Direction::Long, Instrument::Calls, dec!(1.5), 2)).unwrap();
        assert!(matches!(trade.close(Decimal::MAX, at(15)), Err(CoreError::InvalidInput(..))));
        assert_eq!(trade.status, TradeStatus::Open);
        assert_eq!(trade.pnl, None);
    }

    #[test]
    fn short_id_is_the_leading_hex_digits() {
        let trade = Trade::open(new_trade(Direction::Long, Instrument::Shares, dec!(10), 1)).unwrap();
        let short = trade.short_id();
        assert_eq!(short.len(), 8);
        assert!(trade.id.simple().to_string().starts_with(&short));
        assert_eq!(short, short_id(&trade.id));
    }

    #[test]
    fn untagged_trades_group_as_other() {
        let mut new = new_trade(Direction::Long, Instrument::Shares, dec!(10), 1);
        new.setup_type = None;
        let trade = Trade::open(new).unwrap();
        assert_eq!(trade.setup_label(), "other");
    }

    #[test]
    fn narrative_resolves_exactly_once() {
        let mut narrative = Narrative::new("nvda", "AI capex keeps rising", Bias::Bull, vec![dec!(900)], Some(dec!(850)), at(8)).unwrap();
        assert!(narrative.resolve(NarrativeStatus::Active, at(9)).is_err());
        narrative.resolve(NarrativeStatus::Triggered, at(10)).unwrap();
        assert_eq!(narrative.resolved_at, Some(at(10)));
        assert!(narrative.resolve(NarrativeStatus::Invalidated, at(11)).is_err());
        assert_eq!(narrative.status, NarrativeStatus::Triggered);
    }

    #[test]
    fn watchlist_priority_is_bounded() {
        let date = at(8).date_naive();
        assert!(WatchlistItem::new(date, "AAPL", "flag", Bias::Bull, 0).is_err());
        assert!(WatchlistItem::new(date, "AAPL", "flag", Bias::Bull, 6).is_err());
        let item = WatchlistItem::new(date, "aapl", " flag ", Bias::Bull, 5).unwrap();
        assert_eq!(item.setup, "flag");
        assert_eq!(item.status, WatchStatus::Watching);
    }

    #[test]
    fn journal_update_keeps_untouched_fields() {
        let mut entry = JournalEntry::empty(at(8).date_naive(), at(8));
        entry.apply(
            JournalUpdate { premarket_plan: Some("wait for ORB".into()), ..Default::default() },
            at(8),
        );
        entry.apply(
            JournalUpdate { grade: Some(Grade::B), ..Default::default() },
            at(17),
        );
        assert_eq!(entry.premarket_plan.as_deref(), Some("wait for ORB"));
        assert_eq!(entry.grade, Some(Grade::B));
        assert_eq!(entry.updated_at, at(17));
    }
}
