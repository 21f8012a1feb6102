pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{
    Bias, Direction, Grade, Instrument, NarrativeStatus, SetupType, TradeStatus, WatchStatus,
};
pub use error::CoreError;
pub use structs::{
    JournalEntry, JournalUpdate, Narrative, NewTrade, Trade, WatchlistItem, notional, short_id,
};
