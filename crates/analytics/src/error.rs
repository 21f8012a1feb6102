use thiserror::Error;
use uuid::Uuid;

/// Precondition violations detected on the engine's input.
///
/// Well-formed input never fails: an empty slice produces a zeroed result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Trade {0} is not closed; only closed trades with a realized P&L can be analysed")]
    OpenTrade(Uuid),

    #[error("Streak input must be ordered by entry time, most recent first (violated at position {position})")]
    UnsortedInput { position: usize },
}
