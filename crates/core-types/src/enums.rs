use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generates `as_str`, `Display` and a case-insensitive `FromStr` for a
/// fieldless enum whose variants map onto fixed kebab-case labels. The same
/// labels are used for the database columns and the command line.
macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_ascii_lowercase().replace('_', "-");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == needle)
                    .ok_or_else(|| CoreError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Long,
    Short,
}

labelled_enum!(Direction, "direction", {
    Long => "long",
    Short => "short",
});

/// The kind of instrument traded. Everything except `Shares` is an options
/// contract quoted per share with a 100-share multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    #[serde(rename = "shares")]
    Shares,
    #[serde(rename = "calls")]
    Calls,
    #[serde(rename = "puts")]
    Puts,
    #[serde(rename = "0dte-calls")]
    ZeroDteCalls,
    #[serde(rename = "0dte-puts")]
    ZeroDtePuts,
    /// Cash-secured put. Always opened by selling.
    #[serde(rename = "csp")]
    Csp,
}

labelled_enum!(Instrument, "instrument", {
    Shares => "shares",
    Calls => "calls",
    Puts => "puts",
    ZeroDteCalls => "0dte-calls",
    ZeroDtePuts => "0dte-puts",
    Csp => "csp",
});

impl Instrument {
    pub fn is_option(&self) -> bool {
        !matches!(self, Instrument::Shares)
    }

    /// Units of the underlying controlled by one unit of `size`.
    pub fn multiplier(&self) -> u32 {
        if self.is_option() { 100 } else { 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TradeStatus {
    Open,
    Closed,
}

labelled_enum!(TradeStatus, "trade status", {
    Open => "open",
    Closed => "closed",
});

/// The pattern that motivated a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetupType {
    Breakout,
    Pullback,
    Fade,
    Momentum,
    Reversal,
    GapAndGo,
    VwapReclaim,
    Earnings,
    Other,
}

labelled_enum!(SetupType, "setup type", {
    Breakout => "breakout",
    Pullback => "pullback",
    Fade => "fade",
    Momentum => "momentum",
    Reversal => "reversal",
    GapAndGo => "gap-and-go",
    VwapReclaim => "vwap-reclaim",
    Earnings => "earnings",
    Other => "other",
});

/// Directional view shared by narratives and watchlist items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bias {
    Bull,
    Bear,
    Neutral,
}

labelled_enum!(Bias, "bias", {
    Bull => "bull",
    Bear => "bear",
    Neutral => "neutral",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NarrativeStatus {
    Active,
    Triggered,
    Invalidated,
    Expired,
}

labelled_enum!(NarrativeStatus, "narrative status", {
    Active => "active",
    Triggered => "triggered",
    Invalidated => "invalidated",
    Expired => "expired",
});

impl NarrativeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NarrativeStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchStatus {
    Watching,
    Triggered,
    Skipped,
    Missed,
}

labelled_enum!(WatchStatus, "watchlist status", {
    Watching => "watching",
    Triggered => "triggered",
    Skipped => "skipped",
    Missed => "missed",
});

/// Self-assessed letter grade for a trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: &'static [Grade] = &[Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_uppercase();
        Grade::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == needle)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "grade",
                value: s.to_string(),
            })
    }
}
