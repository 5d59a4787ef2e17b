//! Tiering policy
//!
//! Maps cumulative turnover to a customer tier. Turnover never decreases
//! (redemptions only touch the bonus balance), so a tier can never go down.

/// Turnover at which a customer becomes silver (inclusive)
pub const SILVER_THRESHOLD: f64 = 10_000.0;

/// Turnover at which a customer becomes gold (inclusive)
pub const GOLD_THRESHOLD: f64 = 30_000.0;

/// Customer tier, derived solely from turnover.
///
/// Stored denormalized in the `clients` table as its lowercase name and
/// recomputed whenever turnover changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    #[default]
    Base,
    Silver,
    Gold,
}

impl Tier {
    /// Fraction of a purchase amount converted to bonus points.
    pub fn accrual_rate(self) -> f64 {
        match self {
            Tier::Base => 0.05,
            Tier::Silver => 0.07,
            Tier::Gold => 0.10,
        }
    }

    /// Name used in the `level` column of the clients sheet.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Base => "base",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
        }
    }

    /// Parses a stored level value; anything unrecognized falls back to base,
    /// matching how the sheet treats a blank cell.
    pub fn parse(s: &str) -> Tier {
        match s.trim() {
            "silver" => Tier::Silver,
            "gold" => Tier::Gold,
            _ => Tier::Base,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure tiering function: turnover to tier, lower bounds inclusive.
pub fn tier_of(turnover: f64) -> Tier {
    if turnover >= GOLD_THRESHOLD {
        Tier::Gold
    } else if turnover >= SILVER_THRESHOLD {
        Tier::Silver
    } else {
        Tier::Base
    }
}
