use crate::error::{AppError, Result};

/// Km tolerance applied on both sides of a known sale km, for strict
/// fingerprint bands and for ranking-eligibility alike.
pub const KM_TOLERANCE: u32 = 15_000;

/// Year tolerance for strict fingerprint matching. Deliberately tighter than
/// the ranking tolerance below — a strict match gates direct alerting, not
/// discovery.
pub const STRICT_YEAR_TOLERANCE: i32 = 1;

/// Year tolerance for multi-account opportunity ranking.
pub const RANK_YEAR_TOLERANCE: i32 = 2;

/// An account match is dropped when the listing is priced more than this far
/// above the account's historical buy price (under_buy < UNDER_BUY_FLOOR).
pub const UNDER_BUY_FLOOR: f64 = -500.0;

/// Composite candidate-sale score weights: km proximity vs relative profit.
pub const KM_PROXIMITY_WEIGHT: f64 = 0.4;
pub const PROFIT_WEIGHT: f64 = 0.6;

/// Estimated margin at or above this adds a confidence point.
pub const CONFIDENCE_MARGIN_MIN: f64 = 2000.0;

/// Price drop (percent vs the previously observed price) that counts as
/// reserve softening, for both confidence and pressure.
pub const SOFTENING_DROP_PCT: f64 = 5.0;

/// A description-completeness score at or below this counts as under-specified.
pub const SPARSE_DESCRIPTION_MAX: u8 = 1;

/// Days on market at or above this is a pressure signal.
pub const PRESSURE_DAYS_LISTED: i64 = 14;

/// Minimum confidence score for a Buy action. Pressure is still required —
/// confidence alone never buys.
pub const BUY_CONFIDENCE_MIN: u8 = 4;

/// Opportunities untouched for this many days expire.
pub const OPPORTUNITY_EXPIRY_DAYS: i64 = 7;

/// Lifetime of a fingerprint derived from an account sale.
pub const FINGERPRINT_TTL_DAYS: i64 = 90;

/// Channel capacity for score-event routing.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Tier thresholds on the primary account match (dollars).
pub mod tier_thresholds {
    pub const UNDER_BUY_MIN: f64 = 1500.0;
    pub const CODE_RED_MARGIN: f64 = 6000.0;
    pub const HIGH_MARGIN: f64 = 4000.0;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Path to the pre-fetched candidate listings JSON (LISTINGS_PATH).
    pub listings_path: String,
    /// Path to the per-account sales JSON (SALES_PATH).
    pub sales_path: String,
    /// Optional trim-ladder override file merged over the built-in tables (LADDER_PATH).
    pub ladder_path: Option<String>,
    /// Where the scored opportunities JSON is written (OUTPUT_PATH).
    pub output_path: String,
    /// Worker-pool bound for the scoring fan-out (SCORING_CONCURRENCY).
    pub scoring_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            listings_path: std::env::var("LISTINGS_PATH")
                .unwrap_or_else(|_| "listings.json".to_string()),
            sales_path: std::env::var("SALES_PATH").unwrap_or_else(|_| "sales.json".to_string()),
            ladder_path: std::env::var("LADDER_PATH").ok().filter(|s| !s.is_empty()),
            output_path: std::env::var("OUTPUT_PATH")
                .unwrap_or_else(|_| "opportunities.json".to_string()),
            scoring_concurrency: std::env::var("SCORING_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse::<usize>()
                .map_err(|_| {
                    AppError::Config("SCORING_CONCURRENCY must be a positive integer".to_string())
                })?
                .max(1),
        })
    }
}
