use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::tier_thresholds;

// ---------------------------------------------------------------------------
// Drivetrain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Drivetrain {
    #[serde(rename = "4wd")]
    FourWd,
    #[serde(rename = "awd")]
    Awd,
    #[serde(rename = "fwd")]
    Fwd,
    #[serde(rename = "rwd")]
    Rwd,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Drivetrain {
    /// Unknown acts as a wildcard for ranking: it never blocks a match.
    /// A concrete mismatch always blocks.
    pub fn compatible_with(self, other: Drivetrain) -> bool {
        self == Drivetrain::Unknown || other == Drivetrain::Unknown || self == other
    }
}

impl std::fmt::Display for Drivetrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Drivetrain::FourWd => "4wd",
            Drivetrain::Awd => "awd",
            Drivetrain::Fwd => "fwd",
            Drivetrain::Rwd => "rwd",
            Drivetrain::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    New,
    Active,
    Watching,
    Expired,
}

/// A candidate vehicle for sale, already deduplicated and filtered to live
/// lifecycle states by the ingestion side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub source: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    /// Free-text trim/badge/body description as scraped.
    pub variant: String,
    #[serde(default)]
    pub km: Option<u32>,
    pub asking_price: f64,
    pub currency: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub drivetrain: Option<String>,
    /// 0..=3 completeness of the seller's description.
    #[serde(default)]
    pub description_score: u8,
    /// Relist/pass count observed across refreshes.
    #[serde(default)]
    pub pass_count: u32,
    /// Asking price at the immediately prior observation.
    #[serde(default)]
    pub previous_price: Option<f64>,
    /// Retail-deviation estimate supplied by an external oracle.
    #[serde(default)]
    pub estimated_margin: Option<f64>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: ListingStatus,
}

impl Listing {
    /// Boundary validation: year and price must be positive, make and model
    /// must resolve. Anything else is unmatchable and excluded before scoring.
    pub fn is_valid(&self) -> bool {
        self.year > 0
            && self.asking_price > 0.0
            && !self.make.trim().is_empty()
            && !self.model.trim().is_empty()
    }

    /// Percent drop vs the previously observed price. Negative when the price
    /// went up. None when there is no usable prior observation.
    pub fn price_drop_pct(&self) -> Option<f64> {
        let prev = self.previous_price?;
        if prev <= 0.0 {
            return None;
        }
        Some((prev - self.asking_price) / prev * 100.0)
    }

    pub fn days_listed(&self, now: DateTime<Utc>) -> i64 {
        (now - self.first_seen).num_days().max(0)
    }
}

// ---------------------------------------------------------------------------
// Account sale
// ---------------------------------------------------------------------------

/// One row of proven outcome for a business account. Immutable once loaded —
/// corrections arrive as replacement rows, never as mid-run mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSale {
    pub account_id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub km: Option<u32>,
    #[serde(default)]
    pub trim: Option<String>,
    #[serde(default)]
    pub drivetrain: Drivetrain,
    pub platform_class: String,
    pub buy_price: f64,
    pub sale_price: f64,
}

impl AccountSale {
    pub fn profit(&self) -> f64 {
        self.sale_price - self.buy_price
    }

    /// Only profitable sales anchor opportunities.
    pub fn is_profitable(&self) -> bool {
        self.profit() > 0.0
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Urgency/quality classification of an opportunity. Declaration order is
/// best-first so `Ord` sorts CODE_RED ahead of WATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    CodeRed,
    High,
    Buy,
    Watch,
}

impl Tier {
    /// First matching rule wins; anything without real under-buy headroom is
    /// a Watch regardless of margin.
    pub fn from_margins(under_buy: f64, expected_margin: f64) -> Self {
        if under_buy >= tier_thresholds::UNDER_BUY_MIN {
            if expected_margin >= tier_thresholds::CODE_RED_MARGIN {
                Tier::CodeRed
            } else if expected_margin >= tier_thresholds::HIGH_MARGIN {
                Tier::High
            } else {
                Tier::Buy
            }
        } else {
            Tier::Watch
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::CodeRed => "CODE_RED",
            Tier::High => "HIGH",
            Tier::Buy => "BUY",
            Tier::Watch => "WATCH",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    New,
    Reviewed,
    Expired,
}

/// One account's match against a listing: the anchor sale proving
/// profitability plus the derived dollar figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMatch {
    pub account_id: String,
    pub anchor: AccountSale,
    /// anchor.sale_price − listing.asking_price
    pub expected_margin: f64,
    /// anchor.buy_price − listing.asking_price
    pub under_buy: f64,
}

/// Engine output for one scored listing. Upserted by listing id on every
/// scoring pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub listing_id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub trim: String,
    pub asking_price: f64,
    pub best: AccountMatch,
    pub tier: Tier,
    /// Other accounts' surviving matches, ranked by expected_margin desc.
    pub alt_matches: Vec<AccountMatch>,
    pub updated_at: DateTime<Utc>,
    pub days_listed: i64,
    pub status: OpportunityStatus,
}

// ---------------------------------------------------------------------------
// Scoring outcomes and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Make or model missing — no platform class can be formed.
    UnresolvedIdentity,
    /// Trim extraction came back empty; too little identity to score safely.
    UnknownTrim,
    /// No account has any sale on this platform class.
    NoPlatformMatch,
    /// Platform-matching sales exist but none survived the filters or the
    /// under-buy floor.
    BelowThreshold,
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiscardReason::UnresolvedIdentity => "unresolved_identity",
            DiscardReason::UnknownTrim => "unknown_trim",
            DiscardReason::NoPlatformMatch => "no_platform_match",
            DiscardReason::BelowThreshold => "below_threshold",
        };
        write!(f, "{s}")
    }
}

/// Result of scoring one listing against the sales dataset.
#[derive(Debug, Clone)]
pub enum ScoreOutcome {
    Scored(Opportunity),
    Discarded(DiscardReason),
}

/// Routed from the batch scorer to the event consumer.
#[derive(Debug, Clone)]
pub enum ScoreEvent {
    Scored(Opportunity),
    Discarded {
        listing_id: String,
        reason: DiscardReason,
    },
}

// ---------------------------------------------------------------------------
// Seller pressure
// ---------------------------------------------------------------------------

/// Independent behavioral indicators of seller urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureSignals {
    pub pass_count_2_plus: bool,
    pub days_listed_14_plus: bool,
    pub reserve_softening_5_plus: bool,
    pub has_pressure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Watch,
    Buy,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Watch => write!(f, "watch"),
            Action::Buy => write!(f, "buy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_first_rule_wins() {
        assert_eq!(Tier::from_margins(1600.0, 6100.0), Tier::CodeRed);
        assert_eq!(Tier::from_margins(1600.0, 4500.0), Tier::High);
        assert_eq!(Tier::from_margins(1600.0, 1000.0), Tier::Buy);
        assert_eq!(Tier::from_margins(1000.0, 9000.0), Tier::Watch);
    }

    #[test]
    fn tier_threshold_edges_are_inclusive() {
        assert_eq!(Tier::from_margins(1500.0, 6000.0), Tier::CodeRed);
        assert_eq!(Tier::from_margins(1500.0, 4000.0), Tier::High);
        assert_eq!(Tier::from_margins(1499.99, 6000.0), Tier::Watch);
    }

    #[test]
    fn tier_sort_order_is_best_first() {
        let mut tiers = vec![Tier::Watch, Tier::CodeRed, Tier::Buy, Tier::High];
        tiers.sort();
        assert_eq!(tiers, vec![Tier::CodeRed, Tier::High, Tier::Buy, Tier::Watch]);
    }

    #[test]
    fn drivetrain_unknown_is_wildcard() {
        assert!(Drivetrain::Unknown.compatible_with(Drivetrain::FourWd));
        assert!(Drivetrain::Rwd.compatible_with(Drivetrain::Unknown));
        assert!(Drivetrain::Awd.compatible_with(Drivetrain::Awd));
        assert!(!Drivetrain::FourWd.compatible_with(Drivetrain::Rwd));
    }

    #[test]
    fn price_drop_requires_usable_prior_price() {
        let mut listing = test_listing();
        assert!(listing.price_drop_pct().is_none());

        listing.previous_price = Some(0.0);
        assert!(listing.price_drop_pct().is_none());

        listing.previous_price = Some(40_000.0);
        listing.asking_price = 38_000.0;
        let drop = listing.price_drop_pct().unwrap();
        assert!((drop - 5.0).abs() < 1e-9, "drop={drop}");
    }

    fn test_listing() -> Listing {
        Listing {
            id: "l1".to_string(),
            source: "test".to_string(),
            make: "Ford".to_string(),
            model: "Ranger".to_string(),
            year: 2021,
            variant: "XLT".to_string(),
            km: Some(60_000),
            asking_price: 39_000.0,
            currency: "AUD".to_string(),
            engine: None,
            transmission: None,
            drivetrain: None,
            description_score: 2,
            pass_count: 0,
            previous_price: None,
            estimated_margin: None,
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            status: ListingStatus::Active,
        }
    }
}
