use chrono::{DateTime, Utc};

use crate::config::{
    BUY_CONFIDENCE_MIN, CONFIDENCE_MARGIN_MIN, PRESSURE_DAYS_LISTED, SOFTENING_DROP_PCT,
    SPARSE_DESCRIPTION_MAX,
};
use crate::types::{Action, Listing, PressureSignals};

/// Confidence score 0..=5, recomputed from the listing snapshot on every
/// refresh. One point each for: passed in twice, passed in three times, an
/// under-specified description, oracle margin at threshold, and a softened
/// reserve.
pub fn confidence_score(listing: &Listing) -> u8 {
    let mut score = 0u8;
    if listing.pass_count >= 2 {
        score += 1;
    }
    if listing.pass_count >= 3 {
        score += 1;
    }
    if listing.description_score <= SPARSE_DESCRIPTION_MAX {
        score += 1;
    }
    if listing.estimated_margin.is_some_and(|m| m >= CONFIDENCE_MARGIN_MIN) {
        score += 1;
    }
    if listing.price_drop_pct().is_some_and(|d| d >= SOFTENING_DROP_PCT) {
        score += 1;
    }
    score
}

/// Independent seller-urgency booleans plus their OR.
pub fn pressure_signals(listing: &Listing, now: DateTime<Utc>) -> PressureSignals {
    let pass_count_2_plus = listing.pass_count >= 2;
    let days_listed_14_plus = listing.days_listed(now) >= PRESSURE_DAYS_LISTED;
    let reserve_softening_5_plus = listing
        .price_drop_pct()
        .is_some_and(|d| d >= SOFTENING_DROP_PCT);
    PressureSignals {
        pass_count_2_plus,
        days_listed_14_plus,
        reserve_softening_5_plus,
        has_pressure: pass_count_2_plus || days_listed_14_plus || reserve_softening_5_plus,
    }
}

/// Two-factor gate: confidence is a static snapshot and does not prove the
/// seller wants to transact, so Buy additionally requires a pressure signal.
pub fn determine_action(score: u8, listing: &Listing, now: DateTime<Utc>) -> Action {
    if score >= BUY_CONFIDENCE_MIN && pressure_signals(listing, now).has_pressure {
        Action::Buy
    } else {
        Action::Watch
    }
}
