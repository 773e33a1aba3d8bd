use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::{
    KM_PROXIMITY_WEIGHT, KM_TOLERANCE, PROFIT_WEIGHT, RANK_YEAR_TOLERANCE, UNDER_BUY_FLOOR,
};
use crate::identity::{normalizer, TrimLadders};
use crate::types::{
    AccountMatch, AccountSale, DiscardReason, Listing, Opportunity, OpportunityStatus,
    ScoreOutcome, Tier,
};

/// Scores one listing against every account's sales and produces a tiered
/// opportunity, or a discard reason. Pure: all inputs are read-only and `now`
/// is injected, so identical inputs always produce identical output.
///
/// Tie-breaks (documented, stable): accounts are grouped in a BTreeMap, so
/// equal expected margins rank the lower account id first; equal composite
/// scores within an account keep the earlier sale in input order.
pub fn score_listing(
    listing: &Listing,
    sales: &[AccountSale],
    ladders: &TrimLadders,
    now: DateTime<Utc>,
) -> ScoreOutcome {
    let Some(platform) = normalizer::platform_class(&listing.make, &listing.model) else {
        return ScoreOutcome::Discarded(DiscardReason::UnresolvedIdentity);
    };
    let Some(listing_trim) = normalizer::extract_trim(&listing.variant, &listing.make, &listing.model)
    else {
        return ScoreOutcome::Discarded(DiscardReason::UnknownTrim);
    };
    let listing_dt = listing
        .drivetrain
        .as_deref()
        .map(normalizer::bucket_drivetrain)
        .unwrap_or_default();

    // Eligible candidate sales per account. Platform mismatch is tracked
    // separately so the discard reason distinguishes "never sold this
    // platform" from "sold it, but nothing survived the filters".
    let mut platform_seen = false;
    let mut by_account: BTreeMap<&str, Vec<&AccountSale>> = BTreeMap::new();
    for sale in sales {
        if sale.platform_class != platform {
            continue;
        }
        platform_seen = true;
        if !sale.is_profitable() {
            continue;
        }
        let Some(sale_trim) = sale.trim.as_deref() else {
            continue;
        };
        if !ladders.allowed(&platform, &listing_trim, sale_trim) {
            continue;
        }
        if (sale.year - listing.year).abs() > RANK_YEAR_TOLERANCE {
            continue;
        }
        if let (Some(sale_km), Some(listing_km)) = (sale.km, listing.km) {
            if sale_km.abs_diff(listing_km) > KM_TOLERANCE {
                continue;
            }
        }
        if !sale.drivetrain.compatible_with(listing_dt) {
            continue;
        }
        by_account.entry(&sale.account_id).or_default().push(sale);
    }

    if !platform_seen {
        return ScoreOutcome::Discarded(DiscardReason::NoPlatformMatch);
    }

    // Best candidate per account by composite score, then the under-buy floor.
    let mut matches: Vec<AccountMatch> = Vec::new();
    for (account_id, candidates) in by_account {
        let Some(anchor) = best_candidate(listing, &candidates) else {
            continue;
        };
        let under_buy = anchor.buy_price - listing.asking_price;
        if under_buy < UNDER_BUY_FLOOR {
            continue;
        }
        matches.push(AccountMatch {
            account_id: account_id.to_string(),
            anchor: anchor.clone(),
            expected_margin: anchor.sale_price - listing.asking_price,
            under_buy,
        });
    }

    if matches.is_empty() {
        return ScoreOutcome::Discarded(DiscardReason::BelowThreshold);
    }

    // Stable sort by expected margin desc; equal margins keep account-id order.
    matches.sort_by(|a, b| {
        b.expected_margin
            .partial_cmp(&a.expected_margin)
            .unwrap_or(Ordering::Equal)
    });
    let best = matches.remove(0);
    let tier = Tier::from_margins(best.under_buy, best.expected_margin);

    ScoreOutcome::Scored(Opportunity {
        listing_id: listing.id.clone(),
        make: listing.make.clone(),
        model: listing.model.clone(),
        year: listing.year,
        trim: listing_trim,
        asking_price: listing.asking_price,
        best,
        tier,
        alt_matches: matches,
        updated_at: now,
        days_listed: listing.days_listed(now),
        status: OpportunityStatus::New,
    })
}

/// Picks the account's single best sale by
/// `0.4 × km_proximity + 0.6 × relative_profit`. Km proximity is 0.5 when
/// either side lacks km; the profit denominator is clamped to ≥1 to guard
/// divide-by-zero. Strict `>` keeps the first candidate on ties.
fn best_candidate<'a>(listing: &Listing, candidates: &[&'a AccountSale]) -> Option<&'a AccountSale> {
    let max_profit = candidates
        .iter()
        .map(|s| s.profit())
        .fold(f64::MIN, f64::max)
        .max(1.0);

    let mut best: Option<(f64, &AccountSale)> = None;
    for &sale in candidates {
        let km_proximity = match (sale.km, listing.km) {
            (Some(sale_km), Some(listing_km)) => {
                1.0 - sale_km.abs_diff(listing_km) as f64 / KM_TOLERANCE as f64
            }
            _ => 0.5,
        };
        let relative_profit = sale.profit() / max_profit;
        let score = KM_PROXIMITY_WEIGHT * km_proximity + PROFIT_WEIGHT * relative_profit;
        if best.is_none_or(|(best_score, _)| score > best_score) {
            best = Some((score, sale));
        }
    }
    best.map(|(_, sale)| sale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Drivetrain, ListingStatus};

    fn ranger_listing() -> Listing {
        Listing {
            id: "l1".to_string(),
            source: "test".to_string(),
            make: "Ford".to_string(),
            model: "Ranger".to_string(),
            year: 2021,
            variant: "XLT Dual Cab 4x4".to_string(),
            km: Some(60_000),
            asking_price: 40_000.0,
            currency: "AUD".to_string(),
            engine: None,
            transmission: None,
            drivetrain: Some("4x4".to_string()),
            description_score: 2,
            pass_count: 0,
            previous_price: None,
            estimated_margin: None,
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            status: ListingStatus::Active,
        }
    }

    fn ranger_sale(account_id: &str, buy: f64, sell: f64) -> AccountSale {
        AccountSale {
            account_id: account_id.to_string(),
            make: "Ford".to_string(),
            model: "Ranger".to_string(),
            year: 2021,
            km: Some(58_000),
            trim: Some("XLT".to_string()),
            drivetrain: Drivetrain::FourWd,
            platform_class: "FORD:RANGER".to_string(),
            buy_price: buy,
            sale_price: sell,
        }
    }

    fn scored(outcome: ScoreOutcome) -> Opportunity {
        match outcome {
            ScoreOutcome::Scored(opp) => opp,
            ScoreOutcome::Discarded(reason) => panic!("unexpected discard: {reason}"),
        }
    }

    fn discarded(outcome: ScoreOutcome) -> DiscardReason {
        match outcome {
            ScoreOutcome::Discarded(reason) => reason,
            ScoreOutcome::Scored(opp) => panic!("unexpected score: {}", opp.listing_id),
        }
    }

    #[test]
    fn unknown_trim_is_rejected_first() {
        let mut listing = ranger_listing();
        listing.variant = "dual cab auto".to_string();
        let sales = vec![ranger_sale("acct1", 42_000.0, 47_000.0)];
        let outcome = score_listing(&listing, &sales, &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::UnknownTrim);
    }

    #[test]
    fn missing_identity_is_unresolvable() {
        let mut listing = ranger_listing();
        listing.model = "  ".to_string();
        let outcome = score_listing(&listing, &[], &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::UnresolvedIdentity);
    }

    #[test]
    fn no_platform_match_vs_below_threshold() {
        let listing = ranger_listing();

        // Only Hilux history: platform never matches.
        let mut hilux = ranger_sale("acct1", 42_000.0, 47_000.0);
        hilux.platform_class = "TOYOTA:HILUX".to_string();
        let outcome = score_listing(&listing, &[hilux], &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::NoPlatformMatch);

        // Platform matches but the sale made a loss.
        let losing = ranger_sale("acct1", 47_000.0, 42_000.0);
        let outcome = score_listing(&listing, &[losing], &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::BelowThreshold);
    }

    #[test]
    fn under_buy_floor_discards_overpriced_listing() {
        // buy 39_400 vs asking 40_000 → under_buy = -600 < -500.
        let sales = vec![ranger_sale("acct1", 39_400.0, 47_000.0)];
        let outcome = score_listing(&ranger_listing(), &sales, &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::BelowThreshold);
    }

    #[test]
    fn under_buy_floor_edge_survives() {
        // under_buy = -500 exactly is still eligible (floor is exclusive).
        let sales = vec![ranger_sale("acct1", 39_500.0, 47_000.0)];
        let opp = scored(score_listing(
            &ranger_listing(),
            &sales,
            &TrimLadders::builtin(),
            Utc::now(),
        ));
        assert_eq!(opp.tier, Tier::Watch);
        assert!((opp.best.under_buy - -500.0).abs() < 1e-9);
    }

    #[test]
    fn best_account_wins_and_others_become_alternates() {
        let sales = vec![
            // Account A: expected margin 5_000.
            ranger_sale("acct_a", 42_000.0, 45_000.0),
            // Account B: expected margin 7_000.
            ranger_sale("acct_b", 42_000.0, 47_000.0),
        ];
        let opp = scored(score_listing(
            &ranger_listing(),
            &sales,
            &TrimLadders::builtin(),
            Utc::now(),
        ));
        assert_eq!(opp.best.account_id, "acct_b");
        assert!((opp.best.expected_margin - 7_000.0).abs() < 1e-9);
        assert_eq!(opp.alt_matches.len(), 1);
        assert_eq!(opp.alt_matches[0].account_id, "acct_a");
        // under_buy 2_000, margin 7_000 → CODE_RED.
        assert_eq!(opp.tier, Tier::CodeRed);
    }

    #[test]
    fn equal_margins_rank_lower_account_id_first() {
        let sales = vec![
            ranger_sale("acct_b", 42_000.0, 46_000.0),
            ranger_sale("acct_a", 42_000.0, 46_000.0),
        ];
        let opp = scored(score_listing(
            &ranger_listing(),
            &sales,
            &TrimLadders::builtin(),
            Utc::now(),
        ));
        assert_eq!(opp.best.account_id, "acct_a");
        assert_eq!(opp.alt_matches[0].account_id, "acct_b");
    }

    #[test]
    fn one_step_trim_upgrade_is_anchored() {
        // Sale on XL, listing is XLT: exactly one notch up on FORD:RANGER.
        let mut listing = ranger_listing();
        listing.variant = "XLT Dual Cab".to_string();
        let mut sale = ranger_sale("acct1", 42_000.0, 46_000.0);
        sale.trim = Some("XLS".to_string());
        let opp = scored(score_listing(
            &listing,
            &[sale],
            &TrimLadders::builtin(),
            Utc::now(),
        ));
        assert_eq!(opp.trim, "XLT");

        // Two notches down is blocked.
        let mut sale = ranger_sale("acct1", 42_000.0, 46_000.0);
        sale.trim = Some("XL".to_string());
        let outcome = score_listing(&listing, &[sale], &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::BelowThreshold);
    }

    #[test]
    fn year_and_km_windows_filter_candidates() {
        let listing = ranger_listing();

        let mut sale = ranger_sale("acct1", 42_000.0, 46_000.0);
        sale.year = 2018; // |Δyear| = 3 > 2
        let outcome = score_listing(&listing, &[sale], &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::BelowThreshold);

        let mut sale = ranger_sale("acct1", 42_000.0, 46_000.0);
        sale.km = Some(80_000); // |Δkm| = 20_000 > 15_000
        let outcome = score_listing(&listing, &[sale], &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::BelowThreshold);

        // Unknown km on the sale side is a wildcard, not a mismatch.
        let mut sale = ranger_sale("acct1", 42_000.0, 46_000.0);
        sale.km = None;
        let opp = scored(score_listing(&listing, &[sale], &TrimLadders::builtin(), Utc::now()));
        assert_eq!(opp.best.account_id, "acct1");
    }

    #[test]
    fn drivetrain_mismatch_blocks_wildcard_does_not() {
        let listing = ranger_listing();

        let mut sale = ranger_sale("acct1", 42_000.0, 46_000.0);
        sale.drivetrain = Drivetrain::Rwd;
        let outcome = score_listing(&listing, &[sale], &TrimLadders::builtin(), Utc::now());
        assert_eq!(discarded(outcome), DiscardReason::BelowThreshold);

        let mut sale = ranger_sale("acct1", 42_000.0, 46_000.0);
        sale.drivetrain = Drivetrain::Unknown;
        let opp = scored(score_listing(&listing, &[sale], &TrimLadders::builtin(), Utc::now()));
        assert_eq!(opp.best.account_id, "acct1");
    }

    #[test]
    fn composite_score_prefers_profit_over_km_proximity() {
        // Same account: candidate 1 is km-closer, candidate 2 is much more
        // profitable. Weights 0.4/0.6 favor candidate 2:
        //   c1: 0.4·1.0 + 0.6·(2000/6000) = 0.60
        //   c2: 0.4·(1 − 12000/15000) + 0.6·1.0 = 0.68
        let mut near = ranger_sale("acct1", 42_000.0, 44_000.0);
        near.km = Some(60_000);
        let mut far = ranger_sale("acct1", 42_000.0, 48_000.0);
        far.km = Some(72_000);

        let opp = scored(score_listing(
            &ranger_listing(),
            &[near, far],
            &TrimLadders::builtin(),
            Utc::now(),
        ));
        assert_eq!(opp.best.anchor.km, Some(72_000));
        assert!((opp.best.expected_margin - 8_000.0).abs() < 1e-9);
    }

    #[test]
    fn scoring_is_deterministic() {
        let now = Utc::now();
        let listing = ranger_listing();
        let sales = vec![
            ranger_sale("acct_a", 42_000.0, 45_000.0),
            ranger_sale("acct_b", 42_000.0, 47_000.0),
            ranger_sale("acct_c", 41_000.0, 46_500.0),
        ];
        let ladders = TrimLadders::builtin();

        let first = scored(score_listing(&listing, &sales, &ladders, now));
        let second = scored(score_listing(&listing, &sales, &ladders, now));
        assert_eq!(first.best.account_id, second.best.account_id);
        assert_eq!(first.tier, second.tier);
        assert!((first.best.expected_margin - second.best.expected_margin).abs() < 1e-12);
        assert_eq!(first.alt_matches.len(), second.alt_matches.len());
    }
}
