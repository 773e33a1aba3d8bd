use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::config::OPPORTUNITY_EXPIRY_DAYS;
use crate::types::{Opportunity, OpportunityStatus};

/// In-memory opportunity set, keyed by listing id. Upserts replace the whole
/// record, so re-scoring the same snapshot is idempotent and alt_matches
/// never accumulate duplicates. Concurrent upserts race last-write-wins,
/// which is acceptable: results are idempotent given the same inputs.
pub struct OpportunityStore {
    opportunities: DashMap<String, Opportunity>,
}

impl OpportunityStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            opportunities: DashMap::new(),
        })
    }

    pub fn upsert(&self, opp: Opportunity) {
        self.opportunities.insert(opp.listing_id.clone(), opp);
    }

    pub fn get(&self, listing_id: &str) -> Option<Opportunity> {
        self.opportunities.get(listing_id).map(|o| o.clone())
    }

    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }

    /// Non-expired opportunities, best first: tier, then expected margin desc.
    pub fn active(&self) -> Vec<Opportunity> {
        let mut active: Vec<Opportunity> = self
            .opportunities
            .iter()
            .filter(|entry| entry.value().status != OpportunityStatus::Expired)
            .map(|entry| entry.value().clone())
            .collect();
        active.sort_by(|a, b| {
            a.tier.cmp(&b.tier).then(
                b.best
                    .expected_margin
                    .partial_cmp(&a.best.expected_margin)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        active
    }

    /// Time-based sweep, independent of re-scoring: anything still new or
    /// reviewed but untouched for 7 days transitions to expired. Returns the
    /// number of transitions.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(OPPORTUNITY_EXPIRY_DAYS);
        let mut expired = 0;
        for mut entry in self.opportunities.iter_mut() {
            let opp = entry.value_mut();
            let sweepable = matches!(
                opp.status,
                OpportunityStatus::New | OpportunityStatus::Reviewed
            );
            if sweepable && opp.updated_at < cutoff {
                opp.status = OpportunityStatus::Expired;
                expired += 1;
            }
        }
        expired
    }
}
