use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::identity::TrimLadders;
use crate::ranker;
use crate::types::{AccountSale, DiscardReason, Listing, ScoreEvent, ScoreOutcome};

/// Per-run counters. Failures are local to a listing and accumulate here;
/// nothing in the scoring pass can abort the batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub scored: u64,
    pub invalid_input: u64,
    pub unresolved_identity: u64,
    pub unknown_trim: u64,
    pub no_platform_match: u64,
    pub below_threshold: u64,
    pub errors: u64,
}

impl RunStats {
    fn record_discard(&mut self, reason: DiscardReason) {
        match reason {
            DiscardReason::UnresolvedIdentity => self.unresolved_identity += 1,
            DiscardReason::UnknownTrim => self.unknown_trim += 1,
            DiscardReason::NoPlatformMatch => self.no_platform_match += 1,
            DiscardReason::BelowThreshold => self.below_threshold += 1,
        }
    }

    pub fn discarded(&self) -> u64 {
        self.unresolved_identity + self.unknown_trim + self.no_platform_match + self.below_threshold
    }
}

/// Boundary validation for a raw listing snapshot, applied before any
/// matching — strict alerting and ranking alike. Malformed numerics degrade
/// to missing data, unmatchable listings are excluded. Returns the surviving
/// listings and the excluded count.
pub fn sanitize_listings(listings: Vec<Listing>) -> (Vec<Listing>, u64) {
    let mut valid = Vec::with_capacity(listings.len());
    let mut excluded = 0u64;
    for mut listing in listings {
        if listing.km == Some(0) {
            listing.km = None;
        }
        if listing.is_valid() {
            valid.push(listing);
        } else {
            debug!(listing_id = %listing.id, "invalid listing excluded before scoring");
            excluded += 1;
        }
    }
    (valid, excluded)
}

/// Stateless batch pass: sales and ladders are loaded once and shared
/// read-only, every listing is scored independently on the blocking pool
/// with bounded concurrency, and results stream out over the event channel
/// as they arrive so partial runs still produce usable output.
pub struct BatchScorer {
    sales: Arc<Vec<AccountSale>>,
    ladders: Arc<TrimLadders>,
    concurrency: usize,
}

impl BatchScorer {
    pub fn new(sales: Arc<Vec<AccountSale>>, ladders: Arc<TrimLadders>, concurrency: usize) -> Self {
        Self {
            sales,
            ladders,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(
        &self,
        listings: Vec<Listing>,
        now: DateTime<Utc>,
        event_tx: mpsc::Sender<ScoreEvent>,
    ) -> RunStats {
        let mut stats = RunStats::default();

        // Applied here as well so a caller handing over a raw snapshot still
        // gets boundary validation; already-sanitized input is a no-op.
        let (valid, excluded) = sanitize_listings(listings);
        stats.invalid_input += excluded;

        let mut results = stream::iter(valid.into_iter().map(|listing| {
            let sales = Arc::clone(&self.sales);
            let ladders = Arc::clone(&self.ladders);
            tokio::task::spawn_blocking(move || {
                let outcome = ranker::score_listing(&listing, &sales, &ladders, now);
                (listing.id, outcome)
            })
        }))
        .buffer_unordered(self.concurrency);

        while let Some(joined) = results.next().await {
            let (listing_id, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("scoring task failed: {e}");
                    stats.errors += 1;
                    continue;
                }
            };
            let event = match outcome {
                ScoreOutcome::Scored(opp) => {
                    stats.scored += 1;
                    ScoreEvent::Scored(opp)
                }
                ScoreOutcome::Discarded(reason) => {
                    stats.record_discard(reason);
                    ScoreEvent::Discarded { listing_id, reason }
                }
            };
            if event_tx.send(event).await.is_err() {
                // Receiver dropped: run-level cancellation. Already-emitted
                // results remain valid.
                warn!("event channel closed, abandoning remaining listings");
                break;
            }
        }

        stats
    }
}
