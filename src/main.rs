mod config;
mod engine;
mod error;
mod identity;
mod matcher;
mod ranker;
mod scorer;
mod state;
mod types;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, CHANNEL_CAPACITY};
use crate::engine::{sanitize_listings, BatchScorer};
use crate::error::Result;
use crate::identity::TrimLadders;
use crate::matcher::FingerprintStore;
use crate::scorer::{confidence_score, determine_action};
use crate::state::OpportunityStore;
use crate::types::{AccountSale, Listing, Opportunity, ScoreEvent};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let now = Utc::now();

    // --- Load the run snapshot: listings, sales, ladder tables ---
    let listings: Vec<Listing> = load_json(&cfg.listings_path)?;
    let sales: Vec<AccountSale> = load_json(&cfg.sales_path)?;
    let ladders = match &cfg.ladder_path {
        Some(path) => TrimLadders::builtin().with_file(path)?,
        None => TrimLadders::builtin(),
    };
    info!(
        "Snapshot loaded: {} listings, {} sales, {} ladder platforms",
        listings.len(),
        sales.len(),
        ladders.platform_count(),
    );

    // Boundary validation up front, so invalid listings can never trigger a
    // strict alert either.
    let (listings, excluded) = sanitize_listings(listings);

    // --- Strict repeat-spec pass: fingerprints derived from profitable sales ---
    let fingerprints = FingerprintStore::from_profitable_sales(&sales, now);
    let mut strict_hits = 0u64;
    for listing in &listings {
        if let Some(fp) = fingerprints.find_match(listing, now) {
            strict_hits += 1;
            let score = confidence_score(listing);
            let action = determine_action(score, listing, now);
            info!(
                event = "REPEAT_SPEC",
                listing_id = %listing.id,
                account_id = %fp.account_id,
                confidence = score,
                action = %action,
                "REPEAT SPEC  | {} {} {} | account: {} | confidence: {score}/5 | action: {action}",
                listing.year, listing.make, listing.model, fp.account_id,
            );
        }
    }
    info!(
        "Strict pass: {strict_hits} repeat-spec hits against {} fingerprints",
        fingerprints.len()
    );

    // --- Multi-account scoring fan-out ---
    let store = OpportunityStore::new();
    let (event_tx, mut event_rx) = mpsc::channel::<ScoreEvent>(CHANNEL_CAPACITY);

    let batch = BatchScorer::new(
        Arc::new(sales),
        Arc::new(ladders),
        cfg.scoring_concurrency,
    );
    let scorer_task = tokio::spawn(async move { batch.run(listings, now, event_tx).await });

    // Event consumer: log and upsert as results stream in.
    while let Some(event) = event_rx.recv().await {
        match event {
            ScoreEvent::Scored(opp) => {
                log_opportunity(&opp);
                store.upsert(opp);
            }
            ScoreEvent::Discarded { listing_id, reason } => {
                debug!(listing_id = %listing_id, reason = %reason, "listing discarded");
            }
        }
    }

    let mut stats = scorer_task.await?;
    stats.invalid_input += excluded;

    // --- Freshness sweep and output ---
    let expired = store.expire_stale(now);
    let active = store.active();
    let out = std::fs::File::create(&cfg.output_path)?;
    serde_json::to_writer_pretty(out, &active)?;

    info!(
        scored = stats.scored,
        discarded = stats.discarded(),
        unresolved_identity = stats.unresolved_identity,
        unknown_trim = stats.unknown_trim,
        no_platform_match = stats.no_platform_match,
        below_threshold = stats.below_threshold,
        invalid_input = stats.invalid_input,
        errors = stats.errors,
        expired,
        "Run complete: {} active opportunities written to {}",
        active.len(),
        cfg.output_path,
    );

    Ok(())
}

fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn log_opportunity(opp: &Opportunity) {
    let tier_label = match opp.tier {
        types::Tier::CodeRed => "CODE_RED ← DROP EVERYTHING",
        types::Tier::High => "HIGH ← STRONG TARGET",
        types::Tier::Buy => "BUY ← PRICED UNDER",
        types::Tier::Watch => "WATCH",
    };
    info!(
        event = "OPPORTUNITY",
        listing_id = %opp.listing_id,
        tier = %opp.tier,
        account_id = %opp.best.account_id,
        expected_margin = opp.best.expected_margin,
        under_buy = opp.best.under_buy,
        alternates = opp.alt_matches.len(),
        "OPPORTUNITY  | {} {} {} {} | margin: ${:.0} | under buy: ${:.0} | alts: {} | {tier_label}",
        opp.year, opp.make, opp.model, opp.trim,
        opp.best.expected_margin, opp.best.under_buy, opp.alt_matches.len(),
    );
}
