use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{FINGERPRINT_TTL_DAYS, KM_TOLERANCE, STRICT_YEAR_TOLERANCE};
use crate::identity::normalizer;
use crate::types::{AccountSale, Drivetrain, Listing};

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// A reusable matching template derived from one historical sale (or one
/// manually curated spec). A fingerprint with `sale_km` is *full*; without,
/// it is *spec-only* and the km check is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub account_id: String,
    pub make: String,
    pub model: String,
    /// Normalized trim/variant token.
    pub variant: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub drivetrain: Drivetrain,
    #[serde(default)]
    pub transmission: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub sale_km: Option<u32>,
    /// Explicit band overrides; when absent the band is derived from sale_km.
    #[serde(default)]
    pub min_km: Option<u32>,
    #[serde(default)]
    pub max_km: Option<u32>,
    pub active: bool,
    pub expires_at: DateTime<Utc>,
}

impl Fingerprint {
    /// Derives a full fingerprint from a historical sale. Engine and
    /// transmission are not recorded on sales, so a derived fingerprint only
    /// strict-matches listings that also leave them unspecified.
    pub fn from_sale(sale: &AccountSale, now: DateTime<Utc>) -> Self {
        Self {
            account_id: sale.account_id.clone(),
            make: norm(&sale.make),
            model: norm(&sale.model),
            variant: sale.trim.as_deref().map(norm).unwrap_or_default(),
            engine: None,
            drivetrain: sale.drivetrain,
            transmission: None,
            year: sale.year,
            sale_km: sale.km.filter(|&km| km > 0),
            min_km: None,
            max_km: None,
            active: true,
            expires_at: now + Duration::days(FINGERPRINT_TTL_DAYS),
        }
    }

    /// Inclusive km band: `[max(0, sale_km − 15000), sale_km + 15000]`,
    /// unless explicitly overridden.
    fn km_band(&self, sale_km: u32) -> (u32, u32) {
        (
            self.min_km.unwrap_or_else(|| sale_km.saturating_sub(KM_TOLERANCE)),
            self.max_km.unwrap_or_else(|| sale_km.saturating_add(KM_TOLERANCE)),
        )
    }
}

fn norm(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

fn norm_opt(s: &Option<String>) -> String {
    s.as_deref().map(norm).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Strict matcher
// ---------------------------------------------------------------------------

/// Exact-attribute match: "is this literally the same spec this account has
/// sold before". Short-circuits in check order; no ladder substitution and no
/// wildcard drivetrain — this gate is deliberately stricter than ranking.
pub fn is_strict_match(listing: &Listing, fp: &Fingerprint, now: DateTime<Utc>) -> bool {
    if !fp.active || now > fp.expires_at {
        return false;
    }

    if norm(&listing.make) != fp.make || norm(&listing.model) != fp.model {
        return false;
    }
    let listing_variant = normalizer::extract_trim(&listing.variant, &listing.make, &listing.model)
        .unwrap_or_default();
    if listing_variant != fp.variant {
        return false;
    }
    if norm_opt(&listing.engine) != norm_opt(&fp.engine) {
        return false;
    }
    let listing_dt = listing
        .drivetrain
        .as_deref()
        .map(normalizer::bucket_drivetrain)
        .unwrap_or_default();
    if listing_dt != fp.drivetrain {
        return false;
    }
    if norm_opt(&listing.transmission) != norm_opt(&fp.transmission) {
        return false;
    }

    if (listing.year - fp.year).abs() > STRICT_YEAR_TOLERANCE {
        return false;
    }

    if let Some(sale_km) = fp.sale_km {
        let (min_km, max_km) = fp.km_band(sale_km);
        match listing.km {
            Some(km) => km >= min_km && km <= max_km,
            None => false,
        }
    } else {
        // Spec-only fingerprint: km is not checked.
        true
    }
}

// ---------------------------------------------------------------------------
// Fingerprint store
// ---------------------------------------------------------------------------

/// In-memory set of fingerprints, loaded once per run.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    fingerprints: Vec<Fingerprint>,
}

impl FingerprintStore {
    /// Builds one full fingerprint per profitable sale.
    pub fn from_profitable_sales(sales: &[AccountSale], now: DateTime<Utc>) -> Self {
        let fingerprints = sales
            .iter()
            .filter(|s| s.is_profitable())
            .map(|s| Fingerprint::from_sale(s, now))
            .collect();
        Self { fingerprints }
    }

    /// First strict match in store order.
    pub fn find_match(&self, listing: &Listing, now: DateTime<Utc>) -> Option<&Fingerprint> {
        self.fingerprints
            .iter()
            .find(|fp| is_strict_match(listing, fp, now))
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}
