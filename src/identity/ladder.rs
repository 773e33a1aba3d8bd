use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Built-in trim ladders, base trim first. Rank is position in the list.
const DEFAULT_LADDERS: &[(&str, &[&str])] = &[
    ("FORD:RANGER", &["XL", "XLS", "XLT", "SPORT", "WILDTRAK", "RAPTOR"]),
    ("TOYOTA:HILUX", &["WORKMATE", "SR", "SR5", "ROGUE", "GR SPORT"]),
    ("ISUZU:D-MAX", &["SX", "LS-M", "LS-U", "X-TERRAIN"]),
    ("NISSAN:NAVARA", &["SL", "ST", "ST-X", "PRO-4X"]),
    ("MITSUBISHI:TRITON", &["GLX", "GLX+", "GLS", "GSR"]),
    ("MAZDA:BT-50", &["XS", "XT", "XTR", "GT", "SP"]),
    ("TOYOTA:PRADO", &["GX", "GXL", "VX", "KAKADU"]),
    ("TOYOTA:LC300", &["GX", "GXL", "VX", "SAHARA", "GR SPORT"]),
];

/// Immutable per-platform trim hierarchies, loaded once at startup and passed
/// by reference into the ranker.
#[derive(Debug, Clone)]
pub struct TrimLadders {
    ladders: HashMap<String, Vec<String>>,
}

impl TrimLadders {
    pub fn builtin() -> Self {
        let ladders = DEFAULT_LADDERS
            .iter()
            .map(|&(platform, trims)| {
                (
                    platform.to_string(),
                    trims.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();
        Self { ladders }
    }

    /// Merges ladder tables from a JSON file over the built-in set. The file
    /// maps platform class to an ordered trim list, base trim first; a
    /// platform present in the file replaces its built-in ladder entirely.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let extra: HashMap<String, Vec<String>> = serde_json::from_str(&raw)?;
        for (platform, trims) in extra {
            self.ladders.insert(
                platform.to_uppercase(),
                trims.into_iter().map(|t| t.to_uppercase()).collect(),
            );
        }
        Ok(self)
    }

    pub fn rank(&self, platform: &str, trim: &str) -> Option<usize> {
        let trim = trim.to_uppercase();
        self.ladders
            .get(platform)?
            .iter()
            .position(|t| *t == trim)
    }

    /// Whether a sale on `sale_trim` may anchor a listing on `listing_trim`.
    /// Identity is always allowed; otherwise the sale must sit exactly one
    /// rank below the listing — profit proven on a base trim extends one
    /// notch up, never down and never across a gap. Unknown platform or trim
    /// resolves to not-allowed.
    pub fn allowed(&self, platform: &str, listing_trim: &str, sale_trim: &str) -> bool {
        if listing_trim.eq_ignore_ascii_case(sale_trim) {
            return true;
        }
        match (self.rank(platform, listing_trim), self.rank(platform, sale_trim)) {
            (Some(listing_rank), Some(sale_rank)) => listing_rank == sale_rank + 1,
            _ => false,
        }
    }

    pub fn platform_count(&self) -> usize {
        self.ladders.len()
    }
}
