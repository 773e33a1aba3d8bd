pub mod batch;

pub use batch::{sanitize_listings, BatchScorer, RunStats};
