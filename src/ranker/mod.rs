pub mod rank;

pub use rank::score_listing;
