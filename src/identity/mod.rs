pub mod ladder;
pub mod normalizer;

pub use ladder::TrimLadders;
