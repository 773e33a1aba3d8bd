pub mod confidence;

pub use confidence::{confidence_score, determine_action, pressure_signals};
