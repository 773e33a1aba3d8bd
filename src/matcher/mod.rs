pub mod strict;

pub use strict::{is_strict_match, Fingerprint, FingerprintStore};
