//! Export of stored match results for downstream review.

mod reports;

pub use reports::*;
