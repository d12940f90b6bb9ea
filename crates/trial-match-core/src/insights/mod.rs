//! Insights derived from computed matches.
//!
//! - Explainability: feature importance, confidence and a narrative summary
//! - Eligibility: per-trial eligible-patient counts and enrollment checks

mod eligibility;
mod explainability;

pub use eligibility::*;
pub use explainability::*;
