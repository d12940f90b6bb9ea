//! Domain models for the trial-matching system.

mod patient;
mod ranking;
mod trial;
mod trial_match;
mod twin;

pub use patient::*;
pub use ranking::*;
pub use trial::*;
pub use trial_match::*;
pub use twin::*;
