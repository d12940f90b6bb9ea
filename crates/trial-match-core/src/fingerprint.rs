//! Content fingerprints.
//!
//! SHA-256 hex digests used to detect stale match results and to stamp
//! exported reports.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::{ClinicalTrial, Patient};

/// Bumped whenever scoring rules change, so old fingerprints stop matching.
pub const SCORING_VERSION: &str = "trial-match/1";

/// Compute SHA-256 hash of data.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

#[derive(Serialize)]
struct MatchInputs<'a> {
    version: &'static str,
    patient: &'a Patient,
    trials: &'a [ClinicalTrial],
}

/// Fingerprint of everything a matching run reads.
///
/// Trials are hashed in the order given, which is the order the matcher
/// sees them; reordering the catalog changes tie-breaks and so the result.
pub fn input_fingerprint(
    patient: &Patient,
    trials: &[ClinicalTrial],
) -> Result<String, serde_json::Error> {
    let inputs = MatchInputs {
        version: SCORING_VERSION,
        patient,
        trials,
    };
    let payload = serde_json::to_vec(&inputs)?;
    Ok(hash_data(&payload))
}
