//! Trial match storage and the match cache policy.
//!
//! A patient's matches are stored together with a fingerprint of the inputs
//! that produced them. Matching is skipped only while that fingerprint still
//! equals the fingerprint of the current patient record and active catalog.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::{Database, DbError, DbResult};
use crate::fingerprint::input_fingerprint;
use crate::insights::count_eligible_patients;
use crate::matcher::{CancerVocabulary, Matcher};
use crate::models::{CompletionLikelihood, ExplanationFactors, RankedPatient, TrialMatch};
use crate::ranking::rank_patients_by_ai_score;

/// Record of the last matching run for a patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRun {
    pub patient_id: String,
    pub input_fingerprint: String,
    pub match_count: u32,
    pub computed_at: String,
}

impl Database {
    /// Replace all stored matches for a patient and record the run, atomically.
    pub fn replace_matches(
        &mut self,
        patient_id: &str,
        matches: &[TrialMatch],
        fingerprint: &str,
    ) -> DbResult<()> {
        if let Some(stray) = matches.iter().find(|m| m.patient_id != patient_id) {
            return Err(DbError::Constraint(format!(
                "Match for patient {} cannot be stored under patient {}",
                stray.patient_id, patient_id
            )));
        }

        let tx = self.transaction()?;

        tx.execute("DELETE FROM trial_matches WHERE patient_id = ?", [patient_id])?;

        for (position, m) in matches.iter().enumerate() {
            let explanation_json = serde_json::to_string(&m.explanation_factors)?;
            tx.execute(
                r#"
                INSERT INTO trial_matches (
                    patient_id, trial_id, position, match_score, cancer_type_score,
                    biomarker_score, location_score, burden_score, completion_likelihood,
                    explanation_factors
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    m.patient_id,
                    m.trial_id,
                    position as i64,
                    m.match_score,
                    m.cancer_type_score,
                    m.biomarker_score,
                    m.location_score,
                    m.burden_score,
                    m.completion_likelihood.label(),
                    explanation_json,
                ],
            )?;
        }

        tx.execute(
            r#"
            INSERT INTO match_runs (patient_id, input_fingerprint, match_count, computed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(patient_id) DO UPDATE SET
                input_fingerprint = excluded.input_fingerprint,
                match_count = excluded.match_count,
                computed_at = excluded.computed_at
            "#,
            params![
                patient_id,
                fingerprint,
                matches.len() as i64,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Stored matches for a patient, best first.
    pub fn list_matches_for_patient(&self, patient_id: &str) -> DbResult<Vec<TrialMatch>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT patient_id, trial_id, match_score, cancer_type_score, biomarker_score,
                   location_score, burden_score, completion_likelihood, explanation_factors
            FROM trial_matches
            WHERE patient_id = ?
            ORDER BY position
            "#,
        )?;

        let rows = stmt.query_map([patient_id], match_row)?;

        rows.map(|r| r.map_err(DbError::from).and_then(TrialMatch::try_from))
            .collect()
    }

    /// All stored matches grouped by patient, each group best first.
    pub fn matches_by_patient(&self) -> DbResult<HashMap<String, Vec<TrialMatch>>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT patient_id, trial_id, match_score, cancer_type_score, biomarker_score,
                   location_score, burden_score, completion_likelihood, explanation_factors
            FROM trial_matches
            ORDER BY patient_id, position
            "#,
        )?;

        let rows = stmt.query_map([], match_row)?;

        let mut grouped: HashMap<String, Vec<TrialMatch>> = HashMap::new();
        for row in rows {
            let m = TrialMatch::try_from(row?)?;
            grouped.entry(m.patient_id.clone()).or_default().push(m);
        }
        Ok(grouped)
    }

    /// Last matching run for a patient, if any.
    pub fn get_match_run(&self, patient_id: &str) -> DbResult<Option<MatchRun>> {
        self.conn
            .query_row(
                r#"
                SELECT patient_id, input_fingerprint, match_count, computed_at
                FROM match_runs
                WHERE patient_id = ?
                "#,
                [patient_id],
                |row| {
                    Ok(MatchRun {
                        patient_id: row.get(0)?,
                        input_fingerprint: row.get(1)?,
                        match_count: row.get(2)?,
                        computed_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Drop a patient's stored matches so the next request recomputes them.
    pub fn invalidate_matches(&mut self, patient_id: &str) -> DbResult<()> {
        let tx = self.transaction()?;
        tx.execute("DELETE FROM trial_matches WHERE patient_id = ?", [patient_id])?;
        tx.execute("DELETE FROM match_runs WHERE patient_id = ?", [patient_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Return a patient's matches, recomputing them only when inputs changed.
    ///
    /// The cache key covers the patient record and the active catalog but not
    /// the vocabulary; call [`Database::invalidate_matches`] after swapping
    /// vocabularies.
    pub fn get_or_compute_matches<V: CancerVocabulary>(
        &mut self,
        matcher: &Matcher<V>,
        patient_id: &str,
    ) -> DbResult<Vec<TrialMatch>> {
        let patient = self
            .get_patient(patient_id)?
            .ok_or_else(|| DbError::NotFound(format!("Patient {}", patient_id)))?;
        let trials = self.list_active_trials()?;
        let fingerprint = input_fingerprint(&patient, &trials)?;

        if let Some(run) = self.get_match_run(patient_id)? {
            if run.input_fingerprint == fingerprint {
                info!(patient_id, match_count = run.match_count, "match cache hit");
                return self.list_matches_for_patient(patient_id);
            }
            debug!(patient_id, "match inputs changed since last run");
        }

        info!(patient_id, trial_count = trials.len(), "match cache miss, computing");
        let matches = matcher.compute_trial_matches(&patient, &trials);
        self.replace_matches(patient_id, &matches, &fingerprint)?;
        Ok(matches)
    }

    /// Current matches for every stored patient, recomputing stale ones.
    ///
    /// Goes through [`Database::get_or_compute_matches`] per patient, so no
    /// result built on a since-deactivated trial or an older patient record
    /// survives.
    pub fn refresh_all_matches<V: CancerVocabulary>(
        &mut self,
        matcher: &Matcher<V>,
    ) -> DbResult<HashMap<String, Vec<TrialMatch>>> {
        let mut grouped = HashMap::new();
        for patient in self.list_patients()? {
            let matches = self.get_or_compute_matches(matcher, &patient.id)?;
            grouped.insert(patient.id, matches);
        }
        Ok(grouped)
    }

    /// Rank every stored patient against the current active catalog.
    pub fn ranked_patients<V: CancerVocabulary>(
        &mut self,
        matcher: &Matcher<V>,
    ) -> DbResult<Vec<RankedPatient>> {
        let matches = self.refresh_all_matches(matcher)?;
        let patients = self.list_patients()?;
        let total_trials = self.count_active_trials()?;
        Ok(rank_patients_by_ai_score(&patients, &matches, total_trials))
    }

    /// Number of patients whose current match for a trial clears the eligibility threshold.
    pub fn eligible_patient_count<V: CancerVocabulary>(
        &mut self,
        matcher: &Matcher<V>,
        trial_id: &str,
    ) -> DbResult<usize> {
        let matches = self.refresh_all_matches(matcher)?;
        Ok(count_eligible_patients(trial_id, &matches))
    }
}

/// Intermediate row struct for database mapping.
struct MatchRow {
    patient_id: String,
    trial_id: String,
    match_score: u32,
    cancer_type_score: u32,
    biomarker_score: u32,
    location_score: u32,
    burden_score: u32,
    completion_likelihood: String,
    explanation_factors: String,
}

fn match_row(row: &Row<'_>) -> rusqlite::Result<MatchRow> {
    Ok(MatchRow {
        patient_id: row.get(0)?,
        trial_id: row.get(1)?,
        match_score: row.get(2)?,
        cancer_type_score: row.get(3)?,
        biomarker_score: row.get(4)?,
        location_score: row.get(5)?,
        burden_score: row.get(6)?,
        completion_likelihood: row.get(7)?,
        explanation_factors: row.get(8)?,
    })
}

impl TryFrom<MatchRow> for TrialMatch {
    type Error = DbError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        let completion_likelihood = CompletionLikelihood::from_label(&row.completion_likelihood)
            .ok_or_else(|| {
                DbError::Constraint(format!(
                    "Unknown completion likelihood: {}",
                    row.completion_likelihood
                ))
            })?;
        let explanation_factors: ExplanationFactors =
            serde_json::from_str(&row.explanation_factors)?;

        Ok(TrialMatch {
            patient_id: row.patient_id,
            trial_id: row.trial_id,
            match_score: row.match_score,
            cancer_type_score: row.cancer_type_score,
            biomarker_score: row.biomarker_score,
            location_score: row.location_score,
            burden_score: row.burden_score,
            completion_likelihood,
            explanation_factors,
        })
    }
}
