//! Match report export (JSON and CSV).
//!
//! Each report carries a SHA-256 digest of its match lines so a reviewer can
//! tell whether two exports describe the same results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::fingerprint::hash_data;
use crate::models::{ClinicalTrial, Patient, TrialMatch};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

const CSV_HEADER: &str = "patient_id,patient_name,primary_diagnosis,cancer_stage,rank,trial_id,trial_name,match_score,cancer_type_score,biomarker_score,location_score,burden_score,completion_likelihood,digest\n";

/// Match report for a single patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub metadata: ReportMetadata,
    pub lines: Vec<MatchReportLine>,
}

/// Report metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub patient_id: String,
    pub patient_name: String,
    pub primary_diagnosis: String,
    pub cancer_stage: String,
    /// Export timestamp
    pub generated_at: String,
    /// SHA-256 of the patient ID and match lines
    pub digest: String,
}

/// One ranked match in a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchReportLine {
    /// 1-based, best first
    pub rank: u32,
    pub trial_id: String,
    /// Empty when the trial is no longer in the catalog
    pub trial_name: String,
    pub match_score: u32,
    pub cancer_type_score: u32,
    pub biomarker_score: u32,
    pub location_score: u32,
    pub burden_score: u32,
    pub completion_likelihood: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
}

#[derive(Serialize)]
struct DigestPayload<'a> {
    patient_id: &'a str,
    lines: &'a [MatchReportLine],
}

impl MatchReport {
    /// Build a report from a patient's matches; `trials` supplies display names.
    pub fn build(
        patient: &Patient,
        matches: &[TrialMatch],
        trials: &[ClinicalTrial],
    ) -> Result<Self, serde_json::Error> {
        let names: HashMap<&str, &str> = trials
            .iter()
            .map(|t| (t.id.as_str(), t.name.as_str()))
            .collect();

        let lines: Vec<MatchReportLine> = matches
            .iter()
            .enumerate()
            .map(|(i, m)| MatchReportLine {
                rank: i as u32 + 1,
                trial_id: m.trial_id.clone(),
                trial_name: names.get(m.trial_id.as_str()).copied().unwrap_or("").to_string(),
                match_score: m.match_score,
                cancer_type_score: m.cancer_type_score,
                biomarker_score: m.biomarker_score,
                location_score: m.location_score,
                burden_score: m.burden_score,
                completion_likelihood: m.completion_likelihood.label().to_string(),
                strengths: m.explanation_factors.positive.iter().map(|f| f.factor.clone()).collect(),
                concerns: m.explanation_factors.negative.iter().map(|f| f.factor.clone()).collect(),
            })
            .collect();

        let digest = compute_digest(&patient.id, &lines)?;

        Ok(Self {
            metadata: ReportMetadata {
                patient_id: patient.id.clone(),
                patient_name: patient.full_name(),
                primary_diagnosis: patient.primary_diagnosis.clone(),
                cancer_stage: patient.cancer_stage.label().to_string(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                digest,
            },
            lines,
        })
    }

    /// Check that the digest still matches the lines.
    pub fn verify_digest(&self) -> Result<bool, serde_json::Error> {
        Ok(compute_digest(&self.metadata.patient_id, &self.lines)? == self.metadata.digest)
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        self.write_csv_rows(&mut csv);
        csv
    }

    fn write_csv_rows(&self, csv: &mut String) {
        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&self.metadata.patient_id),
                escape_csv(&self.metadata.patient_name),
                escape_csv(&self.metadata.primary_diagnosis),
                escape_csv(&self.metadata.cancer_stage),
                line.rank,
                escape_csv(&line.trial_id),
                escape_csv(&line.trial_name),
                line.match_score,
                line.cancer_type_score,
                line.biomarker_score,
                line.location_score,
                line.burden_score,
                line.completion_likelihood,
                self.metadata.digest,
            ));
        }
    }
}

/// Reports for many patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchMatchReport {
    pub exported_at: String,
    pub reports: Vec<MatchReport>,
    pub total_matches: usize,
    /// SHA-256 over the per-report digests, in order
    pub digest: String,
}

impl BatchMatchReport {
    /// Combine per-patient reports.
    pub fn from_reports(reports: Vec<MatchReport>) -> Self {
        let total_matches = reports.iter().map(|r| r.lines.len()).sum();
        let joined: String = reports.iter().map(|r| r.metadata.digest.as_str()).collect();

        Self {
            exported_at: chrono::Utc::now().to_rfc3339(),
            digest: hash_data(joined.as_bytes()),
            reports,
            total_matches,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        for report in &self.reports {
            report.write_csv_rows(&mut csv);
        }
        csv
    }
}

/// Builds reports from stored patients, trials and matches.
pub struct MatchExporter<'a> {
    db: &'a Database,
}

impl<'a> MatchExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Report for one patient's stored matches.
    pub fn export_patient(&self, patient_id: &str) -> ExportResult<MatchReport> {
        let patient = self
            .db
            .get_patient(patient_id)?
            .ok_or_else(|| DbError::NotFound(format!("Patient {}", patient_id)))?;
        let matches = self.db.list_matches_for_patient(patient_id)?;
        let trials = self.trials_for(&matches)?;

        Ok(MatchReport::build(&patient, &matches, &trials)?)
    }

    /// Reports for every stored patient, in insertion order.
    pub fn export_all(&self) -> ExportResult<BatchMatchReport> {
        let mut by_patient = self.db.matches_by_patient()?;
        let mut reports = Vec::new();

        for patient in self.db.list_patients()? {
            let matches = by_patient.remove(&patient.id).unwrap_or_default();
            let trials = self.trials_for(&matches)?;
            reports.push(MatchReport::build(&patient, &matches, &trials)?);
        }

        Ok(BatchMatchReport::from_reports(reports))
    }

    fn trials_for(&self, matches: &[TrialMatch]) -> ExportResult<Vec<ClinicalTrial>> {
        let mut trials = Vec::with_capacity(matches.len());
        for m in matches {
            if let Some(trial) = self.db.get_trial(&m.trial_id)? {
                trials.push(trial);
            }
        }
        Ok(trials)
    }
}

fn compute_digest(patient_id: &str, lines: &[MatchReportLine]) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_vec(&DigestPayload { patient_id, lines })?;
    Ok(hash_data(&payload))
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Matcher;
    use crate::models::CancerStage;

    fn sample() -> (Patient, Vec<ClinicalTrial>) {
        let mut patient = Patient::new(
            "Sarah".into(),
            "Johnson".into(),
            52,
            "Breast Cancer".into(),
            CancerStage::StageII,
        );
        patient.location = "Boston, MA".into();
        patient.biomarkers.insert("HER2".into(), "Positive".into());

        let mut her2 = ClinicalTrial::new("t-her2".into(), "HER2+ Breast Cancer Immunotherapy Trial".into());
        her2.location = "Boston, MA".into();
        her2.inclusion_criteria.biomarkers = vec!["HER2+".into()];

        let mut breast = ClinicalTrial::new("t-breast".into(), "Breast Cancer, Early Detection".into());
        breast.location = "Miami, FL".into();

        (patient, vec![her2, breast])
    }

    #[test]
    fn test_build_report() {
        let (patient, trials) = sample();
        let matches = Matcher::new().compute_trial_matches(&patient, &trials);
        let report = MatchReport::build(&patient, &matches, &trials).unwrap();

        assert_eq!(report.metadata.patient_name, "Sarah Johnson");
        assert_eq!(report.metadata.cancer_stage, "Stage II");
        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.lines[0].rank, 1);
        assert_eq!(report.lines[0].trial_name, "HER2+ Breast Cancer Immunotherapy Trial");
        assert_eq!(report.lines[0].completion_likelihood, "High");
        assert!(report.lines[0].strengths.contains(&"Cancer Type Match".to_string()));
        assert_eq!(report.metadata.digest.len(), 64);
        assert!(report.verify_digest().unwrap());
    }

    #[test]
    fn test_digest_detects_edits() {
        let (patient, trials) = sample();
        let matches = Matcher::new().compute_trial_matches(&patient, &trials);
        let mut report = MatchReport::build(&patient, &matches, &trials).unwrap();

        report.lines[0].match_score = 99;
        assert!(!report.verify_digest().unwrap());
    }

    #[test]
    fn test_digest_ignores_timestamp() {
        let (patient, trials) = sample();
        let matches = Matcher::new().compute_trial_matches(&patient, &trials);
        let a = MatchReport::build(&patient, &matches, &trials).unwrap();
        let b = MatchReport::build(&patient, &matches, &trials).unwrap();
        assert_eq!(a.metadata.digest, b.metadata.digest);
    }

    #[test]
    fn test_report_csv() {
        let (patient, trials) = sample();
        let matches = Matcher::new().compute_trial_matches(&patient, &trials);
        let report = MatchReport::build(&patient, &matches, &trials).unwrap();

        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3); // Header + 2 matches
        assert!(lines[0].starts_with("patient_id,patient_name"));
        assert!(lines[1].contains("t-her2"));
        // Trial name with a comma is quoted
        assert!(lines[2].contains("\"Breast Cancer, Early Detection\""));
    }

    #[test]
    fn test_report_json() {
        let (patient, trials) = sample();
        let matches = Matcher::new().compute_trial_matches(&patient, &trials);
        let report = MatchReport::build(&patient, &matches, &trials).unwrap();

        let json = report.to_json().unwrap();
        assert!(json.contains("\"trialName\": \"HER2+ Breast Cancer Immunotherapy Trial\""));
        let back: MatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
    }

    #[test]
    fn test_export_all_from_db() {
        let mut db = Database::open_in_memory().unwrap();
        let (patient, trials) = sample();
        db.insert_patient(&patient).unwrap();
        for trial in &trials {
            db.upsert_trial(trial).unwrap();
        }

        let mut other = Patient::new(
            "John".into(),
            "Smith".into(),
            61,
            "Prostate Cancer".into(),
            CancerStage::StageIII,
        );
        other.location = "Boston, MA".into();
        db.insert_patient(&other).unwrap();

        let matcher = Matcher::new();
        db.get_or_compute_matches(&matcher, &patient.id).unwrap();
        db.get_or_compute_matches(&matcher, &other.id).unwrap();

        let exporter = MatchExporter::new(&db);
        let batch = exporter.export_all().unwrap();

        assert_eq!(batch.reports.len(), 2);
        assert_eq!(batch.total_matches, 2);
        assert!(batch.reports[1].lines.is_empty());
        assert_eq!(batch.to_csv().lines().count(), 3);

        let single = exporter.export_patient(&patient.id).unwrap();
        assert_eq!(single.metadata.digest, batch.reports[0].metadata.digest);
    }

    #[test]
    fn test_export_unknown_patient() {
        let db = Database::open_in_memory().unwrap();
        let result = MatchExporter::new(&db).export_patient("missing");
        assert!(matches!(result, Err(ExportError::Db(DbError::NotFound(_)))));
    }
}
