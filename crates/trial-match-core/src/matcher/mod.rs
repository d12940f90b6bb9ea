//! Trial matcher for patient records.
//!
//! Pipeline: Cancer-Type Gate → Factor Scoring → Aggregation → Explanation → Ranking
//!
//! Scoring weights:
//! - Cancer-type gate: 50%
//! - Biomarker compatibility: 25%
//! - Location/travel: 15%
//! - Treatment burden: 10%

mod explanation;
mod gate;
mod scorers;
mod vocabulary;

pub use explanation::*;
pub use gate::*;
pub use scorers::*;
pub use vocabulary::*;

use tracing::{debug, info};

use crate::models::{
    CancerTypeMatch, ClinicalTrial, CompletionLikelihood, Patient, ScoreBreakdown, TrialMatch,
};

/// Maximum number of matches returned per patient.
pub const MAX_MATCHES: usize = 5;

/// A match must score above this to be returned.
pub const MIN_MATCH_SCORE: u32 = 40;

/// Full scoring result for one patient/trial pair, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialEvaluation {
    pub gate: CancerTypeMatch,
    /// `None` when the gate rejected the trial and no factor was scored
    pub trial_match: Option<TrialMatch>,
}

impl TrialEvaluation {
    /// Whether the trial passes both the gate and the score floor.
    pub fn is_included(&self) -> bool {
        self.gate.is_compatible
            && self
                .trial_match
                .as_ref()
                .is_some_and(|m| m.match_score > MIN_MATCH_SCORE)
    }
}

/// Matcher that scores and ranks trials for a patient.
///
/// Holds only its vocabulary; every call is independent, so one matcher can
/// be shared across threads when the vocabulary is `Sync`.
pub struct Matcher<V: CancerVocabulary = CancerTypeTable> {
    vocabulary: V,
}

impl Default for Matcher<CancerTypeTable> {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher<CancerTypeTable> {
    /// Create a matcher with the default cancer-type table.
    pub fn new() -> Self {
        Self {
            vocabulary: CancerTypeTable::new(),
        }
    }
}

impl<V: CancerVocabulary> Matcher<V> {
    /// Create a matcher over a custom vocabulary.
    pub fn with_vocabulary(vocabulary: V) -> Self {
        Self { vocabulary }
    }

    /// Get the vocabulary for direct access.
    pub fn vocabulary(&self) -> &V {
        &self.vocabulary
    }

    /// Score, filter and rank trials for a patient.
    ///
    /// Returns at most [`MAX_MATCHES`] matches, best first. Ties keep the
    /// order in which the trials were supplied.
    pub fn compute_trial_matches(
        &self,
        patient: &Patient,
        trials: &[ClinicalTrial],
    ) -> Vec<TrialMatch> {
        debug!(
            patient_id = %patient.id,
            trial_count = trials.len(),
            "starting trial matching"
        );

        let mut matches: Vec<TrialMatch> = trials
            .iter()
            .map(|trial| self.evaluate(patient, trial))
            .filter(TrialEvaluation::is_included)
            .filter_map(|evaluation| evaluation.trial_match)
            .collect();

        let compatible = matches.len();

        // sort_by is stable, so equal scores keep input order
        matches.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        matches.truncate(MAX_MATCHES);

        info!(
            patient_id = %patient.id,
            compatible,
            returned = matches.len(),
            top_score = matches.first().map(|m| m.match_score),
            "trial matching complete"
        );

        matches
    }

    /// Run the gate and, when it passes, every factor scorer for one trial.
    pub fn evaluate(&self, patient: &Patient, trial: &ClinicalTrial) -> TrialEvaluation {
        let gate = check_cancer_type(&self.vocabulary, &patient.primary_diagnosis, trial);

        debug!(
            trial_id = %trial.id,
            trial_name = %trial.name,
            cancer_type = gate.cancer_type.as_deref().unwrap_or("unrecognized"),
            compatible = gate.is_compatible,
            score = gate.score,
            "cancer type gate"
        );

        if !gate.is_compatible {
            return TrialEvaluation {
                gate,
                trial_match: None,
            };
        }

        let scores = ScoreBreakdown {
            cancer_type_score: gate.score,
            biomarker_score: score_biomarkers(&patient.biomarkers, trial.required_biomarkers()),
            location_score: score_location(&patient.location, &trial.location, patient.travel()),
            burden_score: score_burden(patient.age, patient.cancer_stage, trial.treatment_burden),
        };

        let match_score = scores.weighted_score();
        let trial_match = TrialMatch {
            patient_id: patient.id.clone(),
            trial_id: trial.id.clone(),
            match_score,
            cancer_type_score: scores.cancer_type_score,
            biomarker_score: scores.biomarker_score,
            location_score: scores.location_score,
            burden_score: scores.burden_score,
            completion_likelihood: CompletionLikelihood::from_score(match_score),
            explanation_factors: build_explanation(&gate, &scores),
        };

        TrialEvaluation {
            gate,
            trial_match: Some(trial_match),
        }
    }
}

/// Score, filter and rank trials for a patient with the default vocabulary.
pub fn compute_trial_matches(patient: &Patient, trials: &[ClinicalTrial]) -> Vec<TrialMatch> {
    Matcher::new().compute_trial_matches(patient, trials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BurdenLevel, CancerStage};

    fn breast_patient() -> Patient {
        let mut p = Patient::new(
            "Sarah".into(),
            "Johnson".into(),
            52,
            "Breast Cancer".into(),
            CancerStage::StageII,
        );
        p.id = "p-1".into();
        p.location = "Boston, MA".into();
        p.travel_willingness = "Within 50 miles".into();
        p.biomarkers.insert("HER2".into(), "Positive".into());
        p
    }

    fn trial(id: &str, name: &str, location: &str, biomarkers: &[&str]) -> ClinicalTrial {
        let mut t = ClinicalTrial::new(id.into(), name.into());
        t.location = location.into();
        t.inclusion_criteria.biomarkers = biomarkers.iter().map(|s| s.to_string()).collect();
        t
    }

    #[test]
    fn test_her2_breast_scenario() {
        let patient = breast_patient();
        let trials = vec![trial(
            "t-her2",
            "HER2+ Breast Cancer Immunotherapy Trial",
            "Boston, MA",
            &["HER2+"],
        )];

        let matches = compute_trial_matches(&patient, &trials);
        assert_eq!(matches.len(), 1);

        let m = &matches[0];
        assert_eq!(m.cancer_type_score, 95);
        assert_eq!(m.biomarker_score, 95);
        assert_eq!(m.location_score, 95);
        assert_eq!(m.burden_score, 70);
        assert_eq!(m.match_score, 93);
        assert_eq!(m.completion_likelihood, CompletionLikelihood::High);
        assert!(m.is_consistent());
    }

    #[test]
    fn test_gate_failure_excludes_trial() {
        let mut patient = breast_patient();
        patient.primary_diagnosis = "Prostate Cancer".into();

        let trials = vec![trial(
            "t-her2",
            "HER2+ Breast Cancer Immunotherapy Trial",
            "Boston, MA",
            &["HER2+"],
        )];

        let evaluation = Matcher::new().evaluate(&patient, &trials[0]);
        assert!(!evaluation.gate.is_compatible);
        assert!(evaluation.trial_match.is_none());
        assert!(compute_trial_matches(&patient, &trials).is_empty());
    }

    #[test]
    fn test_weak_compatible_match_still_clears_floor() {
        let mut patient = breast_patient();
        patient.location = "Seattle, WA".into();
        patient.travel_willingness = "Within 25 miles".into();
        patient.cancer_stage = CancerStage::StageIV;
        patient.age = 80;

        let mut t = trial("t-related", "Women's Oncology Trial", "Miami, FL", &["BRCA1"]);
        t.description = "mammary tumors".into();
        t.treatment_burden = BurdenLevel::High;

        // 95*.5 + 20*.25 + 40*.15 + 45*.1 = 63
        // A passing gate contributes at least 40, so the floor of 40 is always cleared
        let matches = compute_trial_matches(&patient, &[t]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_score, 63);
    }

    #[test]
    fn test_ranking_and_truncation() {
        let patient = breast_patient();
        let mut trials = Vec::new();
        for i in 0..8 {
            let location = if i % 2 == 0 { "Boston, MA" } else { "Denver, CO" };
            trials.push(trial(&format!("t-{i}"), "Breast Cancer Study", location, &[]));
        }

        let matches = compute_trial_matches(&patient, &trials);
        assert_eq!(matches.len(), MAX_MATCHES);
        assert!(matches.windows(2).all(|w| w[0].match_score >= w[1].match_score));

        // Co-located trials first, in input order
        let ids: Vec<&str> = matches.iter().map(|m| m.trial_id.as_str()).collect();
        assert_eq!(ids, vec!["t-0", "t-2", "t-4", "t-6", "t-1"]);
    }

    #[test]
    fn test_empty_catalog() {
        assert!(compute_trial_matches(&breast_patient(), &[]).is_empty());
    }

    #[test]
    fn test_unrecognized_diagnosis_matches_nothing() {
        let mut patient = breast_patient();
        patient.primary_diagnosis = "Mesothelioma".into();
        let trials = vec![trial("t-1", "Breast Cancer Study", "Boston, MA", &[])];
        assert!(compute_trial_matches(&patient, &trials).is_empty());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_logs_carry_cancer_type_not_diagnosis_text() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();

        let mut patient = breast_patient();
        patient.primary_diagnosis = "Invasive Ductal Carcinoma of the Breast".into();
        let trials = vec![trial("t-1", "HER2+ Breast Cancer Trial", "Boston, MA", &[])];

        let matches = tracing::subscriber::with_default(subscriber, || {
            compute_trial_matches(&patient, &trials)
        });
        assert_eq!(matches.len(), 1);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let gate_line = output
            .lines()
            .find(|line| line.contains("cancer type gate"))
            .unwrap();
        assert!(gate_line.contains("cancer_type"));
        assert!(gate_line.contains("breast"));
        assert!(output.contains(&patient.id));
        assert!(!output.contains("Ductal"));
    }

    #[test]
    fn test_custom_vocabulary() {
        let mut table = CancerTypeTable::new();
        table.add_alias("mesothelioma", "mesothelioma");
        table.add_related_term("mesothelioma", "thoracic");
        let matcher = Matcher::with_vocabulary(table);

        let mut patient = breast_patient();
        patient.primary_diagnosis = "Pleural Mesothelioma".into();
        let trials = vec![trial("t-1", "Thoracic Oncology Platform", "Boston, MA", &[])];

        let matches = matcher.compute_trial_matches(&patient, &trials);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].cancer_type_score, 80);
    }
}
