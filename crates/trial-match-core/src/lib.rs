//! Trial-Match Core Library
//!
//! Rule-based matching of cancer patients to clinical trials, with
//! patient-list ranking, explainability and a local SQLite store.
//!
//! # Architecture
//!
//! ```text
//! Patient + Active Trials
//!         │
//!         ▼
//! Cancer-Type Gate ──(incompatible)──▶ dropped
//!         │
//!         ▼
//! Factor Scorers (biomarker, location, burden)
//!         │
//!         ▼
//! Weighted Score → Explanation → Rank (top 5)
//!         │
//!         ├──────────────────────┬──────────────────────┐
//!         ▼                      ▼                      ▼
//!   trial_matches          Patient Ranking          Insights
//!  (fingerprinted)    (match + engagement +     (explainability,
//!                          eligibility)          enrollment checks)
//! ```
//!
//! # Core Principle
//!
//! **The cancer-type gate is absolute.** A trial that fails it is never
//! offered to the patient, whatever its other scores.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, ClinicalTrial, TrialMatch, etc.)
//! - [`matcher`]: Gate, factor scorers, aggregation, explanation, ranking
//! - [`ranking`]: Engagement score and patient-list ranking
//! - [`twin`]: Digital twin derivation
//! - [`insights`]: Explainability, eligible-patient counts, enrollment checks
//! - [`db`]: SQLite storage with the match cache
//! - [`export`]: Match report export

pub mod db;
pub mod export;
pub mod fingerprint;
pub mod insights;
pub mod matcher;
pub mod models;
pub mod ranking;
pub mod twin;

// Re-export commonly used types
pub use db::Database;
pub use matcher::{compute_trial_matches, CancerTypeTable, CancerVocabulary, Matcher};
pub use models::{
    BurdenLevel, CancerStage, ClinicalTrial, CompletionLikelihood, DigitalTwin, Patient,
    RankedPatient, TrialMatch,
};
pub use ranking::rank_patients_by_ai_score;
pub use twin::generate_digital_twin;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Youngest age accepted at intake.
pub const MIN_PATIENT_AGE: u32 = 18;
/// Oldest age accepted at intake.
pub const MAX_PATIENT_AGE: u32 = 100;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum TrialMatchError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Not eligible: {0}")]
    NotEligible(String),
}

impl From<db::DbError> for TrialMatchError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => TrialMatchError::NotFound(what),
            db::DbError::Json(e) => TrialMatchError::SerializationError(e.to_string()),
            other => TrialMatchError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TrialMatchError {
    fn from(e: serde_json::Error) -> Self {
        TrialMatchError::SerializationError(e.to_string())
    }
}

impl From<export::ExportError> for TrialMatchError {
    fn from(e: export::ExportError) -> Self {
        match e {
            export::ExportError::Db(e) => e.into(),
            export::ExportError::Json(e) => e.into(),
        }
    }
}

impl From<insights::EnrollmentError> for TrialMatchError {
    fn from(e: insights::EnrollmentError) -> Self {
        TrialMatchError::NotEligible(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for TrialMatchError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        TrialMatchError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<TrialMatchCore>, TrialMatchError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(TrialMatchCore::with_database(db)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<TrialMatchCore>, TrialMatchError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(TrialMatchCore::with_database(db)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database and matcher wrapper for FFI.
#[derive(uniffi::Object)]
pub struct TrialMatchCore {
    db: Arc<Mutex<Database>>,
    matcher: Matcher,
}

impl TrialMatchCore {
    fn with_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            matcher: Matcher::new(),
        }
    }

    fn require_patient(db: &Database, patient_id: &str) -> Result<Patient, TrialMatchError> {
        db.get_patient(patient_id)?
            .ok_or_else(|| TrialMatchError::NotFound(format!("Patient {}", patient_id)))
    }

    fn require_trial(db: &Database, trial_id: &str) -> Result<ClinicalTrial, TrialMatchError> {
        db.get_trial(trial_id)?
            .ok_or_else(|| TrialMatchError::NotFound(format!("Trial {}", trial_id)))
    }
}

#[uniffi::export]
impl TrialMatchCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Create a new patient from intake data.
    pub fn create_patient(&self, input: FfiPatientInput) -> Result<FfiPatient, TrialMatchError> {
        let db = self.db.lock()?;
        let patient = Patient::try_from(input)?;
        db.insert_patient(&patient)?;
        Ok(patient.into())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: String) -> Result<Option<FfiPatient>, TrialMatchError> {
        let db = self.db.lock()?;
        let patient = db.get_patient(&id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// List all patients.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, TrialMatchError> {
        let db = self.db.lock()?;
        let patients = db.list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Search patients by name.
    pub fn search_patients(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiPatient>, TrialMatchError> {
        let db = self.db.lock()?;
        let patients = db.search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Update an existing patient. Returns false if the patient does not exist.
    pub fn update_patient(&self, patient: FfiPatient) -> Result<bool, TrialMatchError> {
        let db = self.db.lock()?;
        let patient = Patient::try_from(patient)?;
        Ok(db.update_patient(&patient)?)
    }

    /// Delete a patient and everything derived from them.
    pub fn delete_patient(&self, id: String) -> Result<bool, TrialMatchError> {
        let db = self.db.lock()?;
        Ok(db.delete_patient(&id)?)
    }

    // =========================================================================
    // Trial Operations
    // =========================================================================

    /// Add or update a trial.
    pub fn upsert_trial(&self, trial: FfiTrial) -> Result<(), TrialMatchError> {
        let db = self.db.lock()?;
        let trial: ClinicalTrial = trial.into();
        if trial.id.trim().is_empty() {
            return Err(TrialMatchError::InvalidInput("Trial ID must not be empty".into()));
        }
        db.upsert_trial(&trial)?;
        Ok(())
    }

    /// Get a trial by ID.
    pub fn get_trial(&self, id: String) -> Result<Option<FfiTrial>, TrialMatchError> {
        let db = self.db.lock()?;
        let trial = db.get_trial(&id)?;
        Ok(trial.map(|t| t.into()))
    }

    /// List trials currently offered to the matcher.
    pub fn list_active_trials(&self) -> Result<Vec<FfiTrial>, TrialMatchError> {
        let db = self.db.lock()?;
        let trials = db.list_active_trials()?;
        Ok(trials.into_iter().map(|t| t.into()).collect())
    }

    /// Stop offering a trial to the matcher.
    pub fn deactivate_trial(&self, id: String) -> Result<bool, TrialMatchError> {
        let db = self.db.lock()?;
        Ok(db.deactivate_trial(&id)?)
    }

    // =========================================================================
    // Matching Operations
    // =========================================================================

    /// Get a patient's trial matches, best first (computed when stale).
    pub fn get_trial_matches(&self, patient_id: String) -> Result<Vec<FfiTrialMatch>, TrialMatchError> {
        let mut db = self.db.lock()?;
        let matches = db.get_or_compute_matches(&self.matcher, &patient_id)?;
        Ok(matches.into_iter().map(|m| m.into()).collect())
    }

    /// Discard stored matches and compute them again.
    pub fn recompute_trial_matches(
        &self,
        patient_id: String,
    ) -> Result<Vec<FfiTrialMatch>, TrialMatchError> {
        let mut db = self.db.lock()?;
        db.invalidate_matches(&patient_id)?;
        let matches = db.get_or_compute_matches(&self.matcher, &patient_id)?;
        Ok(matches.into_iter().map(|m| m.into()).collect())
    }

    /// Rank all patients by AI score against the current active catalog.
    pub fn get_ranked_patients(&self) -> Result<Vec<FfiRankedPatient>, TrialMatchError> {
        let mut db = self.db.lock()?;
        let ranked = db.ranked_patients(&self.matcher)?;
        Ok(ranked.into_iter().map(|r| r.into()).collect())
    }

    // =========================================================================
    // Insight Operations
    // =========================================================================

    /// Get (or derive on first request) a patient's digital twin.
    pub fn get_digital_twin(&self, patient_id: String) -> Result<FfiDigitalTwin, TrialMatchError> {
        let db = self.db.lock()?;
        let twin = db.get_or_create_digital_twin(&patient_id)?;
        Ok(twin.into())
    }

    /// Explain a patient's current matches.
    pub fn explain_matches(&self, patient_id: String) -> Result<FfiExplainability, TrialMatchError> {
        let mut db = self.db.lock()?;
        let patient = Self::require_patient(&db, &patient_id)?;
        let matches = db.get_or_compute_matches(&self.matcher, &patient_id)?;
        Ok(insights::analyze_matches(&patient, &matches).into())
    }

    /// Number of patients eligible for a trial based on current matches.
    pub fn eligible_patient_count(&self, trial_id: String) -> Result<u32, TrialMatchError> {
        let mut db = self.db.lock()?;
        Self::require_trial(&db, &trial_id)?;
        Ok(db.eligible_patient_count(&self.matcher, &trial_id)? as u32)
    }

    /// Check whether a patient may enroll in a trial.
    pub fn check_enrollment(
        &self,
        patient_id: String,
        trial_id: String,
    ) -> Result<FfiEnrollment, TrialMatchError> {
        let mut db = self.db.lock()?;
        let patient = Self::require_patient(&db, &patient_id)?;
        let trial = Self::require_trial(&db, &trial_id)?;
        let matches = db.get_or_compute_matches(&self.matcher, &patient_id)?;
        let enrollment = insights::check_enrollment(&patient, &trial, &matches)?;
        Ok(enrollment.into())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export stored matches for all patients as JSON.
    pub fn export_matches_json(&self) -> Result<String, TrialMatchError> {
        let db = self.db.lock()?;
        let exporter = export::MatchExporter::new(&db);
        let batch = exporter.export_all()?;
        Ok(batch.to_json()?)
    }

    /// Export stored matches for all patients as CSV.
    pub fn export_matches_csv(&self) -> Result<String, TrialMatchError> {
        let db = self.db.lock()?;
        let exporter = export::MatchExporter::new(&db);
        let batch = exporter.export_all()?;
        Ok(batch.to_csv())
    }

    /// Export one patient's stored matches as JSON.
    pub fn export_patient_report_json(&self, patient_id: String) -> Result<String, TrialMatchError> {
        let db = self.db.lock()?;
        let exporter = export::MatchExporter::new(&db);
        let report = exporter.export_patient(&patient_id)?;
        Ok(report.to_json()?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe intake record for a new patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInput {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub gender: String,
    pub primary_diagnosis: String,
    /// "Stage I" .. "Stage IV"
    pub cancer_stage: String,
    pub previous_treatments: Vec<String>,
    pub location: String,
    pub travel_willingness: String,
    pub biomarkers: HashMap<String, String>,
    pub performance_status: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl TryFrom<FfiPatientInput> for Patient {
    type Error = TrialMatchError;

    fn try_from(input: FfiPatientInput) -> Result<Self, Self::Error> {
        validate_age(input.age)?;
        let stage = parse_stage(&input.cancer_stage)?;

        let mut patient = Patient::new(
            input.first_name,
            input.last_name,
            input.age,
            input.primary_diagnosis,
            stage,
        );
        patient.gender = input.gender;
        patient.previous_treatments = input.previous_treatments;
        patient.location = input.location;
        patient.travel_willingness = input.travel_willingness;
        patient.biomarkers = input.biomarkers.into_iter().collect();
        patient.performance_status = input.performance_status;
        patient.email = input.email;
        patient.phone = input.phone;
        Ok(patient)
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub gender: String,
    pub primary_diagnosis: String,
    pub cancer_stage: String,
    pub previous_treatments: Vec<String>,
    pub location: String,
    pub travel_willingness: String,
    pub biomarkers: HashMap<String, String>,
    pub performance_status: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            age: patient.age,
            gender: patient.gender,
            primary_diagnosis: patient.primary_diagnosis,
            cancer_stage: patient.cancer_stage.label().to_string(),
            previous_treatments: patient.previous_treatments,
            location: patient.location,
            travel_willingness: patient.travel_willingness,
            biomarkers: patient.biomarkers.into_iter().collect(),
            performance_status: patient.performance_status,
            email: patient.email,
            phone: patient.phone,
            created_at: patient.created_at,
        }
    }
}

impl TryFrom<FfiPatient> for Patient {
    type Error = TrialMatchError;

    fn try_from(patient: FfiPatient) -> Result<Self, Self::Error> {
        validate_age(patient.age)?;
        let cancer_stage = parse_stage(&patient.cancer_stage)?;

        Ok(Patient {
            id: patient.id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            age: patient.age,
            gender: patient.gender,
            primary_diagnosis: patient.primary_diagnosis,
            cancer_stage,
            previous_treatments: patient.previous_treatments,
            location: patient.location,
            travel_willingness: patient.travel_willingness,
            biomarkers: patient.biomarkers.into_iter().collect::<BTreeMap<_, _>>(),
            performance_status: patient.performance_status,
            email: patient.email,
            phone: patient.phone,
            created_at: patient.created_at,
        })
    }
}

fn validate_age(age: u32) -> Result<(), TrialMatchError> {
    if (MIN_PATIENT_AGE..=MAX_PATIENT_AGE).contains(&age) {
        Ok(())
    } else {
        Err(TrialMatchError::InvalidInput(format!(
            "Age {} outside {}..={}",
            age, MIN_PATIENT_AGE, MAX_PATIENT_AGE
        )))
    }
}

fn parse_stage(label: &str) -> Result<CancerStage, TrialMatchError> {
    CancerStage::from_label(label)
        .ok_or_else(|| TrialMatchError::InvalidInput(format!("Unknown cancer stage: {}", label)))
}

/// FFI-safe clinical trial.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTrial {
    pub id: String,
    pub name: String,
    pub sponsor: String,
    pub phase: String,
    pub location: String,
    pub description: String,
    pub indication: Option<String>,
    pub current_enrollment: u32,
    pub max_enrollment: u32,
    pub required_biomarkers: Vec<String>,
    pub cancer_types: Vec<String>,
    pub stages: Vec<String>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub exclusion_criteria: Vec<String>,
    /// "Low", "Medium" or "High"; anything else is read as "Medium"
    pub treatment_burden: String,
    pub travel_burden: String,
    pub is_active: bool,
}

impl From<ClinicalTrial> for FfiTrial {
    fn from(trial: ClinicalTrial) -> Self {
        let age_range = trial.inclusion_criteria.age_range;
        Self {
            id: trial.id,
            name: trial.name,
            sponsor: trial.sponsor,
            phase: trial.phase,
            location: trial.location,
            description: trial.description,
            indication: trial.indication,
            current_enrollment: trial.current_enrollment,
            max_enrollment: trial.max_enrollment,
            required_biomarkers: trial.inclusion_criteria.biomarkers,
            cancer_types: trial.inclusion_criteria.cancer_types,
            stages: trial.inclusion_criteria.stages,
            min_age: age_range.map(|r| r.min),
            max_age: age_range.map(|r| r.max),
            exclusion_criteria: trial.exclusion_criteria,
            treatment_burden: trial.treatment_burden.label().to_string(),
            travel_burden: trial.travel_burden.label().to_string(),
            is_active: trial.is_active,
        }
    }
}

impl From<FfiTrial> for ClinicalTrial {
    fn from(trial: FfiTrial) -> Self {
        let age_range = match (trial.min_age, trial.max_age) {
            (Some(min), Some(max)) => Some(models::AgeRange { min, max }),
            (Some(min), None) => Some(models::AgeRange { min, max: MAX_PATIENT_AGE }),
            (None, Some(max)) => Some(models::AgeRange { min: MIN_PATIENT_AGE, max }),
            (None, None) => None,
        };

        ClinicalTrial {
            id: trial.id,
            name: trial.name,
            sponsor: trial.sponsor,
            phase: trial.phase,
            location: trial.location,
            description: trial.description,
            indication: trial.indication,
            current_enrollment: trial.current_enrollment,
            max_enrollment: trial.max_enrollment,
            inclusion_criteria: models::InclusionCriteria {
                biomarkers: trial.required_biomarkers,
                cancer_types: trial.cancer_types,
                stages: trial.stages,
                age_range,
            },
            exclusion_criteria: trial.exclusion_criteria,
            treatment_burden: BurdenLevel::from_label(&trial.treatment_burden),
            travel_burden: BurdenLevel::from_label(&trial.travel_burden),
            is_active: trial.is_active,
        }
    }
}

/// FFI-safe explanation factor.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExplanationFactor {
    pub factor: String,
    pub impact: u32,
    pub description: String,
}

impl From<models::ExplanationFactor> for FfiExplanationFactor {
    fn from(f: models::ExplanationFactor) -> Self {
        Self {
            factor: f.factor,
            impact: f.impact,
            description: f.description,
        }
    }
}

/// FFI-safe trial match.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTrialMatch {
    pub patient_id: String,
    pub trial_id: String,
    pub match_score: u32,
    pub cancer_type_score: u32,
    pub biomarker_score: u32,
    pub location_score: u32,
    pub burden_score: u32,
    pub completion_likelihood: String,
    pub positive_factors: Vec<FfiExplanationFactor>,
    pub negative_factors: Vec<FfiExplanationFactor>,
}

impl From<TrialMatch> for FfiTrialMatch {
    fn from(m: TrialMatch) -> Self {
        Self {
            patient_id: m.patient_id,
            trial_id: m.trial_id,
            match_score: m.match_score,
            cancer_type_score: m.cancer_type_score,
            biomarker_score: m.biomarker_score,
            location_score: m.location_score,
            burden_score: m.burden_score,
            completion_likelihood: m.completion_likelihood.label().to_string(),
            positive_factors: m.explanation_factors.positive.into_iter().map(|f| f.into()).collect(),
            negative_factors: m.explanation_factors.negative.into_iter().map(|f| f.into()).collect(),
        }
    }
}

/// FFI-safe ranked patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRankedPatient {
    pub patient: FfiPatient,
    pub ai_score: u32,
    pub match_score: u32,
    pub engagement_score: u32,
    pub eligibility_score: u32,
    pub eligible_trials: u32,
    pub best_match: Option<FfiTrialMatch>,
    pub rank: u32,
}

impl From<RankedPatient> for FfiRankedPatient {
    fn from(r: RankedPatient) -> Self {
        Self {
            patient: r.patient.into(),
            ai_score: r.ai_score,
            match_score: r.match_score,
            engagement_score: r.engagement_score,
            eligibility_score: r.eligibility_score,
            eligible_trials: r.eligible_trials,
            best_match: r.best_match.map(|m| m.into()),
            rank: r.rank,
        }
    }
}

/// FFI-safe digital twin (flattened).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDigitalTwin {
    pub patient_id: String,
    pub risk_score: String,
    pub biomarkers: String,
    pub performance: String,
    pub mobility: String,
    pub support: String,
    pub compliance: String,
    pub motivation: String,
    pub availability: String,
    pub tech_comfort: String,
    pub created_at: String,
}

impl From<DigitalTwin> for FfiDigitalTwin {
    fn from(twin: DigitalTwin) -> Self {
        Self {
            patient_id: twin.patient_id,
            risk_score: twin.clinical_profile.risk_score,
            biomarkers: twin.clinical_profile.biomarkers,
            performance: twin.clinical_profile.performance,
            mobility: twin.lifestyle_factors.mobility,
            support: twin.lifestyle_factors.support,
            compliance: twin.lifestyle_factors.compliance,
            motivation: twin.engagement_signals.motivation,
            availability: twin.engagement_signals.availability,
            tech_comfort: twin.engagement_signals.tech_comfort,
            created_at: twin.created_at,
        }
    }
}

/// FFI-safe feature importance.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFeatureImportance {
    pub cancer_type: f64,
    pub biomarkers: f64,
    pub location: f64,
    pub burden: f64,
}

/// FFI-safe explainability report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExplainability {
    pub feature_importance: Option<FfiFeatureImportance>,
    pub overall_confidence: f64,
    pub data_quality: f64,
    pub prediction_stability: f64,
    pub model_summary: String,
}

impl From<insights::ExplainabilityReport> for FfiExplainability {
    fn from(report: insights::ExplainabilityReport) -> Self {
        Self {
            feature_importance: report.feature_importance.map(|f| FfiFeatureImportance {
                cancer_type: f.cancer_type,
                biomarkers: f.biomarkers,
                location: f.location,
                burden: f.burden,
            }),
            overall_confidence: report.confidence_metrics.overall_confidence,
            data_quality: report.confidence_metrics.data_quality,
            prediction_stability: report.confidence_metrics.prediction_stability,
            model_summary: report.model_summary,
        }
    }
}

/// FFI-safe enrollment confirmation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEnrollment {
    pub patient_id: String,
    pub trial_id: String,
    pub enrolled_at: String,
    pub match_score: u32,
}

impl From<insights::Enrollment> for FfiEnrollment {
    fn from(e: insights::Enrollment) -> Self {
        Self {
            patient_id: e.patient_id,
            trial_id: e.trial_id,
            enrolled_at: e.enrolled_at,
            match_score: e.match_score,
        }
    }
}
