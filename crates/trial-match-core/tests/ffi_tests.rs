//! Tests for the exported `TrialMatchCore` API.

use std::collections::HashMap;

use trial_match_core::{
    open_database_in_memory, FfiPatientInput, FfiTrial, TrialMatchCore, TrialMatchError,
};

fn intake(first: &str, diagnosis: &str, age: u32, stage: &str) -> FfiPatientInput {
    FfiPatientInput {
        first_name: first.into(),
        last_name: "Doe".into(),
        age,
        gender: "Female".into(),
        primary_diagnosis: diagnosis.into(),
        cancer_stage: stage.into(),
        previous_treatments: vec!["Surgery".into()],
        location: "Boston, MA".into(),
        travel_willingness: "Willing to travel anywhere".into(),
        biomarkers: HashMap::from([("HER2".to_string(), "Positive".to_string())]),
        performance_status: "Excellent".into(),
        email: Some("jane@example.com".into()),
        phone: None,
    }
}

fn trial(id: &str, name: &str, max_enrollment: u32) -> FfiTrial {
    FfiTrial {
        id: id.into(),
        name: name.into(),
        sponsor: "Oncology Group".into(),
        phase: "Phase II".into(),
        location: "Boston, MA".into(),
        description: String::new(),
        indication: None,
        current_enrollment: 0,
        max_enrollment,
        required_biomarkers: vec!["HER2+".into()],
        cancer_types: vec!["Breast".into()],
        stages: vec!["Stage II".into(), "Stage III".into()],
        min_age: Some(18),
        max_age: None,
        exclusion_criteria: vec![],
        treatment_burden: "Medium".into(),
        travel_burden: "low".into(),
        is_active: true,
    }
}

fn seeded_core() -> (std::sync::Arc<TrialMatchCore>, String) {
    let core = open_database_in_memory().unwrap();
    let patient = core
        .create_patient(intake("Jane", "Breast Cancer", 52, "Stage II"))
        .unwrap();
    core.upsert_trial(trial("T-HER2", "HER2+ Breast Cancer Immunotherapy Trial", 10))
        .unwrap();
    core.upsert_trial(trial("T-FULL", "Breast Cancer Adjuvant Study", 0))
        .unwrap();
    (core, patient.id)
}

#[test]
fn test_patient_round_trip() {
    let core = open_database_in_memory().unwrap();
    let created = core
        .create_patient(intake("Jane", "Breast Cancer", 52, "stage ii"))
        .unwrap();

    assert_eq!(created.cancer_stage, "Stage II");
    let fetched = core.get_patient(created.id.clone()).unwrap().unwrap();
    assert_eq!(fetched.biomarkers.get("HER2").map(String::as_str), Some("Positive"));

    let mut updated = fetched;
    updated.location = "Cambridge, MA".into();
    assert!(core.update_patient(updated).unwrap());
    assert_eq!(
        core.get_patient(created.id.clone()).unwrap().unwrap().location,
        "Cambridge, MA"
    );

    assert_eq!(core.search_patients("Ja".into(), 10).unwrap().len(), 1);
    assert!(core.delete_patient(created.id.clone()).unwrap());
    assert!(core.list_patients().unwrap().is_empty());
}

#[test]
fn test_intake_validation() {
    let core = open_database_in_memory().unwrap();

    let too_young = core.create_patient(intake("Kid", "Breast Cancer", 12, "Stage I"));
    assert!(matches!(too_young, Err(TrialMatchError::InvalidInput(_))));

    let bad_stage = core.create_patient(intake("Jane", "Breast Cancer", 40, "Stage V"));
    assert!(matches!(bad_stage, Err(TrialMatchError::InvalidInput(_))));

    let empty_id = core.upsert_trial(trial("  ", "Breast Cancer Study", 5));
    assert!(matches!(empty_id, Err(TrialMatchError::InvalidInput(_))));
}

#[test]
fn test_trial_fields_survive_ffi() {
    let (core, _) = seeded_core();
    let stored = core.get_trial("T-HER2".into()).unwrap().unwrap();

    assert_eq!(stored.min_age, Some(18));
    assert_eq!(stored.max_age, Some(100));
    assert_eq!(stored.travel_burden, "Low");
    assert_eq!(stored.stages, vec!["Stage II", "Stage III"]);

    assert!(core.deactivate_trial("T-FULL".into()).unwrap());
    let active: Vec<String> = core
        .list_active_trials()
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(active, vec!["T-HER2"]);
}

#[test]
fn test_matching_and_insights() {
    let (core, patient_id) = seeded_core();

    let matches = core.get_trial_matches(patient_id.clone()).unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].trial_id, "T-HER2");
    assert_eq!(matches[0].match_score, 93);
    assert_eq!(matches[0].completion_likelihood, "High");
    assert!(!matches[0].positive_factors.is_empty());

    let again = core.recompute_trial_matches(patient_id.clone()).unwrap();
    assert_eq!(again.len(), matches.len());

    let ranked = core.get_ranked_patients().unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].rank, 1);
    assert_eq!(ranked[0].eligible_trials, 2);

    let twin = core.get_digital_twin(patient_id.clone()).unwrap();
    assert_eq!(twin.risk_score, "Low");
    assert_eq!(twin.availability, "Flexible");
    assert_eq!(twin.performance, "Excellent");

    let report = core.explain_matches(patient_id.clone()).unwrap();
    assert!(report.feature_importance.is_some());
    assert!(!report.model_summary.is_empty());

    assert_eq!(core.eligible_patient_count("T-HER2".into()).unwrap(), 1);
}

#[test]
fn test_enrollment_checks() {
    let (core, patient_id) = seeded_core();

    let enrollment = core
        .check_enrollment(patient_id.clone(), "T-HER2".into())
        .unwrap();
    assert_eq!(enrollment.trial_id, "T-HER2");
    assert_eq!(enrollment.match_score, 93);

    let full = core.check_enrollment(patient_id.clone(), "T-FULL".into());
    assert!(matches!(full, Err(TrialMatchError::NotEligible(_))));

    let missing = core.check_enrollment("nobody".into(), "T-HER2".into());
    assert!(matches!(missing, Err(TrialMatchError::NotFound(_))));
}

#[test]
fn test_exports() {
    let (core, patient_id) = seeded_core();
    core.get_trial_matches(patient_id.clone()).unwrap();

    let json = core.export_matches_json().unwrap();
    assert!(json.contains("T-HER2"));

    let csv = core.export_matches_csv().unwrap();
    assert!(csv.lines().count() >= 3);

    let report = core.export_patient_report_json(patient_id).unwrap();
    assert!(report.contains("HER2+ Breast Cancer Immunotherapy Trial"));

    let missing = core.export_patient_report_json("nobody".into());
    assert!(matches!(missing, Err(TrialMatchError::NotFound(_))));
}
