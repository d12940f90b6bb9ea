//! Patient database operations.

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{CancerStage, Patient};

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        let treatments_json = serde_json::to_string(&patient.previous_treatments)?;
        let biomarkers_json = serde_json::to_string(&patient.biomarkers)?;

        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, first_name, last_name, age, gender, primary_diagnosis, cancer_stage,
                previous_treatments, location, travel_willingness, biomarkers,
                performance_status, email, phone, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                patient.age,
                patient.gender,
                patient.primary_diagnosis,
                patient.cancer_stage.label(),
                treatments_json,
                patient.location,
                patient.travel_willingness,
                biomarkers_json,
                patient.performance_status,
                patient.email,
                patient.phone,
                patient.created_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient.
    ///
    /// Any change to a patient's fields changes its matching fingerprint, so
    /// stored matches are recomputed on the next request. The stored digital
    /// twin is dropped and derived again on its next request.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let treatments_json = serde_json::to_string(&patient.previous_treatments)?;
        let biomarkers_json = serde_json::to_string(&patient.biomarkers)?;

        let tx = self.conn.unchecked_transaction()?;
        let rows_affected = tx.execute(
            r#"
            UPDATE patients SET
                first_name = ?2,
                last_name = ?3,
                age = ?4,
                gender = ?5,
                primary_diagnosis = ?6,
                cancer_stage = ?7,
                previous_treatments = ?8,
                location = ?9,
                travel_willingness = ?10,
                biomarkers = ?11,
                performance_status = ?12,
                email = ?13,
                phone = ?14,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                patient.age,
                patient.gender,
                patient.primary_diagnosis,
                patient.cancer_stage.label(),
                treatments_json,
                patient.location,
                patient.travel_willingness,
                biomarkers_json,
                patient.performance_status,
                patient.email,
                patient.phone,
            ],
        )?;
        tx.execute("DELETE FROM digital_twins WHERE patient_id = ?", [patient.id.as_str()])?;
        tx.commit()?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT id, first_name, last_name, age, gender, primary_diagnosis, cancer_stage,
                       previous_treatments, location, travel_willingness, biomarkers,
                       performance_status, email, phone, created_at
                FROM patients
                WHERE id = ?
                "#,
                [id],
                patient_row,
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// Search patients by first or last name (prefix match).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", query);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, first_name, last_name, age, gender, primary_diagnosis, cancer_stage,
                   previous_treatments, location, travel_willingness, biomarkers,
                   performance_status, email, phone, created_at
            FROM patients
            WHERE first_name LIKE ?1 OR last_name LIKE ?1
            ORDER BY last_name, first_name
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![pattern, limit as i64], patient_row)?;

        rows.map(|r| r.map_err(DbError::from).and_then(Patient::try_from))
            .collect()
    }

    /// List all patients in insertion order.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, first_name, last_name, age, gender, primary_diagnosis, cancer_stage,
                   previous_treatments, location, travel_willingness, biomarkers,
                   performance_status, email, phone, created_at
            FROM patients
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], patient_row)?;

        rows.map(|r| r.map_err(DbError::from).and_then(Patient::try_from))
            .collect()
    }

    /// Delete a patient along with their matches, match runs and digital twin.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    age: u32,
    gender: String,
    primary_diagnosis: String,
    cancer_stage: String,
    previous_treatments: String,
    location: String,
    travel_willingness: String,
    biomarkers: String,
    performance_status: String,
    email: Option<String>,
    phone: Option<String>,
    created_at: String,
}

fn patient_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        age: row.get(3)?,
        gender: row.get(4)?,
        primary_diagnosis: row.get(5)?,
        cancer_stage: row.get(6)?,
        previous_treatments: row.get(7)?,
        location: row.get(8)?,
        travel_willingness: row.get(9)?,
        biomarkers: row.get(10)?,
        performance_status: row.get(11)?,
        email: row.get(12)?,
        phone: row.get(13)?,
        created_at: row.get(14)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let cancer_stage = CancerStage::from_label(&row.cancer_stage)
            .ok_or_else(|| DbError::Constraint(format!("Unknown cancer stage: {}", row.cancer_stage)))?;
        let previous_treatments: Vec<String> = serde_json::from_str(&row.previous_treatments)?;
        let biomarkers: BTreeMap<String, String> = serde_json::from_str(&row.biomarkers)?;

        Ok(Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            age: row.age,
            gender: row.gender,
            primary_diagnosis: row.primary_diagnosis,
            cancer_stage,
            previous_treatments,
            location: row.location,
            travel_willingness: row.travel_willingness,
            biomarkers,
            performance_status: row.performance_status,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn sample_patient(first: &str, last: &str) -> Patient {
        let mut patient = Patient::new(
            first.into(),
            last.into(),
            58,
            "Non-Small Cell Lung Cancer".into(),
            CancerStage::StageIII,
        );
        patient.location = "Chicago, IL".into();
        patient.travel_willingness = "Within 100 miles".into();
        patient.biomarkers.insert("EGFR".into(), "Mutated".into());
        patient.previous_treatments = vec!["Chemotherapy".into()];
        patient
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut patient = sample_patient("Robert", "Chen");
        patient.email = Some("robert.chen@example.com".into());

        db.insert_patient(&patient).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved, patient);
        assert_eq!(retrieved.biomarkers.get("EGFR").map(String::as_str), Some("Mutated"));
    }

    #[test]
    fn test_get_missing_patient() {
        let db = setup_db();
        assert!(db.get_patient("nope").unwrap().is_none());
    }

    #[test]
    fn test_update_patient() {
        let db = setup_db();

        let mut patient = sample_patient("Robert", "Chen");
        db.insert_patient(&patient).unwrap();

        patient.cancer_stage = CancerStage::StageIV;
        patient.biomarkers.insert("PD-L1".into(), "High".into());
        assert!(db.update_patient(&patient).unwrap());

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved.cancer_stage, CancerStage::StageIV);
        assert_eq!(retrieved.biomarkers.len(), 2);
    }

    #[test]
    fn test_update_missing_patient() {
        let db = setup_db();
        assert!(!db.update_patient(&sample_patient("Ghost", "Patient")).unwrap());
    }

    #[test]
    fn test_search_patients() {
        let db = setup_db();

        db.insert_patient(&sample_patient("Maria", "Garcia")).unwrap();
        db.insert_patient(&sample_patient("Mark", "Lee")).unwrap();
        db.insert_patient(&sample_patient("Linda", "Martin")).unwrap();

        let results = db.search_patients("Mar", 10).unwrap();
        assert_eq!(results.len(), 3);

        let results = db.search_patients("Lee", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].first_name, "Mark");
    }

    #[test]
    fn test_list_in_insertion_order() {
        let db = setup_db();

        let a = sample_patient("Zoe", "Adams");
        let b = sample_patient("Amy", "Brown");
        db.insert_patient(&a).unwrap();
        db.insert_patient(&b).unwrap();

        let ids: Vec<String> = db.list_patients().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_delete_patient() {
        let db = setup_db();
        let patient = sample_patient("Robert", "Chen");
        db.insert_patient(&patient).unwrap();

        assert!(db.delete_patient(&patient.id).unwrap());
        assert!(!db.delete_patient(&patient.id).unwrap());
        assert!(db.get_patient(&patient.id).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_stage_is_constraint_error() {
        let db = setup_db();
        let patient = sample_patient("Robert", "Chen");
        db.insert_patient(&patient).unwrap();

        db.conn()
            .execute("UPDATE patients SET cancer_stage = 'Stage V' WHERE id = ?", [&patient.id])
            .unwrap();

        let result = db.get_patient(&patient.id);
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }
}
