//! Digital twin database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::DigitalTwin;
use crate::twin::generate_digital_twin;

impl Database {
    /// Insert or replace the digital twin for a patient.
    pub fn upsert_digital_twin(&self, twin: &DigitalTwin) -> DbResult<()> {
        let clinical_json = serde_json::to_string(&twin.clinical_profile)?;
        let lifestyle_json = serde_json::to_string(&twin.lifestyle_factors)?;
        let engagement_json = serde_json::to_string(&twin.engagement_signals)?;

        self.conn.execute(
            r#"
            INSERT INTO digital_twins (
                patient_id, clinical_profile, lifestyle_factors, engagement_signals, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(patient_id) DO UPDATE SET
                clinical_profile = excluded.clinical_profile,
                lifestyle_factors = excluded.lifestyle_factors,
                engagement_signals = excluded.engagement_signals,
                created_at = excluded.created_at
            "#,
            params![
                twin.patient_id,
                clinical_json,
                lifestyle_json,
                engagement_json,
                twin.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get the stored digital twin for a patient.
    pub fn get_digital_twin(&self, patient_id: &str) -> DbResult<Option<DigitalTwin>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT patient_id, clinical_profile, lifestyle_factors, engagement_signals, created_at
                FROM digital_twins
                WHERE patient_id = ?
                "#,
                [patient_id],
                |row| {
                    Ok(TwinRow {
                        patient_id: row.get(0)?,
                        clinical_profile: row.get(1)?,
                        lifestyle_factors: row.get(2)?,
                        engagement_signals: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// Return the stored twin, deriving and storing one on first request.
    pub fn get_or_create_digital_twin(&self, patient_id: &str) -> DbResult<DigitalTwin> {
        if let Some(twin) = self.get_digital_twin(patient_id)? {
            return Ok(twin);
        }

        let patient = self
            .get_patient(patient_id)?
            .ok_or_else(|| DbError::NotFound(format!("Patient {}", patient_id)))?;

        let twin = generate_digital_twin(&patient);
        self.upsert_digital_twin(&twin)?;
        Ok(twin)
    }
}

/// Intermediate row struct for database mapping.
struct TwinRow {
    patient_id: String,
    clinical_profile: String,
    lifestyle_factors: String,
    engagement_signals: String,
    created_at: String,
}

impl TryFrom<TwinRow> for DigitalTwin {
    type Error = DbError;

    fn try_from(row: TwinRow) -> Result<Self, Self::Error> {
        Ok(DigitalTwin {
            patient_id: row.patient_id,
            clinical_profile: serde_json::from_str(&row.clinical_profile)?,
            lifestyle_factors: serde_json::from_str(&row.lifestyle_factors)?,
            engagement_signals: serde_json::from_str(&row.engagement_signals)?,
            created_at: row.created_at,
        })
    }
}
