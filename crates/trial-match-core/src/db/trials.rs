//! Clinical trial database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{BurdenLevel, ClinicalTrial, InclusionCriteria};

impl Database {
    /// Insert or update a trial.
    pub fn upsert_trial(&self, trial: &ClinicalTrial) -> DbResult<()> {
        let inclusion_json = serde_json::to_string(&trial.inclusion_criteria)?;
        let exclusion_json = serde_json::to_string(&trial.exclusion_criteria)?;

        self.conn.execute(
            r#"
            INSERT INTO clinical_trials (
                id, name, sponsor, phase, location, description, indication,
                current_enrollment, max_enrollment, inclusion_criteria, exclusion_criteria,
                treatment_burden, travel_burden, is_active, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                sponsor = excluded.sponsor,
                phase = excluded.phase,
                location = excluded.location,
                description = excluded.description,
                indication = excluded.indication,
                current_enrollment = excluded.current_enrollment,
                max_enrollment = excluded.max_enrollment,
                inclusion_criteria = excluded.inclusion_criteria,
                exclusion_criteria = excluded.exclusion_criteria,
                treatment_burden = excluded.treatment_burden,
                travel_burden = excluded.travel_burden,
                is_active = excluded.is_active,
                updated_at = datetime('now')
            "#,
            params![
                trial.id,
                trial.name,
                trial.sponsor,
                trial.phase,
                trial.location,
                trial.description,
                trial.indication,
                trial.current_enrollment,
                trial.max_enrollment,
                inclusion_json,
                exclusion_json,
                trial.treatment_burden.label(),
                trial.travel_burden.label(),
                trial.is_active,
            ],
        )?;
        Ok(())
    }

    /// Get a trial by ID.
    pub fn get_trial(&self, id: &str) -> DbResult<Option<ClinicalTrial>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT id, name, sponsor, phase, location, description, indication,
                       current_enrollment, max_enrollment, inclusion_criteria, exclusion_criteria,
                       treatment_burden, travel_burden, is_active
                FROM clinical_trials
                WHERE id = ?
                "#,
                [id],
                trial_row,
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// List active trials in insertion order (the order the matcher sees them).
    pub fn list_active_trials(&self) -> DbResult<Vec<ClinicalTrial>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, sponsor, phase, location, description, indication,
                   current_enrollment, max_enrollment, inclusion_criteria, exclusion_criteria,
                   treatment_burden, travel_burden, is_active
            FROM clinical_trials
            WHERE is_active = 1
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], trial_row)?;

        rows.map(|r| r.map_err(DbError::from).and_then(ClinicalTrial::try_from))
            .collect()
    }

    /// Number of active trials.
    pub fn count_active_trials(&self) -> DbResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM clinical_trials WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Deactivate a trial (soft delete; stored matches keep their reference).
    pub fn deactivate_trial(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE clinical_trials SET is_active = 0, updated_at = datetime('now') WHERE id = ?",
            [id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct TrialRow {
    id: String,
    name: String,
    sponsor: String,
    phase: String,
    location: String,
    description: String,
    indication: Option<String>,
    current_enrollment: u32,
    max_enrollment: u32,
    inclusion_criteria: String,
    exclusion_criteria: String,
    treatment_burden: String,
    travel_burden: String,
    is_active: bool,
}

fn trial_row(row: &Row<'_>) -> rusqlite::Result<TrialRow> {
    Ok(TrialRow {
        id: row.get(0)?,
        name: row.get(1)?,
        sponsor: row.get(2)?,
        phase: row.get(3)?,
        location: row.get(4)?,
        description: row.get(5)?,
        indication: row.get(6)?,
        current_enrollment: row.get(7)?,
        max_enrollment: row.get(8)?,
        inclusion_criteria: row.get(9)?,
        exclusion_criteria: row.get(10)?,
        treatment_burden: row.get(11)?,
        travel_burden: row.get(12)?,
        is_active: row.get(13)?,
    })
}

impl TryFrom<TrialRow> for ClinicalTrial {
    type Error = DbError;

    fn try_from(row: TrialRow) -> Result<Self, Self::Error> {
        let inclusion_criteria: InclusionCriteria = serde_json::from_str(&row.inclusion_criteria)?;
        let exclusion_criteria: Vec<String> = serde_json::from_str(&row.exclusion_criteria)?;

        Ok(ClinicalTrial {
            id: row.id,
            name: row.name,
            sponsor: row.sponsor,
            phase: row.phase,
            location: row.location,
            description: row.description,
            indication: row.indication,
            current_enrollment: row.current_enrollment,
            max_enrollment: row.max_enrollment,
            inclusion_criteria,
            exclusion_criteria,
            treatment_burden: BurdenLevel::from_label(&row.treatment_burden),
            travel_burden: BurdenLevel::from_label(&row.travel_burden),
            is_active: row.is_active,
        })
    }
}
