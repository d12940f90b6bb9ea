//! SQLite schema definition.

/// Complete database schema for trial matching.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age >= 0),
    gender TEXT NOT NULL DEFAULT '',
    primary_diagnosis TEXT NOT NULL,
    cancer_stage TEXT NOT NULL,                  -- 'Stage I' .. 'Stage IV'
    previous_treatments TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    location TEXT NOT NULL DEFAULT '',
    travel_willingness TEXT NOT NULL DEFAULT '',
    biomarkers TEXT NOT NULL DEFAULT '{}',       -- JSON object marker -> value
    performance_status TEXT NOT NULL DEFAULT '',
    email TEXT,
    phone TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(last_name, first_name);

-- ============================================================================
-- Clinical Trials
-- ============================================================================

CREATE TABLE IF NOT EXISTS clinical_trials (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    sponsor TEXT NOT NULL DEFAULT '',
    phase TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    indication TEXT,
    current_enrollment INTEGER NOT NULL DEFAULT 0,
    max_enrollment INTEGER NOT NULL DEFAULT 0,
    inclusion_criteria TEXT NOT NULL DEFAULT '{}', -- JSON object
    exclusion_criteria TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    treatment_burden TEXT NOT NULL DEFAULT 'Medium',
    travel_burden TEXT NOT NULL DEFAULT 'Medium',
    is_active INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_trials_active ON clinical_trials(is_active);

-- ============================================================================
-- Trial Matches (replaced wholesale per patient on each matching run)
-- ============================================================================

CREATE TABLE IF NOT EXISTS trial_matches (
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    trial_id TEXT NOT NULL REFERENCES clinical_trials(id),
    position INTEGER NOT NULL,                   -- 0-based rank, best first
    match_score INTEGER NOT NULL CHECK (match_score BETWEEN 0 AND 100),
    cancer_type_score INTEGER NOT NULL,
    biomarker_score INTEGER NOT NULL,
    location_score INTEGER NOT NULL,
    burden_score INTEGER NOT NULL,
    completion_likelihood TEXT NOT NULL CHECK (completion_likelihood IN ('Low', 'Medium', 'High')),
    explanation_factors TEXT NOT NULL DEFAULT '{"positive":[],"negative":[]}', -- JSON object
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (patient_id, trial_id)
);

CREATE INDEX IF NOT EXISTS idx_matches_trial ON trial_matches(trial_id);

-- Input fingerprint of the last matching run per patient
CREATE TABLE IF NOT EXISTS match_runs (
    patient_id TEXT PRIMARY KEY REFERENCES patients(id) ON DELETE CASCADE,
    input_fingerprint TEXT NOT NULL,             -- SHA-256 hex of patient + active trials
    match_count INTEGER NOT NULL,
    computed_at TEXT NOT NULL
);

-- ============================================================================
-- Digital Twins
-- ============================================================================

CREATE TABLE IF NOT EXISTS digital_twins (
    patient_id TEXT PRIMARY KEY REFERENCES patients(id) ON DELETE CASCADE,
    clinical_profile TEXT NOT NULL,              -- JSON object
    lifestyle_factors TEXT NOT NULL,             -- JSON object
    engagement_signals TEXT NOT NULL,            -- JSON object
    created_at TEXT NOT NULL
);
"#;
