//! Row-level persistence for patients, completions, and audio links.
//!
//! Patients are written wholesale (the registry rewrites the full table
//! in one transaction, mirroring the enrollment sheet it replaces);
//! completions are appended and removed row by row under a composite
//! primary key.

use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;
use crate::models::{CompletionRecord, Modality, Patient, SymptomCadence, VoiceCadence};

// ───────────────────────────────────────────
// patients
// ───────────────────────────────────────────

/// Replace the whole patient table with `patients`, atomically.
pub fn save_patients(conn: &mut Connection, patients: &[Patient]) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM patients", [])?;
    for patient in patients {
        tx.execute(
            "INSERT INTO patients (patient_id, baseline, start_date, voice_cadence,
             symptom_cadence, environment_sensor, wearable_sensor, visit_dates,
             voice_staff, symptom_staff, environment_staff, wearable_staff)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                patient.patient_id,
                patient.baseline,
                patient.start_date,
                patient.voice_cadence.as_str(),
                patient.symptom_cadence.as_str(),
                patient.environment_sensor as i32,
                patient.wearable_sensor as i32,
                encode_visit_dates(&patient.visit_dates),
                patient.voice_staff,
                patient.symptom_staff,
                patient.environment_staff,
                patient.wearable_staff,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn load_patients(conn: &Connection) -> Result<Vec<Patient>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, baseline, start_date, voice_cadence, symptom_cadence,
         environment_sensor, wearable_sensor, visit_dates,
         voice_staff, symptom_staff, environment_staff, wearable_staff
         FROM patients ORDER BY patient_id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, NaiveDate>(1)?,
            row.get::<_, NaiveDate>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i32>(5)?,
            row.get::<_, i32>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
            row.get::<_, String>(9)?,
            row.get::<_, String>(10)?,
            row.get::<_, String>(11)?,
        ))
    })?;

    let mut patients = Vec::new();
    for row in rows {
        let (
            patient_id,
            baseline,
            start_date,
            voice_cadence,
            symptom_cadence,
            environment_sensor,
            wearable_sensor,
            visit_dates,
            voice_staff,
            symptom_staff,
            environment_staff,
            wearable_staff,
        ) = row?;
        patients.push(Patient {
            patient_id,
            baseline,
            start_date,
            voice_cadence: VoiceCadence::from_str(&voice_cadence)?,
            symptom_cadence: SymptomCadence::from_str(&symptom_cadence)?,
            environment_sensor: environment_sensor != 0,
            wearable_sensor: wearable_sensor != 0,
            visit_dates: decode_visit_dates(&visit_dates),
            voice_staff,
            symptom_staff,
            environment_staff,
            wearable_staff,
        });
    }
    Ok(patients)
}

/// Visit dates persist as a `|`-joined string, the wire format of the
/// enrollment sheets this table replaces.
fn encode_visit_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

fn decode_visit_dates(encoded: &str) -> Vec<NaiveDate> {
    encoded
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .collect()
}

// ───────────────────────────────────────────
// completions
// ───────────────────────────────────────────

pub fn load_completions(conn: &Connection) -> Result<Vec<CompletionRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, date, modality, result
         FROM completions ORDER BY date, patient_id, modality",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, NaiveDate>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (patient_id, date, modality, result) = row?;
        records.push(CompletionRecord {
            patient_id,
            date,
            modality: Modality::from_str(&modality)?,
            result,
        });
    }
    Ok(records)
}

/// Insert one completion. The composite key makes a repeated insert a
/// no-op; returns how many rows were actually added (0 or 1).
pub fn append_completion(conn: &Connection, record: &CompletionRecord) -> Result<usize, StoreError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO completions (patient_id, date, modality, result)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            record.patient_id,
            record.date,
            record.modality.as_str(),
            record.result,
        ],
    )?;
    Ok(inserted)
}

/// Remove the completion matching the key; returns how many rows went.
pub fn remove_completion(
    conn: &Connection,
    patient_id: &str,
    date: NaiveDate,
    modality: Modality,
) -> Result<usize, StoreError> {
    let removed = conn.execute(
        "DELETE FROM completions WHERE patient_id = ?1 AND date = ?2 AND modality = ?3",
        params![patient_id, date, modality.as_str()],
    )?;
    Ok(removed)
}

// ───────────────────────────────────────────
// audio links
// ───────────────────────────────────────────

pub fn get_audio_link(
    conn: &Connection,
    patient_id: &str,
    date: NaiveDate,
) -> Result<Option<String>, StoreError> {
    let link = conn
        .query_row(
            "SELECT link FROM audio_links WHERE patient_id = ?1 AND exam_date = ?2",
            params![patient_id, date],
            |row| row.get(0),
        )
        .optional()?;
    Ok(link)
}

pub fn put_audio_link(
    conn: &Connection,
    patient_id: &str,
    date: NaiveDate,
    link: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO audio_links (patient_id, exam_date, link) VALUES (?1, ?2, ?3)
         ON CONFLICT (patient_id, exam_date) DO UPDATE SET link = excluded.link",
        params![patient_id, date, link],
    )?;
    Ok(())
}
