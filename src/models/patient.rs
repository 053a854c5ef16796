use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::{Modality, SymptomCadence, VoiceCadence};

/// Dates arrive from enrollment forms and spreadsheets in this format.
pub const DATE_FMT: &str = "%Y-%m-%d";

/// Outpatient visits are scheduled at 3/6/9/12 months, so four at most.
pub const MAX_VISIT_DATES: usize = 4;

/// A validated enrollment record. Only ever constructed through
/// [`PatientDraft::validate`], so schedule generation can rely on its
/// invariants (non-empty id, baseline <= start_date, <= 4 visit dates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub baseline: NaiveDate,
    pub start_date: NaiveDate,
    pub voice_cadence: VoiceCadence,
    pub symptom_cadence: SymptomCadence,
    pub environment_sensor: bool,
    pub wearable_sensor: bool,
    pub visit_dates: Vec<NaiveDate>,
    pub voice_staff: String,
    pub symptom_staff: String,
    pub environment_staff: String,
    pub wearable_staff: String,
}

impl Patient {
    /// Responsible staff member for one modality.
    pub fn staff_for(&self, modality: Modality) -> &str {
        match modality {
            Modality::Voice => &self.voice_staff,
            Modality::Symptom => &self.symptom_staff,
            Modality::Environment => &self.environment_staff,
            Modality::Wearable => &self.wearable_staff,
        }
    }

    /// Whether `staff` is responsible for any modality of this patient.
    pub fn assigned_to(&self, staff: &str) -> bool {
        Modality::ALL.iter().any(|m| self.staff_for(*m) == staff)
    }
}

/// Unvalidated enrollment input: string dates and enum wire values,
/// exactly as they come off a registration form or an import sheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientDraft {
    pub patient_id: String,
    pub baseline: String,
    pub start_date: String,
    pub voice_cadence: String,
    pub symptom_cadence: String,
    pub environment_sensor: bool,
    pub wearable_sensor: bool,
    pub visit_dates: Vec<String>,
    pub voice_staff: String,
    pub symptom_staff: String,
    pub environment_staff: String,
    pub wearable_staff: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("patient id must not be empty")]
    EmptyPatientId,

    #[error("invalid date for {field}: {value}")]
    BadDate { field: &'static str, value: String },

    #[error("unknown cadence value for {field}: {value}")]
    UnknownCadence { field: &'static str, value: String },

    #[error("baseline {baseline} is after start date {start_date}")]
    BaselineAfterStart {
        baseline: NaiveDate,
        start_date: NaiveDate,
    },

    #[error("at most {MAX_VISIT_DATES} visit dates allowed, got {count}")]
    TooManyVisitDates { count: usize },
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FMT).map_err(|_| ValidationError::BadDate {
        field,
        value: value.to_string(),
    })
}

impl PatientDraft {
    /// Validate the draft into a [`Patient`]. An invalid draft never
    /// reaches schedule generation.
    pub fn validate(&self) -> Result<Patient, ValidationError> {
        let patient_id = self.patient_id.trim();
        if patient_id.is_empty() {
            return Err(ValidationError::EmptyPatientId);
        }

        let baseline = parse_date("baseline", &self.baseline)?;
        let start_date = parse_date("start_date", &self.start_date)?;
        if baseline > start_date {
            return Err(ValidationError::BaselineAfterStart {
                baseline,
                start_date,
            });
        }

        let voice_cadence = VoiceCadence::from_str(&self.voice_cadence).map_err(|_| {
            ValidationError::UnknownCadence {
                field: "voice_cadence",
                value: self.voice_cadence.clone(),
            }
        })?;
        let symptom_cadence = SymptomCadence::from_str(&self.symptom_cadence).map_err(|_| {
            ValidationError::UnknownCadence {
                field: "symptom_cadence",
                value: self.symptom_cadence.clone(),
            }
        })?;

        if self.visit_dates.len() > MAX_VISIT_DATES {
            return Err(ValidationError::TooManyVisitDates {
                count: self.visit_dates.len(),
            });
        }
        let mut visit_dates = Vec::with_capacity(self.visit_dates.len());
        for value in &self.visit_dates {
            visit_dates.push(parse_date("visit_dates", value)?);
        }

        Ok(Patient {
            patient_id: patient_id.to_string(),
            baseline,
            start_date,
            voice_cadence,
            symptom_cadence,
            environment_sensor: self.environment_sensor,
            wearable_sensor: self.wearable_sensor,
            visit_dates,
            voice_staff: self.voice_staff.clone(),
            symptom_staff: self.symptom_staff.clone(),
            environment_staff: self.environment_staff.clone(),
            wearable_staff: self.wearable_staff.clone(),
        })
    }
}
