use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::Modality;

/// One completed test. The `(patient_id, date, modality)` triple is the
/// identity; the ledger holds at most one record per triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub patient_id: String,
    pub date: NaiveDate,
    pub modality: Modality,
    /// Optional free-text result shown instead of the default marker.
    /// Automatic completions are tagged "auto" here.
    pub result: Option<String>,
}

impl CompletionRecord {
    pub fn new(patient_id: impl Into<String>, date: NaiveDate, modality: Modality) -> Self {
        Self {
            patient_id: patient_id.into(),
            date,
            modality,
            result: None,
        }
    }

    pub fn matches(&self, patient_id: &str, date: NaiveDate, modality: Modality) -> bool {
        self.patient_id == patient_id && self.date == date && self.modality == modality
    }
}
