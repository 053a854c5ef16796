//! The Tracker facade — everything the presentation layer calls.
//!
//! Exposes schedules, due lists, and statistics as plain data; rendering
//! and widgets live elsewhere. Every operation loads persisted state
//! fresh, computes, and (for mutations) writes back through the injected
//! stores, so no ambient mutable state survives between operations.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;
use crate::db::StoreError;
use crate::ledger::CompletionLedger;
use crate::models::{
    CompletionRecord, Modality, Patient, PatientDraft, TimelineFilter, ValidationError,
    MAX_VISIT_DATES,
};
use crate::reconcile::{self, CellStatus, ClassifiedCell};
use crate::registry::PatientRegistry;
use crate::schedule;
use crate::stats::{self, ModalityStats, MonthlyCounts};
use crate::store::{AudioLinkResolver, LedgerStore, PatientStore, SqliteStore};

/// Marker written into the result field by the bulk auto-completion
/// operation, so assumed completions stay distinguishable from
/// performed ones.
pub const AUTO_RESULT: &str = "auto";

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One row of a cross-patient due list, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueEntry {
    pub patient_id: String,
    pub date: NaiveDate,
    pub modality: Modality,
    pub status: CellStatus,
    pub result: Option<String>,
    /// Staff member responsible for this modality of this patient.
    pub staff: String,
    /// Playable link, resolved only for completed voice entries.
    pub audio_link: Option<String>,
}

/// A patient with an outpatient visit on the requested day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEntry {
    pub patient_id: String,
    pub visit_date: NaiveDate,
}

pub struct Tracker {
    patients: Arc<dyn PatientStore>,
    completions: Arc<dyn LedgerStore>,
    audio: Arc<dyn AudioLinkResolver>,
}

impl Tracker {
    pub fn with_stores(
        patients: Arc<dyn PatientStore>,
        completions: Arc<dyn LedgerStore>,
        audio: Arc<dyn AudioLinkResolver>,
    ) -> Self {
        Self {
            patients,
            completions,
            audio,
        }
    }

    /// Open a tracker over a SQLite file; one store instance backs all
    /// three seams, so its mutex is the single writer for the file.
    pub fn open(path: &Path) -> Result<Self, TrackerError> {
        let store = Arc::new(SqliteStore::open(path)?);
        Ok(Self::with_stores(store.clone(), store.clone(), store))
    }

    /// Open the default database under the application data directory.
    pub fn open_default() -> Result<Self, TrackerError> {
        let dir = config::app_data_dir();
        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::ConstraintViolation(format!("cannot create {}: {e}", dir.display()))
        })?;
        Self::open(&config::database_path())
    }

    // ── Patient management ──────────────────────────────────

    pub fn register_patient(&self, draft: &PatientDraft) -> Result<Patient, TrackerError> {
        let patient = draft.validate()?;
        let mut registry = self.registry()?;
        registry.register(patient.clone())?;
        tracing::info!("Registered patient {}", patient.patient_id);
        Ok(patient)
    }

    /// Rewrite a patient's whole record from a fresh draft.
    pub fn edit_patient(&self, draft: &PatientDraft) -> Result<Patient, TrackerError> {
        let patient = draft.validate()?;
        let mut registry = self.registry()?;
        registry.replace(patient.clone())?;
        tracing::info!("Edited patient {}", patient.patient_id);
        Ok(patient)
    }

    pub fn delete_patient(&self, patient_id: &str) -> Result<(), TrackerError> {
        let mut registry = self.registry()?;
        registry.remove(patient_id)?;
        tracing::info!("Deleted patient {patient_id}");
        Ok(())
    }

    pub fn get_patient(&self, patient_id: &str) -> Result<Patient, TrackerError> {
        Ok(self.registry()?.get(patient_id)?.clone())
    }

    pub fn list_patients(&self) -> Result<Vec<Patient>, TrackerError> {
        Ok(self.registry()?.patients().to_vec())
    }

    // ── Visit schedule ──────────────────────────────────────

    /// Replace a patient's outpatient visit dates (protocol allows at
    /// most four: the 3/6/9/12-month visits).
    pub fn update_visit_dates(
        &self,
        patient_id: &str,
        visit_dates: Vec<NaiveDate>,
    ) -> Result<Patient, TrackerError> {
        if visit_dates.len() > MAX_VISIT_DATES {
            return Err(ValidationError::TooManyVisitDates {
                count: visit_dates.len(),
            }
            .into());
        }
        let mut registry = self.registry()?;
        let mut patient = registry.get(patient_id)?.clone();
        patient.visit_dates = visit_dates;
        registry.replace(patient.clone())?;
        tracing::info!("Updated visit dates for {patient_id}");
        Ok(patient)
    }

    /// Patients with an outpatient visit on `date`.
    pub fn visits_on(&self, date: NaiveDate) -> Result<Vec<VisitEntry>, TrackerError> {
        let registry = self.registry()?;
        Ok(registry
            .patients()
            .iter()
            .filter(|p| p.visit_dates.contains(&date))
            .map(|p| VisitEntry {
                patient_id: p.patient_id.clone(),
                visit_date: date,
            })
            .collect())
    }

    // ── Per-patient schedule views ──────────────────────────

    /// The full 365-day classified schedule for one patient.
    pub fn classified_schedule(&self, patient_id: &str) -> Result<Vec<ClassifiedCell>, TrackerError> {
        let registry = self.registry()?;
        let ledger = self.ledger()?;
        let schedule = schedule::generate(registry.get(patient_id)?);
        Ok(reconcile::classify(&schedule, ledger.records()))
    }

    pub fn patient_timeline(
        &self,
        patient_id: &str,
        filter: &TimelineFilter,
    ) -> Result<Vec<ClassifiedCell>, TrackerError> {
        let registry = self.registry()?;
        let ledger = self.ledger()?;
        let schedule = schedule::generate(registry.get(patient_id)?);
        Ok(reconcile::timeline(&schedule, ledger.records(), filter))
    }

    // ── Cross-patient due lists ─────────────────────────────

    /// Due list for one calendar day across the whole cohort. With
    /// `staff` set, only entries that staff member is responsible for
    /// remain. Completed entries stay in the list, annotated, and
    /// completed voice entries carry their audio link when one resolves.
    pub fn due_list(
        &self,
        date: NaiveDate,
        staff: Option<&str>,
    ) -> Result<Vec<DueEntry>, TrackerError> {
        let registry = self.registry()?;
        let ledger = self.ledger()?;
        let schedules = schedule::generate_all(registry.patients());

        let mut entries = Vec::new();
        for (patient, schedule) in registry.patients().iter().zip(&schedules) {
            for cell in reconcile::due_on(schedule, ledger.records(), date) {
                let responsible = patient.staff_for(cell.modality);
                if staff.is_some_and(|s| s != responsible) {
                    continue;
                }
                entries.push(self.due_entry(cell, responsible.to_string()));
            }
        }
        Ok(entries)
    }

    pub fn due_today(&self, staff: Option<&str>) -> Result<Vec<DueEntry>, TrackerError> {
        self.due_list(Local::now().date_naive(), staff)
    }

    pub fn due_tomorrow(&self, staff: Option<&str>) -> Result<Vec<DueEntry>, TrackerError> {
        self.due_list(Local::now().date_naive() + Duration::days(1), staff)
    }

    /// Pending cells dated strictly before `today`, cohort-wide, oldest
    /// first. Surfaced for manual resolution; nothing here resolves them.
    pub fn past_due_unresolved(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ClassifiedCell>, TrackerError> {
        let registry = self.registry()?;
        let ledger = self.ledger()?;
        let schedules = schedule::generate_all(registry.patients());

        let mut cells: Vec<ClassifiedCell> = schedules
            .iter()
            .flat_map(|s| reconcile::past_due_pending(s, ledger.records(), today))
            .collect();
        cells.sort_by(|a, b| (a.date, &a.patient_id).cmp(&(b.date, &b.patient_id)));
        Ok(cells)
    }

    // ── Ledger mutations ────────────────────────────────────

    /// Record a completion for an enrolled patient. Returns `false` when
    /// the cell was already completed.
    pub fn mark_completed(
        &self,
        patient_id: &str,
        date: NaiveDate,
        modality: Modality,
        result: Option<String>,
    ) -> Result<bool, TrackerError> {
        let registry = self.registry()?;
        registry.get(patient_id)?;

        let mut ledger = self.ledger()?;
        let record = CompletionRecord {
            patient_id: patient_id.to_string(),
            date,
            modality,
            result,
        };
        Ok(ledger.mark_completed(record)?)
    }

    /// Cancel a completion, reverting the cell to pending. Returns
    /// `false` when there was nothing to cancel.
    pub fn cancel_completion(
        &self,
        patient_id: &str,
        date: NaiveDate,
        modality: Modality,
    ) -> Result<bool, TrackerError> {
        let registry = self.registry()?;
        registry.get(patient_id)?;

        let mut ledger = self.ledger()?;
        Ok(ledger.cancel(patient_id, date, modality)?)
    }

    /// Bulk-resolve every past-due pending cell, tagging each appended
    /// record [`AUTO_RESULT`]. This is the only path that resolves
    /// past-due cells without a per-cell user action; it runs only when
    /// called, and every run is logged.
    pub fn auto_complete_past_due(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<CompletionRecord>, TrackerError> {
        let registry = self.registry()?;
        let mut ledger = self.ledger()?;
        let schedules = schedule::generate_all(registry.patients());

        let mut appended = Vec::new();
        for schedule in &schedules {
            for cell in reconcile::past_due_pending(schedule, ledger.records(), today) {
                let record = CompletionRecord {
                    patient_id: cell.patient_id,
                    date: cell.date,
                    modality: cell.modality,
                    result: Some(AUTO_RESULT.to_string()),
                };
                if ledger.mark_completed(record.clone())? {
                    appended.push(record);
                }
            }
        }
        tracing::info!(
            "Auto-completed {} past-due cells as of {today}",
            appended.len()
        );
        Ok(appended)
    }

    // ── Statistics ──────────────────────────────────────────

    /// Per-modality adherence over due cells dated `<= today`. With
    /// `staff` set, restricted to patients that staff member is assigned
    /// to (on any modality).
    pub fn overall_stats(
        &self,
        today: NaiveDate,
        staff: Option<&str>,
    ) -> Result<Vec<ModalityStats>, TrackerError> {
        let registry = self.registry()?;
        let ledger = self.ledger()?;
        let schedules = schedule::generate_all(&self.staff_subset(&registry, staff));
        Ok(stats::modality_stats(&schedules, ledger.records(), today))
    }

    /// Month-bucketed due counts over the full horizon.
    pub fn monthly_due_counts(
        &self,
        staff: Option<&str>,
    ) -> Result<Vec<MonthlyCounts>, TrackerError> {
        let registry = self.registry()?;
        let schedules = schedule::generate_all(&self.staff_subset(&registry, staff));
        Ok(stats::monthly_due_counts(&schedules))
    }

    // ── Audio links ─────────────────────────────────────────

    /// Playable link for a completed voice test, if the resolver knows
    /// one. Lookup failures surface as "no link available".
    pub fn voice_audio_link(&self, patient_id: &str, date: NaiveDate) -> Option<String> {
        self.audio.resolve(patient_id, date)
    }

    // ── Internals ───────────────────────────────────────────

    fn registry(&self) -> Result<PatientRegistry, TrackerError> {
        Ok(PatientRegistry::load(self.patients.clone())?)
    }

    fn ledger(&self) -> Result<CompletionLedger, TrackerError> {
        Ok(CompletionLedger::load(self.completions.clone())?)
    }

    fn staff_subset(&self, registry: &PatientRegistry, staff: Option<&str>) -> Vec<Patient> {
        registry
            .patients()
            .iter()
            .filter(|p| staff.map_or(true, |s| p.assigned_to(s)))
            .cloned()
            .collect()
    }

    fn due_entry(&self, cell: ClassifiedCell, staff: String) -> DueEntry {
        let audio_link = (cell.modality == Modality::Voice
            && cell.status == CellStatus::Completed)
            .then(|| self.audio.resolve(&cell.patient_id, cell.date))
            .flatten();
        DueEntry {
            patient_id: cell.patient_id,
            date: cell.date,
            modality: cell.modality,
            status: cell.status,
            result: cell.result,
            staff,
            audio_link,
        }
    }
}
