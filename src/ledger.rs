//! The completion ledger — which tests were actually performed,
//! independent of whether the schedule said they were due.
//!
//! Mutations persist through the injected [`LedgerStore`] before the
//! in-memory copy changes; if the store refuses, the ledger is exactly
//! as it was and the error goes back to the caller. One record per
//! `(patient, date, modality)` key: re-marking is a no-op and a single
//! cancel fully reverts a cell.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::db::StoreError;
use crate::models::{CompletionRecord, Modality};
use crate::store::LedgerStore;

pub struct CompletionLedger {
    store: Arc<dyn LedgerStore>,
    records: Vec<CompletionRecord>,
}

impl CompletionLedger {
    /// Read the full ledger from the store. Loaded fresh per operation;
    /// nothing here outlives the request that needed it.
    pub fn load(store: Arc<dyn LedgerStore>) -> Result<Self, StoreError> {
        let records = store.load()?;
        Ok(Self { store, records })
    }

    pub fn records(&self) -> &[CompletionRecord] {
        &self.records
    }

    /// All records matching the patient, optionally narrowed to a date
    /// and/or a modality. No due-ness validation happens here.
    pub fn query(
        &self,
        patient_id: &str,
        date: Option<NaiveDate>,
        modality: Option<Modality>,
    ) -> Vec<&CompletionRecord> {
        self.records
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .filter(|r| date.map_or(true, |d| r.date == d))
            .filter(|r| modality.map_or(true, |m| r.modality == m))
            .collect()
    }

    fn contains(&self, patient_id: &str, date: NaiveDate, modality: Modality) -> bool {
        self.records
            .iter()
            .any(|r| r.matches(patient_id, date, modality))
    }

    /// Record a completion. Returns `false` (and touches nothing) when
    /// the key is already present.
    pub fn mark_completed(&mut self, record: CompletionRecord) -> Result<bool, StoreError> {
        if self.contains(&record.patient_id, record.date, record.modality) {
            return Ok(false);
        }
        self.store.append(&record)?;
        tracing::info!(
            "Marked {} completed for {} on {}",
            record.modality.as_str(),
            record.patient_id,
            record.date
        );
        self.records.push(record);
        Ok(true)
    }

    /// Cancel a completion. Returns `false` when no record matched.
    pub fn cancel(
        &mut self,
        patient_id: &str,
        date: NaiveDate,
        modality: Modality,
    ) -> Result<bool, StoreError> {
        if !self.contains(patient_id, date, modality) {
            return Ok(false);
        }
        self.store.remove(patient_id, date, modality)?;
        tracing::info!(
            "Cancelled {} completion for {patient_id} on {date}",
            modality.as_str()
        );
        self.records.retain(|r| !r.matches(patient_id, date, modality));
        Ok(true)
    }
}
