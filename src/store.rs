//! Store seams between the engine and its backing storage.
//!
//! The registry and ledger are written against these traits, not against
//! SQLite, so a spreadsheet- or CSV-backed collaborator can slot in
//! without touching the engine. [`SqliteStore`] is the bundled
//! implementation: one connection behind a mutex, so all mutations
//! against a backing file are serialized through a single writer.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::{self, StoreError};
use crate::models::{CompletionRecord, Modality, Patient};

/// Wholesale persistence for the enrollment table.
pub trait PatientStore: Send + Sync {
    fn load(&self) -> Result<Vec<Patient>, StoreError>;
    fn save(&self, patients: &[Patient]) -> Result<(), StoreError>;
}

/// Persistence for the completion ledger.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Vec<CompletionRecord>, StoreError>;
    fn append(&self, record: &CompletionRecord) -> Result<(), StoreError>;
    fn remove(
        &self,
        patient_id: &str,
        date: NaiveDate,
        modality: Modality,
    ) -> Result<usize, StoreError>;
}

/// Lookup from (patient, exam date) to a playable audio link.
///
/// Infallible by contract: implementations catch their own failures and
/// answer `None`, so a broken link table can never take down a view.
pub trait AudioLinkResolver: Send + Sync {
    fn resolve(&self, patient_id: &str, date: NaiveDate) -> Option<String>;
}

/// SQLite-backed implementation of all three store seams.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(db::open_database(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(db::open_memory_database()?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Register a playable link for one (patient, exam date). Links are
    /// imported out of band; the engine only ever reads them.
    pub fn put_audio_link(
        &self,
        patient_id: &str,
        date: NaiveDate,
        link: &str,
    ) -> Result<(), StoreError> {
        db::put_audio_link(&*self.conn()?, patient_id, date, link)
    }
}

impl PatientStore for SqliteStore {
    fn load(&self) -> Result<Vec<Patient>, StoreError> {
        db::load_patients(&*self.conn()?)
    }

    fn save(&self, patients: &[Patient]) -> Result<(), StoreError> {
        db::save_patients(&mut *self.conn()?, patients)
    }
}

impl LedgerStore for SqliteStore {
    fn load(&self) -> Result<Vec<CompletionRecord>, StoreError> {
        db::load_completions(&*self.conn()?)
    }

    fn append(&self, record: &CompletionRecord) -> Result<(), StoreError> {
        db::append_completion(&*self.conn()?, record)?;
        Ok(())
    }

    fn remove(
        &self,
        patient_id: &str,
        date: NaiveDate,
        modality: Modality,
    ) -> Result<usize, StoreError> {
        db::remove_completion(&*self.conn()?, patient_id, date, modality)
    }
}

impl AudioLinkResolver for SqliteStore {
    fn resolve(&self, patient_id: &str, date: NaiveDate) -> Option<String> {
        let conn = match self.conn() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("audio link lookup unavailable: {e}");
                return None;
            }
        };
        match db::get_audio_link(&conn, patient_id, date) {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!("audio link lookup failed for {patient_id} on {date}: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientDraft;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn patient(id: &str) -> Patient {
        PatientDraft {
            patient_id: id.into(),
            baseline: "2025-01-01".into(),
            start_date: "2025-01-01".into(),
            voice_cadence: "1w".into(),
            symptom_cadence: "daily".into(),
            environment_sensor: false,
            wearable_sensor: false,
            visit_dates: vec![],
            voice_staff: "Kim".into(),
            symptom_staff: "Kim".into(),
            environment_staff: "Kim".into(),
            wearable_staff: "Kim".into(),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn state_survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohorta.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            PatientStore::save(&store, &[patient("P1")]).unwrap();
            LedgerStore::append(
                &store,
                &CompletionRecord::new("P1", date("2025-01-08"), Modality::Voice),
            )
            .unwrap();
            store
                .put_audio_link("P1", date("2025-01-08"), "https://drive/a")
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(PatientStore::load(&store).unwrap().len(), 1);
        assert_eq!(LedgerStore::load(&store).unwrap().len(), 1);
        assert_eq!(
            store.resolve("P1", date("2025-01-08")).as_deref(),
            Some("https://drive/a")
        );
    }

    #[test]
    fn resolver_answers_none_for_unknown_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.resolve("P1", date("2025-01-08")).is_none());
    }

    #[test]
    fn resolver_degrades_instead_of_failing() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute_batch("DROP TABLE audio_links")
            .unwrap();
        // the lookup now errors inside, the caller just sees "no link"
        assert!(store.resolve("P1", date("2025-01-08")).is_none());
    }
}
