//! Patient registry — wholesale read/rewrite of the enrollment table.
//!
//! Mirrors the ledger's persist-first rule: the candidate table is saved
//! through the [`PatientStore`] before the in-memory copy moves, so a
//! failed save leaves both the store and the registry as they were.

use std::sync::Arc;

use crate::db::StoreError;
use crate::models::Patient;
use crate::store::PatientStore;

pub struct PatientRegistry {
    store: Arc<dyn PatientStore>,
    patients: Vec<Patient>,
}

impl PatientRegistry {
    pub fn load(store: Arc<dyn PatientStore>) -> Result<Self, StoreError> {
        let patients = store.load()?;
        Ok(Self { store, patients })
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn get(&self, patient_id: &str) -> Result<&Patient, StoreError> {
        self.patients
            .iter()
            .find(|p| p.patient_id == patient_id)
            .ok_or_else(|| StoreError::NotFound {
                entity_type: "patient".into(),
                id: patient_id.into(),
            })
    }

    /// Add a new patient. Registration numbers are hospital-issued, so a
    /// second registration under the same id is always a caller mistake.
    pub fn register(&mut self, patient: Patient) -> Result<(), StoreError> {
        if self.get(&patient.patient_id).is_ok() {
            return Err(StoreError::ConstraintViolation(format!(
                "patient {} is already registered",
                patient.patient_id
            )));
        }
        let mut next = self.patients.clone();
        next.push(patient);
        self.commit(next)
    }

    /// Replace the whole record for an existing patient.
    pub fn replace(&mut self, patient: Patient) -> Result<(), StoreError> {
        let index = self.index_of(&patient.patient_id)?;
        let mut next = self.patients.clone();
        next[index] = patient;
        self.commit(next)
    }

    /// Delete a patient entirely.
    pub fn remove(&mut self, patient_id: &str) -> Result<(), StoreError> {
        let index = self.index_of(patient_id)?;
        let mut next = self.patients.clone();
        next.remove(index);
        self.commit(next)
    }

    fn index_of(&self, patient_id: &str) -> Result<usize, StoreError> {
        self.patients
            .iter()
            .position(|p| p.patient_id == patient_id)
            .ok_or_else(|| StoreError::NotFound {
                entity_type: "patient".into(),
                id: patient_id.into(),
            })
    }

    fn commit(&mut self, next: Vec<Patient>) -> Result<(), StoreError> {
        self.store.save(&next)?;
        self.patients = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientDraft;
    use crate::store::SqliteStore;

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

    fn registry() -> PatientRegistry {
        PatientRegistry::load(Arc::new(SqliteStore::open_in_memory().unwrap())).unwrap()
    }

    struct ReadOnlyStore;

    impl PatientStore for ReadOnlyStore {
        fn load(&self) -> Result<Vec<Patient>, StoreError> {
            Ok(vec![])
        }

        fn save(&self, _patients: &[Patient]) -> Result<(), StoreError> {
            Err(StoreError::ConstraintViolation("store is read-only".into()))
        }
    }

    #[test]
    fn register_then_get_and_list() {
        let mut registry = registry();
        registry.register(patient("P1")).unwrap();
        registry.register(patient("P2")).unwrap();

        assert_eq!(registry.patients().len(), 2);
        assert_eq!(registry.get("P1").unwrap().patient_id, "P1");
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = registry();
        registry.register(patient("P1")).unwrap();
        let err = registry.register(patient("P1")).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert_eq!(registry.patients().len(), 1);
    }

    #[test]
    fn replace_rewrites_the_whole_record() {
        let mut registry = registry();
        registry.register(patient("P1")).unwrap();

        let mut edited = patient("P1");
        edited.voice_staff = "Choi".into();
        edited.wearable_sensor = true;
        registry.replace(edited).unwrap();

        let stored = registry.get("P1").unwrap();
        assert_eq!(stored.voice_staff, "Choi");
        assert!(stored.wearable_sensor);
    }

    #[test]
    fn replace_missing_patient_is_not_found() {
        let mut registry = registry();
        let err = registry.replace(patient("P9")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn remove_deletes_whole_patient() {
        let mut registry = registry();
        registry.register(patient("P1")).unwrap();
        registry.remove("P1").unwrap();
        assert!(registry.patients().is_empty());
        assert!(registry.get("P1").is_err());
    }

    #[test]
    fn remove_missing_patient_is_not_found() {
        let mut registry = registry();
        assert!(matches!(
            registry.remove("P9").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn failed_save_leaves_registry_unchanged() {
        let mut registry = PatientRegistry::load(Arc::new(ReadOnlyStore)).unwrap();
        assert!(registry.register(patient("P1")).is_err());
        assert!(registry.patients().is_empty());
    }
}
