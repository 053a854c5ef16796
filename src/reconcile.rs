//! Reconciliation — overlays the completion ledger onto a generated
//! schedule and classifies every due cell.
//!
//! A cell is COMPLETED exactly when the generator marks it due and a
//! matching ledger record exists; due without a record is PENDING; a day
//! the generator did not mark due stays out of every view regardless of
//! ledger contents. All functions here are pure: they take a schedule
//! and a slice of records and never touch storage.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{CompletionRecord, Modality, TimelineFilter};
use crate::schedule::Schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStatus {
    Pending,
    Completed,
}

/// A due cell with its reconciled status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedCell {
    pub patient_id: String,
    pub date: NaiveDate,
    pub modality: Modality,
    pub status: CellStatus,
    /// Free-text result carried over from the matching ledger record.
    pub result: Option<String>,
}

/// Classify every due cell of the schedule, in date order (modalities in
/// protocol order within a day). Records for other patients or for
/// not-due days are ignored.
pub fn classify(schedule: &Schedule, records: &[CompletionRecord]) -> Vec<ClassifiedCell> {
    let completed: HashMap<(NaiveDate, Modality), &Option<String>> = records
        .iter()
        .filter(|r| r.patient_id == schedule.patient_id)
        .map(|r| ((r.date, r.modality), &r.result))
        .collect();

    let mut cells = Vec::new();
    for row in &schedule.days {
        for modality in Modality::ALL {
            if !row.is_due(modality) {
                continue;
            }
            let (status, result) = match completed.get(&(row.date, modality)) {
                Some(result) => (CellStatus::Completed, (*result).clone()),
                None => (CellStatus::Pending, None),
            };
            cells.push(ClassifiedCell {
                patient_id: schedule.patient_id.clone(),
                date: row.date,
                modality,
                status,
                result,
            });
        }
    }
    cells
}

/// Date-ordered classified cells restricted by the caller's filter.
pub fn timeline(
    schedule: &Schedule,
    records: &[CompletionRecord],
    filter: &TimelineFilter,
) -> Vec<ClassifiedCell> {
    classify(schedule, records)
        .into_iter()
        .filter(|cell| filter.accepts(cell.date, cell.modality))
        .collect()
}

/// Classified due cells for a single date. Completed cells stay in the
/// list (annotated), so a due-today view can offer cancellation.
pub fn due_on(
    schedule: &Schedule,
    records: &[CompletionRecord],
    date: NaiveDate,
) -> Vec<ClassifiedCell> {
    classify(schedule, records)
        .into_iter()
        .filter(|cell| cell.date == date)
        .collect()
}

/// Pending cells strictly before `today`. Surfaced for manual
/// resolution; nothing in this module resolves them.
pub fn past_due_pending(
    schedule: &Schedule,
    records: &[CompletionRecord],
    today: NaiveDate,
) -> Vec<ClassifiedCell> {
    classify(schedule, records)
        .into_iter()
        .filter(|cell| cell.status == CellStatus::Pending && cell.date < today)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, PatientDraft};
    use crate::schedule::generate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn patient() -> Patient {
        PatientDraft {
            patient_id: "P1".into(),
            baseline: "2025-01-01".into(),
            start_date: "2025-01-01".into(),
            voice_cadence: "1w".into(),
            symptom_cadence: "daily".into(),
            environment_sensor: false,
            wearable_sensor: false,
            visit_dates: vec![],
            voice_staff: "Kim".into(),
            symptom_staff: "Choi".into(),
            environment_staff: "Kim".into(),
            wearable_staff: "Choi".into(),
        }
        .validate()
        .unwrap()
    }

    fn record(day: &str, modality: Modality) -> CompletionRecord {
        CompletionRecord::new("P1", date(day), modality)
    }

    fn cell<'a>(
        cells: &'a [ClassifiedCell],
        day: &str,
        modality: Modality,
    ) -> Option<&'a ClassifiedCell> {
        cells
            .iter()
            .find(|c| c.date == date(day) && c.modality == modality)
    }

    #[test]
    fn due_cell_without_record_is_pending() {
        let cells = classify(&generate(&patient()), &[]);
        let c = cell(&cells, "2025-01-08", Modality::Voice).unwrap();
        assert_eq!(c.status, CellStatus::Pending);
        assert!(c.result.is_none());
    }

    #[test]
    fn matching_record_completes_cell_and_removal_reverts_it() {
        let schedule = generate(&patient());
        let records = vec![record("2025-01-08", Modality::Voice)];

        let cells = classify(&schedule, &records);
        let c = cell(&cells, "2025-01-08", Modality::Voice).unwrap();
        assert_eq!(c.status, CellStatus::Completed);

        let cells = classify(&schedule, &[]);
        let c = cell(&cells, "2025-01-08", Modality::Voice).unwrap();
        assert_eq!(c.status, CellStatus::Pending);
    }

    #[test]
    fn record_on_not_due_day_produces_no_cell() {
        let schedule = generate(&patient());
        // 2025-01-05 is not a voice day for a weekly cadence.
        let records = vec![record("2025-01-05", Modality::Voice)];
        let cells = classify(&schedule, &records);
        assert!(cell(&cells, "2025-01-05", Modality::Voice).is_none());
    }

    #[test]
    fn other_patients_records_are_ignored() {
        let schedule = generate(&patient());
        let records = vec![CompletionRecord::new("P9", date("2025-01-08"), Modality::Voice)];
        let cells = classify(&schedule, &records);
        let c = cell(&cells, "2025-01-08", Modality::Voice).unwrap();
        assert_eq!(c.status, CellStatus::Pending);
    }

    #[test]
    fn completed_iff_due_and_record_exists() {
        let schedule = generate(&patient());
        let records = vec![
            record("2025-01-01", Modality::Voice),
            record("2025-01-03", Modality::Symptom),
        ];
        for c in classify(&schedule, &records) {
            let has_record = records.iter().any(|r| r.matches("P1", c.date, c.modality));
            assert_eq!(c.status == CellStatus::Completed, has_record);
        }
    }

    #[test]
    fn result_text_carried_onto_completed_cell() {
        let schedule = generate(&patient());
        let mut r = record("2025-01-08", Modality::Voice);
        r.result = Some("retest".into());
        let cells = classify(&schedule, &[r]);
        let c = cell(&cells, "2025-01-08", Modality::Voice).unwrap();
        assert_eq!(c.result.as_deref(), Some("retest"));
    }

    #[test]
    fn classify_output_is_date_ordered() {
        let cells = classify(&generate(&patient()), &[]);
        assert!(cells.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn timeline_respects_range_and_modality_filter() {
        let schedule = generate(&patient());
        let filter = TimelineFilter {
            date_from: Some(date("2025-01-06")),
            date_to: Some(date("2025-01-12")),
            modalities: Some(vec![Modality::Voice]),
        };
        let cells = timeline(&schedule, &[], &filter);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].date, date("2025-01-08"));
        assert_eq!(cells[0].modality, Modality::Voice);
    }

    #[test]
    fn due_on_keeps_completed_cells_annotated() {
        let schedule = generate(&patient());
        let records = vec![record("2025-01-08", Modality::Symptom)];
        let cells = due_on(&schedule, &records, date("2025-01-08"));
        // weekly voice day + daily symptom day
        assert_eq!(cells.len(), 2);
        let symptom = cell(&cells, "2025-01-08", Modality::Symptom).unwrap();
        assert_eq!(symptom.status, CellStatus::Completed);
        let voice = cell(&cells, "2025-01-08", Modality::Voice).unwrap();
        assert_eq!(voice.status, CellStatus::Pending);
    }

    #[test]
    fn past_due_is_strictly_before_today_and_pending_only() {
        let schedule = generate(&patient());
        let records = vec![record("2025-01-02", Modality::Symptom)];
        let past_due = past_due_pending(&schedule, &records, date("2025-01-04"));

        assert!(past_due.iter().all(|c| c.date < date("2025-01-04")));
        assert!(past_due.iter().all(|c| c.status == CellStatus::Pending));
        // the completed 01-02 symptom cell is out, today's cells are out
        assert!(cell(&past_due, "2025-01-02", Modality::Symptom).is_none());
        assert!(cell(&past_due, "2025-01-04", Modality::Symptom).is_none());
        // 01-01 voice+symptom and 01-02/01-03 symptom remain
        assert!(cell(&past_due, "2025-01-01", Modality::Voice).is_some());
        assert!(cell(&past_due, "2025-01-03", Modality::Symptom).is_some());
    }
}
