//! Cross-patient progress statistics.
//!
//! Rolls classified due cells into per-modality completion counts and
//! progress/drop rates, plus month-bucketed due counts for trend
//! reporting. Accumulation is commutative: totals do not depend on
//! patient iteration order.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{CompletionRecord, Modality};
use crate::schedule::Schedule;

/// Adherence counters for one modality, over due cells dated up to and
/// including the reporting day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityStats {
    pub modality: Modality,
    pub total_due: u32,
    pub completed: u32,
    pub pending: u32,
    /// completed / total_due × 100; 0.0 when nothing was due.
    pub progress_pct: f64,
    /// pending / total_due × 100; 0.0 when nothing was due.
    pub drop_pct: f64,
}

/// Due-cell counts per calendar month, one row per "YYYY-MM".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCounts {
    pub month: String,
    pub voice: u32,
    pub symptom: u32,
    pub environment: u32,
    pub wearable: u32,
}

/// Per-modality adherence across the cohort, counting due cells dated
/// `<= today`. Returned in protocol modality order.
pub fn modality_stats(
    schedules: &[Schedule],
    records: &[CompletionRecord],
    today: NaiveDate,
) -> Vec<ModalityStats> {
    let completed_keys: HashSet<(&str, NaiveDate, Modality)> = records
        .iter()
        .map(|r| (r.patient_id.as_str(), r.date, r.modality))
        .collect();

    let mut totals = [0u32; Modality::ALL.len()];
    let mut completed = [0u32; Modality::ALL.len()];

    for schedule in schedules {
        for row in &schedule.days {
            if row.date > today {
                break;
            }
            for (slot, modality) in Modality::ALL.into_iter().enumerate() {
                if !row.is_due(modality) {
                    continue;
                }
                totals[slot] += 1;
                if completed_keys.contains(&(schedule.patient_id.as_str(), row.date, modality)) {
                    completed[slot] += 1;
                }
            }
        }
    }

    Modality::ALL
        .into_iter()
        .enumerate()
        .map(|(slot, modality)| {
            let total_due = totals[slot];
            let done = completed[slot];
            let pending = total_due - done;
            ModalityStats {
                modality,
                total_due,
                completed: done,
                pending,
                progress_pct: rate(done, total_due),
                drop_pct: rate(pending, total_due),
            }
        })
        .collect()
}

/// Due-cell counts bucketed by calendar year-month over the full
/// horizon, sorted by month.
pub fn monthly_due_counts(schedules: &[Schedule]) -> Vec<MonthlyCounts> {
    let mut buckets: BTreeMap<String, [u32; 4]> = BTreeMap::new();

    for schedule in schedules {
        for row in &schedule.days {
            let key = format!("{:04}-{:02}", row.date.year(), row.date.month());
            let counts = buckets.entry(key).or_default();
            for (slot, modality) in Modality::ALL.into_iter().enumerate() {
                if row.is_due(modality) {
                    counts[slot] += 1;
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|(month, [voice, symptom, environment, wearable])| MonthlyCounts {
            month,
            voice,
            symptom,
            environment,
            wearable,
        })
        .collect()
}

fn rate(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(total) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletionRecord, Patient, PatientDraft};
    use crate::schedule::generate_all;

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

    fn stats_for(stats: &[ModalityStats], modality: Modality) -> &ModalityStats {
        stats.iter().find(|s| s.modality == modality).unwrap()
    }

    #[test]
    fn counts_due_cells_up_to_today_only() {
        let schedules = generate_all(&[patient("P1")]);
        let stats = modality_stats(&schedules, &[], date("2025-01-08"));

        // voice: 01-01 and 01-08; symptom: daily, 8 days
        assert_eq!(stats_for(&stats, Modality::Voice).total_due, 2);
        assert_eq!(stats_for(&stats, Modality::Symptom).total_due, 8);
        assert_eq!(stats_for(&stats, Modality::Environment).total_due, 0);
    }

    #[test]
    fn completed_and_pending_partition_the_total() {
        let schedules = generate_all(&[patient("P1")]);
        let records = vec![CompletionRecord::new("P1", date("2025-01-01"), Modality::Voice)];
        let stats = modality_stats(&schedules, &records, date("2025-01-08"));

        let voice = stats_for(&stats, Modality::Voice);
        assert_eq!(voice.total_due, 2);
        assert_eq!(voice.completed, 1);
        assert_eq!(voice.pending, 1);
        assert!((voice.progress_pct - 50.0).abs() < f64::EPSILON);
        assert!((voice.drop_pct - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rates_are_zero_when_nothing_is_due() {
        let schedules = generate_all(&[patient("P1")]);
        let stats = modality_stats(&schedules, &[], date("2025-01-08"));

        let environment = stats_for(&stats, Modality::Environment);
        assert_eq!(environment.total_due, 0);
        assert_eq!(environment.progress_pct, 0.0);
        assert_eq!(environment.drop_pct, 0.0);
    }

    #[test]
    fn rates_bounded_and_sum_to_100_when_due() {
        let schedules = generate_all(&[patient("P1"), patient("P2")]);
        let records = vec![
            CompletionRecord::new("P1", date("2025-01-02"), Modality::Symptom),
            CompletionRecord::new("P2", date("2025-01-03"), Modality::Symptom),
        ];
        let stats = modality_stats(&schedules, &records, date("2025-03-01"));

        for s in &stats {
            assert!((0.0..=100.0).contains(&s.progress_pct));
            assert!((0.0..=100.0).contains(&s.drop_pct));
            if s.total_due > 0 {
                assert!((s.progress_pct + s.drop_pct - 100.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn completion_records_after_today_do_not_count() {
        let schedules = generate_all(&[patient("P1")]);
        let records = vec![CompletionRecord::new("P1", date("2025-02-05"), Modality::Voice)];
        let stats = modality_stats(&schedules, &records, date("2025-01-08"));
        assert_eq!(stats_for(&stats, Modality::Voice).completed, 0);
    }

    #[test]
    fn totals_independent_of_patient_order() {
        let forward = generate_all(&[patient("P1"), patient("P2"), patient("P3")]);
        let reversed = generate_all(&[patient("P3"), patient("P2"), patient("P1")]);
        let records = vec![
            CompletionRecord::new("P2", date("2025-01-01"), Modality::Voice),
            CompletionRecord::new("P3", date("2025-01-04"), Modality::Symptom),
        ];

        let today = date("2025-02-01");
        assert_eq!(
            modality_stats(&forward, &records, today),
            modality_stats(&reversed, &records, today)
        );
        assert_eq!(monthly_due_counts(&forward), monthly_due_counts(&reversed));
    }

    #[test]
    fn stats_serialize() {
        let schedules = generate_all(&[patient("P1")]);
        let stats = modality_stats(&schedules, &[], date("2025-01-08"));
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"progress_pct\""));
        assert!(json.contains("\"drop_pct\""));
    }

    #[test]
    fn monthly_buckets_cover_horizon_in_order() {
        let schedules = generate_all(&[patient("P1")]);
        let months = monthly_due_counts(&schedules);

        assert_eq!(months.len(), 12);
        assert_eq!(months.first().unwrap().month, "2025-01");
        assert_eq!(months.last().unwrap().month, "2025-12");
        assert!(months.windows(2).all(|w| w[0].month < w[1].month));

        let january = &months[0];
        assert_eq!(january.symptom, 31); // daily
        assert_eq!(january.voice, 5); // 01, 08, 15, 22, 29
        assert_eq!(january.environment, 0);
    }
}
