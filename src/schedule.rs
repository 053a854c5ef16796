//! Protocol schedule generation — expands a patient's enrollment into a
//! dense per-day due matrix over the observation horizon.
//!
//! Pure and deterministic: the same [`Patient`] always yields the same
//! [`Schedule`], and nothing here touches storage. Callers regenerate on
//! every query instead of persisting the matrix.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Modality, Patient, SymptomCadence};

/// Observation horizon: one year of daily cells starting at baseline.
pub const HORIZON_DAYS: i64 = 365;

/// Sensor wear window lengths, in days.
const ENVIRONMENT_WINDOW_DAYS: i64 = 28;
const WEARABLE_WINDOW_DAYS: i64 = 14;

/// Sensor windows recur in the run-up to each protocol month anchor.
const ANCHOR_MONTHS: [u32; 4] = [3, 6, 9, 12];

/// Due flags for the four modalities on a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRow {
    pub date: NaiveDate,
    pub voice: bool,
    pub symptom: bool,
    pub environment: bool,
    pub wearable: bool,
}

impl DayRow {
    pub fn is_due(&self, modality: Modality) -> bool {
        match modality {
            Modality::Voice => self.voice,
            Modality::Symptom => self.symptom,
            Modality::Environment => self.environment,
            Modality::Wearable => self.wearable,
        }
    }
}

/// One patient's full due matrix: exactly [`HORIZON_DAYS`] rows starting
/// at the patient's baseline date. Derived data, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub patient_id: String,
    pub days: Vec<DayRow>,
}

impl Schedule {
    pub fn day(&self, date: NaiveDate) -> Option<&DayRow> {
        let offset = (date - self.days.first()?.date).num_days();
        if (0..HORIZON_DAYS).contains(&offset) {
            self.days.get(offset as usize)
        } else {
            None
        }
    }
}

/// Expand one patient's enrollment into the daily due matrix.
pub fn generate(patient: &Patient) -> Schedule {
    let baseline = patient.baseline;
    let voice_gap = patient.voice_cadence.gap_days();

    let environment_windows = if patient.environment_sensor {
        sensor_windows(baseline, ENVIRONMENT_WINDOW_DAYS)
    } else {
        Vec::new()
    };
    let wearable_windows = if patient.wearable_sensor {
        sensor_windows(baseline, WEARABLE_WINDOW_DAYS)
    } else {
        Vec::new()
    };

    let days = (0..HORIZON_DAYS)
        .map(|offset| {
            let date = baseline + Duration::days(offset);
            DayRow {
                date,
                voice: voice_due(date, baseline, patient.start_date, voice_gap),
                symptom: symptom_due(date, patient.symptom_cadence),
                environment: in_any_window(date, &environment_windows),
                wearable: in_any_window(date, &wearable_windows),
            }
        })
        .collect();

    Schedule {
        patient_id: patient.patient_id.clone(),
        days,
    }
}

/// Generate schedules for a whole cohort. Each patient's matrix is an
/// independent computation, so the map runs on the rayon pool; output
/// order follows input order.
pub fn generate_all(patients: &[Patient]) -> Vec<Schedule> {
    patients.par_iter().map(generate).collect()
}

/// Voice is due at baseline, at start, and every `gap` days after start.
fn voice_due(date: NaiveDate, baseline: NaiveDate, start_date: NaiveDate, gap: i64) -> bool {
    date == baseline
        || date == start_date
        || (date > start_date && (date - start_date).num_days() % gap == 0)
}

/// Daily cadence is due every day; the "weekly" cadence means the fixed
/// Mon/Wed/Fri/Sat check-in subset.
fn symptom_due(date: NaiveDate, cadence: SymptomCadence) -> bool {
    match cadence {
        SymptomCadence::Daily => true,
        SymptomCadence::Weekly => matches!(
            date.weekday(),
            Weekday::Mon | Weekday::Wed | Weekday::Fri | Weekday::Sat
        ),
    }
}

/// Inclusive wear windows for one sensor: the first `window_days` of the
/// protocol, then the `window_days`-day run-up to each month anchor
/// (baseline + 3/6/9/12 calendar months, clamped to month end). Anchors
/// past the horizon still contribute their in-horizon days; rows outside
/// the horizon are simply never generated.
fn sensor_windows(baseline: NaiveDate, window_days: i64) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = vec![(baseline, baseline + Duration::days(window_days - 1))];
    for months in ANCHOR_MONTHS {
        if let Some(anchor) = baseline.checked_add_months(Months::new(months)) {
            windows.push((anchor - Duration::days(window_days - 1), anchor));
        }
    }
    windows
}

fn in_any_window(date: NaiveDate, windows: &[(NaiveDate, NaiveDate)]) -> bool {
    windows.iter().any(|&(from, to)| from <= date && date <= to)
}
