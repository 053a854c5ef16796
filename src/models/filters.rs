use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::Modality;

/// Restricts a patient timeline to a date range and a modality subset.
/// `None` means unrestricted on that axis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub modalities: Option<Vec<Modality>>,
}

impl TimelineFilter {
    pub fn accepts(&self, date: NaiveDate, modality: Modality) -> bool {
        if self.date_from.is_some_and(|from| date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| date > to) {
            return false;
        }
        if let Some(ref modalities) = self.modalities {
            if !modalities.contains(&modality) {
                return false;
            }
        }
        true
    }
}
