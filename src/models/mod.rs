pub mod completion;
pub mod enums;
pub mod filters;
pub mod patient;

pub use completion::CompletionRecord;
pub use enums::{Modality, SymptomCadence, VoiceCadence};
pub use filters::TimelineFilter;
pub use patient::{Patient, PatientDraft, ValidationError, DATE_FMT, MAX_VISIT_DATES};
