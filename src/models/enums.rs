use crate::db::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Modality {
    Voice => "voice",
    Symptom => "symptom",
    Environment => "environment",
    Wearable => "wearable",
});

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Voice,
        Modality::Symptom,
        Modality::Environment,
        Modality::Wearable,
    ];
}

str_enum!(VoiceCadence {
    Weekly => "1w",
    Biweekly => "2w",
    Monthly => "1m",
});

impl VoiceCadence {
    /// Days between consecutive due dates after the start date.
    pub fn gap_days(&self) -> i64 {
        match self {
            VoiceCadence::Weekly => 7,
            VoiceCadence::Biweekly => 14,
            VoiceCadence::Monthly => 30,
        }
    }
}

// "weekly" here does not mean once a week: the protocol asks for symptom
// check-ins on a fixed Mon/Wed/Fri/Sat subset. The wire value is kept for
// compatibility with existing enrollment sheets.
str_enum!(SymptomCadence {
    Daily => "daily",
    Weekly => "weekly",
});
