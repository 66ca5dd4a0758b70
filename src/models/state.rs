use serde::{Deserialize, Serialize};

/// Progress of a hierarchy record.
///
/// - `Proposed`: Captured but not yet planned
/// - `Active`: Planned or in progress
/// - `Done`: Delivered
/// - `Cancelled`: Dropped, kept for reference
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkState {
    #[default]
    Proposed,
    Active,
    Done,
    Cancelled,
}

impl WorkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Active => "active",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "proposed" => Some(Self::Proposed),
            "active" => Some(Self::Active),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}
