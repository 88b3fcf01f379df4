use serde::{Deserialize, Serialize};

/// Outcome flags on a job record. Unset flags are left untouched on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFlags {
    pub high_demand: Option<bool>,
    pub proven_track: Option<bool>,
    pub weak_relationship: Option<bool>,
}

impl JobFlags {
    pub fn proven_track() -> Self {
        Self {
            proven_track: Some(true),
            ..Self::default()
        }
    }
}
