use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Idle,
    Started,
    Running,
    Finished,
}

impl TrialState {
    pub fn accepts_samples(&self) -> bool {
        matches!(self, TrialState::Started | TrialState::Running)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TrialState::Finished)
    }
}

/// What ends a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishPolicy {
    /// The feedback marker's bounding box touches the target's.
    #[default]
    Overlap,
    /// The raw pointer enters the target, whatever the feedback shows.
    DirectEntry,
}

impl FromStr for FinishPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overlap" => Ok(FinishPolicy::Overlap),
            "direct-entry" => Ok(FinishPolicy::DirectEntry),
            other => Err(format!(
                "unknown finish policy {other:?}, expected overlap or direct-entry"
            )),
        }
    }
}

/// Whether the target disk is on screen before the start control is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetVisibility {
    #[default]
    HiddenUntilStart,
    AlwaysVisible,
}
