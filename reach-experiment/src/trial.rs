use reach_core::{FeedbackMode, NormalizedPoint, TransformKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Reported once, when a session reaches `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub elapsed: Duration,
    pub samples: usize,
    pub log_path: PathBuf,
}

/// Recorded result per trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub block: String,
    pub trial: usize,
    pub feedback: FeedbackMode,
    pub transform: TransformKind,
    pub target: NormalizedPoint,
    pub elapsed_secs: f64,
    pub samples: usize,
    pub log_path: PathBuf,
}
