use crate::error::ConfigError;
use reach_core::{
    Canvas, FeedbackMode, FeedbackTransform, FinishPolicy, NormalizedPoint, TargetVisibility,
    TransformKind,
};
use reach_timing::Clock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PARTICIPANT: &str = "Roger";
pub const DEFAULT_MARKER_RADIUS: f64 = 25.0;

pub(crate) fn check_marker_radius(radius: f64) -> Result<(), ConfigError> {
    if radius.is_nan() || radius <= 0.0 {
        return Err(ConfigError::InvalidMarkerRadius(radius));
    }
    Ok(())
}

/// Configuration of a single reach trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub target: NormalizedPoint,
    pub width: u32,
    pub height: u32,
    /// Generated from the participant and the clock when absent.
    pub logfile: Option<PathBuf>,
    pub feedback: FeedbackMode,
    pub participant: String,
    pub transform: FeedbackTransform,
    pub finish_policy: FinishPolicy,
    pub target_visibility: TargetVisibility,
    pub marker_radius: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target: NormalizedPoint::CENTER,
            width: 1000,
            height: 1000,
            logfile: None,
            feedback: FeedbackMode::default(),
            participant: DEFAULT_PARTICIPANT.to_string(),
            transform: FeedbackTransform::Identity,
            finish_policy: FinishPolicy::default(),
            target_visibility: TargetVisibility::default(),
            marker_radius: DEFAULT_MARKER_RADIUS,
        }
    }
}

impl SessionConfig {
    /// Sets the colour scheme from its textual name.
    pub fn with_feedback(mut self, mode: &str) -> Result<Self, ConfigError> {
        self.feedback = mode.parse()?;
        Ok(self)
    }

    /// Sets a built-in transform from its textual name.
    pub fn with_transform(mut self, name: &str) -> Result<Self, ConfigError> {
        let kind: TransformKind = name
            .parse()
            .map_err(|_| ConfigError::UnknownTransform(name.to_string()))?;
        self.transform = kind.into();
        Ok(self)
    }

    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target.is_unit() {
            return Err(ConfigError::TargetOutOfRange {
                nx: self.target.nx,
                ny: self.target.ny,
            });
        }
        if !self.canvas().fits_clip_margin() {
            return Err(ConfigError::CanvasTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        check_marker_radius(self.marker_radius)
    }

    /// The configured log path, or `{participant}_trial_{YYYY_MM_DD_HH_MM_SS}.csv`.
    pub fn resolve_logfile<C: Clock>(&self, clock: &C) -> PathBuf {
        self.logfile.clone().unwrap_or_else(|| {
            let stamp = clock.local_time().format("%Y_%m_%d_%H_%M_%S");
            PathBuf::from(format!("{}_trial_{}.csv", self.participant, stamp))
        })
    }
}
