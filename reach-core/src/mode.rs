use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Rgba = [u8; 4];

pub const GREEN: Rgba = [0, 128, 0, 255];
pub const RED: Rgba = [255, 0, 0, 255];
pub const BLUE: Rgba = [0, 0, 255, 255];
pub const WHITE: Rgba = [255, 255, 255, 255];

/// Colour scheme of a trial. Parsed from `reflected`, `rotated` or `both`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FeedbackMode {
    #[default]
    Reflected,
    Rotated,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFeedbackMode(pub String);

impl fmt::Display for UnknownFeedbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "feedback mode must be one of reflected, rotated, both (got {:?})",
            self.0
        )
    }
}

impl std::error::Error for UnknownFeedbackMode {}

impl FeedbackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackMode::Reflected => "reflected",
            FeedbackMode::Rotated => "rotated",
            FeedbackMode::Both => "both",
        }
    }

    /// Colour of the true target disk.
    pub fn target_color(&self) -> Rgba {
        match self {
            FeedbackMode::Reflected | FeedbackMode::Both => GREEN,
            FeedbackMode::Rotated => RED,
        }
    }

    /// Colour of the feedback marker.
    pub fn feedback_color(&self) -> Rgba {
        match self {
            FeedbackMode::Reflected | FeedbackMode::Both => RED,
            FeedbackMode::Rotated => GREEN,
        }
    }
}

impl FromStr for FeedbackMode {
    type Err = UnknownFeedbackMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reflected" => Ok(FeedbackMode::Reflected),
            "rotated" => Ok(FeedbackMode::Rotated),
            "both" => Ok(FeedbackMode::Both),
            other => Err(UnknownFeedbackMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for FeedbackMode {
    type Error = UnknownFeedbackMode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FeedbackMode> for String {
    fn from(mode: FeedbackMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for FeedbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
