//! Feedback transforms: map the true pointer position to the position at
//! which the feedback marker is drawn.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Lower bound of the marker radius used by [`point_reflect_snap`].
pub const SNAP_MIN_RADIUS: f64 = 19.0;

/// Everything a transform may look at for one pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformInput {
    pub height: f64,
    pub width: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub mouse_x: f64,
    pub mouse_y: f64,
}

impl TransformInput {
    pub fn new(
        height: f64,
        width: f64,
        target_x: f64,
        target_y: f64,
        mouse_x: f64,
        mouse_y: f64,
    ) -> Self {
        Self {
            height,
            width,
            target_x,
            target_y,
            mouse_x,
            mouse_y,
        }
    }

    fn target_distance(&self) -> f64 {
        (self.mouse_x - self.target_x).hypot(self.mouse_y - self.target_y)
    }
}

/// Unclipped feedback position, with an optional marker radius override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feedback {
    pub x: f64,
    pub y: f64,
    pub radius: Option<f64>,
}

impl Feedback {
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, radius: None }
    }
}

pub fn identity(input: &TransformInput) -> Feedback {
    Feedback::at(input.mouse_x, input.mouse_y)
}

/// Horizontal mirror across the vertical centre line.
pub fn mirror(input: &TransformInput) -> Feedback {
    Feedback::at(input.width - input.mouse_x, input.mouse_y)
}

/// Quarter turn of the pointer around the canvas.
///
/// The pointer is centred with `height / 2` on both axes but re-offset by
/// `(width / 2, height)` after rotating.
pub fn rotate_90(input: &TransformInput) -> Feedback {
    let x = input.mouse_x - input.height / 2.0;
    let y = input.mouse_y - input.height / 2.0;
    let radius = x.hypot(y);
    let angle = y.atan2(x) - FRAC_PI_2;
    Feedback::at(
        radius * angle.cos() + input.width / 2.0,
        radius * angle.sin() + input.height,
    )
}

/// Point reflection of the pointer through the target. The marker shrinks as
/// the pointer approaches and snaps onto the target once within two radii.
pub fn point_reflect_snap(input: &TransformInput) -> Feedback {
    let distance = input.target_distance();
    let radius = (distance / 2.0).max(SNAP_MIN_RADIUS);
    let (x, y) = if distance < 2.0 * radius {
        (input.target_x, input.target_y)
    } else {
        (
            2.0 * input.target_x - input.mouse_x,
            2.0 * input.target_y - input.mouse_y,
        )
    };
    Feedback {
        x,
        y,
        radius: Some(radius),
    }
}

pub type CustomTransform = Arc<dyn Fn(&TransformInput) -> Feedback + Send + Sync>;

/// The mapping applied to every pointer sample.
#[derive(Clone, Default)]
pub enum FeedbackTransform {
    #[default]
    Identity,
    Mirror,
    Rotate90,
    PointReflectSnap,
    Custom(CustomTransform),
}

impl FeedbackTransform {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&TransformInput) -> Feedback + Send + Sync + 'static,
    {
        FeedbackTransform::Custom(Arc::new(f))
    }

    pub fn apply(&self, input: &TransformInput) -> Feedback {
        match self {
            FeedbackTransform::Identity => identity(input),
            FeedbackTransform::Mirror => mirror(input),
            FeedbackTransform::Rotate90 => rotate_90(input),
            FeedbackTransform::PointReflectSnap => point_reflect_snap(input),
            FeedbackTransform::Custom(f) => f(input),
        }
    }

    pub fn kind(&self) -> Option<TransformKind> {
        match self {
            FeedbackTransform::Identity => Some(TransformKind::Identity),
            FeedbackTransform::Mirror => Some(TransformKind::Mirror),
            FeedbackTransform::Rotate90 => Some(TransformKind::Rotate90),
            FeedbackTransform::PointReflectSnap => Some(TransformKind::PointReflect),
            FeedbackTransform::Custom(_) => None,
        }
    }
}

impl fmt::Debug for FeedbackTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{kind:?}"),
            None => f.write_str("Custom(..)"),
        }
    }
}

impl Serialize for FeedbackTransform {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.kind() {
            Some(kind) => kind.serialize(serializer),
            None => Err(serde::ser::Error::custom(
                "custom feedback transforms cannot be serialised",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for FeedbackTransform {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        TransformKind::deserialize(deserializer).map(FeedbackTransform::from)
    }
}

/// Serialisable name of a built-in transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    #[default]
    Identity,
    Mirror,
    Rotate90,
    PointReflect,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Identity => "identity",
            TransformKind::Mirror => "mirror",
            TransformKind::Rotate90 => "rotate90",
            TransformKind::PointReflect => "point-reflect",
        }
    }
}

impl From<TransformKind> for FeedbackTransform {
    fn from(kind: TransformKind) -> Self {
        match kind {
            TransformKind::Identity => FeedbackTransform::Identity,
            TransformKind::Mirror => FeedbackTransform::Mirror,
            TransformKind::Rotate90 => FeedbackTransform::Rotate90,
            TransformKind::PointReflect => FeedbackTransform::PointReflectSnap,
        }
    }
}

impl FromStr for TransformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" | "linear" => Ok(TransformKind::Identity),
            "mirror" | "reflect-x" => Ok(TransformKind::Mirror),
            "rotate90" => Ok(TransformKind::Rotate90),
            "point-reflect" => Ok(TransformKind::PointReflect),
            other => Err(format!(
                "unknown transform {other:?}, expected identity, mirror, rotate90 or point-reflect"
            )),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
