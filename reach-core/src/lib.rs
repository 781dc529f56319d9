pub mod geometry;
pub mod mode;
pub mod surface;
pub mod transform;
pub mod trial;

pub use geometry::{BBox, Canvas, NormalizedPoint, PixelPoint, CLIP_MARGIN};
pub use mode::{FeedbackMode, Rgba, UnknownFeedbackMode};
pub use surface::{ShapeId, Surface};
pub use transform::{Feedback, FeedbackTransform, TransformInput, TransformKind};
pub use trial::{FinishPolicy, TargetVisibility, TrialState};
