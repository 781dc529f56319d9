use crate::geometry::{BBox, PixelPoint};
use crate::mode::Rgba;

/// Handle of a shape placed on a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(pub usize);

/// Defines the drawing capabilities a trial needs from its host
pub trait Surface {
    fn create_disk(&mut self, center: PixelPoint, radius: f64, color: Rgba) -> ShapeId;
    fn create_rect(&mut self, bounds: BBox, color: Rgba) -> ShapeId;

    /// Moves a disk to a new centre. `None` keeps the current radius.
    fn move_disk(&mut self, id: ShapeId, center: PixelPoint, radius: Option<f64>);

    fn bbox(&self, id: ShapeId) -> Option<BBox>;

    /// True when `point` lies on the drawn area of the shape.
    fn hit_test(&self, id: ShapeId, point: PixelPoint) -> bool {
        self.bbox(id).is_some_and(|b| b.contains(point))
    }

    fn overlapping(&self, a: ShapeId, b: ShapeId) -> bool {
        match (self.bbox(a), self.bbox(b)) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        }
    }

    /// Tears the surface down and asks the host to leave its event loop.
    fn close(&mut self);
    fn is_closed(&self) -> bool;
}
