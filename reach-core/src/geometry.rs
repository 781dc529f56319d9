use serde::{Deserialize, Serialize};

/// Distance kept between a clipped feedback position and the canvas edge.
pub const CLIP_MARGIN: i32 = 20;

/// A position in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &PixelPoint) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }
}

impl From<(i32, i32)> for PixelPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Target location expressed as a fraction of the usable canvas, independent
/// of the canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub nx: f64,
    pub ny: f64,
}

impl NormalizedPoint {
    pub const CENTER: NormalizedPoint = NormalizedPoint { nx: 0.5, ny: 0.5 };

    pub const fn new(nx: f64, ny: f64) -> Self {
        Self { nx, ny }
    }

    pub fn is_unit(&self) -> bool {
        (0.0..=1.0).contains(&self.nx) && (0.0..=1.0).contains(&self.ny)
    }
}

impl Default for NormalizedPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Axis-aligned bounding box, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Bounding box of a disk centred on `center`.
    pub fn around(center: PixelPoint, radius: f64) -> Self {
        let (cx, cy) = (center.x as f64, center.y as f64);
        Self::new(cx - radius, cy - radius, cx + radius, cy + radius)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Touching edges count as an intersection.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1 && self.y0 <= other.y1 && other.y0 <= self.y1
    }

    pub fn contains(&self, p: PixelPoint) -> bool {
        let (x, y) = (p.x as f64, p.y as f64);
        self.x0 <= x && x <= self.x1 && self.y0 <= y && y <= self.y1
    }
}

/// Drawable area of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
        }
    }
}

impl Canvas {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// True when the clip range `[20, extent - 20]` is non-empty on both axes.
    pub fn fits_clip_margin(&self) -> bool {
        let min = 2 * CLIP_MARGIN as u32;
        self.width >= min && self.height >= min
    }

    /// Maps a normalized target into the central half-extent square of the
    /// canvas. Fractions are truncated to whole pixels.
    pub fn target_location(&self, target: NormalizedPoint) -> PixelPoint {
        let (cx, cy) = self.center();
        let x = target.nx * cx + cx / 2.0;
        let y = target.ny * cy + cy / 2.0;
        PixelPoint::new(x as i32, y as i32)
    }

    /// Pins a computed position to `[20, width-20] × [20, height-20]` and
    /// rounds it to the nearest pixel.
    pub fn clip(&self, x: f64, y: f64) -> PixelPoint {
        let margin = CLIP_MARGIN as f64;
        let x = x.min(self.width as f64 - margin).max(margin);
        let y = y.min(self.height as f64 - margin).max(margin);
        PixelPoint::new(x.round() as i32, y.round() as i32)
    }

    pub fn bounds(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width as f64, self.height as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn center_target_lands_mid_canvas() {
        let canvas = Canvas::default();
        assert_eq!(
            canvas.target_location(NormalizedPoint::CENTER),
            PixelPoint::new(500, 500)
        );
    }

    #[test]
    fn target_corners_stay_in_central_square() {
        let canvas = Canvas::new(1920, 1080);
        assert_eq!(
            canvas.target_location(NormalizedPoint::new(0.0, 0.0)),
            PixelPoint::new(480, 270)
        );
        assert_eq!(
            canvas.target_location(NormalizedPoint::new(1.0, 1.0)),
            PixelPoint::new(1440, 810)
        );
    }

    #[test]
    fn target_location_truncates() {
        let canvas = Canvas::new(1001, 1001);
        // 0.5 * 500.5 + 250.25 = 500.5
        assert_eq!(
            canvas.target_location(NormalizedPoint::CENTER),
            PixelPoint::new(500, 500)
        );
    }

    #[test]
    fn clip_pins_to_margin() {
        let canvas = Canvas::new(800, 600);
        assert_eq!(canvas.clip(-40.0, 5.0), PixelPoint::new(20, 20));
        assert_eq!(canvas.clip(900.0, 1000.0), PixelPoint::new(780, 580));
        assert_eq!(canvas.clip(400.4, 300.6), PixelPoint::new(400, 301));
    }

    #[test]
    fn bbox_touching_edges_intersect() {
        let a = BBox::around(PixelPoint::new(100, 100), 25.0);
        let b = BBox::around(PixelPoint::new(150, 100), 25.0);
        let c = BBox::around(PixelPoint::new(151, 100), 25.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn small_canvas_is_flagged() {
        assert!(!Canvas::new(39, 500).fits_clip_margin());
        assert!(Canvas::new(40, 40).fits_clip_margin());
    }

    proptest! {
        #[test]
        fn clip_always_in_range(x in -5000.0f64..5000.0, y in -5000.0f64..5000.0,
                                w in 40u32..4000, h in 40u32..4000) {
            let canvas = Canvas::new(w, h);
            let p = canvas.clip(x, y);
            prop_assert!(p.x >= CLIP_MARGIN && p.x <= w as i32 - CLIP_MARGIN);
            prop_assert!(p.y >= CLIP_MARGIN && p.y <= h as i32 - CLIP_MARGIN);
        }

        #[test]
        fn target_inside_central_square(nx in 0.0f64..=1.0, ny in 0.0f64..=1.0,
                                         w in 40u32..4000, h in 40u32..4000) {
            let canvas = Canvas::new(w, h);
            let t = canvas.target_location(NormalizedPoint::new(nx, ny));
            prop_assert!(t.x as f64 >= (w as f64 / 4.0).floor());
            prop_assert!(t.x as f64 <= w as f64 * 0.75);
            prop_assert!(t.y as f64 >= (h as f64 / 4.0).floor());
            prop_assert!(t.y as f64 <= h as f64 * 0.75);
        }
    }
}
