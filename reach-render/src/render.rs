use anyhow::{Result, bail};
use reach_core::mode::WHITE;
use reach_core::{BBox, PixelPoint, Rgba, ShapeId, Surface};
use std::time::{Duration, Instant};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ShapeKind {
    Disk { center: PixelPoint, radius: f64 },
    Rect(BBox),
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    kind: ShapeKind,
    color: Rgba,
}

impl Shape {
    fn bbox(&self) -> BBox {
        match self.kind {
            ShapeKind::Disk { center, radius } => BBox::around(center, radius),
            ShapeKind::Rect(b) => b,
        }
    }
}

pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub shapes: usize,
    /// False when nothing changed since the previous frame and the canvas was reused.
    pub redrawn: bool,
}

/// Software surface: keeps the trial's shapes and rasterises them into an
/// RGBA frame with tiny-skia.
pub struct SkiaSurface {
    width: u32,
    height: u32,
    background: Rgba,
    shapes: Vec<Shape>,
    canvas: Pixmap,
    dirty: bool,
    closed: bool,
}

fn color(c: Rgba) -> Color {
    Color::from_rgba8(c[0], c[1], c[2], c[3])
}

impl SkiaSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let Some(canvas) = Pixmap::new(width, height) else {
            bail!("cannot allocate a {width}x{height} canvas");
        };
        Ok(Self {
            width,
            height,
            background: WHITE,
            shapes: Vec::with_capacity(4),
            canvas,
            dirty: true,
            closed: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied RGBA pixels of the last drawn frame.
    pub fn pixels(&self) -> &[u8] {
        self.canvas.data()
    }

    /// RGBA of the canvas pixel at `(x, y)`, if inside.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let p = self.canvas.pixel(x, y)?;
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    fn draw(&mut self) {
        self.canvas.fill(color(self.background));
        let mut paint = Paint::default();
        paint.anti_alias = true;

        for shape in &self.shapes {
            paint.set_color(color(shape.color));
            match shape.kind {
                ShapeKind::Disk { center, radius } => {
                    let path = PathBuilder::from_circle(
                        center.x as f32,
                        center.y as f32,
                        radius as f32,
                    );
                    if let Some(path) = path {
                        self.canvas.fill_path(
                            &path,
                            &paint,
                            FillRule::Winding,
                            Transform::identity(),
                            None,
                        );
                    }
                }
                ShapeKind::Rect(b) => {
                    let rect =
                        Rect::from_ltrb(b.x0 as f32, b.y0 as f32, b.x1 as f32, b.y1 as f32);
                    if let Some(rect) = rect {
                        self.canvas
                            .fill_rect(rect, &paint, Transform::identity(), None);
                    }
                }
            }
        }
        self.dirty = false;
    }

    /// Redraws the canvas if a shape changed and copies it into `frame_buffer`,
    /// which must be `width * height * 4` bytes.
    pub fn render_frame(&mut self, frame_buffer: &mut [u8]) -> Result<FrameStats> {
        let expected = self.canvas.data().len();
        if frame_buffer.len() != expected {
            bail!(
                "frame buffer holds {} bytes, canvas needs {}",
                frame_buffer.len(),
                expected
            );
        }

        let start = Instant::now();
        let redrawn = self.dirty;
        if redrawn {
            self.draw();
        }
        let draw = start.elapsed();

        let t = Instant::now();
        frame_buffer.copy_from_slice(self.canvas.data());
        let copy = t.elapsed();

        Ok(FrameStats {
            draw,
            copy,
            total: start.elapsed(),
            shapes: self.shapes.len(),
            redrawn,
        })
    }

    fn push(&mut self, shape: Shape) -> ShapeId {
        self.shapes.push(shape);
        self.dirty = true;
        ShapeId(self.shapes.len() - 1)
    }
}

impl Surface for SkiaSurface {
    fn create_disk(&mut self, center: PixelPoint, radius: f64, color: Rgba) -> ShapeId {
        self.push(Shape {
            kind: ShapeKind::Disk { center, radius },
            color,
        })
    }

    fn create_rect(&mut self, bounds: BBox, color: Rgba) -> ShapeId {
        self.push(Shape {
            kind: ShapeKind::Rect(bounds),
            color,
        })
    }

    fn move_disk(&mut self, id: ShapeId, center: PixelPoint, radius: Option<f64>) {
        let Some(shape) = self.shapes.get_mut(id.0) else {
            debug!(?id, "move of unknown shape");
            return;
        };
        if let ShapeKind::Disk {
            center: c,
            radius: r,
        } = &mut shape.kind
        {
            *c = center;
            if let Some(radius) = radius {
                *r = radius;
            }
            self.dirty = true;
        }
    }

    fn bbox(&self, id: ShapeId) -> Option<BBox> {
        self.shapes.get(id.0).map(Shape::bbox)
    }

    fn hit_test(&self, id: ShapeId, point: PixelPoint) -> bool {
        match self.shapes.get(id.0).map(|s| s.kind) {
            Some(ShapeKind::Disk { center, radius }) => center.distance(&point) <= radius,
            Some(ShapeKind::Rect(b)) => b.contains(point),
            None => false,
        }
    }

    fn close(&mut self) {
        self.shapes.clear();
        self.dirty = true;
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
