//! Drawing surface abstraction.
//!
//! Looks render against [`Canvas`], a small immediate-mode 2D interface modelled
//! on what a cairo-like backend offers: filled rectangles, circles and polygons,
//! text, and a current user-to-device [`Affine`] transform. The actual surface
//! (image buffer, window, video pipe) lives outside this crate;
//! [`RecordingCanvas`] keeps the draw calls in memory for diagnostics and tests.

pub use ecolor::Rgba;
use serde::{Deserialize, Serialize};

/// Linear RGB colour, components in `[0, 1]`. Themes are written in this form.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb(pub f64, pub f64, pub f64);

impl Rgb {
    pub fn with_alpha(self, a: f64) -> Rgba {
        Rgba::from_rgba_unmultiplied(self.0 as f32, self.1 as f32, self.2 as f32, a.clamp(0.0, 1.0) as f32)
    }
}

/// 2D affine transform, `device = M * user`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        xx: 1.0,
        yx: 0.0,
        xy: 0.0,
        yy: 1.0,
        x0: 0.0,
        y0: 0.0,
    };

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            xx: sx,
            yy: sy,
            ..Self::IDENTITY
        }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            x0: tx,
            y0: ty,
            ..Self::IDENTITY
        }
    }

    pub fn rotate(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            xx: c,
            yx: s,
            xy: -s,
            yy: c,
            x0: 0.0,
            y0: 0.0,
        }
    }

    /// Transform that applies `local` first and then `self`.
    pub fn then_local(&self, local: &Affine) -> Affine {
        Affine {
            xx: self.xx * local.xx + self.xy * local.yx,
            yx: self.yx * local.xx + self.yy * local.yx,
            xy: self.xx * local.xy + self.xy * local.yy,
            yy: self.yx * local.xy + self.yy * local.yy,
            x0: self.xx * local.x0 + self.xy * local.y0 + self.x0,
            y0: self.yx * local.x0 + self.yy * local.y0 + self.y0,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = self.apply_distance(x, y);
        (dx + self.x0, dy + self.y0)
    }

    pub fn apply_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.xx * dx + self.xy * dy, self.yx * dx + self.yy * dy)
    }

    pub fn invert(&self) -> Option<Affine> {
        let det = self.xx * self.yy - self.xy * self.yx;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let xx = self.yy / det;
        let xy = -self.xy / det;
        let yx = -self.yx / det;
        let yy = self.xx / det;
        Some(Affine {
            xx,
            yx,
            xy,
            yy,
            x0: -(xx * self.x0 + xy * self.y0),
            y0: -(yx * self.x0 + yy * self.y0),
        })
    }
}

/// Metrics of a rendered string, cairo-style.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtents {
    pub x_bearing: f64,
    pub y_bearing: f64,
    pub width: f64,
    pub height: f64,
}

pub trait Canvas {
    fn transform(&self) -> Affine;
    fn set_transform(&mut self, transform: Affine);

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba);
    fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, color: Rgba);
    fn fill_polygon(&mut self, points: &[(f64, f64)], color: Rgba);

    fn text_extents(&self, text: &str, size: f64) -> TextExtents;
    /// Draws bold text with its baseline origin at `(x, y)`.
    fn fill_text(&mut self, x: f64, y: f64, text: &str, size: f64, color: Rgba);
}

/// Runs `draw` with `local` applied on top of the current transform, then restores it.
pub fn with_local<F>(canvas: &mut dyn Canvas, local: Affine, draw: F)
where
    F: FnOnce(&mut dyn Canvas),
{
    let saved = canvas.transform();
    canvas.set_transform(saved.then_local(&local));
    draw(canvas);
    canvas.set_transform(saved);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect { x: f64, y: f64, w: f64, h: f64 },
    Circle { cx: f64, cy: f64, r: f64 },
    Polygon(Vec<(f64, f64)>),
    Text { x: f64, y: f64, text: String, size: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawOp {
    pub shape: Shape,
    pub color: Rgba,
    pub transform: Affine,
}

/// Canvas that records draw calls in user coordinates.
///
/// Text metrics are approximated from the font size, which is enough to lay
/// out labels consistently.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    base: Affine,
    transform: Affine,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(scale: f64) -> Self {
        let base = Affine::scale(scale, scale);
        Self {
            base,
            transform: base,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drops the recorded calls and resets the transform, ready for the next frame.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.transform = self.base;
    }

    fn record(&mut self, shape: Shape, color: Rgba) {
        self.ops.push(DrawOp {
            shape,
            color,
            transform: self.transform,
        });
    }
}

impl Canvas for RecordingCanvas {
    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba) {
        self.record(Shape::Rect { x, y, w, h }, color);
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, color: Rgba) {
        self.record(Shape::Circle { cx, cy, r }, color);
    }

    fn fill_polygon(&mut self, points: &[(f64, f64)], color: Rgba) {
        self.record(Shape::Polygon(points.to_vec()), color);
    }

    fn text_extents(&self, text: &str, size: f64) -> TextExtents {
        TextExtents {
            x_bearing: 0.0,
            y_bearing: -0.72 * size,
            width: 0.6 * size * text.chars().count() as f64,
            height: 0.72 * size,
        }
    }

    fn fill_text(&mut self, x: f64, y: f64, text: &str, size: f64, color: Rgba) {
        self.record(
            Shape::Text {
                x,
                y,
                text: text.to_string(),
                size,
            },
            color,
        );
    }
}
