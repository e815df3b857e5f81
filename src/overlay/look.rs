//! Visual elements and their per-frame state.
//!
//! A [`Look`] turns the value of one control into pixels. Between frames it
//! keeps the temporal state needed for fading out idle controls and for
//! recolouring controls that are pushed to their limit.

use crate::overlay::adapter::Value;
use crate::overlay::canvas::{with_local, Affine, Canvas, Rgb};
use crate::overlay::context::AnimationContext;
use crate::overlay::error::LookError;
use crate::overlay::snap::{snap_circle, snap_dist, snap_point, snap_rect};
use crate::presets::Theme;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Below this alpha a look is not drawn at all.
pub const DRAW_EPSILON: f64 = 0.001;

/// Values above this keep a fading look fully visible.
const ACTIVE_THRESHOLD: f64 = 0.2;

const MAXED_THRESHOLD: f64 = 0.98;

/// Never-active marker, far enough in the past that no fade is running.
const NEVER_ACTIVE_MS: i64 = -100_000_000;

pub const DEFAULT_LABEL_SIZE: f64 = 0.88;

/// Foreground styling applied while a control sits at its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxoutStyle {
    #[default]
    None,
    /// Recolour the foreground with the theme's maxed colour.
    Face,
}

impl FromStr for MaxoutStyle {
    type Err = LookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(MaxoutStyle::None),
            "face" => Ok(MaxoutStyle::Face),
            other => Err(LookError::InvalidMaxoutStyle(other.to_string())),
        }
    }
}

impl fmt::Display for MaxoutStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxoutStyle::None => f.write_str("none"),
            MaxoutStyle::Face => f.write_str("face"),
        }
    }
}

/// Options shared by all looks.
#[derive(Debug, Clone, PartialEq)]
pub struct LookOptions {
    pub hide_after_ms: Option<i64>,
    pub maxout: MaxoutStyle,
    pub label: Option<String>,
    pub label_size: f64,
}

impl Default for LookOptions {
    fn default() -> Self {
        Self {
            hide_after_ms: None,
            maxout: MaxoutStyle::None,
            label: None,
            label_size: DEFAULT_LABEL_SIZE,
        }
    }
}

impl LookOptions {
    /// Fades the look out over `ms` once it stops being active.
    pub fn hide_after(mut self, ms: i64) -> Self {
        self.hide_after_ms = Some(ms);
        self
    }

    /// Same as [`LookOptions::hide_after`], but only when a fade is given.
    pub fn hide_after_opt(mut self, ms: Option<i64>) -> Self {
        self.hide_after_ms = ms;
        self
    }

    pub fn maxout(mut self, style: MaxoutStyle) -> Self {
        self.maxout = style;
        self
    }

    pub fn label(mut self, text: impl Into<String>) -> Self {
        self.label = Some(text.into());
        self
    }

    pub fn label_size(mut self, size: f64) -> Self {
        self.label_size = size;
        self
    }
}

pub trait Look: fmt::Debug {
    fn init_theme(&mut self, theme: &Theme);

    fn update(&mut self, ctx: &mut AnimationContext, value: &Value) -> Result<(), LookError>;

    fn alpha(&self) -> f64;

    /// Normalized value driving the fade logic, in `[0, 1]`.
    fn value(&self) -> f64;

    fn on_draw(&self, canvas: &mut dyn Canvas);

    fn draw(&self, canvas: &mut dyn Canvas) {
        if self.alpha() > DRAW_EPSILON {
            self.on_draw(canvas);
        }
    }
}

/// Fade timer, clamped value and label shared by every look.
#[derive(Debug, Clone)]
struct LookBase {
    center: (f64, f64),
    options: LookOptions,
    last_active_ms: i64,
    alpha: f64,
    value: f64,
    text_color: Rgb,
}

impl LookBase {
    fn new(center: (f64, f64), options: LookOptions) -> Self {
        Self {
            center,
            options,
            last_active_ms: NEVER_ACTIVE_MS,
            alpha: 1.0,
            value: 0.0,
            text_color: Rgb::default(),
        }
    }

    fn init_theme(&mut self, theme: &Theme) {
        if self.options.hide_after_ms.is_some() {
            self.alpha = 0.0;
        }
        self.text_color = theme.text_color;
    }

    /// Stores the clamped value and runs the fade timer. Returns the clamped value.
    fn update(&mut self, ctx: &mut AnimationContext, value: f64) -> f64 {
        let value = value.clamp(0.0, 1.0);
        self.value = value;
        if let Some(hide_after) = self.options.hide_after_ms {
            let now = ctx.time_ms();
            let idle = now - self.last_active_ms;
            self.alpha = if value > ACTIVE_THRESHOLD {
                self.last_active_ms = now;
                1.0
            } else if idle < hide_after {
                ctx.request_redraw();
                1.0 - idle as f64 / hide_after as f64
            } else {
                0.0
            };
        }
        value
    }

    fn draw_label(&self, canvas: &mut dyn Canvas) {
        let Some(label) = &self.options.label else {
            return;
        };
        let size = self.options.label_size;
        // "J" fixes the vertical metrics so all labels share a baseline
        let reference = canvas.text_extents("J", size);
        let extents = canvas.text_extents(label, size);
        let (cx, cy) = self.center;
        canvas.fill_text(
            cx - extents.width / 2.0 - extents.x_bearing,
            cy + reference.y_bearing / 2.0 - reference.y_bearing,
            label,
            size,
            self.text_color.with_alpha(self.alpha),
        );
    }
}

/// Background and foreground paint for looks that show a filled shape.
#[derive(Debug, Clone)]
struct BgFg {
    bg_size: f64,
    fg_size: f64,
    bg_alpha: f64,
    fg_alpha: f64,
    bg_color: Rgb,
    fg_color: Rgb,
    theme_fg: Rgb,
    maxed_color: Rgb,
    style: MaxoutStyle,
}

impl BgFg {
    fn new(bg_size: f64, fg_size: f64, style: MaxoutStyle) -> Self {
        Self {
            bg_size,
            fg_size,
            bg_alpha: 0.5,
            fg_alpha: 1.0,
            bg_color: Rgb::default(),
            fg_color: Rgb::default(),
            theme_fg: Rgb::default(),
            maxed_color: Rgb::default(),
            style,
        }
    }

    fn init_theme(&mut self, theme: &Theme) {
        self.bg_color = theme.bg_color;
        self.fg_color = theme.fg_color;
        self.theme_fg = theme.fg_color;
        self.maxed_color = theme.maxed_color;
    }

    fn maxout(&mut self, value: f64) {
        self.fg_color = if value >= MAXED_THRESHOLD {
            match self.style {
                MaxoutStyle::Face => self.maxed_color,
                MaxoutStyle::None => self.fg_color,
            }
        } else {
            self.theme_fg
        };
    }
}

fn expect_scalar(look: &'static str, value: &Value) -> Result<f64, LookError> {
    value.as_scalar().ok_or_else(|| LookError::ValueShape {
        look,
        expected: "a scalar",
        got: value.to_string(),
    })
}

fn expect_pair(look: &'static str, value: &Value) -> Result<(f64, f64), LookError> {
    match value.as_vector() {
        Some([x, y, ..]) => Ok((*x, *y)),
        _ => Err(LookError::ValueShape {
            look,
            expected: "a vector of at least two components",
            got: value.to_string(),
        }),
    }
}

/// Rectangle filling with the value, used for shoulder buttons and triggers.
///
/// The fancy fill rises from the bottom until it covers the background, then
/// grows outwards from the middle.
#[derive(Debug, Clone)]
pub struct RectLook {
    base: LookBase,
    paint: BgFg,
    size: (f64, f64),
    fancy: bool,
}

impl RectLook {
    pub fn new(center: (f64, f64), size: (f64, f64), options: LookOptions) -> Self {
        let paint = BgFg::new(0.8, 1.0, options.maxout);
        Self {
            base: LookBase::new(center, options),
            paint,
            size,
            fancy: true,
        }
    }

    /// Grows the fill from the middle only.
    pub fn plain(mut self) -> Self {
        self.fancy = false;
        self
    }

    pub fn with_sizes(mut self, bg_size: f64, fg_size: f64) -> Self {
        self.paint.bg_size = bg_size;
        self.paint.fg_size = fg_size;
        self
    }

    fn bg_bounds(&self) -> (f64, f64, f64, f64) {
        let (cx, cy) = self.base.center;
        let bw = self.size.0 * self.paint.bg_size;
        let bh = self.size.1 * self.paint.bg_size;
        (cx - bw * 0.5, cy - bh * 0.5, bw, bh)
    }
}

impl Look for RectLook {
    fn init_theme(&mut self, theme: &Theme) {
        self.base.init_theme(theme);
        self.paint.init_theme(theme);
    }

    fn update(&mut self, ctx: &mut AnimationContext, value: &Value) -> Result<(), LookError> {
        let value = self.base.update(ctx, expect_scalar("rect", value)?);
        self.paint.maxout(value);
        Ok(())
    }

    fn alpha(&self) -> f64 {
        self.base.alpha
    }

    fn value(&self) -> f64 {
        self.base.value
    }

    fn on_draw(&self, canvas: &mut dyn Canvas) {
        let t = canvas.transform();
        let alpha = self.base.alpha;
        let (x, y, w, h) = self.bg_bounds();
        let (bx, by, bw, bh) = snap_rect(&t, x, y, w, h);
        canvas.fill_rect(bx, by, bw, bh, self.paint.bg_color.with_alpha(self.paint.bg_alpha * alpha));

        let (sw, sh) = self.size;
        let extent = self.base.value * self.paint.fg_size;
        let fg = self.paint.fg_color.with_alpha(self.paint.fg_alpha * alpha);
        let fill_h = sh * extent;
        if self.fancy && extent < self.paint.bg_size {
            let (fx, fy, fw, fh) = snap_rect(&t, bx, by + bh - fill_h, bw, fill_h);
            canvas.fill_rect(fx, fy, fw, fh, fg);
        } else {
            let fill_w = sw * extent;
            let (cx, cy, hw, hh) = snap_rect(&t, bx + bw * 0.5, by + bh * 0.5, fill_w / 2.0, fill_h / 2.0);
            canvas.fill_rect(cx - hw, cy - hh, hw * 2.0, hh * 2.0, fg);
        }
        self.base.draw_label(canvas);
    }
}

/// Disc whose foreground radius follows the value.
#[derive(Debug, Clone)]
pub struct CircleLook {
    base: LookBase,
    paint: BgFg,
    radius: f64,
    fg: (f64, f64, f64),
}

impl CircleLook {
    pub fn new(center: (f64, f64), radius: f64, options: LookOptions) -> Self {
        Self::with_sizes(center, radius, 0.8, 1.0, options)
    }

    pub fn with_sizes(center: (f64, f64), radius: f64, bg_size: f64, fg_size: f64, options: LookOptions) -> Self {
        let paint = BgFg::new(bg_size, fg_size, options.maxout);
        Self {
            fg: (center.0, center.1, radius * fg_size),
            base: LookBase::new(center, options),
            paint,
            radius,
        }
    }

    fn draw_discs(&self, canvas: &mut dyn Canvas) {
        let t = canvas.transform();
        let alpha = self.base.alpha;
        let (cx, cy) = self.base.center;
        let (bx, by, br) = snap_circle(&t, cx, cy, self.radius * self.paint.bg_size);
        canvas.fill_circle(bx, by, br, self.paint.bg_color.with_alpha(self.paint.bg_alpha * alpha));
        let (fx, fy, fr) = snap_circle(&t, self.fg.0, self.fg.1, self.fg.2);
        canvas.fill_circle(fx, fy, fr, self.paint.fg_color.with_alpha(self.paint.fg_alpha * alpha));
        self.base.draw_label(canvas);
    }

    fn apply(&mut self, ctx: &mut AnimationContext, value: f64) -> f64 {
        let value = self.base.update(ctx, value);
        self.paint.maxout(value);
        value
    }
}

impl Look for CircleLook {
    fn init_theme(&mut self, theme: &Theme) {
        self.base.init_theme(theme);
        self.paint.init_theme(theme);
    }

    fn update(&mut self, ctx: &mut AnimationContext, value: &Value) -> Result<(), LookError> {
        let value = self.apply(ctx, expect_scalar("circle", value)?);
        let (cx, cy) = self.base.center;
        self.fg = (cx, cy, self.radius * self.paint.fg_size * value);
        Ok(())
    }

    fn alpha(&self) -> f64 {
        self.base.alpha
    }

    fn value(&self) -> f64 {
        self.base.value
    }

    fn on_draw(&self, canvas: &mut dyn Canvas) {
        self.draw_discs(canvas);
    }
}

/// Analog stick: a knob displaced from the center by the stick vector.
#[derive(Debug, Clone)]
pub struct StickLook {
    circle: CircleLook,
    direction: (f64, f64),
}

impl StickLook {
    pub fn new(center: (f64, f64), radius: f64, options: LookOptions) -> Self {
        Self {
            circle: CircleLook::with_sizes(center, radius, 0.8, 0.55, options),
            direction: (0.0, 0.0),
        }
    }

    /// Stick vector after clamping to the unit circle.
    pub fn direction(&self) -> (f64, f64) {
        self.direction
    }

    /// Knob center and radius in layout units.
    pub fn knob(&self) -> (f64, f64, f64) {
        self.circle.fg
    }
}

impl Look for StickLook {
    fn init_theme(&mut self, theme: &Theme) {
        self.circle.init_theme(theme);
    }

    fn update(&mut self, ctx: &mut AnimationContext, value: &Value) -> Result<(), LookError> {
        let (mut vx, mut vy) = expect_pair("stick", value)?;
        let mut magnitude = vx.hypot(vy);
        if magnitude > 1.0 {
            vx /= magnitude;
            vy /= magnitude;
            magnitude = 1.0;
        }
        self.circle.apply(ctx, magnitude);
        let c = &mut self.circle;
        let space = c.radius * (1.0 - c.paint.fg_size);
        let (cx, cy) = c.base.center;
        c.fg = (cx + space * vx, cy + space * vy, c.radius * c.paint.fg_size);
        self.direction = (vx, vy);
        Ok(())
    }

    fn alpha(&self) -> f64 {
        self.circle.alpha()
    }

    fn value(&self) -> f64 {
        self.circle.value()
    }

    fn on_draw(&self, canvas: &mut dyn Canvas) {
        self.circle.draw_discs(canvas);
    }
}

/// One chevron of a directional pad, pointing along `angle` from the origin.
#[derive(Debug, Clone)]
pub struct DpadButtonLook {
    base: LookBase,
    paint: BgFg,
    size: f64,
    angle: f64,
    margin: f64,
}

impl DpadButtonLook {
    pub fn new(size: f64, angle: f64, margin: f64, bg_size: f64, fg_size: f64) -> Self {
        let options = LookOptions::default();
        Self {
            paint: BgFg::new(bg_size, fg_size, options.maxout),
            base: LookBase::new((size / 2.0, 0.0), options),
            size,
            angle,
            margin,
        }
    }

    pub fn pressed(&self) -> bool {
        self.base.value > 0.1
    }

    /// Left edge, right edge and half height of a chevron of width `w`.
    fn bounds(&self, t: &Affine, w: f64) -> (f64, f64, f64) {
        let cx = self.size / 2.0;
        let margin = self.size * self.margin;
        (
            snap_dist(t, cx - w * 0.5 + margin, -0.5),
            snap_dist(t, cx + w * 0.5, 0.0),
            snap_dist(t, w * 0.25, 0.0),
        )
    }
}

fn chevron((l, r, h): (f64, f64, f64)) -> [(f64, f64); 5] {
    [(r, h), (l + h, h), (l, 0.0), (l + h, -h), (r, -h)]
}

impl Look for DpadButtonLook {
    fn init_theme(&mut self, theme: &Theme) {
        self.base.init_theme(theme);
        self.paint.init_theme(theme);
    }

    fn update(&mut self, ctx: &mut AnimationContext, value: &Value) -> Result<(), LookError> {
        let value = self.base.update(ctx, expect_scalar("dpad button", value)?);
        self.paint.maxout(value);
        Ok(())
    }

    fn alpha(&self) -> f64 {
        self.base.alpha
    }

    fn value(&self) -> f64 {
        self.base.value
    }

    fn on_draw(&self, canvas: &mut dyn Canvas) {
        let t = canvas.transform();
        let alpha = self.base.alpha;
        let bg = self.bounds(&t, self.size * self.paint.bg_size);
        let fg = self.bounds(&t, self.size * self.paint.fg_size);
        let (_, arrow_r, arrow_h) = self.bounds(&t, self.size * self.paint.bg_size * 0.8);

        with_local(canvas, Affine::rotate(self.angle), |c| {
            c.fill_polygon(&chevron(bg), self.paint.bg_color.with_alpha(self.paint.bg_alpha * alpha));
            if self.pressed() {
                c.fill_polygon(&chevron(fg), self.paint.fg_color.with_alpha(self.paint.fg_alpha * alpha));
            }
            c.fill_polygon(
                &[(arrow_r, 0.0), (arrow_r - arrow_h, arrow_h), (arrow_r - arrow_h, -arrow_h)],
                self.base.text_color.with_alpha(alpha),
            );
        });
        self.base.draw_label(canvas);
    }
}

/// Four-way directional pad driven by a 2D vector.
#[derive(Debug, Clone)]
pub struct DpadGroupLook {
    base: LookBase,
    /// Right, down, left, up.
    buttons: [DpadButtonLook; 4],
}

impl DpadGroupLook {
    const DEAD_ZONE: f64 = 0.1;

    pub fn new(center: (f64, f64), radius: f64, options: LookOptions) -> Self {
        Self::with_geometry(center, radius, 1.0, 0.8, 0.05, options)
    }

    pub fn with_geometry(
        center: (f64, f64),
        radius: f64,
        fg_size: f64,
        bg_size: f64,
        margin: f64,
        options: LookOptions,
    ) -> Self {
        let button = |angle: f64| DpadButtonLook::new(radius, angle, margin, bg_size, fg_size);
        Self {
            base: LookBase::new(center, options),
            buttons: [button(0.0), button(PI * 0.5), button(PI), button(PI * 1.5)],
        }
    }

    /// Pressed state of right, down, left and up.
    pub fn pressed(&self) -> [bool; 4] {
        self.buttons.each_ref().map(DpadButtonLook::pressed)
    }

    pub fn buttons(&self) -> &[DpadButtonLook; 4] {
        &self.buttons
    }

    fn direction(v: f64) -> f64 {
        if v >= Self::DEAD_ZONE {
            1.0
        } else if v <= -Self::DEAD_ZONE {
            -1.0
        } else {
            0.0
        }
    }
}

impl Look for DpadGroupLook {
    fn init_theme(&mut self, theme: &Theme) {
        self.base.init_theme(theme);
        for button in &mut self.buttons {
            button.init_theme(theme);
        }
    }

    fn update(&mut self, ctx: &mut AnimationContext, value: &Value) -> Result<(), LookError> {
        let (vx, vy) = expect_pair("dpad", value)?;
        let (vx, vy) = (Self::direction(vx), Self::direction(vy));
        let flag = |on: bool| Value::Scalar(if on { 1.0 } else { 0.0 });
        let states = [vx > 0.0, vy > 0.0, vx < 0.0, vy < 0.0];
        for (button, on) in self.buttons.iter_mut().zip(states) {
            button.update(ctx, &flag(on))?;
        }
        self.base.update(ctx, if vx != 0.0 || vy != 0.0 { 1.0 } else { 0.0 });
        for button in &mut self.buttons {
            button.base.alpha = self.base.alpha;
        }
        Ok(())
    }

    fn alpha(&self) -> f64 {
        self.base.alpha
    }

    fn value(&self) -> f64 {
        self.base.value
    }

    fn on_draw(&self, canvas: &mut dyn Canvas) {
        let t = canvas.transform();
        let (cx, cy) = snap_point(&t, self.base.center.0, self.base.center.1, 0.0, 0.0);
        with_local(canvas, Affine::translate(cx, cy), |c| {
            for button in &self.buttons {
                button.draw(c);
            }
        });
        self.base.draw_label(canvas);
    }
}
