//! Pixel snapping.
//!
//! Coordinates are rounded in device space and mapped back to user space so
//! that adjacent fills meet on pixel boundaries instead of blending into
//! anti-aliased seams. A degenerate transform leaves values unsnapped.

use crate::overlay::canvas::Affine;

pub fn snap_rect(t: &Affine, x: f64, y: f64, w: f64, h: f64) -> (f64, f64, f64, f64) {
    let Some(inv) = t.invert() else {
        return (x, y, w, h);
    };
    let (dx, dy) = t.apply(x, y);
    let (dw, dh) = t.apply_distance(w, h);
    let (ux, uy) = inv.apply(dx.round(), dy.round());
    let (uw, uh) = inv.apply_distance(dw.round(), dh.round());
    (ux, uy, uw, uh)
}

pub fn snap_circle(t: &Affine, x: f64, y: f64, r: f64) -> (f64, f64, f64) {
    let Some(inv) = t.invert() else {
        return (x, y, r);
    };
    let (dx, dy) = t.apply(x, y);
    let dr = t.apply_distance(r, r).0.round();
    let (ux, uy) = inv.apply(dx.round(), dy.round());
    (ux, uy, inv.apply_distance(dr, dr).0)
}

pub fn snap_point(t: &Affine, x: f64, y: f64, add_x: f64, add_y: f64) -> (f64, f64) {
    let Some(inv) = t.invert() else {
        return (x, y);
    };
    let (dx, dy) = t.apply(x, y);
    inv.apply(dx.round() + add_x, dy.round() + add_y)
}

pub fn snap_dist(t: &Affine, d: f64, add: f64) -> f64 {
    let Some(inv) = t.invert() else {
        return d;
    };
    let (dx, dy) = t.apply_distance(d, 0.0);
    inv.apply_distance(dx.round() + add, dy.round()).0
}
