//! Grid lines for the static background layer.
//!
//! The grid is generated once per `(scale, size)` as a tile anchored at the
//! screen origin and one spacing larger than the viewport in each direction.
//! Panning never regenerates it: the renderer shifts the tile by
//! [`grid_tile_offset`], which is the pan offset modulo the on-screen spacing.

use crate::geometry::{Point, Size};

/// Grids whose on-screen spacing falls below this are not drawn.
pub const MIN_VISIBLE_SPACING: f32 = 4.0;

/// On-screen distance between grid lines.
pub fn effective_spacing(spacing: f32, scale: f32) -> f32 {
    spacing * scale
}

/// Generate SVG path commands for a grid tile
///
/// Lines start at 0 and repeat every `spacing * scale` pixels until they cover
/// `size` plus one extra spacing, so shifting the tile by up to one spacing
/// still covers the viewport.
///
/// # Returns
/// SVG path commands string (e.g., "M 0 0 L 0 624 M 24 0 L 24 624...") or an
/// empty string when the lines would be closer than [`MIN_VISIBLE_SPACING`].
pub fn generate_grid_commands(size: Size, scale: f32, spacing: f32) -> String {
    let step = effective_spacing(spacing, scale);
    if !step.is_finite() || step < MIN_VISIBLE_SPACING {
        return String::new();
    }

    let extent_w = size.width + step;
    let extent_h = size.height + step;
    let mut commands = String::with_capacity(10000);

    let mut i = 0u32;
    loop {
        let x = i as f32 * step;
        if x >= extent_w {
            break;
        }
        if !commands.is_empty() {
            commands.push(' ');
        }
        commands.push_str(&format!("M {} 0 L {} {}", x, x, extent_h));
        i += 1;
    }

    let mut j = 0u32;
    loop {
        let y = j as f32 * step;
        if y >= extent_h {
            break;
        }
        commands.push(' ');
        commands.push_str(&format!("M 0 {} L {} {}", y, extent_w, y));
        j += 1;
    }

    commands
}

/// Where to draw the cached tile for the current pan.
///
/// `screen_pan` is the translation in screen pixels. The result lies in
/// `(-step, 0]` on both axes so the tile always covers the viewport origin.
pub fn grid_tile_offset(screen_pan: Point, scale: f32, spacing: f32) -> Point {
    let step = effective_spacing(spacing, scale);
    if !step.is_finite() || step <= 0.0 {
        return Point::default();
    }
    let wrap = |v: f32| {
        let r = v.rem_euclid(step);
        if r == 0.0 {
            0.0
        } else {
            r - step
        }
    };
    Point::new(wrap(screen_pan.x), wrap(screen_pan.y))
}
