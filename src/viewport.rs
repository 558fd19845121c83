//! Pan/zoom transform and screen/scene coordinate mapping.
//!
//! `screen = (scene + translation) * scale` and
//! `scene = screen / scale - translation`. The viewport knows nothing about
//! scene contents; it only records that it changed.

use tracing::{debug, trace};

use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::events::ChangeBatch;
use crate::geometry::{Point, Rect, Size};

/// Default viewport size until the host reports its real one.
pub const DEFAULT_VIEWPORT_SIZE: Size = Size::new(800.0, 600.0);

/// A snapshot of the scene/screen mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    /// Offset in scene units.
    pub translation: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { scale: 1.0, translation: Point::default() }
    }
}

impl ViewTransform {
    pub fn scene_to_screen(&self, p: Point) -> Point {
        Point::new(
            (p.x + self.translation.x) * self.scale,
            (p.y + self.translation.y) * self.scale,
        )
    }

    pub fn screen_to_scene(&self, p: Point) -> Point {
        Point::new(
            p.x / self.scale - self.translation.x,
            p.y / self.scale - self.translation.y,
        )
    }

    pub fn scene_rect_to_screen(&self, r: Rect) -> Rect {
        Rect::from_origin_size(
            self.scene_to_screen(r.origin()),
            Size::new(r.width * self.scale, r.height * self.scale),
        )
    }

    pub fn screen_rect_to_scene(&self, r: Rect) -> Rect {
        Rect::from_origin_size(
            self.screen_to_scene(r.origin()),
            Size::new(r.width / self.scale, r.height / self.scale),
        )
    }

    /// Pan offset expressed in screen pixels.
    pub fn screen_offset(&self) -> Point {
        Point::new(self.translation.x * self.scale, self.translation.y * self.scale)
    }
}

/// Viewport state: transform, screen size and zoom limits.
#[derive(Debug, Clone)]
pub struct Viewport {
    transform: ViewTransform,
    size: Size,
    min_scale: f32,
    max_scale: f32,
    pending: ChangeBatch,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}

impl Viewport {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            transform: ViewTransform::default(),
            size: DEFAULT_VIEWPORT_SIZE,
            min_scale: config.min_zoom,
            max_scale: config.max_zoom,
            pending: ChangeBatch::default(),
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn scale(&self) -> f32 {
        self.transform.scale
    }

    pub fn translation(&self) -> Point {
        self.transform.translation
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn scale_limits(&self) -> (f32, f32) {
        (self.min_scale, self.max_scale)
    }

    /// Zoom level rounded to a whole percentage, for zoom indicators.
    pub fn zoom_percent(&self) -> i32 {
        (self.transform.scale * 100.0).round() as i32
    }

    pub fn scene_to_screen(&self, p: Point) -> Point {
        self.transform.scene_to_screen(p)
    }

    pub fn screen_to_scene(&self, p: Point) -> Point {
        self.transform.screen_to_scene(p)
    }

    pub fn scene_rect_to_screen(&self, r: Rect) -> Rect {
        self.transform.scene_rect_to_screen(r)
    }

    pub fn screen_rect_to_scene(&self, r: Rect) -> Rect {
        self.transform.screen_rect_to_scene(r)
    }

    /// Convert a screen-pixel distance into scene units at the current scale.
    pub fn screen_distance_to_scene(&self, d: f32) -> f32 {
        d / self.transform.scale
    }

    /// The part of the scene currently on screen.
    pub fn visible_scene_rect(&self) -> Rect {
        self.screen_rect_to_scene(Rect::from_origin_size(Point::default(), self.size))
    }

    /// Multiply the scale by `factor` around a screen-space anchor.
    ///
    /// The scene point under `anchor` stays under `anchor`. Returns `Ok(false)`
    /// without recording a change when the clamped scale does not move.
    pub fn zoom_at(&mut self, anchor: Point, factor: f32, viewport_size: Size) -> Result<bool, CanvasError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(CanvasError::InvalidTransform(format!("zoom factor {factor}")));
        }
        if !anchor.is_finite() {
            return Err(CanvasError::InvalidTransform(format!("zoom anchor {anchor:?}")));
        }
        check_size(viewport_size)?;

        let old_scale = self.transform.scale;
        let new_scale = (old_scale * factor).clamp(self.min_scale, self.max_scale);
        if new_scale == old_scale {
            trace!(scale = old_scale, "zoom clamped, no change");
            return Ok(self.apply_size(viewport_size));
        }

        // Nothing is touched until the new transform is known to be finite
        let anchor_scene = self.transform.screen_to_scene(anchor);
        let translation = Point::new(
            anchor.x / new_scale - anchor_scene.x,
            anchor.y / new_scale - anchor_scene.y,
        );
        if !translation.is_finite() {
            return Err(CanvasError::InvalidTransform("zoom produced a non-finite translation".into()));
        }

        self.apply_size(viewport_size);
        self.transform = ViewTransform { scale: new_scale, translation };
        self.pending.viewport = true;
        self.pending.static_layer = true;
        debug!(from = old_scale, to = new_scale, "viewport zoomed");
        Ok(true)
    }

    /// Zoom to an absolute scale around the viewport centre.
    pub fn set_scale(&mut self, scale: f32) -> Result<bool, CanvasError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CanvasError::InvalidTransform(format!("scale {scale}")));
        }
        let centre = Point::new(self.size.width * 0.5, self.size.height * 0.5);
        self.zoom_at(centre, scale / self.transform.scale, self.size)
    }

    /// Shift the view by a screen-space delta.
    pub fn pan(&mut self, delta: Point) -> Result<(), CanvasError> {
        if !delta.is_finite() {
            return Err(CanvasError::InvalidTransform(format!("pan delta {delta:?}")));
        }
        if delta.x == 0.0 && delta.y == 0.0 {
            return Ok(());
        }

        let scale = self.transform.scale;
        let translation = self.transform.translation.offset(delta.x / scale, delta.y / scale);
        if !translation.is_finite() {
            return Err(CanvasError::InvalidTransform("pan produced a non-finite translation".into()));
        }
        self.transform.translation = translation;
        self.pending.viewport = true;
        trace!(dx = delta.x, dy = delta.y, "viewport panned");
        Ok(())
    }

    /// Record a new screen size.
    pub fn resize(&mut self, size: Size) -> Result<(), CanvasError> {
        check_size(size)?;
        if self.apply_size(size) {
            debug!(width = size.width, height = size.height, "viewport resized");
        }
        Ok(())
    }

    /// Scale and centre the view so `scene_rect` fits with `margin` pixels
    /// on every side. The scale is clamped to the zoom limits.
    pub fn fit_rect(&mut self, scene_rect: Rect, viewport_size: Size, margin: f32) -> Result<(), CanvasError> {
        check_size(viewport_size)?;
        if !scene_rect.is_finite() || scene_rect.width < 0.0 || scene_rect.height < 0.0 {
            return Err(CanvasError::InvalidGeometry(format!("cannot fit {scene_rect:?}")));
        }
        if !margin.is_finite() || margin < 0.0 {
            return Err(CanvasError::InvalidTransform(format!("fit margin {margin}")));
        }

        let avail_w = (viewport_size.width - margin * 2.0).max(1.0);
        let avail_h = (viewport_size.height - margin * 2.0).max(1.0);
        let fit_w = if scene_rect.width > 0.0 { avail_w / scene_rect.width } else { self.max_scale };
        let fit_h = if scene_rect.height > 0.0 { avail_h / scene_rect.height } else { self.max_scale };
        let scale = fit_w.min(fit_h).clamp(self.min_scale, self.max_scale);

        let c = scene_rect.center();
        let translation = Point::new(
            viewport_size.width / (2.0 * scale) - c.x,
            viewport_size.height / (2.0 * scale) - c.y,
        );
        if !translation.is_finite() {
            return Err(CanvasError::InvalidTransform("fit produced a non-finite translation".into()));
        }

        self.apply_size(viewport_size);
        if scale != self.transform.scale {
            self.pending.static_layer = true;
        }
        self.transform = ViewTransform { scale, translation };
        self.pending.viewport = true;
        debug!(scale, "viewport fitted to rect");
        Ok(())
    }

    /// Drain the changes recorded since the last call.
    pub fn take_changes(&mut self) -> ChangeBatch {
        self.pending.take()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    fn apply_size(&mut self, size: Size) -> bool {
        if size == self.size {
            return false;
        }
        self.size = size;
        self.pending.viewport = true;
        self.pending.static_layer = true;
        true
    }
}

fn check_size(size: Size) -> Result<(), CanvasError> {
    if size.is_positive() {
        Ok(())
    } else {
        Err(CanvasError::InvalidTransform(format!(
            "viewport size {}x{}",
            size.width, size.height
        )))
    }
}
