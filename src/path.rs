//! SVG path generation and distance measurement for connections.
//!
//! Connections are computed in scene space. Because the viewport transform is
//! affine, mapping the endpoints and control points to screen space yields the
//! same curve, so the renderer and the hit-tester share one geometry.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Length of an arrow head in scene units at scale 1.
pub const ARROW_HEAD_LENGTH: f32 = 10.0;
/// Half the width of an arrow head's base.
pub const ARROW_HEAD_HALF_WIDTH: f32 = 5.0;
/// Below this endpoint distance a curved connection degrades to a line.
const CURVE_STRAIGHTEN_DISTANCE: f32 = 10.0;

/// Visual style of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStyle {
    /// Straight line with an arrow head at the target.
    #[default]
    Arrow,
    Line,
    Dashed,
    /// Horizontal-biased cubic bezier.
    Curved,
}

impl ConnectionStyle {
    pub fn has_arrow_head(self) -> bool {
        matches!(self, ConnectionStyle::Arrow)
    }

    pub fn is_dashed(self) -> bool {
        matches!(self, ConnectionStyle::Dashed)
    }
}

/// Cubic bezier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl CubicBezier {
    /// Horizontal-biased curve between two points.
    ///
    /// Control points extend horizontally by half the horizontal distance, but
    /// never less than `min_offset`. Very short curves collapse their control
    /// points onto the endpoints to avoid zig-zags.
    pub fn from_endpoints(start: Point, end: Point, min_offset: f32) -> Self {
        if start.distance(end) < CURVE_STRAIGHTEN_DISTANCE {
            return CubicBezier { p0: start, p1: start, p2: end, p3: end };
        }

        let offset = ((end.x - start.x).abs() * 0.5).max(min_offset);
        CubicBezier {
            p0: start,
            p1: start.offset(offset, 0.0),
            p2: end.offset(-offset, 0.0),
            p3: end,
        }
    }

    /// Evaluate the bezier curve at parameter t (0.0 to 1.0)
    pub fn eval(&self, t: f32) -> Point {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        Point::new(
            mt3 * self.p0.x + 3.0 * mt2 * t * self.p1.x + 3.0 * mt * t2 * self.p2.x + t3 * self.p3.x,
            mt3 * self.p0.y + 3.0 * mt2 * t * self.p1.y + 3.0 * mt * t2 * self.p2.y + t3 * self.p3.y,
        )
    }

    /// Bounding box of the control polygon, which contains the curve.
    pub fn hull_bounds(&self) -> Rect {
        Rect::from_points(self.p0, self.p0)
            .union(&Rect::from_points(self.p1, self.p2))
            .union(&Rect::from_points(self.p3, self.p3))
    }

    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        CubicBezier { p0: f(self.p0), p1: f(self.p1), p2: f(self.p2), p3: f(self.p3) }
    }
}

/// Squared distance from a point to a line segment
fn distance_to_segment_sq(point: Point, a: Point, b: Point) -> f32 {
    let ab = (b.x - a.x, b.y - a.y);
    let ap = (point.x - a.x, point.y - a.y);

    let ab_len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    if ab_len_sq < f32::EPSILON {
        return ap.0 * ap.0 + ap.1 * ap.1;
    }

    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / ab_len_sq).clamp(0.0, 1.0);
    let dx = point.x - (a.x + t * ab.0);
    let dy = point.y - (a.y + t * ab.1);
    dx * dx + dy * dy
}

/// Distance from a point to a line segment.
pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f32 {
    distance_to_segment_sq(point, a, b).sqrt()
}

/// Minimum distance from a point to a cubic bezier curve.
///
/// Samples the curve into `num_samples` segments (20 when zero is passed).
pub fn distance_to_bezier(point: Point, bezier: &CubicBezier, num_samples: usize) -> f32 {
    let num_samples = if num_samples == 0 { 20 } else { num_samples };

    let mut min_dist_sq = f32::MAX;
    let mut prev = bezier.eval(0.0);
    for i in 1..=num_samples {
        let curr = bezier.eval(i as f32 / num_samples as f32);
        min_dist_sq = min_dist_sq.min(distance_to_segment_sq(point, prev, curr));
        prev = curr;
    }

    min_dist_sq.sqrt()
}

/// Point where the ray from `rect`'s centre towards `toward` leaves `rect`.
///
/// Returns the centre itself when `toward` coincides with it.
pub fn rect_boundary_point(rect: Rect, toward: Point) -> Point {
    let c = rect.center();
    let dx = toward.x - c.x;
    let dy = toward.y - c.y;
    if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
        return c;
    }

    let half_w = rect.width * 0.5;
    let half_h = rect.height * 0.5;
    let tx = if dx.abs() > f32::EPSILON { half_w / dx.abs() } else { f32::INFINITY };
    let ty = if dy.abs() > f32::EPSILON { half_h / dy.abs() } else { f32::INFINITY };
    if tx <= ty {
        Point::new(c.x + half_w.copysign(dx), c.y + dy * tx)
    } else {
        Point::new(c.x + dx * ty, c.y + half_h.copysign(dy))
    }
}

/// Geometry of one connection, in the space of its points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionGeometry {
    pub start: Point,
    pub end: Point,
    pub style: ConnectionStyle,
    /// Present for [`ConnectionStyle::Curved`].
    pub curve: Option<CubicBezier>,
}

impl ConnectionGeometry {
    /// Route a connection between two node rectangles.
    ///
    /// Endpoints sit where the centre-to-centre line crosses each outline.
    pub fn between(source: Rect, target: Rect, style: ConnectionStyle, curve_min_offset: f32) -> Self {
        let start = rect_boundary_point(source, target.center());
        let end = rect_boundary_point(target, source.center());
        Self::from_endpoints(start, end, style, curve_min_offset)
    }

    pub fn from_endpoints(start: Point, end: Point, style: ConnectionStyle, curve_min_offset: f32) -> Self {
        let curve = match style {
            ConnectionStyle::Curved => Some(CubicBezier::from_endpoints(start, end, curve_min_offset)),
            ConnectionStyle::Arrow | ConnectionStyle::Line | ConnectionStyle::Dashed => None,
        };
        Self { start, end, style, curve }
    }

    /// Apply a point mapping (typically scene to screen).
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            start: f(self.start),
            end: f(self.end),
            style: self.style,
            curve: self.curve.map(|c| c.map(&f)),
        }
    }

    /// Conservative bounding rectangle including the arrow head.
    pub fn bounds(&self) -> Rect {
        let mut bounds = match &self.curve {
            Some(curve) => curve.hull_bounds(),
            None => Rect::from_points(self.start, self.end),
        };
        if self.style.has_arrow_head() {
            bounds = bounds.inflate(ARROW_HEAD_LENGTH);
        }
        bounds
    }

    /// Distance from `point` to the drawn line or curve.
    pub fn distance_to(&self, point: Point, samples: usize) -> f32 {
        match &self.curve {
            Some(curve) => distance_to_bezier(point, curve, samples),
            None => distance_to_segment(point, self.start, self.end),
        }
    }

    /// SVG path commands for the connection body.
    pub fn path_commands(&self) -> String {
        match &self.curve {
            Some(c) => format!(
                "M {} {} C {} {} {} {} {} {}",
                c.p0.x, c.p0.y, c.p1.x, c.p1.y, c.p2.x, c.p2.y, c.p3.x, c.p3.y
            ),
            None => format!("M {} {} L {} {}", self.start.x, self.start.y, self.end.x, self.end.y),
        }
    }

    /// Closed triangle at the end point, `None` for styles without a head.
    pub fn arrow_head_commands(&self, scale: f32) -> Option<String> {
        if !self.style.has_arrow_head() {
            return None;
        }
        Some(arrow_head_commands(self.start, self.end, scale))
    }
}

/// Closed triangle pointing from `from` towards `tip`.
pub fn arrow_head_commands(from: Point, tip: Point, scale: f32) -> String {
    let len = from.distance(tip);
    let (ux, uy) = if len > f32::EPSILON {
        ((tip.x - from.x) / len, (tip.y - from.y) / len)
    } else {
        (1.0, 0.0)
    };
    let head = ARROW_HEAD_LENGTH * scale;
    let half = ARROW_HEAD_HALF_WIDTH * scale;
    let base = Point::new(tip.x - ux * head, tip.y - uy * head);
    let left = Point::new(base.x - uy * half, base.y + ux * half);
    let right = Point::new(base.x + uy * half, base.y - ux * half);
    format!(
        "M {} {} L {} {} L {} {} Z",
        tip.x, tip.y, left.x, left.y, right.x, right.y
    )
}

/// Straight preview line used while a connection is being drawn.
pub fn generate_line_path(start: Point, end: Point) -> String {
    format!("M {} {} L {} {}", start.x, start.y, end.x, end.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-3
    }

    // ========================================================================
    // CubicBezier
    // ========================================================================

    #[test]
    fn test_bezier_from_endpoints_horizontal_control_points() {
        let b = CubicBezier::from_endpoints(Point::new(0.0, 0.0), Point::new(200.0, 100.0), 50.0);
        assert_eq!(b.p1, Point::new(100.0, 0.0));
        assert_eq!(b.p2, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_bezier_min_offset_wins_for_vertical_connections() {
        let b = CubicBezier::from_endpoints(Point::new(0.0, 0.0), Point::new(0.0, 100.0), 50.0);
        assert_eq!(b.p1, Point::new(50.0, 0.0));
        assert_eq!(b.p2, Point::new(-50.0, 100.0));
    }

    #[test]
    fn test_bezier_short_distance_collapses() {
        let b = CubicBezier::from_endpoints(Point::new(0.0, 0.0), Point::new(3.0, 4.0), 50.0);
        assert_eq!(b.p1, b.p0);
        assert_eq!(b.p2, b.p3);
    }

    #[test]
    fn test_bezier_eval_endpoints() {
        let b = CubicBezier::from_endpoints(Point::new(10.0, 20.0), Point::new(210.0, 80.0), 50.0);
        assert!(approx(b.eval(0.0), b.p0));
        assert!(approx(b.eval(1.0), b.p3));
    }

    #[test]
    fn test_hull_bounds_contains_samples() {
        let b = CubicBezier::from_endpoints(Point::new(0.0, 0.0), Point::new(40.0, 200.0), 50.0);
        let hull = b.hull_bounds().inflate(1e-3);
        for i in 0..=20 {
            assert!(hull.contains_point(b.eval(i as f32 / 20.0)));
        }
    }

    // ========================================================================
    // Distance
    // ========================================================================

    #[test]
    fn test_distance_to_segment() {
        let d = distance_to_segment(Point::new(5.0, 3.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-5);
        // Beyond the end clamps to the endpoint
        let d = distance_to_segment(Point::new(13.0, 4.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_distance_to_bezier_on_curve_is_small() {
        let b = CubicBezier::from_endpoints(Point::new(0.0, 0.0), Point::new(200.0, 100.0), 50.0);
        let on_curve = b.eval(0.37);
        assert!(distance_to_bezier(on_curve, &b, 50) < 1.0);
    }

    #[test]
    fn test_distance_to_bezier_zero_samples_uses_default() {
        let b = CubicBezier::from_endpoints(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 50.0);
        let d0 = distance_to_bezier(Point::new(50.0, 30.0), &b, 0);
        let d20 = distance_to_bezier(Point::new(50.0, 30.0), &b, 20);
        assert_eq!(d0, d20);
    }

    // ========================================================================
    // Boundary routing
    // ========================================================================

    #[test]
    fn test_rect_boundary_point_horizontal() {
        let r = Rect::new(0.0, 0.0, 40.0, 40.0);
        assert!(approx(rect_boundary_point(r, Point::new(500.0, 20.0)), Point::new(40.0, 20.0)));
        assert!(approx(rect_boundary_point(r, Point::new(-500.0, 20.0)), Point::new(0.0, 20.0)));
    }

    #[test]
    fn test_rect_boundary_point_diagonal_hits_corner() {
        let r = Rect::new(0.0, 0.0, 40.0, 40.0);
        assert!(approx(rect_boundary_point(r, Point::new(100.0, 100.0)), Point::new(40.0, 40.0)));
    }

    #[test]
    fn test_rect_boundary_point_same_centre() {
        let r = Rect::new(0.0, 0.0, 40.0, 40.0);
        assert_eq!(rect_boundary_point(r, Point::new(20.0, 20.0)), Point::new(20.0, 20.0));
    }

    #[test]
    fn test_between_routes_edge_to_edge() {
        let a = Rect::new(0.0, 0.0, 40.0, 40.0);
        let b = Rect::new(500.0, 0.0, 40.0, 40.0);
        let g = ConnectionGeometry::between(a, b, ConnectionStyle::Line, 50.0);
        assert!(approx(g.start, Point::new(40.0, 20.0)));
        assert!(approx(g.end, Point::new(500.0, 20.0)));
        assert_eq!(g.path_commands(), "M 40 20 L 500 20");
    }

    // ========================================================================
    // Styles
    // ========================================================================

    #[test]
    fn test_arrow_bounds_include_head() {
        let g = ConnectionGeometry::from_endpoints(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            ConnectionStyle::Arrow,
            50.0,
        );
        let bounds = g.bounds();
        assert!(bounds.y <= -ARROW_HEAD_HALF_WIDTH);
        assert!(g.arrow_head_commands(1.0).is_some());
    }

    #[test]
    fn test_curved_path_uses_cubic_command() {
        let g = ConnectionGeometry::from_endpoints(
            Point::new(10.0, 20.0),
            Point::new(140.0, 80.0),
            ConnectionStyle::Curved,
            50.0,
        );
        let commands = g.path_commands();
        assert!(commands.starts_with("M 10 20 C"));
        assert!(g.arrow_head_commands(1.0).is_none());
    }

    #[test]
    fn test_map_preserves_style_and_curve() {
        let g = ConnectionGeometry::from_endpoints(
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            ConnectionStyle::Curved,
            50.0,
        );
        let doubled = g.map(|p| Point::new(p.x * 2.0, p.y * 2.0));
        assert_eq!(doubled.end, Point::new(400.0, 0.0));
        let curve = doubled.curve.unwrap();
        assert_eq!(curve.p1, Point::new(200.0, 0.0));
    }

    #[test]
    fn test_arrow_head_points_at_tip() {
        let commands = arrow_head_commands(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 1.0);
        assert_eq!(commands, "M 100 0 L 90 5 L 90 -5 Z");
    }
}
