//! The closed set of node shapes.
//!
//! Each kind knows its default size, whether it carries text, and how to
//! outline itself as SVG path commands inside a given rectangle. The renderer
//! dispatches on [`ShapeKind`] with a single exhaustive `match`, so adding a
//! kind is a compile error everywhere it must be handled.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};

/// Corner radius of [`ShapeKind::RoundedRect`] at scale 1.
pub const ROUNDED_CORNER_RADIUS: f32 = 8.0;

/// Geometric kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    RoundedRect,
    Rect,
    Pill,
    Circle,
    Triangle,
    Diamond,
    Hexagon,
    /// Plain text block without an outline.
    Text,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 8] = [
        ShapeKind::RoundedRect,
        ShapeKind::Rect,
        ShapeKind::Pill,
        ShapeKind::Circle,
        ShapeKind::Triangle,
        ShapeKind::Diamond,
        ShapeKind::Hexagon,
        ShapeKind::Text,
    ];

    /// Whether nodes of this kind may hold non-empty content.
    pub fn is_text_capable(self) -> bool {
        match self {
            ShapeKind::RoundedRect
            | ShapeKind::Rect
            | ShapeKind::Pill
            | ShapeKind::Diamond
            | ShapeKind::Hexagon
            | ShapeKind::Text => true,
            ShapeKind::Circle | ShapeKind::Triangle => false,
        }
    }

    /// Size used when a node is placed without an explicit size.
    pub fn default_size(self) -> Size {
        match self {
            ShapeKind::RoundedRect | ShapeKind::Rect => Size::new(120.0, 60.0),
            ShapeKind::Pill => Size::new(140.0, 48.0),
            ShapeKind::Circle => Size::new(64.0, 64.0),
            ShapeKind::Triangle => Size::new(72.0, 64.0),
            ShapeKind::Diamond => Size::new(100.0, 80.0),
            ShapeKind::Hexagon => Size::new(120.0, 64.0),
            ShapeKind::Text => Size::new(160.0, 32.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::RoundedRect => "rounded-rect",
            ShapeKind::Rect => "rect",
            ShapeKind::Pill => "pill",
            ShapeKind::Circle => "circle",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Hexagon => "hexagon",
            ShapeKind::Text => "text",
        }
    }

    /// SVG path commands outlining this kind inside `rect`.
    ///
    /// `rect` is in whatever space the caller draws in; `scale` only affects
    /// the rounded-rect corner radius. Text blocks have no outline and yield
    /// an empty string.
    pub fn outline_commands(self, rect: Rect, scale: f32) -> String {
        match self {
            ShapeKind::Rect => polygon(&[
                rect.origin(),
                Point::new(rect.right(), rect.y),
                Point::new(rect.right(), rect.bottom()),
                Point::new(rect.x, rect.bottom()),
            ]),
            ShapeKind::RoundedRect => {
                let r = (ROUNDED_CORNER_RADIUS * scale)
                    .min(rect.width * 0.5)
                    .min(rect.height * 0.5);
                rounded_rect(rect, r)
            }
            ShapeKind::Pill => rounded_rect(rect, rect.width.min(rect.height) * 0.5),
            ShapeKind::Circle => ellipse(rect),
            ShapeKind::Triangle => polygon(&[
                Point::new(rect.center().x, rect.y),
                Point::new(rect.right(), rect.bottom()),
                Point::new(rect.x, rect.bottom()),
            ]),
            ShapeKind::Diamond => {
                let c = rect.center();
                polygon(&[
                    Point::new(c.x, rect.y),
                    Point::new(rect.right(), c.y),
                    Point::new(c.x, rect.bottom()),
                    Point::new(rect.x, c.y),
                ])
            }
            ShapeKind::Hexagon => {
                let inset = rect.width * 0.25;
                let cy = rect.center().y;
                polygon(&[
                    Point::new(rect.x + inset, rect.y),
                    Point::new(rect.right() - inset, rect.y),
                    Point::new(rect.right(), cy),
                    Point::new(rect.right() - inset, rect.bottom()),
                    Point::new(rect.x + inset, rect.bottom()),
                    Point::new(rect.x, cy),
                ])
            }
            ShapeKind::Text => String::new(),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn polygon(points: &[Point]) -> String {
    let mut commands = String::with_capacity(points.len() * 16);
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            commands.push(' ');
        }
        let op = if i == 0 { 'M' } else { 'L' };
        commands.push_str(&format!("{} {} {}", op, p.x, p.y));
    }
    commands.push_str(" Z");
    commands
}

fn rounded_rect(rect: Rect, r: f32) -> String {
    let (x, y, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
    format!(
        "M {} {} L {} {} A {r} {r} 0 0 1 {} {} L {} {} A {r} {r} 0 0 1 {} {} L {} {} A {r} {r} 0 0 1 {} {} L {} {} A {r} {r} 0 0 1 {} {} Z",
        x + r, y,
        right - r, y,
        right, y + r,
        right, bottom - r,
        right - r, bottom,
        x + r, bottom,
        x, bottom - r,
        x, y + r,
        x + r, y,
    )
}

fn ellipse(rect: Rect) -> String {
    let rx = rect.width * 0.5;
    let ry = rect.height * 0.5;
    let cy = rect.center().y;
    format!(
        "M {} {} A {rx} {ry} 0 1 0 {} {} A {rx} {ry} 0 1 0 {} {} Z",
        rect.x,
        cy,
        rect.right(),
        cy,
        rect.x,
        cy,
    )
}
