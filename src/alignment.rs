//! Alignment and snapping for drag operations.
//!
//! [`compute_alignment`] is a pure function. For each axis independently it
//! compares the start, centre and end of the moving rectangle against the same
//! three features of every other rectangle, snaps by the best candidate within
//! tolerance, and reports a guide segment for every feature pair that lines up
//! after the snap.

use crate::geometry::{Point, Rect};
use crate::graph::NodeId;

/// Two features closer than this after snapping count as aligned.
const ALIGNED_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal position; aligned features produce vertical guides.
    X,
    /// Vertical position; aligned features produce horizontal guides.
    Y,
}

/// Feature of a rectangle along one axis, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Start,
    Center,
    End,
}

impl Feature {
    const ALL: [Feature; 3] = [Feature::Start, Feature::Center, Feature::End];

    fn of(self, rect: &Rect, axis: Axis) -> f32 {
        let (start, len) = match axis {
            Axis::X => (rect.x, rect.width),
            Axis::Y => (rect.y, rect.height),
        };
        match self {
            Feature::Start => start,
            Feature::Center => start + len * 0.5,
            Feature::End => start + len,
        }
    }
}

/// Another node the moving rectangle may align with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignTarget {
    pub id: NodeId,
    pub rect: Rect,
    pub z: i64,
}

/// A guide line segment in scene space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    pub axis: Axis,
    pub from: Point,
    pub to: Point,
}

impl Guide {
    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.from, self.to)
    }
}

/// One aligned feature pair after snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentMatch {
    pub axis: Axis,
    pub target: NodeId,
    pub moving: Feature,
    pub other: Feature,
}

/// Outcome of [`compute_alignment`].
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// The moving rectangle after snapping.
    pub rect: Rect,
    pub guides: Vec<Guide>,
    pub matches: Vec<AlignmentMatch>,
}

impl Alignment {
    fn unchanged(rect: Rect) -> Self {
        Self { rect, guides: Vec::new(), matches: Vec::new() }
    }

    pub fn is_snapped(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Ids of the nodes aligned with the moving rectangle, first match first.
    pub fn aligned_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = Vec::new();
        for m in &self.matches {
            if !ids.contains(&m.target) {
                ids.push(m.target);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    delta: f32,
    z: i64,
    moving: Feature,
    other: Feature,
}

impl Candidate {
    /// Smaller |delta| wins, then higher z, then earlier feature pair.
    fn beats(&self, best: &Candidate) -> bool {
        let (a, b) = (self.delta.abs(), best.delta.abs());
        if a != b {
            return a < b;
        }
        if self.z != best.z {
            return self.z > best.z;
        }
        (self.moving, self.other) < (best.moving, best.other)
    }
}

/// Snap `moving` against `others`.
///
/// `tolerance` is in the same units as the rectangles. A non-finite or
/// negative tolerance disables snapping.
pub fn compute_alignment(moving: Rect, others: &[AlignTarget], tolerance: f32) -> Alignment {
    if !tolerance.is_finite() || tolerance < 0.0 || !moving.is_finite() {
        return Alignment::unchanged(moving);
    }

    let dx = best_delta(&moving, others, tolerance, Axis::X).unwrap_or(0.0);
    let dy = best_delta(&moving, others, tolerance, Axis::Y).unwrap_or(0.0);
    let rect = moving.translate(dx, dy);

    let mut result = Alignment::unchanged(rect);
    for axis in [Axis::X, Axis::Y] {
        collect_aligned(&rect, others, axis, &mut result);
    }
    result
}

fn best_delta(moving: &Rect, others: &[AlignTarget], tolerance: f32, axis: Axis) -> Option<f32> {
    let mut best: Option<Candidate> = None;
    for target in others {
        for moving_feature in Feature::ALL {
            let m = moving_feature.of(moving, axis);
            for other_feature in Feature::ALL {
                let delta = other_feature.of(&target.rect, axis) - m;
                if delta.is_nan() || delta.abs() > tolerance {
                    continue;
                }
                let candidate = Candidate { delta, z: target.z, moving: moving_feature, other: other_feature };
                if best.map_or(true, |b| candidate.beats(&b)) {
                    best = Some(candidate);
                }
            }
        }
    }
    best.map(|c| c.delta)
}

fn collect_aligned(rect: &Rect, others: &[AlignTarget], axis: Axis, result: &mut Alignment) {
    for target in others {
        for moving_feature in Feature::ALL {
            let m = moving_feature.of(rect, axis);
            for other_feature in Feature::ALL {
                let o = other_feature.of(&target.rect, axis);
                if (o - m).abs() > ALIGNED_EPSILON {
                    continue;
                }
                result.matches.push(AlignmentMatch {
                    axis,
                    target: target.id,
                    moving: moving_feature,
                    other: other_feature,
                });
                let guide = guide_for(rect, &target.rect, axis, o);
                if !result.guides.contains(&guide) {
                    result.guides.push(guide);
                }
            }
        }
    }
}

/// Segment at `pos` spanning both rectangles along the other axis.
fn guide_for(moving: &Rect, target: &Rect, axis: Axis, pos: f32) -> Guide {
    match axis {
        Axis::X => {
            let top = moving.y.min(target.y);
            let bottom = moving.bottom().max(target.bottom());
            Guide { axis, from: Point::new(pos, top), to: Point::new(pos, bottom) }
        }
        Axis::Y => {
            let left = moving.x.min(target.x);
            let right = moving.right().max(target.right());
            Guide { axis, from: Point::new(left, pos), to: Point::new(right, pos) }
        }
    }
}
