//! Uniform-grid spatial index over node rectangles.
//!
//! The scene is divided into square buckets of `cell_size` scene units; each
//! bucket lists the nodes whose rectangle overlaps it. Entries spanning more
//! than [`MAX_CELLS_PER_ENTRY`] buckets go to an overflow list that every query
//! scans linearly.
//!
//! # Invariants
//!
//! 1. Query results equal the brute-force intersection over all entries.
//! 2. Results are ordered by z; z values are unique so the order is total.
//! 3. The index is derived data: [`SpatialIndex::rebuild`] restores it from
//!    the authoritative node table at any time.

use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use crate::geometry::{Point, Rect};
use crate::graph::NodeId;

/// Entries covering more buckets than this are kept in the overflow list.
pub const MAX_CELLS_PER_ENTRY: i64 = 256;

/// Ordering of query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    /// Lowest z first, the order nodes are painted in.
    Paint,
    /// Highest z first, the order hit-testing wants.
    TopmostFirst,
}

type Cell = (i32, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl CellRange {
    /// Saturates for ranges clamped at the `i32` cell limits.
    fn count(&self) -> i64 {
        let w = self.x1 as i64 - self.x0 as i64 + 1;
        let h = self.y1 as i64 - self.y0 as i64 + 1;
        w.saturating_mul(h)
    }

    fn cells(self) -> impl Iterator<Item = Cell> {
        (self.y0..=self.y1).flat_map(move |y| (self.x0..=self.x1).map(move |x| (x, y)))
    }
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    rect: Rect,
    z: i64,
    /// `None` when the entry lives in the overflow list.
    cells: Option<CellRange>,
}

/// Spatial index mapping scene rectangles to node ids.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    buckets: HashMap<Cell, Vec<NodeId>>,
    entries: HashMap<NodeId, IndexEntry>,
    overflow: Vec<NodeId>,
}

impl SpatialIndex {
    /// `cell_size` must be finite and positive; [`CanvasConfig::validate`]
    /// guarantees that for configured values.
    ///
    /// [`CanvasConfig::validate`]: crate::config::CanvasConfig::validate
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            buckets: HashMap::new(),
            entries: HashMap::new(),
            overflow: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn rect_of(&self, id: NodeId) -> Option<Rect> {
        self.entries.get(&id).map(|e| e.rect)
    }

    /// Number of entries kept in the overflow list.
    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, id: NodeId, rect: Rect, z: i64) {
        self.remove(id);
        let cells = self.place(id, rect);
        self.entries.insert(id, IndexEntry { rect, z, cells });
    }

    /// Move an existing entry. Returns `false` for unknown ids.
    pub fn update(&mut self, id: NodeId, rect: Rect) -> bool {
        let Some(entry) = self.entries.get(&id).copied() else {
            return false;
        };
        if entry.rect == rect {
            return true;
        }
        if entry.cells.is_some() && entry.cells == self.cell_range(rect) {
            // Same buckets; only the stored rect changes.
            if let Some(e) = self.entries.get_mut(&id) {
                e.rect = rect;
            }
            return true;
        }
        self.insert(id, rect, entry.z);
        true
    }

    /// Change an entry's z. Returns `false` for unknown ids.
    pub fn set_z(&mut self, id: NodeId, z: i64) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.z = z;
                true
            }
            None => false,
        }
    }

    /// Remove an entry. Returns `false` for unknown ids.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        match entry.cells {
            Some(range) => {
                for cell in range.cells() {
                    if let Some(bucket) = self.buckets.get_mut(&cell) {
                        bucket.retain(|&other| other != id);
                        if bucket.is_empty() {
                            self.buckets.remove(&cell);
                        }
                    }
                }
            }
            None => self.overflow.retain(|&other| other != id),
        }
        true
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
        self.overflow.clear();
    }

    /// Rebuild from scratch.
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (NodeId, Rect, i64)>,
    {
        self.clear();
        for (id, rect, z) in entries {
            self.insert(id, rect, z);
        }
        trace!(entries = self.entries.len(), overflow = self.overflow.len(), "spatial index rebuilt");
    }

    /// Ids of entries whose rectangle intersects `rect`, in the given order.
    pub fn query_rect(&self, rect: Rect, order: ZOrder) -> Vec<NodeId> {
        let mut hits: Vec<(i64, NodeId)> = Vec::new();
        let scan_all = match self.cell_range(rect) {
            Some(range) => range.count() > self.entries.len().max(1) as i64 * 4,
            None => true,
        };

        if scan_all {
            hits.extend(
                self.entries
                    .iter()
                    .filter(|(_, e)| e.rect.intersects(&rect))
                    .map(|(&id, e)| (e.z, id)),
            );
        } else if let Some(range) = self.cell_range(rect) {
            let mut seen = HashSet::new();
            for cell in range.cells() {
                for &id in self.buckets.get(&cell).into_iter().flatten() {
                    if seen.insert(id) {
                        self.push_if(id, &mut hits, |r| r.intersects(&rect));
                    }
                }
            }
            for &id in &self.overflow {
                self.push_if(id, &mut hits, |r| r.intersects(&rect));
            }
        }

        sort_hits(&mut hits, order);
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// Ids of entries containing `p` (edges inclusive), in the given order.
    pub fn query_point(&self, p: Point, order: ZOrder) -> Vec<NodeId> {
        let mut hits = Vec::new();
        if p.is_finite() {
            let cell = self.cell_of(p);
            for &id in self.buckets.get(&cell).into_iter().flatten() {
                self.push_if(id, &mut hits, |r| r.contains_point(p));
            }
            for &id in &self.overflow {
                self.push_if(id, &mut hits, |r| r.contains_point(p));
            }
        }
        sort_hits(&mut hits, order);
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// The highest-z entry containing `p`.
    pub fn topmost_at(&self, p: Point) -> Option<NodeId> {
        self.query_point(p, ZOrder::TopmostFirst).into_iter().next()
    }

    fn push_if(&self, id: NodeId, hits: &mut Vec<(i64, NodeId)>, pred: impl Fn(&Rect) -> bool) {
        if let Some(entry) = self.entries.get(&id) {
            if pred(&entry.rect) {
                hits.push((entry.z, id));
            }
        }
    }

    fn place(&mut self, id: NodeId, rect: Rect) -> Option<CellRange> {
        match self.cell_range(rect) {
            Some(range) if range.count() <= MAX_CELLS_PER_ENTRY => {
                for cell in range.cells() {
                    self.buckets.entry(cell).or_default().push(id);
                }
                Some(range)
            }
            _ => {
                warn!(node = %id, ?rect, "node spans too many index cells, using overflow list");
                self.overflow.push(id);
                None
            }
        }
    }

    fn cell_of(&self, p: Point) -> Cell {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        )
    }

    fn cell_range(&self, rect: Rect) -> Option<CellRange> {
        if !rect.is_finite() || rect.width < 0.0 || rect.height < 0.0 {
            return None;
        }
        let (x0, y0) = self.cell_of(rect.origin());
        let (x1, y1) = self.cell_of(Point::new(rect.right(), rect.bottom()));
        Some(CellRange { x0, y0, x1, y1 })
    }
}

fn sort_hits(hits: &mut [(i64, NodeId)], order: ZOrder) {
    match order {
        ZOrder::Paint => hits.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1))),
        ZOrder::TopmostFirst => hits.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1))),
    }
}
