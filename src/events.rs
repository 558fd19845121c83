//! Change notifications.
//!
//! Components never call each other back. Each one records what changed into
//! a pending [`ChangeBatch`]; the controller drains those at the end of an
//! input cycle and publishes a single merged batch on the [`ChangeBus`].

use std::fmt;

use crate::geometry::Rect;

/// Everything that changed during one input cycle.
///
/// `damage` holds unpadded scene-space rectangles: prior and new footprints of
/// moved or resized nodes, of their attached connections, and of overlay items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeBatch {
    /// Nodes or connections were added, removed or changed.
    pub scene: bool,
    pub selection: bool,
    /// Pan or zoom changed; the whole surface must repaint.
    pub viewport: bool,
    /// Scale or viewport size changed; the cached grid layer is stale.
    pub static_layer: bool,
    /// Marquee, connection preview or alignment guides changed.
    pub overlay: bool,
    pub damage: Vec<Rect>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        !self.scene
            && !self.selection
            && !self.viewport
            && !self.static_layer
            && !self.overlay
            && self.damage.is_empty()
    }

    /// Record a damaged scene-space rectangle.
    pub fn add_damage(&mut self, rect: Rect) {
        self.damage.push(rect);
    }

    /// Fold `other` into this batch.
    pub fn merge(&mut self, other: ChangeBatch) {
        self.scene |= other.scene;
        self.selection |= other.selection;
        self.viewport |= other.viewport;
        self.static_layer |= other.static_layer;
        self.overlay |= other.overlay;
        self.damage.extend(other.damage);
    }

    /// Union of every damaged rectangle.
    pub fn damage_bounds(&self) -> Option<Rect> {
        let mut iter = self.damage.iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, r| acc.union(r)))
    }

    /// Take the batch, leaving an empty one behind.
    pub fn take(&mut self) -> ChangeBatch {
        std::mem::take(self)
    }
}

/// Handle returned by [`ChangeBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ChangeBatch)>;

/// Publish-only listener list.
///
/// Listeners receive batches in subscription order. They get no handle back
/// to the publisher, so notifications cannot re-enter the component that
/// produced them.
#[derive(Default)]
pub struct ChangeBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeBatch) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(other, _)| *other != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, batch: &ChangeBatch) {
        for (_, listener) in &mut self.listeners {
            listener(batch);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_empty_batch() {
        let batch = ChangeBatch::default();
        assert!(batch.is_empty());
        assert!(batch.damage_bounds().is_none());
    }

    #[test]
    fn test_merge_ors_flags_and_appends_damage() {
        let mut a = ChangeBatch { scene: true, ..Default::default() };
        a.add_damage(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut b = ChangeBatch { viewport: true, ..Default::default() };
        b.add_damage(Rect::new(20.0, 0.0, 10.0, 10.0));
        a.merge(b);
        assert!(a.scene && a.viewport && !a.selection);
        assert_eq!(a.damage.len(), 2);
        assert_eq!(a.damage_bounds(), Some(Rect::new(0.0, 0.0, 30.0, 10.0)));
    }

    #[test]
    fn test_publish_reaches_listeners_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ChangeBus::new();
        for tag in ["first", "second"] {
            let log = log.clone();
            bus.subscribe(move |batch| log.borrow_mut().push((tag, batch.scene)));
        }
        bus.publish(&ChangeBatch { scene: true, ..Default::default() });
        assert_eq!(*log.borrow(), vec![("first", true), ("second", true)]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = ChangeBus::new();
        let id = {
            let count = count.clone();
            bus.subscribe(move |_| *count.borrow_mut() += 1)
        };
        bus.publish(&ChangeBatch::default());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&ChangeBatch::default());
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
