//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use std::cell::RefCell;
use std::rc::Rc;

use slint_diagram_canvas::{CanvasController, ChangeBatch, Rect, SubscriptionId};

/// Records every batch the controller publishes.
#[derive(Default, Clone)]
pub struct ChangeTracker {
    pub batches: Rc<RefCell<Vec<ChangeBatch>>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe this tracker to `ctrl`.
    pub fn attach(&self, ctrl: &mut CanvasController) -> SubscriptionId {
        let batches = Rc::clone(&self.batches);
        ctrl.subscribe(move |batch| batches.borrow_mut().push(batch.clone()))
    }

    pub fn count(&self) -> usize {
        self.batches.borrow().len()
    }

    pub fn last(&self) -> Option<ChangeBatch> {
        self.batches.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.batches.borrow_mut().clear();
    }

    pub fn scene_changes(&self) -> usize {
        self.batches.borrow().iter().filter(|b| b.scene).count()
    }

    pub fn selection_changes(&self) -> usize {
        self.batches.borrow().iter().filter(|b| b.selection).count()
    }

    pub fn viewport_changes(&self) -> usize {
        self.batches.borrow().iter().filter(|b| b.viewport).count()
    }

    pub fn overlay_changes(&self) -> usize {
        self.batches.borrow().iter().filter(|b| b.overlay).count()
    }

    /// Every damaged rectangle across all recorded batches.
    pub fn all_damage(&self) -> Vec<Rect> {
        self.batches
            .borrow()
            .iter()
            .flat_map(|b| b.damage.iter().copied())
            .collect()
    }
}

/// Approximate float comparison for positions computed through the viewport.
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}
