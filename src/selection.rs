use std::collections::HashSet;

use slint::{Model, VecModel};

use crate::graph::NodeId;

/// Ordered set of selected nodes.
///
/// Iteration follows insertion order, so the first node selected stays the
/// "primary" one for multi-node operations. Membership checks are O(1).
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    order: Vec<NodeId>,
    members: HashSet<NodeId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a click on `id` with or without shift held.
    ///
    /// Shift toggles membership. A plain click collapses the selection to
    /// `id`. Returns `true` if the selection changed.
    pub fn handle_interaction(&mut self, id: NodeId, shift_held: bool) -> bool {
        if shift_held {
            if !self.remove(id) {
                self.insert(id);
            }
            true
        } else {
            if self.order.len() == 1 && self.members.contains(&id) {
                return false;
            }
            self.clear();
            self.insert(id);
            true
        }
    }

    /// Add `id` at the end. Returns `false` if it was already selected.
    pub fn insert(&mut self, id: NodeId) -> bool {
        if self.members.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    /// Remove `id`. Returns `true` if it was selected.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if self.members.remove(&id) {
            self.order.retain(|&other| other != id);
            true
        } else {
            false
        }
    }

    /// Clear the current selection. Returns `true` if anything was selected.
    pub fn clear(&mut self) -> bool {
        let changed = !self.order.is_empty();
        self.order.clear();
        self.members.clear();
        changed
    }

    /// Replace the current selection, keeping first occurrences in order.
    ///
    /// Returns `true` if the resulting ordered set differs from the old one.
    pub fn replace_selection<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = NodeId>,
    {
        let previous = std::mem::take(&mut self.order);
        self.members.clear();
        for id in ids {
            self.insert(id);
        }
        previous != self.order
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.members.contains(&id)
    }

    /// Selected ids in insertion order.
    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeId> {
        self.order.iter()
    }

    /// First selected node, if any.
    pub fn primary(&self) -> Option<NodeId> {
        self.order.first().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sync the selection to a Slint VecModel of raw node ids.
    pub fn sync_to_model(&self, model: &VecModel<i32>) {
        model.set_vec(self.order.iter().map(|id| id.0).collect::<Vec<_>>());
    }

    /// Replace the selection from any Slint Model of raw node ids.
    ///
    /// Ids are not checked against the scene; use
    /// [`SceneGraph::set_selection`](crate::graph::SceneGraph::set_selection)
    /// when they come from untrusted input.
    pub fn sync_from_model(&mut self, model: &dyn Model<Data = i32>) -> bool {
        self.replace_selection((0..model.row_count()).filter_map(|i| model.row_data(i)).map(NodeId))
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a NodeId;
    type IntoIter = std::slice::Iter<'a, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}
