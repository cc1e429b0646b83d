use std::collections::HashSet;
use std::hash::Hash;

/// Keeps the ids of `previous` that are still in `current`, in `previous` order.
pub fn prune<Id: Eq + Hash + Clone>(previous: &[Id], current: &HashSet<Id>) -> Vec<Id> {
    previous
        .iter()
        .filter(|id| current.contains(*id))
        .cloned()
        .collect()
}

/// Ordered set of ids marked as selected in a list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<Id> {
    ids: Vec<Id>,
}

impl<Id> Default for Selection<Id> {
    fn default() -> Self {
        Self { ids: Vec::new() }
    }
}

impl<Id: Eq + Hash + Clone> Selection<Id> {
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.ids.contains(id)
    }

    /// Returns true if the id was not already selected.
    pub fn select(&mut self, id: Id) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn deselect(&mut self, id: &Id) -> bool {
        let before = self.ids.len();
        self.ids.retain(|s| s != id);
        before != self.ids.len()
    }

    /// Flips the selection of `id` and returns whether it is now selected.
    pub fn toggle(&mut self, id: Id) -> bool {
        if self.deselect(&id) {
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    /// Replaces the selection, dropping repeated ids.
    pub fn set(&mut self, ids: impl IntoIterator<Item = Id>) {
        self.ids.clear();
        for id in ids {
            self.select(id);
        }
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    /// Drops every id not in `current`. Returns true if anything was dropped.
    pub fn retain_existing(&mut self, current: &HashSet<Id>) -> bool {
        let next = prune(&self.ids, current);
        let changed = next.len() != self.ids.len();
        self.ids = next;
        changed
    }
}
