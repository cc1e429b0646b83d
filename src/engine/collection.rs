use indexmap::IndexMap;
use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::{Entity, Error, Result};

/// What [`EntityCollection::add`] does when the id is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Replace the stored entity in place. Keeps `add` idempotent under retry.
    #[default]
    Overwrite,
    /// Refuse the insert with [`Error::DuplicateId`].
    Reject,
}

/// Normalized, insertion-ordered storage of entities keyed by id.
///
/// Every stored key equals the `id` of the entity stored under it, and ids are
/// unique. Each mutation that changes the contents bumps [`version`](Self::version),
/// which derived views use to decide whether to recompute.
#[derive(Debug, Clone)]
pub struct EntityCollection<T: Entity> {
    items: IndexMap<T::Id, T>,
    policy: DuplicatePolicy,
    version: u64,
}

impl<T: Entity> Default for EntityCollection<T> {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl<T: Entity> EntityCollection<T> {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            items: IndexMap::new(),
            policy,
            version: 0,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replaces the whole collection. Iteration order follows `items`; when the
    /// input repeats an id, the last occurrence wins and keeps the first position.
    pub fn set_all(&mut self, items: Vec<T>) {
        let mut next = IndexMap::with_capacity(items.len());
        for item in items {
            next.insert(item.id().clone(), item);
        }
        self.items = next;
        self.version += 1;
    }

    /// Inserts one entity, applying the duplicate policy.
    pub fn add(&mut self, item: T) -> Result<()> {
        if self.policy == DuplicatePolicy::Reject && self.items.contains_key(item.id()) {
            return Err(Error::DuplicateId(item.id().to_string()));
        }
        self.upsert(item);
        Ok(())
    }

    /// Inserts or replaces regardless of policy. An existing entity keeps its position.
    pub fn upsert(&mut self, item: T) {
        self.items.insert(item.id().clone(), item);
        self.version += 1;
    }

    /// Shallow-merges `changes` into the entity stored under `id`.
    ///
    /// Top-level fields present in the serialized changes overwrite the stored
    /// ones; fields the changes omit are kept. Returns `Ok(false)` without
    /// touching anything when `id` is absent.
    pub fn update<C: Serialize + ?Sized>(&mut self, id: &T::Id, changes: &C) -> Result<bool> {
        let Some(current) = self.items.get(id) else {
            warn!("{}: update for unknown id {} ignored", T::RESOURCE, id);
            return Ok(false);
        };

        let merged = merge_fields(current, changes)?;
        if merged.id() != id {
            return Err(Error::IdMismatch {
                expected: id.to_string(),
                found: merged.id().to_string(),
            });
        }

        if let Some(slot) = self.items.get_mut(id) {
            *slot = merged;
        }
        self.version += 1;
        Ok(true)
    }

    /// Removes one entity. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &T::Id) -> bool {
        let removed = self.items.shift_remove(id).is_some();
        if removed {
            self.version += 1;
        }
        removed
    }

    /// Removes every listed id in one pass and returns how many were present.
    pub fn remove_many(&mut self, ids: &[T::Id]) -> usize {
        let before = self.items.len();
        self.items.retain(|id, _| !ids.contains(id));
        let removed = before - self.items.len();
        if removed > 0 {
            self.version += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.version += 1;
        }
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &T::Id> {
        self.items.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.items.values().filter(|item| pred(item)).cloned().collect()
    }

    /// Returns a sorted copy; the stored order is left alone.
    pub fn sorted_by(&self, cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) -> Vec<T> {
        let mut out = self.to_vec();
        out.sort_by(cmp);
        out
    }
}

fn merge_fields<T: Entity, C: Serialize + ?Sized>(current: &T, changes: &C) -> Result<T> {
    let mut base = serde_json::to_value(current)?;
    match (base.as_object_mut(), serde_json::to_value(changes)?) {
        (_, Value::Null) => return Ok(current.clone()),
        (Some(target), Value::Object(fields)) => {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        _ => {
            return Err(Error::Internal(format!(
                "{}: entity and changes must both serialize to JSON objects",
                T::RESOURCE
            )))
        }
    }
    Ok(serde_json::from_value(base)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{widget, Widget};
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn ids(c: &EntityCollection<Widget>) -> Vec<u32> {
        c.ids().copied().collect()
    }

    #[test]
    fn test_set_all_keeps_input_order() {
        let mut c = EntityCollection::default();
        c.set_all(vec![widget(3, "c"), widget(1, "a"), widget(2, "b")]);
        assert_eq!(ids(&c), vec![3, 1, 2]);
        assert_eq!(c.version(), 1);
    }

    #[test]
    fn test_set_all_collapses_repeated_ids() {
        let mut c = EntityCollection::default();
        c.set_all(vec![widget(1, "first"), widget(2, "b"), widget(1, "second")]);
        assert_eq!(ids(&c), vec![1, 2]);
        assert_eq!(c.get(&1).unwrap().name, "second");
    }

    #[test]
    fn test_mixed_mutations_never_duplicate_ids() {
        let mut c = EntityCollection::default();
        c.set_all(vec![widget(1, "a"), widget(2, "b")]);
        c.add(widget(2, "b2")).unwrap();
        c.add(widget(3, "c")).unwrap();
        c.update(&3, &json!({ "name": "c2" })).unwrap();
        c.remove(&1);
        c.add(widget(1, "a2")).unwrap();
        c.add(widget(3, "c3")).unwrap();

        assert_eq!(ids(&c), vec![2, 3, 1]);
        for (key, item) in c.items.iter() {
            assert_eq!(key, item.id());
        }
        assert_eq!(c.get(&3).unwrap().name, "c3");
    }

    #[derive(Debug, Clone)]
    enum Op {
        SetAll(Vec<u32>),
        Add(u32),
        Update(u32),
        Remove(u32),
        RemoveMany(Vec<u32>),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            prop::collection::vec(0u32..8, 0..6).prop_map(Op::SetAll),
            (0u32..8).prop_map(Op::Add),
            (0u32..8).prop_map(Op::Update),
            (0u32..8).prop_map(Op::Remove),
            prop::collection::vec(0u32..8, 0..4).prop_map(Op::RemoveMany),
        ]
    }

    proptest! {
        #[test]
        fn test_mutation_sequences_keep_ids_unique(
            ops in prop::collection::vec(arb_op(), 1..40),
            reject in any::<bool>(),
        ) {
            let policy = if reject { DuplicatePolicy::Reject } else { DuplicatePolicy::Overwrite };
            let mut c = EntityCollection::<Widget>::new(policy);
            let mut expected = BTreeSet::new();

            for op in ops {
                match op {
                    Op::SetAll(ids) => {
                        expected = ids.iter().copied().collect();
                        c.set_all(ids.into_iter().map(|id| widget(id, "set")).collect());
                    }
                    Op::Add(id) => {
                        let _ = c.add(widget(id, "added"));
                        expected.insert(id);
                    }
                    Op::Update(id) => {
                        let patch = json!({ "name": "updated" });
                        prop_assert!(c.update(&id, &patch).is_ok());
                    }
                    Op::Remove(id) => {
                        c.remove(&id);
                        expected.remove(&id);
                    }
                    Op::RemoveMany(ids) => {
                        c.remove_many(&ids);
                        for id in &ids {
                            expected.remove(id);
                        }
                    }
                }

                for (key, item) in c.items.iter() {
                    prop_assert_eq!(key, item.id());
                }
                let stored: BTreeSet<u32> = c.ids().copied().collect();
                prop_assert_eq!(stored.len(), c.len());
                prop_assert_eq!(&stored, &expected);
            }
        }
    }

    #[test]
    fn test_overwrite_policy_keeps_position() {
        let mut c = EntityCollection::new(DuplicatePolicy::Overwrite);
        c.set_all(vec![widget(1, "a"), widget(2, "b")]);
        c.add(widget(1, "retry")).unwrap();
        assert_eq!(ids(&c), vec![1, 2]);
        assert_eq!(c.get(&1).unwrap().name, "retry");
    }

    #[test]
    fn test_reject_policy_refuses_duplicates() {
        let mut c = EntityCollection::new(DuplicatePolicy::Reject);
        c.add(widget(1, "a")).unwrap();
        let res = c.add(widget(1, "again"));
        assert!(matches!(res, Err(Error::DuplicateId(id)) if id == "1"));
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(&1).unwrap().name, "a");
    }

    #[test]
    fn test_update_merges_and_keeps_omitted_fields() {
        let mut c = EntityCollection::default();
        let mut w = widget(1, "a");
        w.note = Some("keep me".into());
        c.set_all(vec![w]);

        assert!(c.update(&1, &json!({ "name": "renamed" })).unwrap());
        let got = c.get(&1).unwrap();
        assert_eq!(got.name, "renamed");
        assert_eq!(got.note.as_deref(), Some("keep me"));
    }

    #[test]
    fn test_update_absent_id_is_noop() {
        let mut c = EntityCollection::default();
        c.set_all(vec![widget(1, "a")]);
        let version = c.version();
        assert!(!c.update(&9, &json!({ "name": "ghost" })).unwrap());
        assert_eq!(c.version(), version);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_update_cannot_change_id() {
        let mut c = EntityCollection::default();
        c.set_all(vec![widget(1, "a")]);
        let res = c.update(&1, &json!({ "id": 2 }));
        assert!(matches!(res, Err(Error::IdMismatch { .. })));
        assert!(c.contains(&1));
        assert!(!c.contains(&2));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut c = EntityCollection::default();
        c.set_all(vec![widget(1, "a")]);
        let version = c.version();
        assert!(!c.remove(&5));
        assert_eq!(c.remove_many(&[5, 6]), 0);
        assert_eq!(c.version(), version);
    }

    #[test]
    fn test_remove_many_preserves_remaining_order() {
        let mut c = EntityCollection::default();
        c.set_all((1..=7).map(|i| widget(i, "w")).collect());
        assert_eq!(c.remove_many(&[2, 5, 6, 42]), 3);
        assert_eq!(ids(&c), vec![1, 3, 4, 7]);
    }

    #[test]
    fn test_sorted_by_does_not_reorder_storage() {
        let mut c = EntityCollection::default();
        c.set_all(vec![widget(2, "b"), widget(1, "a")]);
        let sorted = c.sorted_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(sorted[0].id, 1);
        assert_eq!(ids(&c), vec![2, 1]);
    }
}
