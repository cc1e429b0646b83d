use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{Entity, Error, Gateway, Result};

/// In-process gateway that behaves like the REST API, for embedded use and tests.
///
/// Ids for created entities come from `alloc`, fed with an increasing counter;
/// counter values whose id is already taken are skipped. `alloc` should map
/// distinct counter values to distinct ids, otherwise `create` can run out of ids.
pub struct MemGateway<T: Entity> {
    rows: Mutex<IndexMap<T::Id, T>>,
    counter: AtomicU64,
    alloc: Box<dyn Fn(u64) -> T::Id + Send + Sync>,
    failures: Mutex<VecDeque<Error>>,
}

impl<T: Entity> MemGateway<T> {
    pub fn new(alloc: impl Fn(u64) -> T::Id + Send + Sync + 'static) -> Self {
        Self {
            rows: Mutex::new(IndexMap::new()),
            counter: AtomicU64::new(0),
            alloc: Box::new(alloc),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    fn lock_rows(&self) -> MutexGuard<'_, IndexMap<T::Id, T>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the server-side rows.
    pub fn seed(&self, rows: Vec<T>) {
        let mut guard = self.lock_rows();
        guard.clear();
        for row in rows {
            guard.insert(row.id().clone(), row);
        }
    }

    pub fn rows(&self) -> Vec<T> {
        self.lock_rows().values().cloned().collect()
    }

    /// Makes the next gateway call fail with `err`. Queued failures are used in order.
    pub fn fail_next(&self, err: Error) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(err);
    }

    fn take_failure(&self) -> Result<()> {
        let next = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// An injective `alloc` yields a free id within `rows.len() + 1` tries.
    fn next_id(&self, rows: &IndexMap<T::Id, T>) -> Result<T::Id> {
        for _ in 0..=rows.len() {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let id = (self.alloc)(n);
            if !rows.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(Error::Internal(format!(
            "{}: no free id after {} attempts",
            T::RESOURCE,
            rows.len() + 1
        )))
    }
}

/// Builds an entity from its data fields laid over `base`, with `id` forced.
fn materialize<T: Entity>(base: Option<&T>, data: &T::Data, id: &T::Id) -> Result<T> {
    let mut value = match base {
        Some(existing) => serde_json::to_value(existing)?,
        None => Value::Object(serde_json::Map::new()),
    };
    let (Some(target), Value::Object(fields)) = (value.as_object_mut(), to_value(data)?) else {
        return Err(Error::Validation {
            message: format!("{} payload must be a JSON object", T::RESOURCE),
            fields: Default::default(),
        });
    };
    target.extend(fields);
    target.insert("id".to_string(), serde_json::to_value(id)?);
    Ok(serde_json::from_value(value)?)
}

fn to_value<D: Serialize + ?Sized>(data: &D) -> Result<Value> {
    Ok(serde_json::to_value(data)?)
}

#[async_trait]
impl<T: Entity> Gateway<T> for MemGateway<T> {
    async fn list(&self) -> Result<Vec<T>> {
        self.take_failure()?;
        Ok(self.rows())
    }

    async fn get(&self, id: &T::Id) -> Result<T> {
        self.take_failure()?;
        self.lock_rows()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{}/{}", T::RESOURCE, id)))
    }

    async fn create(&self, data: &T::Data) -> Result<T> {
        self.take_failure()?;
        let mut rows = self.lock_rows();
        let id = self.next_id(&rows)?;
        let entity = materialize::<T>(None, data, &id)?;
        rows.insert(id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: &T::Id, data: &T::Data) -> Result<T> {
        self.take_failure()?;
        let mut rows = self.lock_rows();
        let current = rows
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("{}/{}", T::RESOURCE, id)))?;
        let entity = materialize(Some(current), data, id)?;
        rows.insert(id.clone(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &T::Id) -> Result<()> {
        self.take_failure()?;
        self.lock_rows()
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("{}/{}", T::RESOURCE, id)))
    }

    async fn delete_many(&self, ids: &[T::Id]) -> Result<()> {
        self.take_failure()?;
        self.lock_rows().retain(|id, _| !ids.contains(id));
        Ok(())
    }
}
