//! Explicit registry holding one shared store per entity type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Entity, EntityStore};

trait Lifecycle: Send + Sync {
    fn resource(&self) -> &'static str;
    fn dispose(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Entity> Lifecycle for EntityStore<T> {
    fn resource(&self) -> &'static str {
        T::RESOURCE
    }

    fn dispose(&self) {
        EntityStore::dispose(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Stores are registered once at startup and looked up by entity type, so
/// every consumer of `EntityStore<T>` shares the same instance.
#[derive(Default)]
pub struct StoreRegistry {
    stores: RwLock<HashMap<TypeId, Arc<dyn Lifecycle>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the store for `T`, replacing any previous one.
    pub fn register<T: Entity>(&self, store: Arc<EntityStore<T>>) {
        let previous = self
            .stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), store);
        if previous.is_some() {
            log::warn!("{}: store replaced in registry", T::RESOURCE);
        }
    }

    pub fn get<T: Entity>(&self) -> Option<Arc<EntityStore<T>>> {
        let store = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()?;
        store.into_any().downcast::<EntityStore<T>>().ok()
    }

    /// Resource names of all registered stores, sorted.
    pub fn resources(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|s| s.resource())
            .collect();
        names.sort_unstable();
        names
    }

    /// Disposes every store and empties the registry.
    pub fn dispose_all(&self) {
        let stores: Vec<_> = self
            .stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, s)| s)
            .collect();
        for store in stores {
            log::debug!("{}: disposing store", store.resource());
            store.dispose();
        }
    }
}
