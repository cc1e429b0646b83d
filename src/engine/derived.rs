use std::sync::{Mutex, PoisonError};

/// A derived value cached against the collection version it was computed from.
///
/// [`EntityStore::derive`](crate::engine::EntityStore::derive) hands in the
/// current version; the closure only runs when that version differs from the
/// cached one.
#[derive(Debug)]
pub struct Memo<R> {
    cached: Mutex<Option<(u64, R)>>,
}

impl<R> Default for Memo<R> {
    fn default() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }
}

impl<R: Clone> Memo<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, version: u64, compute: impl FnOnce() -> R) -> R {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        match cached.as_ref() {
            Some((v, value)) if *v == version => value.clone(),
            _ => {
                let value = compute();
                *cached = Some((version, value.clone()));
                value
            }
        }
    }

    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
