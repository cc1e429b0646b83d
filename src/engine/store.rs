use log::{debug, error, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::engine::{
    DialogMode, DialogState, DuplicatePolicy, EntityCollection, ErrorInfo, Memo, RequestState,
    Selection,
};
use crate::notify::Notification;
use crate::{Entity, Error, Gateway, Notifier};

const EVENT_CAPACITY: usize = 64;

/// Emitted after a store operation changes observable state.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The collection changed; `version` is the new collection version.
    Collection { version: u64 },
    /// The request state changed.
    Request(RequestState),
    Dialog,
    Selection,
}

struct StoreState<T: Entity> {
    collection: EntityCollection<T>,
    request: RequestState,
    dialog: DialogState<T::Id>,
    selection: Selection<T::Id>,
}

/// Client-side mirror of one remote collection.
///
/// The collection only changes in response to confirmed gateway results; there
/// are no optimistic writes. Gateway failures never escape: they are recorded as
/// the request `error` and, for mutations, sent to the [`Notifier`].
///
/// All state sits behind one lock, and each completed operation is applied in a
/// single write, so readers never observe a half-applied result. Concurrent
/// operations are not serialized; see [`RequestState`] for how overlapping
/// requests resolve.
pub struct EntityStore<T: Entity> {
    gateway: Arc<dyn Gateway<T>>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<StoreState<T>>,
    events: broadcast::Sender<StoreEvent>,
    disposed: AtomicBool,
}

impl<T: Entity> EntityStore<T> {
    pub fn new(gateway: Arc<dyn Gateway<T>>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_policy(gateway, notifier, DuplicatePolicy::default())
    }

    pub fn with_policy(
        gateway: Arc<dyn Gateway<T>>,
        notifier: Arc<dyn Notifier>,
        policy: DuplicatePolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            notifier,
            state: RwLock::new(StoreState {
                collection: EntityCollection::new(policy),
                request: RequestState::default(),
                dialog: DialogState::default(),
                selection: Selection::default(),
            }),
            events,
            disposed: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` as one state update, prunes the selection if the collection
    /// changed, then publishes one event per changed part.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState<T>) -> R) -> R {
        let (out, events) = {
            let mut state = self.write();
            let version = state.collection.version();
            let request = state.request.clone();
            let dialog = state.dialog.clone();
            let selection = state.selection.clone();

            let out = f(&mut *state);

            if state.collection.version() != version {
                let current: HashSet<T::Id> = state.collection.ids().cloned().collect();
                state.selection.retain_existing(&current);
            }

            let mut events = Vec::new();
            if state.collection.version() != version {
                events.push(StoreEvent::Collection {
                    version: state.collection.version(),
                });
            }
            if state.request != request {
                events.push(StoreEvent::Request(state.request.clone()));
            }
            if state.dialog != dialog {
                events.push(StoreEvent::Dialog);
            }
            if state.selection != selection {
                events.push(StoreEvent::Selection);
            }
            (out, events)
        };

        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        out
    }

    fn is_disposed(&self, op: &str) -> bool {
        let disposed = self.disposed.load(Ordering::SeqCst);
        if disposed {
            warn!("{}: {} ignored, store is disposed", T::RESOURCE, op);
        }
        disposed
    }

    fn begin(&self, op: &str) -> bool {
        if self.is_disposed(op) {
            return false;
        }
        debug!("{}: {} started", T::RESOURCE, op);
        self.mutate(|s| s.request.start());
        true
    }

    fn fail(&self, op: &str, err: &Error, notify: bool) {
        error!("{}: {} failed: {}", T::RESOURCE, op, err);
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let info = ErrorInfo::from(err);
        let detail = info.to_string();
        self.mutate(|s| s.request.fail(info));
        if notify {
            self.notifier
                .notify(Notification::error(format!("{} failed", op), detail));
        }
    }

    /// Subscribes to change events. Lagging receivers lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Marks the store live and loads the collection.
    pub async fn init(&self) {
        self.disposed.store(false, Ordering::SeqCst);
        self.find_all().await;
    }

    /// Drops all state. Operations issued afterwards are ignored, and responses
    /// still in flight are discarded, until [`init`](Self::init) runs again.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.mutate(|s| {
            s.collection.clear();
            s.request = RequestState::default();
            s.dialog.close();
            s.selection.clear();
        });
    }

    /// Loads the whole collection. On failure the collection is left untouched.
    pub async fn find_all(&self) {
        if !self.begin("load") {
            return;
        }
        match self.gateway.list().await {
            Ok(items) => {
                if self.disposed.load(Ordering::SeqCst) {
                    return;
                }
                debug!("{}: loaded {} entities", T::RESOURCE, items.len());
                self.mutate(|s| {
                    s.collection.set_all(items);
                    s.request.succeed();
                });
            }
            Err(e) => self.fail("load", &e, false),
        }
    }

    /// Starts [`find_all`](Self::find_all) in the background.
    pub fn spawn_find_all(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move { store.find_all().await })
    }

    /// Fetches one entity and inserts or refreshes it in the collection.
    pub async fn find_one(&self, id: T::Id) {
        if !self.begin("load one") {
            return;
        }
        match self.gateway.get(&id).await {
            Ok(entity) => {
                if self.disposed.load(Ordering::SeqCst) {
                    return;
                }
                self.mutate(|s| {
                    s.collection.upsert(entity);
                    s.request.succeed();
                });
            }
            Err(e) => self.fail("load one", &e, false),
        }
    }

    /// Creates an entity and adds the server's copy (with its assigned id).
    pub async fn create(&self, data: T::Data) {
        if !self.begin("create") {
            return;
        }
        let entity = match self.gateway.create(&data).await {
            Ok(entity) => entity,
            Err(e) => return self.fail("create", &e, true),
        };
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let id = entity.id().clone();
        let added = self.mutate(|s| {
            let res = s.collection.add(entity);
            if res.is_ok() {
                s.request.succeed();
            }
            res
        });
        match added {
            Ok(()) => self.notifier.notify(Notification::success(
                "Created",
                format!("{} {} created", T::RESOURCE, id),
            )),
            Err(e) => self.fail("create", &e, true),
        }
    }

    /// Updates an entity and merges the server's response into the stored copy.
    ///
    /// Fields the response omits keep their stored values. If `id` is no longer
    /// in the collection, the response is dropped with a warning.
    pub async fn update(&self, id: T::Id, data: T::Data) {
        if !self.begin("update") {
            return;
        }
        let entity = match self.gateway.update(&id, &data).await {
            Ok(entity) => entity,
            Err(e) => return self.fail("update", &e, true),
        };
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let merged = self.mutate(|s| {
            let res = s.collection.update(&id, &entity);
            if res.is_ok() {
                s.request.succeed();
            }
            res
        });
        match merged {
            Ok(true) => self.notifier.notify(Notification::success(
                "Updated",
                format!("{} {} updated", T::RESOURCE, id),
            )),
            Ok(false) => {}
            Err(e) => self.fail("update", &e, true),
        }
    }

    pub async fn delete(&self, id: T::Id) {
        if !self.begin("delete") {
            return;
        }
        if let Err(e) = self.gateway.delete(&id).await {
            return self.fail("delete", &e, true);
        }
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        self.mutate(|s| {
            s.collection.remove(&id);
            s.request.succeed();
        });
        self.notifier.notify(Notification::success(
            "Deleted",
            format!("{} {} deleted", T::RESOURCE, id),
        ));
    }

    /// Deletes several entities with one bulk request and removes them in one update.
    pub async fn delete_all_by_id(&self, ids: Vec<T::Id>) {
        if ids.is_empty() {
            debug!("{}: bulk delete with no ids skipped", T::RESOURCE);
            return;
        }
        if !self.begin("bulk delete") {
            return;
        }
        if let Err(e) = self.gateway.delete_many(&ids).await {
            return self.fail("bulk delete", &e, true);
        }
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        self.mutate(|s| {
            s.collection.remove_many(&ids);
            s.request.succeed();
        });
        self.notifier.notify(Notification::success(
            "Deleted",
            format!("{} {} deleted", ids.len(), T::RESOURCE),
        ));
    }

    /// Bulk-deletes the current selection.
    pub async fn delete_selected(&self) {
        let ids = self.selected_ids();
        self.delete_all_by_id(ids).await;
    }

    pub fn open_dialog(&self, entity: Option<&T>, mode: Option<DialogMode>) {
        let id = entity.map(|e| e.id().clone());
        self.mutate(|s| s.dialog.open(id, mode));
    }

    pub fn close_dialog(&self) {
        self.mutate(|s| s.dialog.close());
    }

    /// Selects an id present in the collection. Unknown ids are ignored.
    pub fn select(&self, id: T::Id) -> bool {
        self.mutate(|s| s.collection.contains(&id) && s.selection.select(id))
    }

    pub fn deselect(&self, id: &T::Id) -> bool {
        self.mutate(|s| s.selection.deselect(id))
    }

    /// Flips the selection of an id present in the collection.
    pub fn toggle_selection(&self, id: T::Id) -> bool {
        self.mutate(|s| {
            if s.collection.contains(&id) {
                s.selection.toggle(id)
            } else {
                false
            }
        })
    }

    /// Replaces the selection, keeping only ids present in the collection.
    pub fn set_selection(&self, ids: impl IntoIterator<Item = T::Id>) {
        self.mutate(|s| {
            let known: Vec<T::Id> = ids
                .into_iter()
                .filter(|id| s.collection.contains(id))
                .collect();
            s.selection.set(known);
        });
    }

    pub fn select_all(&self) {
        self.mutate(|s| {
            let all: Vec<T::Id> = s.collection.ids().cloned().collect();
            s.selection.set(all);
        });
    }

    pub fn clear_selection(&self) {
        self.mutate(|s| s.selection.clear());
    }

    pub fn selected_ids(&self) -> Vec<T::Id> {
        self.read().selection.ids().to_vec()
    }

    /// Selected entities in selection order.
    pub fn selected_items(&self) -> Vec<T> {
        let state = self.read();
        state
            .selection
            .ids()
            .iter()
            .filter_map(|id| state.collection.get(id).cloned())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.read().collection.len()
    }

    pub fn version(&self) -> u64 {
        self.read().collection.version()
    }

    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.read().collection.get(id).cloned()
    }

    pub fn items(&self) -> Vec<T> {
        self.read().collection.to_vec()
    }

    pub fn ids(&self) -> Vec<T::Id> {
        self.read().collection.ids().cloned().collect()
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.read().collection.filter(pred)
    }

    pub fn sorted_by(&self, cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) -> Vec<T> {
        self.read().collection.sorted_by(cmp)
    }

    pub fn request_state(&self) -> RequestState {
        self.read().request.clone()
    }

    pub fn loading(&self) -> bool {
        self.read().request.loading
    }

    pub fn error(&self) -> Option<ErrorInfo> {
        self.read().request.error.clone()
    }

    pub fn dialog(&self) -> DialogState<T::Id> {
        self.read().dialog.clone()
    }

    /// Reads the collection without copying it.
    pub fn with_collection<R>(&self, f: impl FnOnce(&EntityCollection<T>) -> R) -> R {
        f(&self.read().collection)
    }

    /// Computes a derived value, reusing `memo` while the collection is unchanged.
    /// A memo must only ever be used with one store.
    pub fn derive<R: Clone>(&self, memo: &Memo<R>, f: impl FnOnce(&EntityCollection<T>) -> R) -> R {
        let state = self.read();
        memo.get_or_compute(state.collection.version(), || f(&state.collection))
    }
}
