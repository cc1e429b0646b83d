pub mod collection;
pub mod derived;
pub mod dialog;
pub mod request;
pub mod selection;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use collection::{DuplicatePolicy, EntityCollection};
pub use derived::Memo;
pub use dialog::{DialogMode, DialogState};
pub use request::{ErrorInfo, ErrorKind, RequestState, RequestStatus};
pub use selection::{prune, Selection};
pub use store::{EntityStore, StoreEvent};
