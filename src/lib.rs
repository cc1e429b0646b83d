//! Mercato Store keeps client-side mirrors of server-side business collections.
//!
//! Each domain (products, purchase orders, suppliers, payments, ...) gets one
//! [`engine::EntityStore`] that holds a normalized, insertion-ordered collection,
//! tracks the state of its last request, keeps the UI selection and dialog state
//! consistent with the data, and reconciles the results of remote calls made
//! through a [`Gateway`].
//!
//! ## Core Components
//! - [`engine`]: collection, request state, selection, dialog state and the store itself.
//! - [`sdk`]: gateway implementations (HTTP and in-memory) and configuration.
//! - [`domain`]: worked entity types with their derived views.
//! - [`registry`]: one shared store per entity type.

pub mod domain;
pub mod engine;
pub mod notify;
pub mod registry;
pub mod sdk;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use thiserror::Error;

pub use engine::{EntityStore, ErrorInfo, ErrorKind, StoreEvent};
pub use notify::{LogNotifier, MemoryNotifier, Notification, NotificationLevel};
pub use registry::StoreRegistry;

/// Errors returned by gateways and collection operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The transport failed before a response was received.
    #[error("network error: {0}")]
    Network(String),
    /// The server answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// The server rejected the payload, optionally with per-field detail.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        fields: HashMap<String, Vec<String>>,
    },
    /// An entity with this id is already present and the policy rejects duplicates.
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    /// A merge would have changed the id of a stored entity.
    #[error("id mismatch: expected {expected}, found {found}")]
    IdMismatch { expected: String, found: String },
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A specialized Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A uniquely identified domain record.
///
/// `RESOURCE` is the path segment the gateway uses for this collection
/// (`GET /{RESOURCE}`, `PUT /{RESOURCE}/{id}`, ...).
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identifier type, unique within a collection.
    type Id: Clone
        + Eq
        + Hash
        + Debug
        + Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;
    /// The entity shape without server-assigned fields.
    type Data: Serialize + Send + Sync + 'static;

    const RESOURCE: &'static str;

    fn id(&self) -> &Self::Id;
}

/// The remote API a store persists to and loads from.
#[async_trait]
pub trait Gateway<T: Entity>: Send + Sync {
    /// `GET /{resource}`
    async fn list(&self) -> Result<Vec<T>>;
    /// `GET /{resource}/{id}`
    async fn get(&self, id: &T::Id) -> Result<T>;
    /// `POST /{resource}`. The server assigns the id.
    async fn create(&self, data: &T::Data) -> Result<T>;
    /// `PUT /{resource}/{id}`
    async fn update(&self, id: &T::Id, data: &T::Data) -> Result<T>;
    /// `DELETE /{resource}/{id}`
    async fn delete(&self, id: &T::Id) -> Result<()>;
    /// `DELETE /{resource}/delete-many` with the ids as the JSON body.
    async fn delete_many(&self, ids: &[T::Id]) -> Result<()>;
}

/// Receives user-facing messages (toasts) emitted by stores.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
