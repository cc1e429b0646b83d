//! Gateways that connect an [`EntityStore`](crate::EntityStore) to its data.
//!
//! [`HttpGateway`] talks to the REST API, [`MemGateway`] keeps everything in
//! process. [`connect`] wires a store to the HTTP gateway from a config.

pub mod config;
pub mod http;
pub mod memory;

pub use config::{ConfigOverrides, GatewayConfig};
pub use http::HttpGateway;
pub use memory::MemGateway;

use std::sync::Arc;

use crate::{Entity, EntityStore, Notifier, Result};

/// Builds a store for `T` backed by the HTTP gateway. The store is not loaded yet;
/// call [`EntityStore::init`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use mercato_store::domain::PurchaseOrder;
/// use mercato_store::sdk::{self, GatewayConfig};
/// use mercato_store::LogNotifier;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = GatewayConfig::from_env()?;
///     let orders = sdk::connect::<PurchaseOrder>(&config, Arc::new(LogNotifier))?;
///     orders.init().await;
///     println!("{} purchase orders", orders.count());
///     Ok(())
/// }
/// ```
pub fn connect<T: Entity>(
    config: &GatewayConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<Arc<EntityStore<T>>> {
    let gateway = Arc::new(HttpGateway::<T>::new(config)?);
    Ok(Arc::new(EntityStore::<T>::new(gateway, notifier)))
}
