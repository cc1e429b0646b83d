use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::Memo;
use crate::{Entity, EntityStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    Pending,
    Shipped,
    Received,
    Cancelled,
}

impl OrderStatus {
    /// Orders that still expect goods to arrive.
    pub fn is_open(self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Pending | OrderStatus::Shipped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: u64,
    pub quantity: u32,
    pub unit_price: f64,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

/// Fields left as `None` are omitted on the wire, so a response that leaves
/// them out does not clear what the store already holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<u64>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PurchaseOrder {
    pub fn line_items(&self) -> &[LineItem] {
        self.items.as_deref().unwrap_or_default()
    }

    pub fn amount(&self) -> f64 {
        self.line_items().iter().map(LineItem::subtotal).sum()
    }
}

/// Body of create and update requests; the server assigns `id` and `orderNumber`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderData {
    pub supplier_id: u64,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entity for PurchaseOrder {
    type Id = u64;
    type Data = PurchaseOrderData;

    const RESOURCE: &'static str = "purchase-orders";

    fn id(&self) -> &u64 {
        &self.id
    }
}

/// Aggregates over a purchase-order store, recomputed only when the collection changes.
pub struct PurchaseOrderViews {
    store: Arc<EntityStore<PurchaseOrder>>,
    total: Memo<f64>,
    by_status: Memo<BTreeMap<OrderStatus, usize>>,
}

impl PurchaseOrderViews {
    pub fn new(store: Arc<EntityStore<PurchaseOrder>>) -> Self {
        Self {
            store,
            total: Memo::new(),
            by_status: Memo::new(),
        }
    }

    pub fn store(&self) -> &Arc<EntityStore<PurchaseOrder>> {
        &self.store
    }

    /// Sum of line items over all orders that are not cancelled.
    pub fn total_amount(&self) -> f64 {
        self.store.derive(&self.total, |orders| {
            orders
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled)
                .map(PurchaseOrder::amount)
                .sum()
        })
    }

    pub fn count_by_status(&self) -> BTreeMap<OrderStatus, usize> {
        self.store.derive(&self.by_status, |orders| {
            let mut counts = BTreeMap::new();
            for order in orders.iter() {
                *counts.entry(order.status).or_insert(0) += 1;
            }
            counts
        })
    }

    pub fn count_with_status(&self, status: OrderStatus) -> usize {
        self.count_by_status().get(&status).copied().unwrap_or(0)
    }

    pub fn open_orders(&self) -> Vec<PurchaseOrder> {
        self.store.filter(|o| o.status.is_open())
    }
}
