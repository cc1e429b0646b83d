use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::Memo;
use crate::{Entity, EntityStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
    pub purchase_price: f64,
    pub sale_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder_level: Option<u32>,
}

impl Product {
    /// Products without a reorder level never need reordering; unknown stock counts as empty.
    pub fn needs_reorder(&self) -> bool {
        self.reorder_level
            .is_some_and(|level| self.stock.unwrap_or(0) <= level)
    }

    pub fn margin(&self) -> f64 {
        self.sale_price - self.purchase_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub stock: u32,
    pub reorder_level: u32,
}

impl Entity for Product {
    type Id = u64;
    type Data = ProductData;

    const RESOURCE: &'static str = "products";

    fn id(&self) -> &u64 {
        &self.id
    }
}

pub struct ProductViews {
    store: Arc<EntityStore<Product>>,
    value: Memo<f64>,
    low_stock: Memo<Vec<u64>>,
}

impl ProductViews {
    pub fn new(store: Arc<EntityStore<Product>>) -> Self {
        Self {
            store,
            value: Memo::new(),
            low_stock: Memo::new(),
        }
    }

    pub fn store(&self) -> &Arc<EntityStore<Product>> {
        &self.store
    }

    /// Stock valued at purchase price.
    pub fn inventory_value(&self) -> f64 {
        self.store.derive(&self.value, |products| {
            products
                .iter()
                .map(|p| f64::from(p.stock.unwrap_or(0)) * p.purchase_price)
                .sum()
        })
    }

    /// Ids of products at or below their reorder level, in collection order.
    pub fn low_stock(&self) -> Vec<u64> {
        self.store.derive(&self.low_stock, |products| {
            products
                .iter()
                .filter(|p| p.needs_reorder())
                .map(|p| p.id)
                .collect()
        })
    }

    pub fn in_category(&self, category_id: u64) -> Vec<Product> {
        self.store.filter(|p| p.category_id == Some(category_id))
    }
}
