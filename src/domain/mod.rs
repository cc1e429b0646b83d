//! Entity types for the business domains, with their derived views.

pub mod product;
pub mod purchase_order;

pub use product::{Product, ProductData, ProductViews};
pub use purchase_order::{
    LineItem, OrderStatus, PurchaseOrder, PurchaseOrderData, PurchaseOrderViews,
};
