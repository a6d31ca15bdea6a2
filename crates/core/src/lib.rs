#![warn(clippy::all, missing_docs)]

//! Core library for the item store.
//!
//! This crate hosts the record model, the ordering policy for products,
//! the audited in-memory store, its JSON document codec and the
//! configuration used by embedding applications.

pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::AppConfig;
pub use error::{StoreError, StoreResult};
pub use models::{
    compare_products, Identity, Product, Record, RecordId, RecordKind, Service, Variant,
};
pub use store::{AuditEvent, AuditLog, ItemStore};
