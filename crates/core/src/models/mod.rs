//! Record model shared by the store and its codec.
//!
//! Records form a closed set of variants ([`Product`] and [`Service`]) wrapped
//! in the [`Record`] sum type. Every variant carries an immutable [`RecordId`]
//! assigned at construction and a mutable display name.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod product;
mod service;

pub use product::{compare_products, Product};
pub use service::Service;

/// Process-unique identifier assigned to a record when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Tag naming one case of the closed [`Record`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A priced product.
    Product,
    /// A billable service.
    Service,
}

impl RecordKind {
    /// Every known variant, in declaration order.
    pub const ALL: [RecordKind; 2] = [RecordKind::Product, RecordKind::Service];

    /// Tag used for rendering and in persisted documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Product => "Product",
            RecordKind::Service => "Service",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Identity fields common to every record variant.
pub trait Identity {
    /// Identifier fixed at construction.
    fn id(&self) -> RecordId;

    /// Current display name.
    fn name(&self) -> &str;

    /// Replace the display name.
    fn set_name(&mut self, name: String);
}

/// Typed access to one case of [`Record`], used for variant filtering.
pub trait Variant: Identity + Into<Record> {
    /// Tag of the variant.
    const KIND: RecordKind;

    /// Borrow the variant out of a record, if the record is of this kind.
    fn from_record(record: &Record) -> Option<&Self>;

    /// Mutable counterpart of [`Variant::from_record`].
    fn from_record_mut(record: &mut Record) -> Option<&mut Self>;
}

/// One stored item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Record {
    /// See [`Product`].
    Product(Product),
    /// See [`Service`].
    Service(Service),
}

impl Record {
    /// Variant tag of this record.
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Product(_) => RecordKind::Product,
            Record::Service(_) => RecordKind::Service,
        }
    }

    /// Returns the product if this record is one.
    pub fn as_product(&self) -> Option<&Product> {
        Product::from_record(self)
    }

    /// Returns the service if this record is one.
    pub fn as_service(&self) -> Option<&Service> {
        Service::from_record(self)
    }

    fn identity(&self) -> &dyn Identity {
        match self {
            Record::Product(product) => product as &dyn Identity,
            Record::Service(service) => service,
        }
    }
}

impl Identity for Record {
    fn id(&self) -> RecordId {
        self.identity().id()
    }

    fn name(&self) -> &str {
        self.identity().name()
    }

    fn set_name(&mut self, name: String) {
        match self {
            Record::Product(product) => product.set_name(name),
            Record::Service(service) => service.set_name(name),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Product(product) => fmt::Display::fmt(product, f),
            Record::Service(service) => fmt::Display::fmt(service, f),
        }
    }
}

impl From<Product> for Record {
    fn from(value: Product) -> Self {
        Record::Product(value)
    }
}

impl From<Service> for Record {
    fn from(value: Service) -> Self {
        Record::Service(value)
    }
}
