use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

use super::{Identity, Record, RecordId, RecordKind, Variant};

/// A priced item.
///
/// Products order by price ascending, then by name using plain byte
/// comparison. See [`Product::cmp_price_then_name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Product {
    id: RecordId,
    #[serde(default)]
    name: String,
    price: f64,
}

impl Product {
    /// Create a product with a fresh id. The price must be finite and non-negative.
    pub fn new(name: impl Into<String>, price: f64) -> StoreResult<Self> {
        let product = Self {
            id: RecordId::new(),
            name: name.into(),
            price: normalize_zero(price),
        };
        product.validate()?;
        Ok(product)
    }

    /// Unit price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Total order over products: price first, then name.
    pub fn cmp_price_then_name(&self, other: &Self) -> Ordering {
        self.price
            .total_cmp(&other.price)
            .then_with(|| self.name.as_bytes().cmp(other.name.as_bytes()))
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(StoreError::InvalidRecord(format!(
                "product '{}' has invalid price {}",
                self.name, self.price
            )));
        }
        Ok(())
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.price = normalize_zero(self.price);
        self
    }
}

// -0.0 and 0.0 must rank equal under total_cmp.
fn normalize_zero(price: f64) -> f64 {
    if price == 0.0 {
        0.0
    } else {
        price
    }
}

/// Compare two optional products. A present product ranks above an absent one.
pub fn compare_products(a: Option<&Product>, b: Option<&Product>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp_price_then_name(b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

impl Identity for Product {
    fn id(&self) -> RecordId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Variant for Product {
    const KIND: RecordKind = RecordKind::Product;

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Product(product) => Some(product),
            _ => None,
        }
    }

    fn from_record_mut(record: &mut Record) -> Option<&mut Self> {
        match record {
            Record::Product(product) => Some(product),
            _ => None,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({}) price={}",
            Self::KIND,
            self.name,
            self.id,
            self.price
        )
    }
}
