use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

use super::{Identity, Record, RecordId, RecordKind, Variant};

/// Work billed by the hour.
///
/// `total` is derived from the rate and hours on every call and is never
/// persisted. Hours are not validated and may be zero or negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    id: RecordId,
    #[serde(default)]
    name: String,
    hourly_rate: f64,
    hours: i32,
}

impl Service {
    /// Create a service with a fresh id. The hourly rate must be finite.
    pub fn new(name: impl Into<String>, hourly_rate: f64, hours: i32) -> StoreResult<Self> {
        let service = Self {
            id: RecordId::new(),
            name: name.into(),
            hourly_rate,
            hours,
        };
        service.validate()?;
        Ok(service)
    }

    /// Rate charged per hour.
    pub fn hourly_rate(&self) -> f64 {
        self.hourly_rate
    }

    /// Billed hours.
    pub fn hours(&self) -> i32 {
        self.hours
    }

    /// `hourly_rate * hours`.
    pub fn total(&self) -> f64 {
        self.hourly_rate * f64::from(self.hours)
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        if !self.hourly_rate.is_finite() {
            return Err(StoreError::InvalidRecord(format!(
                "service '{}' has invalid hourly rate {}",
                self.name, self.hourly_rate
            )));
        }
        Ok(())
    }
}

impl Identity for Service {
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

impl Variant for Service {
    const KIND: RecordKind = RecordKind::Service;

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Service(service) => Some(service),
            _ => None,
        }
    }

    fn from_record_mut(record: &mut Record) -> Option<&mut Self> {
        match record {
            Record::Service(service) => Some(service),
            _ => None,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({}) rate={} hours={} total={}",
            Self::KIND,
            self.name,
            self.id,
            self.hourly_rate,
            self.hours,
            self.total()
        )
    }
}
