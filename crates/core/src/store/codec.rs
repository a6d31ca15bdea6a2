//! JSON document codec for the record collection.
//!
//! A document is a single object:
//!
//! ```json
//! {
//!   "format": "itemstore",
//!   "version": 1,
//!   "records": [
//!     { "type": "Product", "id": "…", "name": "Laptop", "price": 1500.0 },
//!     { "type": "Service", "id": "…", "name": "Hosting", "hourly_rate": 10.0, "hours": 12 }
//!   ]
//! }
//! ```
//!
//! Elements keep collection order and are written as `type`, `id`, `name`
//! followed by the variant's own fields. Derived values such as
//! [`Service::total`] are never written. Decoding is all-or-nothing: either
//! every element decodes or an error is returned.

use std::{fs, io::Write, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::{
    error::{StoreError, StoreResult},
    models::{Product, Record, RecordKind, Service},
};

/// Value of the document's `format` field.
pub const DOCUMENT_FORMAT: &str = "itemstore";
/// Current document version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Serialize)]
struct DocumentRef<'a> {
    format: &'a str,
    version: u32,
    records: &'a [Record],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    format: String,
    version: u32,
    records: Vec<Value>,
}

/// Serialize `records` into a document.
pub fn encode(records: &[Record], pretty: bool) -> StoreResult<Vec<u8>> {
    let document = DocumentRef {
        format: DOCUMENT_FORMAT,
        version: DOCUMENT_VERSION,
        records,
    };
    let mut bytes = if pretty {
        serde_json::to_vec_pretty(&document)?
    } else {
        serde_json::to_vec(&document)?
    };
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a document back into records, preserving element order.
pub fn decode(bytes: &[u8]) -> StoreResult<Vec<Record>> {
    let document: RawDocument = serde_json::from_slice(bytes).map_err(|err| {
        StoreError::malformed(
            format!("line {}, column {}", err.line(), err.column()),
            err,
        )
    })?;

    if document.format != DOCUMENT_FORMAT {
        return Err(StoreError::malformed(
            "format",
            format!("expected '{DOCUMENT_FORMAT}', found '{}'", document.format),
        ));
    }
    if document.version != DOCUMENT_VERSION {
        return Err(StoreError::malformed(
            "version",
            format!(
                "unsupported version {}, expected {DOCUMENT_VERSION}",
                document.version
            ),
        ));
    }

    document
        .records
        .into_iter()
        .enumerate()
        .map(|(index, value)| decode_record(index, value))
        .collect()
}

fn decode_record(index: usize, value: Value) -> StoreResult<Record> {
    let position = format!("records[{index}]");
    let Value::Object(mut fields) = value else {
        return Err(StoreError::malformed(position, "expected an object"));
    };

    let tag = match fields.remove("type") {
        Some(Value::String(tag)) => tag,
        Some(other) => {
            return Err(StoreError::malformed(
                position,
                format!("'type' must be a string, found {other}"),
            ))
        }
        None => return Err(StoreError::malformed(position, "missing 'type' tag")),
    };
    let kind = tag
        .parse::<RecordKind>()
        .map_err(|tag| StoreError::UnsupportedVariant {
            position: position.clone(),
            tag,
        })?;

    let fields = Value::Object(fields);
    let record = match kind {
        RecordKind::Product => {
            let product = serde_json::from_value::<Product>(fields)
                .map_err(|err| StoreError::malformed(position.clone(), err))?
                .normalized();
            product
                .validate()
                .map_err(|err| StoreError::malformed(position.clone(), err))?;
            Record::Product(product)
        }
        RecordKind::Service => {
            let service = serde_json::from_value::<Service>(fields)
                .map_err(|err| StoreError::malformed(position.clone(), err))?;
            service
                .validate()
                .map_err(|err| StoreError::malformed(position.clone(), err))?;
            Record::Service(service)
        }
    };
    Ok(record)
}

/// Encode `records` and replace the file at `path` with the result.
///
/// The document is written to a temporary file in the same directory and
/// then renamed over `path`.
pub fn write_file(path: &Path, records: &[Record], pretty: bool) -> StoreResult<()> {
    let bytes = encode(records, pretty)?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| StoreError::io(parent, source))?;

    let mut temp =
        NamedTempFile::new_in(parent).map_err(|source| StoreError::io(parent, source))?;
    temp.write_all(&bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|source| StoreError::io(temp.path(), source))?;
    temp.persist(path)
        .map_err(|err| StoreError::io(path, err.error))?;
    Ok(())
}

/// Read and decode the document at `path`.
pub fn read_file(path: &Path) -> StoreResult<Vec<Record>> {
    if !path.exists() {
        return Err(StoreError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| StoreError::io(path, source))?;
    decode(&bytes)
}
