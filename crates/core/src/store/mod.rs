//! The item store: an ordered, audited, persistable record collection.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    error::{StoreError, StoreResult},
    models::{Identity, Product, Record, RecordId, RecordKind, Variant},
};

pub mod audit;
pub mod codec;

pub use audit::{AuditEvent, AuditLog};

/// Owns an ordered collection of [`Record`]s plus an optional audit sink.
///
/// Records keep insertion order, which is also the order written by
/// [`ItemStore::save`]. Once [`ItemStore::dispose`] has run, every other
/// operation returns [`StoreError::Disposed`]. Dropping the store disposes
/// it, so the audit sink is flushed and closed on every exit path.
///
/// Iteration borrows the store, so the collection cannot change while an
/// iterator from [`ItemStore::iter`] or [`ItemStore::records_of_type`] is
/// alive. Each call observes the collection as it is at that moment.
#[derive(Debug)]
pub struct ItemStore {
    records: Vec<Record>,
    audit: Option<AuditLog>,
    pretty: bool,
    disposed: bool,
}

impl ItemStore {
    /// Create an empty store, opening `audit_log` for appending when given.
    pub fn new(audit_log: Option<&Path>) -> StoreResult<Self> {
        let audit = audit_log.map(AuditLog::open).transpose()?;
        // Disposed until the created line is written; `Drop` skips a failed sink.
        let mut store = Self {
            records: Vec::new(),
            audit,
            pretty: true,
            disposed: true,
        };
        store.audit(AuditEvent::Created, "store created")?;
        store.disposed = false;
        debug!(audit = ?store.audit_path(), "item store created");
        Ok(store)
    }

    /// Create an empty store using the audit destination and output style
    /// from `config`.
    pub fn from_config(config: &AppConfig) -> StoreResult<Self> {
        let mut store = Self::new(config.audit_log.as_deref())?;
        store.pretty = config.pretty;
        Ok(store)
    }

    /// Destination of the audit sink, if one is open.
    pub fn audit_path(&self) -> Option<&Path> {
        self.audit.as_ref().map(AuditLog::path)
    }

    /// Whether [`ItemStore::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of records held.
    pub fn len(&self) -> StoreResult<usize> {
        self.ensure_live()?;
        Ok(self.records.len())
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// Append a record to the end of the collection.
    pub fn add(&mut self, record: impl Into<Record>) -> StoreResult<()> {
        self.ensure_live()?;
        let record = record.into();
        self.audit(AuditEvent::Added, format!("added: {record}"))?;
        debug!(id = %record.id(), kind = %record.kind(), "record added");
        self.records.push(record);
        Ok(())
    }

    /// Remove the first record whose id matches. Returns `false` if none does.
    ///
    /// Ids are not checked for uniqueness on insertion; when duplicates exist
    /// only the earliest inserted one is removed.
    pub fn remove(&mut self, id: RecordId) -> StoreResult<bool> {
        self.ensure_live()?;
        let Some(index) = self.records.iter().position(|record| record.id() == id) else {
            return Ok(false);
        };
        self.audit(
            AuditEvent::Removed,
            format!("removed: {}", self.records[index]),
        )?;
        let record = self.records.remove(index);
        debug!(id = %record.id(), "record removed");
        Ok(true)
    }

    /// First record with the given id.
    pub fn get(&self, id: RecordId) -> StoreResult<Option<&Record>> {
        self.ensure_live()?;
        Ok(self.records.iter().find(|record| record.id() == id))
    }

    /// Mutable access to the first record with the given id.
    pub fn get_mut(&mut self, id: RecordId) -> StoreResult<Option<&mut Record>> {
        self.ensure_live()?;
        Ok(self.records.iter_mut().find(|record| record.id() == id))
    }

    /// Iterate every record in insertion order.
    pub fn iter(&self) -> StoreResult<std::slice::Iter<'_, Record>> {
        self.ensure_live()?;
        Ok(self.records.iter())
    }

    /// Iterate only the records of variant `V`, in collection order.
    pub fn records_of_type<'a, V: Variant + 'a>(
        &'a self,
    ) -> StoreResult<impl Iterator<Item = &'a V> + 'a> {
        self.ensure_live()?;
        Ok(self.records.iter().filter_map(V::from_record))
    }

    /// Iterate only the records tagged `kind`, in collection order.
    pub fn records_of_kind(
        &self,
        kind: RecordKind,
    ) -> StoreResult<impl Iterator<Item = &Record> + '_> {
        self.ensure_live()?;
        Ok(self
            .records
            .iter()
            .filter(move |record| record.kind() == kind))
    }

    /// Products ordered by price, then name. Equal products keep collection order.
    pub fn products_sorted(&self) -> StoreResult<Vec<&Product>> {
        let mut products: Vec<&Product> = self.records_of_type::<Product>()?.collect();
        products.sort_by(|a, b| a.cmp_price_then_name(b));
        Ok(products)
    }

    /// Write the whole collection to `path`, replacing any existing file.
    pub fn save(&mut self, path: impl AsRef<Path>) -> StoreResult<()> {
        self.ensure_live()?;
        let path = path.as_ref();
        codec::write_file(path, &self.records, self.pretty)?;
        let count = self.records.len();
        self.audit(
            AuditEvent::Saved,
            format!("saved {count} records to {}", path.display()),
        )?;
        info!(path = %path.display(), count, "item store saved");
        Ok(())
    }

    /// Replace the collection with the records stored at `path`.
    ///
    /// Nothing changes unless the whole document decodes.
    pub fn load(&mut self, path: impl AsRef<Path>) -> StoreResult<()> {
        self.ensure_live()?;
        let path = path.as_ref();
        let records = codec::read_file(path).inspect_err(|err| {
            warn!(path = %path.display(), "failed to load item store: {err}");
        })?;
        let count = records.len();
        self.audit(
            AuditEvent::Loaded,
            format!("loaded {count} records from {}", path.display()),
        )?;
        self.records = records;
        info!(path = %path.display(), count, "item store loaded");
        Ok(())
    }

    /// Close the audit sink and mark the store unusable.
    ///
    /// Calling this more than once is a no-op.
    pub fn dispose(&mut self) -> StoreResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        if let Some(mut audit) = self.audit.take() {
            audit.record(AuditEvent::Disposed, "store disposed")?;
            audit.close()?;
        }
        debug!("item store disposed");
        Ok(())
    }

    fn ensure_live(&self) -> StoreResult<()> {
        if self.disposed {
            Err(StoreError::Disposed)
        } else {
            Ok(())
        }
    }

    fn audit(&mut self, event: AuditEvent, detail: impl std::fmt::Display) -> StoreResult<()> {
        match self.audit.as_mut() {
            Some(audit) => audit.record(event, detail),
            None => Ok(()),
        }
    }
}

impl Drop for ItemStore {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!("failed to dispose item store: {err}");
        }
    }
}

/// Default location for a store document inside `dir`.
pub fn default_data_path(dir: impl AsRef<Path>) -> PathBuf {
    dir.as_ref().join("items.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Service;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    fn seeded(store: &mut ItemStore) -> Result<Vec<RecordId>> {
        let laptop = Product::new("Laptop", 1500.0)?;
        let hosting = Service::new("Hosting", 10.0, 12)?;
        let mouse = Product::new("Mouse", 25.99)?;
        let ids = vec![laptop.id(), hosting.id(), mouse.id()];
        store.add(laptop)?;
        store.add(hosting)?;
        store.add(mouse)?;
        Ok(ids)
    }

    #[test]
    fn worked_example() -> Result<()> {
        let dir = tempdir()?;
        let data = default_data_path(dir.path());

        let mut store = ItemStore::new(None)?;
        let ids = seeded(&mut store)?;

        let seen: Vec<_> = store.iter()?.map(Identity::id).collect();
        assert_eq!(seen, ids);

        let sorted: Vec<_> = store
            .products_sorted()?
            .into_iter()
            .map(|p| (p.name().to_string(), p.price()))
            .collect();
        assert_eq!(
            sorted,
            vec![("Mouse".to_string(), 25.99), ("Laptop".to_string(), 1500.0)]
        );

        store.save(&data)?;
        let mut reloaded = ItemStore::new(None)?;
        reloaded.load(&data)?;
        let original: Vec<_> = store.iter()?.cloned().collect();
        let restored: Vec<_> = reloaded.iter()?.cloned().collect();
        assert_eq!(restored, original);

        let service = reloaded
            .records_of_type::<Service>()?
            .next()
            .expect("service survives reload");
        assert_eq!(service.total(), 120.0);
        Ok(())
    }

    #[test]
    fn count_tracks_adds_and_successful_removes() -> Result<()> {
        let mut store = ItemStore::new(None)?;
        assert!(store.is_empty()?);
        let ids = seeded(&mut store)?;
        assert_eq!(store.len()?, 3);

        assert!(store.remove(ids[1])?);
        assert!(!store.remove(ids[1])?);
        assert!(!store.remove(RecordId::new())?);
        assert_eq!(store.len()?, 2);

        let remaining: Vec<_> = store.iter()?.map(Identity::id).collect();
        assert_eq!(remaining, vec![ids[0], ids[2]]);
        Ok(())
    }

    #[test]
    fn remove_takes_first_match_for_duplicate_ids() -> Result<()> {
        let mut store = ItemStore::new(None)?;
        let first = Product::new("First", 1.0)?;
        let mut second = first.clone();
        second.set_name("Second".to_string());
        store.add(first.clone())?;
        store.add(second)?;

        assert!(store.remove(first.id())?);
        let names: Vec<_> = store.iter()?.map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["Second".to_string()]);
        Ok(())
    }

    #[test]
    fn filters_by_variant_in_collection_order() -> Result<()> {
        let mut store = ItemStore::new(None)?;
        seeded(&mut store)?;

        let products: Vec<_> = store
            .records_of_type::<Product>()?
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(products, vec!["Laptop".to_string(), "Mouse".to_string()]);
        assert_eq!(store.records_of_type::<Service>()?.count(), 1);
        assert_eq!(store.records_of_kind(RecordKind::Service)?.count(), 1);

        // A fresh call reflects later mutations.
        store.add(Product::new("Keyboard", 49.0)?)?;
        assert_eq!(store.records_of_type::<Product>()?.count(), 3);
        assert_eq!(store.len()?, 4);
        Ok(())
    }

    #[test]
    fn renames_through_get_mut() -> Result<()> {
        let mut store = ItemStore::new(None)?;
        let ids = seeded(&mut store)?;

        if let Some(record) = store.get_mut(ids[0])? {
            record.set_name("Notebook".to_string());
        }
        assert_eq!(store.get(ids[0])?.map(Identity::name), Some("Notebook"));
        assert!(store.get(RecordId::new())?.is_none());
        Ok(())
    }

    #[test]
    fn operations_fail_after_dispose() -> Result<()> {
        let dir = tempdir()?;
        let data = dir.path().join("items.json");
        let mut store = ItemStore::new(None)?;
        let ids = seeded(&mut store)?;
        store.save(&data)?;

        store.dispose()?;
        store.dispose()?;
        assert!(store.is_disposed());

        assert!(matches!(store.len(), Err(StoreError::Disposed)));
        assert!(matches!(
            store.add(Product::new("Late", 1.0)?),
            Err(StoreError::Disposed)
        ));
        assert!(matches!(store.remove(ids[0]), Err(StoreError::Disposed)));
        assert!(matches!(store.get(ids[0]), Err(StoreError::Disposed)));
        assert!(store.iter().is_err());
        assert!(store.records_of_type::<Product>().is_err());
        assert!(store.products_sorted().is_err());
        assert!(matches!(store.save(&data), Err(StoreError::Disposed)));
        assert!(matches!(store.load(&data), Err(StoreError::Disposed)));
        Ok(())
    }

    #[test]
    fn missing_file_leaves_collection_untouched() -> Result<()> {
        let dir = tempdir()?;
        let mut store = ItemStore::new(None)?;
        let ids = seeded(&mut store)?;

        let err = store.load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        let seen: Vec<_> = store.iter()?.map(Identity::id).collect();
        assert_eq!(seen, ids);
        Ok(())
    }

    #[test]
    fn rejected_documents_leave_collection_untouched() -> Result<()> {
        let dir = tempdir()?;
        let mut store = ItemStore::new(None)?;
        let ids = seeded(&mut store)?;

        let unsupported = dir.path().join("unsupported.json");
        fs::write(
            &unsupported,
            r#"{"format":"itemstore","version":1,"records":[
                {"type":"Product","id":"6f1c1d1e-3f55-4c3f-9d7a-8f1a2b3c4d5e","name":"Pen","price":1.0},
                {"type":"Subscription","id":"7f1c1d1e-3f55-4c3f-9d7a-8f1a2b3c4d5e","name":"Feed"}
            ]}"#,
        )?;
        assert!(matches!(
            store.load(&unsupported),
            Err(StoreError::UnsupportedVariant { .. })
        ));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "<items><Product/></items>")?;
        assert!(matches!(
            store.load(&garbage),
            Err(StoreError::Malformed { .. })
        ));

        let seen: Vec<_> = store.iter()?.map(Identity::id).collect();
        assert_eq!(seen, ids);
        Ok(())
    }

    #[test]
    fn load_replaces_rather_than_merges() -> Result<()> {
        let dir = tempdir()?;
        let data = dir.path().join("items.json");

        let mut source = ItemStore::new(None)?;
        source.add(Product::new("Only", 3.0)?)?;
        source.save(&data)?;

        let mut target = ItemStore::new(None)?;
        seeded(&mut target)?;
        target.load(&data)?;
        let names: Vec<_> = target.iter()?.map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["Only".to_string()]);
        Ok(())
    }

    #[test]
    fn save_overwrites_existing_file() -> Result<()> {
        let dir = tempdir()?;
        let data = dir.path().join("items.json");
        fs::write(&data, "stale contents that are much longer than an empty document")?;

        let mut store = ItemStore::new(None)?;
        store.save(&data)?;
        let mut reloaded = ItemStore::new(None)?;
        seeded(&mut reloaded)?;
        reloaded.load(&data)?;
        assert!(reloaded.is_empty()?);
        Ok(())
    }

    #[test]
    fn audit_log_records_lifecycle() -> Result<()> {
        let dir = tempdir()?;
        let log = dir.path().join("audit.log");
        let data = dir.path().join("items.json");

        {
            let mut store = ItemStore::new(Some(log.as_path()))?;
            assert_eq!(store.audit_path(), Some(log.as_path()));
            let ids = seeded(&mut store)?;
            store.remove(ids[0])?;
            assert!(!store.remove(ids[0])?);
            store.save(&data)?;
            store.load(&data)?;
            // Dropped without an explicit dispose.
        }

        let contents = fs::read_to_string(&log)?;
        let events: Vec<_> = contents
            .lines()
            .filter_map(|line| {
                let start = line.find('[')?;
                let end = line.find(']')?;
                Some(line[start + 1..end].to_string())
            })
            .collect();
        assert_eq!(
            events,
            vec![
                "created", "added", "added", "added", "removed", "saved", "loaded", "disposed"
            ]
        );
        assert!(contents.contains("added: Product 'Laptop'"));
        assert!(contents.contains("saved 2 records"));
        Ok(())
    }

    #[test]
    fn unopenable_audit_log_fails_construction() -> Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("file");
        fs::write(&blocker, "")?;
        let err = ItemStore::new(Some(blocker.join("audit.log").as_path())).unwrap_err();
        assert!(matches!(err, StoreError::AuditSink { .. }));
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_created_line_aborts_construction() {
        // Opening succeeds but every write fails with ENOSPC.
        let err = ItemStore::new(Some(Path::new("/dev/full"))).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn dispose_twice_writes_one_disposed_line() -> Result<()> {
        let dir = tempdir()?;
        let log = dir.path().join("audit.log");
        let mut store = ItemStore::new(Some(log.as_path()))?;
        store.dispose()?;
        store.dispose()?;
        drop(store);

        let contents = fs::read_to_string(&log)?;
        assert_eq!(contents.matches("[disposed]").count(), 1);
        Ok(())
    }
}
