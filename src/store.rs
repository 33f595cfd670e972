//! Content-addressed metadata store.
//!
//! Records persist in an embedded key-value database under their
//! content signature, so identical content always lands on the same
//! key and re-storing it silently replaces the earlier record. Each
//! record serializes with an explicit kind tag and reconstructs as the
//! concrete shape it was stored with.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entry::{FileMeta, PopulateWarnings};
use crate::error::StoreError;
use crate::image::ImageMeta;
use crate::inspect::Inspector;

/// A persisted metadata record, tagged with its concrete kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StoredRecord {
    File(FileMeta),
    Image(ImageMeta),
}

impl StoredRecord {
    /// Signature the record keys under, once computed.
    pub fn signature(&self) -> Option<&str> {
        match self {
            StoredRecord::File(file) => file.signature.as_deref(),
            StoredRecord::Image(image) => image.file.signature.as_deref(),
        }
    }

    /// Source path the record was captured from.
    pub fn path(&self) -> &Path {
        match self {
            StoredRecord::File(file) => &file.path,
            StoredRecord::Image(image) => &image.file.path,
        }
    }

    pub fn is_populated(&self) -> bool {
        match self {
            StoredRecord::File(file) => file.is_populated(),
            StoredRecord::Image(image) => image.is_populated(),
        }
    }

    /// Runs the kind-appropriate population pass.
    pub fn populate(&mut self, inspector: &Inspector) -> PopulateWarnings {
        match self {
            StoredRecord::File(file) => file.populate(inspector),
            StoredRecord::Image(image) => image.populate(inspector),
        }
    }

    fn mark_populated(&mut self) {
        match self {
            StoredRecord::File(file) => file.populated = true,
            StoredRecord::Image(image) => image.file.populated = true,
        }
    }
}

impl From<FileMeta> for StoredRecord {
    fn from(file: FileMeta) -> StoredRecord {
        StoredRecord::File(file)
    }
}

impl From<ImageMeta> for StoredRecord {
    fn from(image: ImageMeta) -> StoredRecord {
        StoredRecord::Image(image)
    }
}

impl fmt::Display for StoredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Handle to the on-disk content-addressed store.
#[derive(Debug)]
pub struct MetaStore {
    db: sled::Db,
}

impl MetaStore {
    /// Opens or creates the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<MetaStore, StoreError> {
        Ok(MetaStore {
            db: sled::open(path)?,
        })
    }

    /// Ensures the record is populated, serializes it, and writes it
    /// under its signature, overwriting whatever was there. Returns the
    /// key. A record that never gained a signature has no identity to
    /// store under and is refused.
    pub fn put(
        &self,
        record: &mut StoredRecord,
        inspector: &Inspector,
    ) -> Result<String, StoreError> {
        if !record.is_populated() {
            let warnings = record.populate(inspector);
            for (field, reason) in warnings.iter() {
                tracing::debug!("populating {record} left {field} empty: {reason}");
            }
        }

        let key = record
            .signature()
            .ok_or_else(|| StoreError::MissingSignature(record.path().to_path_buf()))?
            .to_string();

        let value = serde_json::to_vec(record)?;
        self.db.insert(key.as_bytes(), value)?;
        Ok(key)
    }

    /// Fetches the record stored under a signature key. The kind tag
    /// reconstructs the concrete shape; the result counts as populated
    /// since every attribute was computed at store time.
    pub fn fetch(&self, key: &str) -> Result<StoredRecord, StoreError> {
        let value = self
            .db
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        let mut record: StoredRecord = serde_json::from_slice(&value)?;
        record.mark_populated();
        Ok(record)
    }

    /// Up to `limit` keys in the store's iteration order.
    pub fn keys(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();

        for key in self.db.iter().keys().take(limit) {
            keys.push(String::from_utf8_lossy(&key?).into_owned());
        }

        Ok(keys)
    }

    /// Flushes and releases the handle. Consuming the handle makes
    /// use-after-close unrepresentable.
    pub fn close(self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::entry::Entry;
    use crate::testdata::fixture;

    const FABLE_KEY: &str = "yPdVQEIMrUg13COQXCl69OCG3Sc=";

    fn open_store(tmp: &TempDir) -> MetaStore {
        MetaStore::open(tmp.path().join("filemeta.db")).unwrap()
    }

    fn file_record(path: PathBuf) -> StoredRecord {
        match Entry::new(path).unwrap() {
            Entry::File(file) => StoredRecord::File(file),
            Entry::Dir(_) => panic!("expected a file"),
        }
    }

    fn image_record(path: PathBuf, inspector: &Inspector) -> StoredRecord {
        match Entry::new(path).unwrap() {
            Entry::File(file) => {
                StoredRecord::Image(ImageMeta::convert(file, inspector).unwrap())
            }
            Entry::Dir(_) => panic!("expected a file"),
        }
    }

    #[test]
    fn the_signature_is_the_key() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let inspector = Inspector::new();

        let mut record = file_record(fixture("fable.txt"));
        let key = store.put(&mut record, &inspector).unwrap();

        assert_eq!(key, FABLE_KEY);
    }

    #[test]
    fn files_round_trip_as_files() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let inspector = Inspector::new();

        let mut record = file_record(fixture("fable.txt"));
        record.populate(&inspector);
        let key = store.put(&mut record, &inspector).unwrap();

        match store.fetch(&key).unwrap() {
            StoredRecord::File(file) => {
                assert_eq!(file.path, fixture("fable.txt"));
                assert_eq!(file.name, "fable.txt");
                assert_eq!(file.size, 43);
                assert_eq!(file.mimetype.as_deref(), Some("text/plain"));
                assert_eq!(file.signature.as_deref(), Some(FABLE_KEY));
                assert!(file.is_populated());
            }
            StoredRecord::Image(_) => panic!("a text file must not come back as an image"),
        }
    }

    #[test]
    fn images_round_trip_as_images() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let inspector = Inspector::new();

        let mut record = image_record(fixture("quay.jpg"), &inspector);
        let key = store.put(&mut record, &inspector).unwrap();

        match store.fetch(&key).unwrap() {
            StoredRecord::Image(image) => {
                assert_eq!((image.width, image.height), (640, 480));
                assert_eq!(image.tags.get("Make").map(String::as_str), Some("LGE"));
                assert!(!image.tags.is_empty());
                assert_eq!(image.file.mimetype.as_deref(), Some("image/jpeg"));
                assert!(image.is_populated());
            }
            StoredRecord::File(_) => panic!("an image must come back as an image"),
        }
    }

    #[test]
    fn fetching_an_absent_key_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        match store.fetch("no-such-signature") {
            Err(StoreError::NotFound(key)) => assert_eq!(key, "no-such-signature"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn keys_respects_the_exact_bound() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let inspector = Inspector::new();

        store
            .put(&mut file_record(fixture("fable.txt")), &inspector)
            .unwrap();
        store
            .put(&mut file_record(fixture("pier.jpg")), &inspector)
            .unwrap();

        assert_eq!(store.keys(1).unwrap().len(), 1);
        assert_eq!(store.keys(100).unwrap().len(), 2);
        assert!(store.keys(0).unwrap().is_empty());
    }

    #[test]
    fn identical_content_silently_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let inspector = Inspector::new();

        let first = tmp.path().join("first.txt");
        let second = tmp.path().join("second.txt");
        File::create(&first).unwrap().write_all(b"same words").unwrap();
        File::create(&second).unwrap().write_all(b"same words").unwrap();

        let key_a = store.put(&mut file_record(first), &inspector).unwrap();
        let key_b = store.put(&mut file_record(second.clone()), &inspector).unwrap();

        assert_eq!(key_a, key_b);
        assert_eq!(store.keys(100).unwrap().len(), 1);

        let fetched = store.fetch(&key_b).unwrap();
        assert_eq!(fetched.path(), dunce::canonicalize(second).unwrap());
    }

    #[test]
    fn records_without_a_signature_are_refused() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        let inspector = Inspector::new();

        let path = tmp.path().join("fleeting.txt");
        File::create(&path).unwrap().write_all(b"gone soon").unwrap();
        let mut record = file_record(path.clone());
        fs::remove_file(&path).unwrap();

        match store.put(&mut record, &inspector) {
            Err(StoreError::MissingSignature(reported)) => {
                assert!(reported.ends_with("fleeting.txt"));
            }
            other => panic!("expected a refusal, got {other:?}"),
        }
    }

    #[test]
    fn reopening_preserves_records() {
        let tmp = TempDir::new().unwrap();
        let inspector = Inspector::new();

        let store = open_store(&tmp);
        let key = store
            .put(&mut file_record(fixture("fable.txt")), &inspector)
            .unwrap();
        store.close().unwrap();

        let store = open_store(&tmp);
        assert!(store.fetch(&key).is_ok());
    }

    #[test]
    fn the_tag_names_the_concrete_kind() {
        let inspector = Inspector::new();

        let mut record = file_record(fixture("fable.txt"));
        record.populate(&inspector);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value.get("kind").and_then(|kind| kind.as_str()), Some("File"));

        let mut record = image_record(fixture("skyline.png"), &inspector);
        record.populate(&inspector);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value.get("kind").and_then(|kind| kind.as_str()), Some("Image"));
    }
}
