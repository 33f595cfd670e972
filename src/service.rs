//! Backup orchestration.
//!
//! The service drives a recursive walk over a directory tree and stores
//! metadata for every visible file, refining images along the way.
//! Hidden entries and everything beneath a hidden directory are left
//! alone. Per-entry failures are logged and the walk keeps going; only
//! an unusable root aborts a run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::entry::{DirMeta, Entity, Entry, FileMeta, Flow};
use crate::error::ServiceError;
use crate::image::ImageMeta;
use crate::inspect::Inspector;
use crate::store::{MetaStore, StoredRecord};

/// Counters from one backup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub visited: usize,
    pub stored: usize,
    pub images: usize,
    pub skipped_hidden: usize,
    pub errors: usize,
}

impl fmt::Display for BackupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visited {} entries: stored {} ({} images), skipped {} hidden, {} errors",
            self.visited, self.stored, self.images, self.skipped_hidden, self.errors
        )
    }
}

/// The metadata capture pipeline wired to an open store.
pub struct Service {
    inspector: Inspector,
    store: MetaStore,
}

impl Service {
    /// Builds the pipeline around an already-open store.
    pub fn assemble(store: MetaStore) -> Service {
        Service {
            inspector: Inspector::new(),
            store,
        }
    }

    pub fn inspector(&self) -> &Inspector {
        &self.inspector
    }

    /// Walks a directory tree and stores metadata for every visible
    /// file, as an image where conversion succeeds. Fails when the root
    /// is not a readable directory.
    pub fn backup(&self, root: impl AsRef<Path>) -> Result<BackupReport, ServiceError> {
        let root = DirMeta::open(root)?;
        let mut report = BackupReport::default();

        tracing::info!("started backup on directory \"{root}\"");

        root.walk(|step| {
            let entry = match step {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::error!("could not visit an entry under \"{root}\": {err}");
                    report.errors += 1;
                    return Ok(Flow::Continue);
                }
            };

            report.visited += 1;

            if entry.parent().is_hidden() {
                report.skipped_hidden += 1;
                return Ok(Flow::SkipSubtree);
            }

            match entry {
                Entry::Dir(dir) => {
                    if dir.is_hidden() {
                        report.skipped_hidden += 1;
                        return Ok(Flow::SkipSubtree);
                    }
                }
                Entry::File(file) => {
                    if file.is_hidden() {
                        report.skipped_hidden += 1;
                    } else {
                        self.store_file(file, &mut report);
                    }
                }
            }

            Ok(Flow::Continue)
        })?;

        tracing::info!("finished backup on directory \"{root}\": {report}");
        Ok(report)
    }

    fn store_file(&self, file: FileMeta, report: &mut BackupReport) {
        let mut record = match ImageMeta::convert(file, &self.inspector) {
            Ok(image) => StoredRecord::Image(image),
            Err(file) => StoredRecord::File(file),
        };

        let warnings = record.populate(&self.inspector);
        for (field, reason) in warnings.iter() {
            tracing::warn!("populating \"{record}\" left {field} empty: {reason}");
        }

        match self.store.put(&mut record, &self.inspector) {
            Ok(key) => {
                report.stored += 1;
                if matches!(record, StoredRecord::Image(_)) {
                    report.images += 1;
                }
                tracing::debug!("stored \"{record}\" under {key}");
            }
            Err(err) => {
                report.errors += 1;
                tracing::error!("could not store \"{record}\": {err}");
            }
        }
    }

    /// Walks a tree and counts classifiable, visible files by mimetype.
    pub fn survey(&self, root: impl AsRef<Path>) -> Result<BTreeMap<String, usize>, ServiceError> {
        let root = DirMeta::open(root)?;
        let mut counts = BTreeMap::new();

        root.walk(|step| {
            let entry = match step {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::error!("could not visit an entry under \"{root}\": {err}");
                    return Ok(Flow::Continue);
                }
            };

            if entry.parent().is_hidden() {
                return Ok(Flow::SkipSubtree);
            }

            match entry {
                Entry::Dir(dir) if dir.is_hidden() => return Ok(Flow::SkipSubtree),
                Entry::File(file) if !file.is_hidden() => {
                    if let Ok(mimetype) = self.inspector.classify(file.path()) {
                        *counts.entry(mimetype).or_insert(0) += 1;
                    }
                }
                _ => {}
            }

            Ok(Flow::Continue)
        })?;

        Ok(counts)
    }

    /// Up to `limit` stored keys.
    pub fn keys(&self, limit: usize) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.keys(limit)?)
    }

    /// One stored record by signature.
    pub fn fetch(&self, key: &str) -> Result<StoredRecord, ServiceError> {
        Ok(self.store.fetch(key)?)
    }

    /// Flushes the store and tears the pipeline down.
    pub fn close(self) -> Result<(), ServiceError> {
        Ok(self.store.close()?)
    }
}
