//! Filesystem entry model.
//!
//! Files and directories form a closed set of typed entries behind the
//! [`Entity`] capability trait. An entry's path is cleaned and absolute
//! from construction onward; everything else (stat attributes, owner,
//! mimetype, content signature) is derived on demand by a population
//! pass that records per-field outcomes instead of failing wholesale.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::EntryError;
use crate::inspect::{hash_reader, Inspector};

/// Visitor signal controlling a recursive walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep walking.
    Continue,
    /// Do not descend into the directory just visited.
    SkipSubtree,
}

/// Shared capability surface for files and directories.
pub trait Entity {
    /// Cleaned path of the entry.
    fn path(&self) -> &Path;

    /// True when the base name starts with the hidden marker. The
    /// current and parent directory references are never hidden.
    fn is_hidden(&self) -> bool {
        hidden(self.path())
    }

    /// Directory one level up. Constructible whether or not that
    /// directory exists on disk; the filesystem root is its own parent.
    fn parent(&self) -> DirMeta {
        let path = self.path().parent().unwrap_or_else(|| self.path());
        DirMeta::from_path(path.to_path_buf())
    }

    /// Raw filesystem attributes of the entry.
    fn stat(&self) -> Result<fs::Metadata, EntryError> {
        fs::metadata(self.path()).map_err(|err| not_found_or_io(self.path(), err))
    }

    /// Account name of the owning user. Ownership by the superuser does
    /// not attribute and resolves as unknown.
    #[cfg(unix)]
    fn owner(&self) -> Result<String, EntryError> {
        use std::os::unix::fs::MetadataExt;

        let uid = self.stat()?.uid();
        if uid == 0 {
            return Err(EntryError::UnknownOwner(display_path(self.path())));
        }

        uzers::get_user_by_uid(uid)
            .map(|user| user.name().to_string_lossy().into_owned())
            .ok_or_else(|| EntryError::UnknownOwner(display_path(self.path())))
    }

    /// Account name of the owning user. Not resolvable on this platform.
    #[cfg(not(unix))]
    fn owner(&self) -> Result<String, EntryError> {
        Err(EntryError::UnknownOwner(display_path(self.path())))
    }
}

/// A typed filesystem entry.
#[derive(Debug, Clone)]
pub enum Entry {
    File(FileMeta),
    Dir(DirMeta),
}

impl Entry {
    /// Resolves a path into a typed entry. The path is cleaned and made
    /// absolute; a path that does not exist or cannot be inspected is
    /// an error.
    pub fn new(path: impl AsRef<Path>) -> Result<Entry, EntryError> {
        let path = path.as_ref();
        let resolved = dunce::canonicalize(path).map_err(|err| not_found_or_io(path, err))?;
        let stat = fs::metadata(&resolved).map_err(|err| not_found_or_io(&resolved, err))?;

        if stat.is_dir() {
            Ok(Entry::Dir(DirMeta::from_path(resolved)))
        } else {
            Ok(Entry::File(FileMeta::from_path(resolved)))
        }
    }

    fn from_walk(dirent: &walkdir::DirEntry) -> Entry {
        let path = dirent.path().to_path_buf();
        if dirent.file_type().is_dir() {
            Entry::Dir(DirMeta::from_path(path))
        } else {
            Entry::File(FileMeta::from_path(path))
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Dir(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File(_))
    }
}

impl Entity for Entry {
    fn path(&self) -> &Path {
        match self {
            Entry::File(file) => file.path(),
            Entry::Dir(dir) => dir.path(),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Per-field outcome of a population pass. A `Some` value carries the
/// reason the corresponding attributes were left at their zero values.
#[derive(Debug, Clone, Default)]
pub struct PopulateWarnings {
    pub stat: Option<String>,
    pub owner: Option<String>,
    pub mimetype: Option<String>,
    pub signature: Option<String>,
    pub dimensions: Option<String>,
    pub tags: Option<String>,
}

impl PopulateWarnings {
    /// True when every sub-step of the pass succeeded.
    pub fn is_clean(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Loggable (field, reason) pairs for the sub-steps that failed.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("stat", &self.stat),
            ("owner", &self.owner),
            ("mimetype", &self.mimetype),
            ("signature", &self.signature),
            ("dimensions", &self.dimensions),
            ("tags", &self.tags),
        ]
        .into_iter()
        .filter_map(|(field, reason)| reason.as_deref().map(|reason| (field, reason)))
    }
}

/// Captured metadata for a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    pub path: PathBuf,
    pub mimetype: Option<String>,
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub signature: Option<String>,
    pub host: String,
    pub author: Option<String>,
    #[serde(skip)]
    pub(crate) populated: bool,
}

impl FileMeta {
    pub(crate) fn from_path(path: PathBuf) -> FileMeta {
        FileMeta {
            path,
            mimetype: None,
            name: String::new(),
            size: 0,
            modified: None,
            signature: None,
            host: String::new(),
            author: None,
            populated: false,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Computes every derived attribute and marks the entry populated.
    /// Each sub-step is best-effort: a failure leaves its attributes at
    /// their zero values and is reported in the returned warnings.
    /// Calling again overwrites with freshly computed values.
    pub fn populate(&mut self, inspector: &Inspector) -> PopulateWarnings {
        let mut warnings = PopulateWarnings::default();

        match self.stat() {
            Ok(stat) => {
                self.name = base_name(&self.path);
                self.size = stat.len();
                self.modified = stat.modified().ok().map(DateTime::from);
            }
            Err(err) => warnings.stat = Some(err.to_string()),
        }

        match self.owner() {
            Ok(owner) => self.author = Some(owner),
            Err(err) => warnings.owner = Some(err.to_string()),
        }

        self.host = inspector.hostname().to_string();

        match inspector.classify(&self.path) {
            Ok(mimetype) => self.mimetype = Some(mimetype),
            Err(err) => {
                self.mimetype = None;
                warnings.mimetype = Some(err.to_string());
            }
        }

        match self.hash() {
            Ok(signature) => self.signature = Some(signature),
            Err(err) => {
                self.signature = None;
                warnings.signature = Some(err.to_string());
            }
        }

        self.populated = true;
        warnings
    }

    /// Streams the file's content through the digest and returns the
    /// base64-encoded signature. Memory use stays bounded for files of
    /// any size.
    pub fn hash(&self) -> Result<String, EntryError> {
        let file = fs::File::open(&self.path).map_err(|err| not_found_or_io(&self.path, err))?;
        Ok(hash_reader(file)?)
    }

    /// Classifies the mimetype if it is not already known and caches it
    /// on the entry.
    pub fn ensure_mimetype(&mut self, inspector: &Inspector) -> Result<&str, EntryError> {
        if self.mimetype.is_none() {
            self.mimetype = Some(inspector.classify(&self.path)?);
        }

        Ok(self.mimetype.as_deref().unwrap_or_default())
    }

    /// True when the (classified-on-demand) mimetype is an image type.
    pub fn is_image(&mut self, inspector: &Inspector) -> Result<bool, EntryError> {
        Ok(self.ensure_mimetype(inspector)?.starts_with("image/"))
    }
}

impl Entity for FileMeta {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for FileMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Captured metadata for a directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirMeta {
    pub path: PathBuf,
    pub name: String,
    pub modified: Option<DateTime<Local>>,
    #[serde(skip)]
    pub(crate) populated: bool,
}

impl DirMeta {
    pub(crate) fn from_path(path: PathBuf) -> DirMeta {
        DirMeta {
            path,
            name: String::new(),
            modified: None,
            populated: false,
        }
    }

    /// Resolves a path that must be an existing directory.
    pub fn open(path: impl AsRef<Path>) -> Result<DirMeta, EntryError> {
        match Entry::new(path)? {
            Entry::Dir(dir) => Ok(dir),
            Entry::File(file) => Err(EntryError::NotADirectory(file.path)),
        }
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Fills the directory's name and modification time, best-effort.
    pub fn populate(&mut self) -> PopulateWarnings {
        let mut warnings = PopulateWarnings::default();

        match self.stat() {
            Ok(stat) => {
                self.name = base_name(&self.path);
                self.modified = stat.modified().ok().map(DateTime::from);
            }
            Err(err) => warnings.stat = Some(err.to_string()),
        }

        self.populated = true;
        warnings
    }

    /// Appends a relative segment to the directory's path.
    pub fn join(&self, segment: impl AsRef<Path>) -> PathBuf {
        self.path.join(segment)
    }

    /// Immediate children as typed entries, in name order.
    pub fn list(&self) -> Result<Vec<Entry>, EntryError> {
        let mut children = Vec::new();

        for dirent in fs::read_dir(&self.path).map_err(|err| not_found_or_io(&self.path, err))? {
            let dirent = dirent?;
            let path = dirent.path();

            if dirent.file_type()?.is_dir() {
                children.push(Entry::Dir(DirMeta::from_path(path)));
            } else {
                children.push(Entry::File(FileMeta::from_path(path)));
            }
        }

        children.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(children)
    }

    /// Recursive pre-order walk in name order, the directory itself
    /// first. The visitor receives each entry, or the traversal error
    /// for entries that could not be read. Returning
    /// [`Flow::SkipSubtree`] from a directory visit prevents descent
    /// into it; a visitor error aborts the walk and propagates.
    pub fn walk<F>(&self, mut visitor: F) -> Result<(), EntryError>
    where
        F: FnMut(Result<Entry, EntryError>) -> Result<Flow, EntryError>,
    {
        let mut steps = WalkDir::new(&self.path).sort_by_file_name().into_iter();

        while let Some(step) = steps.next() {
            match step {
                Ok(dirent) => {
                    let is_dir = dirent.file_type().is_dir();
                    if visitor(Ok(Entry::from_walk(&dirent)))? == Flow::SkipSubtree && is_dir {
                        steps.skip_current_dir();
                    }
                }
                Err(err) => {
                    visitor(Err(EntryError::Walk(err)))?;
                }
            }
        }

        Ok(())
    }
}

impl Entity for DirMeta {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for DirMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

pub(crate) fn not_found_or_io(path: &Path, err: io::Error) -> EntryError {
    if err.kind() == io::ErrorKind::NotFound {
        EntryError::NotFound(path.to_path_buf())
    } else {
        EntryError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    use crate::inspect::hash_bytes;

    fn scratch() -> TempDir {
        TempDir::new().unwrap()
    }

    fn touch(path: &Path, content: &[u8]) {
        let mut file = File::create(path).unwrap();
        file.write_all(content).unwrap();
    }

    #[test]
    fn resolves_files_and_directories() {
        let tmp = scratch();
        touch(&tmp.path().join("notes.txt"), b"hello");
        fs::create_dir(tmp.path().join("nested")).unwrap();

        let file = Entry::new(tmp.path().join("notes.txt")).unwrap();
        assert!(file.is_file());
        assert!(!file.is_dir());
        assert!(file.path().is_absolute());

        let dir = Entry::new(tmp.path().join("nested")).unwrap();
        assert!(dir.is_dir());
        assert!(!dir.is_file());
    }

    #[test]
    fn missing_paths_are_not_found() {
        let tmp = scratch();
        match Entry::new(tmp.path().join("ghost")) {
            Err(EntryError::NotFound(path)) => {
                assert!(path.ends_with("ghost"));
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn construction_cleans_the_path() {
        let tmp = scratch();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        touch(&tmp.path().join("nested").join("notes.txt"), b"hi");

        let twisty = tmp
            .path()
            .join("nested")
            .join("..")
            .join("nested")
            .join("notes.txt");
        let entry = Entry::new(&twisty).unwrap();
        assert_eq!(entry.path(), dunce::canonicalize(&twisty).unwrap());
    }

    #[test]
    fn dot_references_are_never_hidden() {
        assert!(!hidden(Path::new(".")));
        assert!(!hidden(Path::new("..")));
        assert!(!hidden(Path::new("album/..")));
        assert!(hidden(Path::new(".git")));
        assert!(hidden(Path::new("album/.cache")));
        assert!(!hidden(Path::new("notes.txt")));
    }

    #[test]
    fn hidden_entries_are_detected_by_name() {
        let tmp = scratch();
        touch(&tmp.path().join(".secret"), b"shh");
        touch(&tmp.path().join("plain.txt"), b"ok");

        assert!(Entry::new(tmp.path().join(".secret")).unwrap().is_hidden());
        assert!(!Entry::new(tmp.path().join("plain.txt")).unwrap().is_hidden());
    }

    #[test]
    fn parent_is_always_constructible() {
        let tmp = scratch();
        touch(&tmp.path().join("notes.txt"), b"hello");

        let entry = Entry::new(tmp.path().join("notes.txt")).unwrap();
        assert_eq!(entry.parent().path(), dunce::canonicalize(tmp.path()).unwrap());

        let vanished = entry.parent().join("nowhere");
        let orphan = FileMeta::from_path(vanished.join("lost.txt"));
        assert_eq!(orphan.parent().path(), vanished.as_path());
    }

    #[test]
    fn the_root_is_its_own_parent() {
        let root = DirMeta::from_path(PathBuf::from("/"));
        assert_eq!(root.parent().path(), Path::new("/"));
    }

    #[test]
    fn join_appends_relative_segments() {
        let dir = DirMeta::from_path(PathBuf::from("/albums"));
        assert_eq!(dir.join("2015/quay.jpg"), PathBuf::from("/albums/2015/quay.jpg"));
    }

    #[test]
    fn list_returns_typed_children_in_name_order() {
        let tmp = scratch();
        touch(&tmp.path().join("beta.txt"), b"b");
        touch(&tmp.path().join("alpha.txt"), b"a");
        fs::create_dir(tmp.path().join("middle")).unwrap();

        let dir = DirMeta::open(tmp.path()).unwrap();
        let children = dir.list().unwrap();

        let names: Vec<String> = children.iter().map(|child| base_name(child.path())).collect();
        assert_eq!(names, ["alpha.txt", "beta.txt", "middle"]);
        assert!(children[0].is_file());
        assert!(children[1].is_file());
        assert!(children[2].is_dir());
    }

    #[test]
    fn list_fails_for_an_unreadable_directory() {
        let dir = DirMeta::from_path(PathBuf::from("/definitely/not/here"));
        assert!(matches!(dir.list(), Err(EntryError::NotFound(_))));
    }

    #[test]
    fn open_rejects_files() {
        let tmp = scratch();
        touch(&tmp.path().join("notes.txt"), b"hello");

        match DirMeta::open(tmp.path().join("notes.txt")) {
            Err(EntryError::NotADirectory(path)) => assert!(path.ends_with("notes.txt")),
            other => panic!("expected not-a-directory, got {other:?}"),
        }
    }

    #[test]
    fn walk_visits_preorder_and_honors_skip() {
        let tmp = scratch();
        fs::create_dir(tmp.path().join("keep")).unwrap();
        fs::create_dir(tmp.path().join("skip")).unwrap();
        touch(&tmp.path().join("keep").join("inner.txt"), b"in");
        touch(&tmp.path().join("skip").join("buried.txt"), b"out");
        touch(&tmp.path().join("top.txt"), b"top");

        let dir = DirMeta::open(tmp.path()).unwrap();
        let mut visited = Vec::new();
        dir.walk(|step| {
            let entry = step.unwrap();
            visited.push(base_name(entry.path()));
            if entry.is_dir() && base_name(entry.path()) == "skip" {
                return Ok(Flow::SkipSubtree);
            }
            Ok(Flow::Continue)
        })
        .unwrap();

        let root = base_name(dir.path());
        assert_eq!(visited, [root.as_str(), "keep", "inner.txt", "skip", "top.txt"]);
    }

    #[test]
    fn walk_aborts_when_the_visitor_errors() {
        let tmp = scratch();
        touch(&tmp.path().join("alpha.txt"), b"a");
        touch(&tmp.path().join("beta.txt"), b"b");

        let dir = DirMeta::open(tmp.path()).unwrap();
        let mut visits = 0;
        let outcome = dir.walk(|step| {
            let entry = step.unwrap();
            visits += 1;
            if entry.is_file() {
                return Err(EntryError::Io(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "halt",
                )));
            }
            Ok(Flow::Continue)
        });

        assert!(matches!(outcome, Err(EntryError::Io(_))));
        assert_eq!(visits, 2);
    }

    #[test]
    fn populate_fills_file_attributes() {
        let tmp = scratch();
        touch(&tmp.path().join("notes.txt"), b"hello");

        let inspector = Inspector::new();
        let mut file = match Entry::new(tmp.path().join("notes.txt")).unwrap() {
            Entry::File(file) => file,
            Entry::Dir(_) => panic!("expected a file"),
        };

        assert!(!file.is_populated());
        let warnings = file.populate(&inspector);

        assert!(file.is_populated());
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.size, 5);
        assert!(file.modified.is_some());
        assert_eq!(file.mimetype.as_deref(), Some("text/plain"));
        assert_eq!(file.signature.as_deref(), Some(hash_bytes(b"hello").as_str()));
        assert_eq!(file.host, inspector.hostname());
        assert!(warnings.stat.is_none());
        assert!(warnings.mimetype.is_none());
        assert!(warnings.signature.is_none());
    }

    #[test]
    fn populate_overwrites_on_repeat() {
        let tmp = scratch();
        let path = tmp.path().join("notes.txt");
        touch(&path, b"hello");

        let inspector = Inspector::new();
        let mut file = FileMeta::from_path(dunce::canonicalize(&path).unwrap());
        file.populate(&inspector);
        let first = file.signature.clone();

        touch(&path, b"hello again");
        file.populate(&inspector);

        assert_eq!(file.size, 11);
        assert_ne!(file.signature, first);
        assert_eq!(
            file.signature.as_deref(),
            Some(hash_bytes(b"hello again").as_str())
        );
    }

    #[test]
    fn populate_warns_per_failed_field() {
        let tmp = scratch();
        touch(&tmp.path().join("README"), b"plain");

        let inspector = Inspector::new();
        let mut file = match Entry::new(tmp.path().join("README")).unwrap() {
            Entry::File(file) => file,
            Entry::Dir(_) => panic!("expected a file"),
        };

        let warnings = file.populate(&inspector);

        assert!(file.mimetype.is_none());
        assert!(warnings.mimetype.is_some());
        assert!(warnings.signature.is_none());
        assert!(file.signature.is_some());
        assert!(!warnings.is_clean());

        let failed: Vec<&str> = warnings.iter().map(|(field, _)| field).collect();
        assert!(failed.contains(&"mimetype"));
    }

    #[test]
    fn populate_reports_everything_missing_for_a_vanished_file() {
        let tmp = scratch();
        let path = tmp.path().join("fleeting.txt");
        touch(&path, b"here");

        let inspector = Inspector::new();
        let mut file = FileMeta::from_path(dunce::canonicalize(&path).unwrap());
        fs::remove_file(&path).unwrap();

        let warnings = file.populate(&inspector);

        assert!(file.is_populated());
        assert_eq!(file.size, 0);
        assert!(file.modified.is_none());
        assert!(file.signature.is_none());
        assert!(warnings.stat.is_some());
        assert!(warnings.owner.is_some());
        assert!(warnings.signature.is_some());
    }

    #[test]
    fn ensure_mimetype_uses_the_cached_value() {
        let mut file = FileMeta::from_path(PathBuf::from("/albums/quay.jpg"));
        file.mimetype = Some("application/x-already-known".to_string());

        let inspector = Inspector::new();
        assert_eq!(
            file.ensure_mimetype(&inspector).unwrap(),
            "application/x-already-known"
        );
    }

    #[test]
    fn dir_populate_fills_name_and_timestamp() {
        let tmp = scratch();
        fs::create_dir(tmp.path().join("album")).unwrap();

        let mut dir = DirMeta::open(tmp.path().join("album")).unwrap();
        let warnings = dir.populate();

        assert!(dir.is_populated());
        assert_eq!(dir.name, "album");
        assert!(dir.modified.is_some());
        assert!(warnings.is_clean());
    }
}
