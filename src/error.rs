//! Error taxonomies for each layer of the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the path model and metadata extraction.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The path does not exist on the filesystem.
    #[error("no such path: {}", .0.display())]
    NotFound(PathBuf),

    /// A directory operation was attempted on a non-directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The classifier produced no mimetype for the path.
    #[error("no known mimetype for {}", .0.display())]
    UnknownMimetype(PathBuf),

    /// File ownership could not be attributed to a regular account.
    #[error("could not resolve owner: {0}")]
    UnknownOwner(String),

    /// Traversal failed below the walk root.
    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by the content store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the requested key.
    #[error("no record for key \"{0}\"")]
    NotFound(String),

    /// The record carries no content signature, so it has no identity to
    /// store under.
    #[error("record for {} has no content signature", .0.display())]
    MissingSignature(PathBuf),

    /// A record could not be serialized or deserialized.
    #[error("record encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The key-value engine failed.
    #[error("storage engine failure: {0}")]
    Engine(#[from] sled::Error),
}

/// Errors raised while loading or persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file is absent; loading never invents one.
    #[error("no YAML config file at {}", .0.display())]
    Missing(PathBuf),

    /// No per-user home directory could be located.
    #[error("could not resolve a home directory for application state")]
    NoHomeDir,

    /// The config file exists but does not parse.
    #[error("malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while installing the log subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("could not open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not install log subscriber: {0}")]
    Subscriber(String),
}

/// Errors raised while interpreting embedded image tags.
#[derive(Debug, Error)]
pub enum ExifError {
    /// Only the JPEG encoding carries an embedded tag block.
    #[error("only JPEG files carry embedded tags")]
    NotJpeg,

    /// The container held no readable tag block.
    #[error("could not read embedded tags: {0}")]
    Unreadable(#[from] exif::Error),

    /// A tag required by the computation is absent.
    #[error("missing tag: {0}")]
    MissingTag(String),

    /// A tag was present but its value did not have the expected shape.
    #[error("malformed tag value: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level failures from service assembly and orchestration.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LogError),
}
