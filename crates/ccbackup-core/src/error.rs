//! 错误类型
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive already exists: {0}")]
    ArchiveExists(PathBuf),

    #[error("cannot open archive {path} for writing: {source}")]
    ArchiveCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive write failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("cannot read rule file {path}: {source}")]
    RuleFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule file parse error: {0}")]
    RuleParse(#[from] toml::de::Error),

    #[error("invalid rule {id}: {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("manifest serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BackupError>;
