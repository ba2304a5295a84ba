use std::path::{Path, PathBuf};

use crate::error_codes;

pub type Result<T> = std::result::Result<T, MirrorError>;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("no original path is recorded for {mirrored_name}")]
    NotTracked { mirrored_name: String },

    #[error("failed to {op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mapping file {path:?} is malformed: {source}")]
    MalformedMapping {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("destination chooser failed: {0}")]
    Chooser(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to watch mirror folder: {0}")]
    Watch(#[from] notify::Error),

    #[error("copy of {source_path:?} to {target:?} does not match the original")]
    VerificationFailed { source_path: PathBuf, target: PathBuf },
}

impl MirrorError {
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Stable code for the host UI.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotTracked { .. } => error_codes::ERR_NOT_TRACKED,
            Self::Io { .. } => error_codes::ERR_IO,
            Self::MalformedMapping { .. } => error_codes::ERR_MALFORMED_MAPPING,
            Self::Chooser(_) => error_codes::ERR_CHOOSER_FAILED,
            Self::InvalidPath(_) => error_codes::ERR_INVALID_PATH,
            Self::Config(_) => error_codes::ERR_CONFIG,
            Self::Watch(_) => error_codes::ERR_WATCH_START_FAILED,
            Self::VerificationFailed { .. } => error_codes::ERR_VERIFICATION_FAILED,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
