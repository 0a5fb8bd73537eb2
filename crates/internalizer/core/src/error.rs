use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Failures while assembling a package graph.
///
/// Every variant is terminal: construction stops at the first one and no
/// partial graph is returned.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read go.mod at {}: {source}", path.display())]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse go.mod at {}: {message}", path.display())]
    DescriptorParse { path: PathBuf, message: String },

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}:{line}: {message}", path.display())]
    ImportParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid exclude glob '{pattern}': {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

impl BuildError {
    /// The file or directory the failure is about, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::DescriptorRead { path, .. }
            | Self::DescriptorParse { path, .. }
            | Self::Walk { path, .. }
            | Self::SourceRead { path, .. }
            | Self::ImportParse { path, .. } => Some(path),
            Self::InvalidExclude { .. } => None,
        }
    }
}
