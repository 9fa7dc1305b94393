use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::transform::TransformError;

/// A recompute that did not produce an artifact.
///
/// The previously published artifact stays current either way.
#[derive(Debug, Error)]
pub enum RecomputeError {
    #[error("failed to read `{}`", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl RecomputeError {
    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SourceRead { .. } => "read",
            Self::Transform(_) => "transform",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_read_display_names_path() {
        let err = RecomputeError::SourceRead {
            path: PathBuf::from("notes.md"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "failed to read `notes.md`");
        assert_eq!(err.label(), "read");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_transform_error_is_transparent() {
        let err = RecomputeError::from(TransformError::Rejected("bad outline".into()));
        assert_eq!(err.to_string(), "transform rejected input: bad outline");
        assert_eq!(err.label(), "transform");
    }
}
