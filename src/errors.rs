use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the tiling pipeline.
///
/// Each variant names the stage that failed and carries the path or command
/// involved, so the top-level report can say what to inspect before the run
/// is re-invoked.
#[derive(Error, Debug)]
pub enum GridifyError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Probe error: could not read dimensions of {path:?}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("Geometry error: {reason}")]
    Geometry { reason: String },

    #[error("Subprocess error: `{command}` {reason}")]
    Subprocess {
        command: String,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, GridifyError>;

impl GridifyError {
    pub(crate) fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Call sites that know the path and operation build `FileSystem` directly;
/// this is the fallback for the few that don't.
impl From<std::io::Error> for GridifyError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Convert image crate errors to image processing errors.
impl From<image::ImageError> for GridifyError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

/// Marks a fallible call whose failure is tolerated.
///
/// Cleanup of state left behind by an interrupted earlier run is expected to
/// fail now and then; those call sites say so explicitly instead of
/// discarding the result.
pub trait BestEffort<T> {
    /// Logs the error as a warning and yields `None` instead of failing.
    fn best_effort(self, what: &str) -> Option<T>;
}

impl<T> BestEffort<T> for Result<T> {
    fn best_effort(self, what: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("{} failed, continuing: {}", what, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_swallows_errors() {
        let failed: Result<u32> = Err(GridifyError::Configuration {
            message: "boom".to_string(),
        });
        assert_eq!(failed.best_effort("cleanup"), None);

        let ok: Result<u32> = Ok(7);
        assert_eq!(ok.best_effort("cleanup"), Some(7));
    }

    #[test]
    fn test_subprocess_error_message() {
        let err = GridifyError::Subprocess {
            command: "convert a.png b.png".to_string(),
            reason: "exited with status 1".to_string(),
            source: None,
        };
        assert_eq!(
            err.to_string(),
            "Subprocess error: `convert a.png b.png` exited with status 1"
        );
    }
}
