use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the spill forensics pipeline.
///
/// The four run-level failures operators see (model load, decode, shape
/// mismatch, invalid threshold) each get their own variant so callers can
/// match on them without parsing messages.
#[derive(Error, Debug)]
pub enum SpillError {
    #[error("Model load failure: {path:?}")]
    ModelLoadFailure {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Decode failure: {reason}")]
    DecodeFailure {
        reason: String,
        #[source]
        source: Option<image::ImageError>,
    },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid threshold: {value} is outside [0, 1]")]
    InvalidThreshold { value: f32 },

    #[error("Probability out of range: {value} at ({row}, {col})")]
    ProbabilityOutOfRange { value: f32, row: usize, col: usize },

    #[error("Inference error: {operation} failed")]
    Inference {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path:?})")]
    ImageProcessing {
        path: PathBuf,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, SpillError>;

impl SpillError {
    pub(crate) fn inference<E>(operation: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Inference {
            operation: operation.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

/// Runtime errors from a session that is already loaded.
///
/// Load-time errors are mapped to [`SpillError::ModelLoadFailure`] explicitly
/// in `Model::load`, where the model path is known.
impl From<ort::Error> for SpillError {
    fn from(err: ort::Error) -> Self {
        Self::inference("ort operation", err)
    }
}

/// Fallback for I/O errors raised without path context. Call sites that know
/// the path build [`SpillError::FileSystem`] themselves.
impl From<std::io::Error> for SpillError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Tensor reshapes only happen around inference, so they are reported as
/// inference failures rather than a separate tensor category.
impl From<ndarray::ShapeError> for SpillError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::inference("tensor shape conversion", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = SpillError::InvalidThreshold { value: 1.5 };
        assert!(err.to_string().contains("1.5"));

        let err = SpillError::shape_mismatch(&[256, 256], &[128, 128]);
        let msg = err.to_string();
        assert!(msg.contains("[256, 256]"));
        assert!(msg.contains("[128, 128]"));

        let err = SpillError::FileSystem {
            path: PathBuf::from("scenes/a.png"),
            operation: "read image".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("read image"));
    }
}
