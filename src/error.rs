use thiserror::Error;

/// Filesystem I/O errors raised by the cache store and the image source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// File does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// Reading a file failed
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    /// Writing or publishing a file failed
    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Errors produced while validating transform query parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A parameter required by the requested operation is absent
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Width or height is not a positive integer
    #[error("Invalid dimension for '{name}': {value:?} (must be a positive integer)")]
    InvalidDimension { name: &'static str, value: String },

    /// Crop origin is not an integer
    #[error("Invalid coordinate for '{name}': {value:?} (must be an integer)")]
    InvalidCoordinate { name: &'static str, value: String },
}

/// Errors that can occur while decoding, transforming or re-encoding an image
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// Source bytes are corrupt or in an unsupported format
    #[error("Failed to decode image: {message}")]
    DecodeError { message: String },

    /// Transformed image could not be encoded in the source format
    #[error("Failed to encode image: {message}")]
    EncodeError { message: String },

    /// Crop rectangle does not intersect the image
    #[error(
        "Crop rectangle {width}x{height} at ({x}, {y}) is outside the {image_width}x{image_height} image"
    )]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Resize would produce more pixels than the configured budget
    #[error("Output {width}x{height} exceeds the limit of {max_pixels} pixels")]
    TooLarge {
        width: u64,
        height: u64,
        max_pixels: u64,
    },
}

/// Errors raised while resolving a request path to a source image
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// No readable image exists at the requested path
    #[error("Source image not found: {0}")]
    NotFound(String),

    /// Requested path escapes the configured source root
    #[error("Path escapes the source root: {0}")]
    OutsideRoot(String),

    /// I/O error while reading the source
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Derived cache key is not usable as a file name
#[derive(Debug, Clone, Error)]
#[error("Unsafe cache key: {0:?}")]
pub struct KeyError(pub String);

/// Errors surfaced by the request pipeline.
///
/// Each stage keeps its own error type so failures stay distinguishable in logs.
/// The HTTP layer collapses all of them into one not-found response.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Query parameters failed validation
    #[error("Bad request: {0}")]
    Validation(#[from] ValidationError),

    /// Source path could not be resolved or read
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Cache key failed the file-name safety checks
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// Decode, transform or encode failure
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Cache read or write failure
    #[error("Cache I/O error: {0}")]
    Io(#[from] IoError),

    /// Blocking transform task panicked or was cancelled
    #[error("Transform task failed: {0}")]
    Task(String),
}

impl PipelineError {
    /// Short identifier used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation_error",
            PipelineError::Source(SourceError::Io(_)) => "io_error",
            PipelineError::Source(_) => "not_found",
            PipelineError::Key(_) => "not_found",
            PipelineError::Transform(TransformError::DecodeError { .. }) => "decode_error",
            PipelineError::Transform(_) => "transform_error",
            PipelineError::Io(_) => "io_error",
            PipelineError::Task(_) => "task_error",
        }
    }

    /// Whether the failure was caused by the caller's parameters.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }

    /// Whether the failure points at a server-side problem rather than the request.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Io(_)
                | PipelineError::Source(SourceError::Io(_))
                | PipelineError::Transform(TransformError::EncodeError { .. })
                | PipelineError::Task(_)
        )
    }
}
