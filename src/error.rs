//! Error types for the Mosquitto Rust API.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur when using the client API.
///
/// Engine failures carry the native mosquitto return code verbatim together
/// with the text produced by the library's own code-to-string translator, so
/// callers can match on either.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A caller-supplied argument was rejected before reaching the engine.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine failed to allocate a client handle.
    #[error("failed to allocate engine handle")]
    OutOfMemory,

    /// Global initialization of the engine library failed.
    #[error("engine library initialization failed: {0}")]
    EngineInitFailed(String),

    /// The client holds no engine handle (construction failed earlier).
    #[error("client has no engine handle")]
    NotInitialized,

    /// An engine call returned a non-success code.
    #[error("engine error {code}: {message}")]
    Engine {
        /// The native return code, passed through verbatim.
        code: i32,
        /// Human-readable text for the code.
        message: String,
    },

    /// A string destined for the engine contains an interior null byte.
    #[error("string contains null byte: {0}")]
    Nul(#[from] std::ffi::NulError),

    /// UTF-8 conversion error.
    #[error("invalid UTF-8 string: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl Error {
    /// Builds an engine error from a native return code and its translation.
    pub fn engine(code: i32, message: impl Into<String>) -> Self {
        Error::Engine {
            code,
            message: message.into(),
        }
    }

    /// Builds an `InvalidArgument` error.
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        Error::InvalidArgument(details.into())
    }

    /// Returns the native engine code, if this is a pass-through engine error.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }
}
