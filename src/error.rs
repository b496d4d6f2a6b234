//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. A missing key is never
//! an error here: plain reads report absence through `Option`.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for named caches.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A compute-on-miss supplier produced a value that the conversion
    /// service could not turn into the requested type
    #[error("Cache supplier returned a value that cannot be converted to type: {type_name}")]
    UnconvertibleValue {
        /// Name of the type the caller asked for
        type_name: &'static str,
    },

    /// Cache configuration rejected before the engine was built
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
