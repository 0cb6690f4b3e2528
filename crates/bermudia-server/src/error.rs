//! Error types for the server binary.
//!
//! [`ServerError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: bermudia_core::ConfigError,
    },

    /// The content file could not be loaded.
    #[error("content error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: bermudia_core::CatalogError,
    },

    /// Connecting to or migrating the database failed.
    #[error("database error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: bermudia_db::StoreError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("api error: {source}")]
    Api {
        /// The underlying server error.
        #[from]
        source: bermudia_api::ServerError,
    },
}
