use thiserror::Error;

/// Main error type for artistgraph
#[derive(Error, Debug)]
pub enum ArtistGraphError {
    /// A seed query matched no artist in the catalog
    #[error("Resolution error: no artist matched query {0:?}")]
    Resolution(String),

    /// Transport, HTTP status, rate limit or timeout failure from the catalog provider
    #[error("Provider error: {0}")]
    Provider(String),

    /// The graph store could not be reached or did not answer in time
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A node or edge with the same identity already exists in the store
    #[error("Conflict: {0} already exists")]
    Conflict(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider response or stored record with an unexpected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The run was cancelled before it completed
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Convenient Result type using ArtistGraphError
pub type Result<T> = std::result::Result<T, ArtistGraphError>;
