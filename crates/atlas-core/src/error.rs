use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the library.
///
/// Workflow batches record per-item failures as strings on the work item
/// instead of aborting, so most variants here are only seen when a storage
/// primitive or a whole-workflow step fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid resource identifier '{id}': {reason}")]
    InvalidIdentifier { id: String, reason: &'static str },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("malformed markup: {0}")]
    Markup(String),

    #[error("markup error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to encode or decode '{id}': {source}")]
    Codec {
        id: String,
        #[source]
        source: quick_xml::DeError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(String),
}
