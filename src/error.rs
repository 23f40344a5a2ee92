use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    /// A programming mistake by the grid's integrator: missing option,
    /// duplicate or over-long column id, unresolvable default. Fatal at
    /// configuration time, never tolerated at request time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request asked for something this grid does not offer (search
    /// without a configured searcher, AJAX entry without the AJAX marker).
    /// Maps to a not-found class response.
    #[error("client request error: {0}")]
    ClientRequest(String),

    #[error("query error: {0}")]
    Query(#[from] crate::query::QueryError),

    #[error("store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GridError>;
