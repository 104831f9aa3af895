use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ws bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("no structure with id {0:?}")]
    UnknownStructure(String),
    #[error("{op} does not apply to {id} ({kind})")]
    WrongKind {
        id: String,
        op: &'static str,
        kind: &'static str,
    },
    #[error("{op} on empty {id}")]
    Empty { id: String, op: &'static str },
}
