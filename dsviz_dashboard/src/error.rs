use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported scheme {0:?} (expected http, https, ws or wss)")]
    UnsupportedScheme(String),
    #[error("unknown filter {0:?} (expected all, list, stack, queue or binary_tree)")]
    UnknownFilter(String),
}

/// Why an inbound frame never reached the store.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown message kind {0:?}")]
    UnknownKind(String),
    #[error("bad {kind} payload: {source}")]
    BadPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("{0}")]
    BadFilter(String),
}
