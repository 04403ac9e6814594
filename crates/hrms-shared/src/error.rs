use thiserror::Error;

/// Why an untrusted payload was rejected at the ingestion boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for field `{0}`")]
    InvalidField(&'static str),

    #[error("unknown push event `{0}`")]
    UnknownEvent(String),

    #[error("malformed frame: {0}")]
    Malformed(String),
}
