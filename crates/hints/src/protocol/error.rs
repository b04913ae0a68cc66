use std::error::Error as StdError;
use std::io;

use http::StatusCode;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("handler contract violation: {reason}")]
    ContractViolation { reason: String },

    #[error("handler failed: {source}")]
    HandlerFailure { source: BoxError },
}

impl HttpError {
    pub fn contract_violation<S: ToString>(str: S) -> Self {
        Self::ContractViolation { reason: str.to_string() }
    }

    pub fn handler<E: Into<BoxError>>(e: E) -> Self {
        Self::HandlerFailure { source: e.into() }
    }

    /// Returns true if the connection failed underneath the response
    pub fn is_io(&self) -> bool {
        matches!(self, Self::ResponseError { source: SendError::Io { .. } })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("no reason phrase for status code {status}")]
    UnknownStatus { status: u16 },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("connection is closed")]
    Closed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn unknown_status(status: StatusCode) -> Self {
        Self::UnknownStatus { status: status.as_u16() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}
