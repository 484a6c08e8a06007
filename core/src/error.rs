//! Error types for the question gateway.
//!
//! # Design
//! `InvalidEndpoint` and `EncodeFailure` are raised while building a request,
//! so they never involve the network. `InvalidResponse` covers any exchange
//! that completed but produced nothing decodable. `Transport` keeps the
//! underlying cause reachable through `source()`.

use std::error::Error;
use std::fmt;

use crate::transport::TransportError;

/// Errors returned by `QuestionGateway`.
#[derive(Debug)]
pub enum GatewayError {
    /// The configured base URL cannot produce a valid request URL.
    InvalidEndpoint(String),

    /// The outgoing question could not be encoded.
    EncodeFailure(String),

    /// The response body was missing, undecodable, or came with a non-2xx
    /// status.
    InvalidResponse { status: u16, reason: String },

    /// The request never produced a response.
    Transport(TransportError),
}

/// Coarse classification of a `GatewayError`, cheap to copy into UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidEndpoint,
    EncodeFailure,
    InvalidResponse,
    Transport,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidEndpoint(_) => ErrorKind::InvalidEndpoint,
            GatewayError::EncodeFailure(_) => ErrorKind::EncodeFailure,
            GatewayError::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            GatewayError::Transport(_) => ErrorKind::Transport,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::InvalidEndpoint(msg) => write!(f, "invalid endpoint: {msg}"),
            GatewayError::EncodeFailure(msg) => write!(f, "could not encode question: {msg}"),
            GatewayError::InvalidResponse { status, reason } => {
                write!(f, "invalid response (HTTP {status}): {reason}")
            }
            GatewayError::Transport(err) => write!(f, "request failed: {err}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GatewayError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        GatewayError::Transport(err)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidEndpoint => "invalid endpoint",
            ErrorKind::EncodeFailure => "encode failure",
            ErrorKind::InvalidResponse => "invalid response",
            ErrorKind::Transport => "transport",
        };
        f.write_str(name)
    }
}
