//! Error types for the employee service.
//!
//! This module defines the central [`Error`] enum, which captures every
//! failure a handler can report, and [`classify`], the single pure function
//! deciding which gRPC status code each failure is delivered with. The
//! `From<Error>` implementation for [`tonic::Status`] goes through `classify`,
//! so handlers only ever return `Error` and `?` does the rest.
//!
//! ## Error Cases
//! - `NotFound`: the requested employee (or any employee at all) is absent.
//! - `Internal`: the record store or an internal step failed; carries the
//!   operation context and the underlying cause.
//! - `StreamInterrupted`: a long-lived stream was cut short by the server.
//! - `RequestCancelled`: the client went away while a stream was producing.
//! - `ChannelError`: an internal channel between tasks closed unexpectedly.
//! - `InvalidRequest`: the client request exceeded a configured limit.
//! - `ServiceShutdown`: a streaming call arrived while the service was
//!   shutting down.

use core::fmt;
use tonic::{Code, Status};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the employee service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// No record matched. The message is delivered verbatim.
    #[error("{message}")]
    NotFound { message: String },

    /// An unexpected failure, usually from the record store.
    #[error("{context}: {cause}")]
    Internal { context: String, cause: String },

    /// The server terminated a stream before it finished.
    #[error("Stream interrupted: {reason}")]
    StreamInterrupted { reason: String },

    /// The client aborted the request.
    #[error("Request cancelled by client")]
    RequestCancelled,

    /// Internal channel send/receive failure.
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The client request was invalid or exceeded constraints.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Wraps an underlying failure with the operation that was attempted.
    pub fn internal(context: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::Internal {
            context: context.into(),
            cause: cause.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. } | Self::ChannelError { .. } => ErrorKind::InternalFailure,
            Self::StreamInterrupted { .. } | Self::RequestCancelled => {
                ErrorKind::StreamCancellationOrInterruption
            }
            Self::InvalidRequest { .. } => ErrorKind::Validation,
            Self::ServiceShutdown => ErrorKind::Unavailable,
        }
    }
}

/// Coarse failure categories, independent of the wire protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InternalFailure,
    StreamCancellationOrInterruption,
    Validation,
    Unavailable,
}

/// Maps a service error to the gRPC status code it is reported with.
///
/// Interruptions are split by origin: a server-side interruption is
/// `ABORTED`, a client-side cancellation is `CANCELLED`.
pub fn classify(err: &Error) -> Code {
    match (err.kind(), err) {
        (ErrorKind::NotFound, _) => Code::NotFound,
        (ErrorKind::InternalFailure, _) => Code::Internal,
        (ErrorKind::StreamCancellationOrInterruption, Error::RequestCancelled) => Code::Cancelled,
        (ErrorKind::StreamCancellationOrInterruption, _) => Code::Aborted,
        (ErrorKind::Validation, _) => Code::InvalidArgument,
        (ErrorKind::Unavailable, _) => Code::Unavailable,
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        Status::new(classify(&err), err.to_string())
    }
}
