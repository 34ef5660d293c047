//! Error types for the API client.
//!
//! # Design
//! `ClassifiedError` is the one failure vocabulary callers see, whether the
//! problem was detected by the transport, the status check or the envelope
//! decoder. Every variant carries the request that produced it so a caller
//! juggling several in-flight calls can tell them apart. Serialization of a
//! request body fails before any exchange exists and is reported separately
//! through `BuildError`.

use std::io;

use thiserror::Error;

use crate::envelope::ApiError;
use crate::http::{HttpRequest, ResponseMeta};

/// Why an exchange produced no response.
#[derive(Debug, Error)]
pub enum TransportFault {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Error reported by the HTTP library (DNS, TLS, protocol, timeout).
    #[error("{0}")]
    Http(String),

    /// The transport released the exchange without ever completing it.
    #[error("exchange was dropped before it completed")]
    Abandoned,
}

/// Why a success-status body could not be turned into the expected envelope.
#[derive(Debug, Error)]
pub enum DecodeFault {
    #[error("could not read response body: {0}")]
    Read(#[source] io::Error),

    #[error("malformed response body: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Classified outcome of a failed API call.
#[derive(Debug, Error)]
pub enum ClassifiedError {
    /// No response was received.
    #[error("request {request} failed before a response was received: {fault}")]
    TransportFailure {
        request: HttpRequest,
        #[source]
        fault: TransportFault,
    },

    /// A response arrived with a status outside 2xx.
    #[error("request {request} returned status {}", .response.status)]
    StatusFailure {
        request: HttpRequest,
        response: ResponseMeta,
    },

    /// A 2xx body did not match the envelope shape or the expected payload.
    #[error("request {request} returned an undecodable body: {fault}")]
    DecodeFailure {
        request: HttpRequest,
        response: ResponseMeta,
        #[source]
        fault: DecodeFault,
    },

    /// A well-formed envelope with no errors and no data.
    #[error("request {request} returned an envelope without data")]
    EmptyPayloadFailure {
        request: HttpRequest,
        response: ResponseMeta,
    },

    /// The server rejected the call inside a 2xx envelope.
    #[error("request {request} was rejected: {}", describe(.errors))]
    ApplicationError {
        request: HttpRequest,
        errors: Vec<ApiError>,
    },
}

impl ClassifiedError {
    /// The request whose exchange failed.
    pub fn request(&self) -> &HttpRequest {
        match self {
            ClassifiedError::TransportFailure { request, .. }
            | ClassifiedError::StatusFailure { request, .. }
            | ClassifiedError::DecodeFailure { request, .. }
            | ClassifiedError::EmptyPayloadFailure { request, .. }
            | ClassifiedError::ApplicationError { request, .. } => request,
        }
    }

    /// Status code, when a response was received and its status kept.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClassifiedError::StatusFailure { response, .. }
            | ClassifiedError::DecodeFailure { response, .. }
            | ClassifiedError::EmptyPayloadFailure { response, .. } => Some(response.status),
            ClassifiedError::TransportFailure { .. } | ClassifiedError::ApplicationError { .. } => {
                None
            }
        }
    }

    /// True for a 401, the signal that the bearer token needs refreshing.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClassifiedError::StatusFailure { response, .. } if response.status == 401)
    }

    /// Application-level errors, empty for every other kind.
    pub fn api_errors(&self) -> &[ApiError] {
        match self {
            ClassifiedError::ApplicationError { errors, .. } => errors,
            _ => &[],
        }
    }
}

fn describe(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(|e| format!("[{}] {}: {}", e.code, e.key, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A request could not be built.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),
}
