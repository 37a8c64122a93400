//! Error taxonomy for the attribute services.
//!
//! Per-item failures are not errors: they travel as status codes inside the
//! response arrays. The types here cover what must be rejected at the boundary
//! before any array indexing happens.

use crate::status::StatusCode;

/// A malformed request (caller error) or a malformed response (protocol violation).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The caller built a request that must not be submitted.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The response does not carry exactly one result per requested item.
    #[error("{service} response carries {actual} results for {expected} requested items")]
    ResultCountMismatch {
        service: &'static str,
        expected: usize,
        actual: usize,
    },

    /// `diagnostic_infos` is neither empty nor parallel to its results.
    #[error("{service} response carries {diagnostics} diagnostic infos for {results} results")]
    DiagnosticsMismatch {
        service: &'static str,
        results: usize,
        diagnostics: usize,
    },

    /// A history update result does not carry one operation result per sub-item.
    #[error(
        "history update result {index} carries {actual} operation results for {expected} sub-items"
    )]
    OperationResultMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// A history read result carries a payload of a different kind than the details asked for.
    #[error("history read result {index} carries {found} data for {requested} details")]
    HistoryDataMismatch {
        index: usize,
        requested: &'static str,
        found: &'static str,
    },

    /// A read result reports Good without a value.
    #[error("read result {index} is Good but carries no value")]
    GoodWithoutValue { index: usize },
}

impl ValidationError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// True for errors in a request the caller built.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// True for errors in a response the server (or transport) produced.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        !self.is_caller_error()
    }
}

/// Failure of a whole service call as seen by a client.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The service-level result was Bad; per-item arrays are not authoritative.
    #[error("service call failed: {0}")]
    Fault(StatusCode),

    #[error(transparent)]
    Continuation(#[from] ContinuationError),

    #[error("transport failure: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Misuse of a history-read continuation sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContinuationError {
    /// Read details may not change while any node holds an open continuation point.
    #[error("read details cannot change while {open} continuation points are open")]
    DetailsChanged { open: usize },

    #[error("no node at index {0} in this sequence")]
    UnknownNode(usize),

    /// A response arrived with no request outstanding.
    #[error("no history read request is outstanding")]
    NothingInFlight,

    /// The previous request has not been answered or abandoned yet.
    #[error("a history read request is already outstanding")]
    RequestInFlight,

    /// The server kept returning continuation points past the round-trip cap.
    #[error("history read still incomplete after {0} round trips")]
    TooManyRoundTrips(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ValidationError::invalid("x").is_caller_error());
        let mismatch = ValidationError::DiagnosticsMismatch {
            service: "Read",
            results: 2,
            diagnostics: 1,
        };
        assert!(mismatch.is_protocol_violation());
        assert_eq!(
            mismatch.to_string(),
            "Read response carries 1 diagnostic infos for 2 results"
        );
    }

    #[test]
    fn service_error_wraps_validation_transparently() {
        let err: ServiceError = ValidationError::invalid("nodesToRead is empty").into();
        assert_eq!(err.to_string(), "invalid argument: nodesToRead is empty");
    }
}
