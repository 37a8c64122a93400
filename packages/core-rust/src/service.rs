//! Seams between the message model and its collaborators.
//!
//! [`AttributeService`] is the transport collaborator: it takes ownership of a
//! request and eventually yields the matching response. [`ServiceRequest`] and
//! [`ServiceResponse`] let the validators and the result aggregator treat the
//! four services uniformly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::ValidationError;
use crate::header::{RequestHeader, ResponseHeader};
use crate::messages::{
    HistoryReadRequest, HistoryReadResponse, HistoryUpdateRequest, HistoryUpdateResponse,
    ReadRequest, ReadResponse, WriteRequest, WriteResponse,
};
use crate::status::StatusCode;

/// Transport for the attribute service set.
///
/// Implementations must preserve positional correspondence between request
/// items and response results, including across any retry they perform.
#[async_trait]
pub trait AttributeService: Send + Sync {
    async fn read(&self, request: ReadRequest) -> anyhow::Result<ReadResponse>;

    async fn write(&self, request: WriteRequest) -> anyhow::Result<WriteResponse>;

    async fn history_read(&self, request: HistoryReadRequest)
        -> anyhow::Result<HistoryReadResponse>;

    async fn history_update(
        &self,
        request: HistoryUpdateRequest,
    ) -> anyhow::Result<HistoryUpdateResponse>;
}

#[async_trait]
impl<T: AttributeService + ?Sized> AttributeService for Arc<T> {
    async fn read(&self, request: ReadRequest) -> anyhow::Result<ReadResponse> {
        (**self).read(request).await
    }

    async fn write(&self, request: WriteRequest) -> anyhow::Result<WriteResponse> {
        (**self).write(request).await
    }

    async fn history_read(&self, request: HistoryReadRequest)
        -> anyhow::Result<HistoryReadResponse> {
        (**self).history_read(request).await
    }

    async fn history_update(
        &self,
        request: HistoryUpdateRequest,
    ) -> anyhow::Result<HistoryUpdateResponse> {
        (**self).history_update(request).await
    }
}

/// A request of one of the attribute services.
pub trait ServiceRequest {
    type Response: ServiceResponse;

    /// Service name used in errors and logs.
    const SERVICE: &'static str;

    fn request_header(&self) -> &RequestHeader;

    fn context(&self) -> Option<&RequestContext>;

    /// Number of items in the request's input array.
    fn item_count(&self) -> usize;

    /// Rejects requests that must not be submitted.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidArgument` describing the first problem found.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Checks a response against this request before it is handed to a caller.
    ///
    /// # Errors
    ///
    /// Returns a protocol-violation variant of `ValidationError` when array
    /// lengths or payload kinds do not line up with the request.
    fn validate_response(&self, response: &Self::Response) -> Result<(), ValidationError>;
}

/// A response of one of the attribute services.
pub trait ServiceResponse {
    fn response_header(&self) -> &ResponseHeader;

    fn result_count(&self) -> usize;

    fn diagnostic_count(&self) -> usize;

    /// Every per-item status in the response, including nested operation results.
    fn item_statuses(&self) -> Vec<StatusCode>;
}

/// Diagnostics are either absent or parallel to their results.
pub(crate) fn check_diagnostics(
    service: &'static str,
    results: usize,
    diagnostics: usize,
) -> Result<(), ValidationError> {
    if diagnostics == 0 || diagnostics == results {
        Ok(())
    } else {
        Err(ValidationError::DiagnosticsMismatch {
            service,
            results,
            diagnostics,
        })
    }
}

/// Shared response checks: diagnostics length always, result count unless the
/// service-level result is Bad.
///
/// Returns `false` when the service failed and per-item checks must be skipped.
pub(crate) fn check_envelope<R: ServiceResponse>(
    service: &'static str,
    expected: usize,
    response: &R,
) -> Result<bool, ValidationError> {
    check_diagnostics(service, response.result_count(), response.diagnostic_count())?;
    if response.response_header().service_result.is_bad() {
        return Ok(false);
    }
    if response.result_count() != expected {
        return Err(ValidationError::ResultCountMismatch {
            service,
            expected,
            actual: response.result_count(),
        });
    }
    Ok(true)
}
