//! Validating client over an [`AttributeService`] transport.
//!
//! Requests are checked before submission so caller errors never reach the
//! transport. Responses are checked against the request that produced them
//! before any result array is handed out, and a Bad service-level result is
//! surfaced as [`ServiceError::Fault`] so callers cannot index into arrays the
//! server did not vouch for.

use tracing::{debug, info_span, warn, Instrument};

use crate::aggregate::ResultPolicy;
use crate::context::RequestContext;
use crate::continuation::{HistoryPage, HistoryReadSequence};
use crate::error::{ContinuationError, ServiceError};
use crate::identifiers::NodeId;
use crate::messages::{
    HistoryData, HistoryReadDetails, HistoryReadRequest, HistoryReadResponse, HistoryReadValueId,
    HistoryUpdateRequest, HistoryUpdateResponse, ReadRequest, ReadResponse, WriteRequest,
    WriteResponse,
};
use crate::service::{AttributeService, ServiceRequest, ServiceResponse};
use crate::status::StatusCode;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Policy applied by [`AttributeClient::is_good`].
    pub policy: ResultPolicy,
    /// Upper bound on round trips made by [`AttributeClient::read_history_to_end`].
    pub max_history_round_trips: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            policy: ResultPolicy::STRICT,
            max_history_round_trips: 1000,
        }
    }
}

/// A validated response together with the caller's correlation token.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion<R> {
    pub context: Option<RequestContext>,
    pub response: R,
}

impl<R> Completion<R> {
    #[must_use]
    pub fn into_response(self) -> R {
        self.response
    }
}

/// Everything read for one node by [`AttributeClient::read_history_to_end`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHistory {
    pub node_id: NodeId,
    /// Status of the last round trip for this node.
    pub status: StatusCode,
    /// Pages concatenated in the order they arrived.
    pub data: Option<HistoryData>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AttributeClient<S> {
    service: S,
    options: ClientOptions,
}

impl<S: AttributeService> AttributeClient<S> {
    #[must_use]
    pub fn new(service: S) -> Self {
        Self::with_options(service, ClientOptions::default())
    }

    #[must_use]
    pub fn with_options(service: S, options: ClientOptions) -> Self {
        Self { service, options }
    }

    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Aggregate verdict for `response` under this client's policy.
    #[must_use]
    pub fn is_good<Q: ServiceRequest>(&self, request: &Q, response: &Q::Response) -> bool {
        self.options.policy.is_good_for(request, response)
    }

    /// # Errors
    ///
    /// See [`ServiceError`]: invalid request, transport failure, Bad service
    /// result, or a response that does not match the request.
    pub async fn read(&self, request: ReadRequest) -> Result<Completion<ReadResponse>, ServiceError> {
        prepare(&request)?;
        let span = info_span!("read", nodes = request.item_count());
        let response = self.service.read(request.clone()).instrument(span).await?;
        finish(request, response)
    }

    /// # Errors
    ///
    /// See [`AttributeClient::read`].
    pub async fn write(&self, request: WriteRequest) -> Result<Completion<WriteResponse>, ServiceError> {
        prepare(&request)?;
        let span = info_span!("write", nodes = request.item_count());
        let response = self.service.write(request.clone()).instrument(span).await?;
        finish(request, response)
    }

    /// One history read round trip. Continuation points in the response are
    /// left for the caller to resume or release.
    ///
    /// # Errors
    ///
    /// See [`AttributeClient::read`].
    pub async fn history_read(
        &self,
        request: HistoryReadRequest,
    ) -> Result<Completion<HistoryReadResponse>, ServiceError> {
        prepare(&request)?;
        let span = info_span!(
            "history_read",
            nodes = request.item_count(),
            details = request.history_read_details.name(),
            release = request.release_continuation_points,
        );
        let response = self
            .service
            .history_read(request.clone())
            .instrument(span)
            .await?;
        finish(request, response)
    }

    /// # Errors
    ///
    /// See [`AttributeClient::read`].
    pub async fn history_update(
        &self,
        request: HistoryUpdateRequest,
    ) -> Result<Completion<HistoryUpdateResponse>, ServiceError> {
        prepare(&request)?;
        let span = info_span!("history_update", operations = request.item_count());
        let response = self
            .service
            .history_update(request.clone())
            .instrument(span)
            .await?;
        finish(request, response)
    }

    /// Issues one round trip of `sequence` and applies the response to it.
    ///
    /// Returns `Ok(None)` when the sequence had nothing left to read.
    ///
    /// # Errors
    ///
    /// Any error of [`AttributeClient::history_read`]; the outstanding
    /// request is abandoned so the sequence can be retried or released.
    pub async fn step(
        &self,
        sequence: &mut HistoryReadSequence,
    ) -> Result<Option<Vec<HistoryPage>>, ServiceError> {
        let Some(request) = sequence.next_request()? else {
            return Ok(None);
        };
        match self.history_read(request).await {
            Ok(done) => sequence.apply(done.response).map(Some),
            Err(err) => {
                sequence.abandon();
                Err(err)
            }
        }
    }

    /// Releases every cursor `sequence` still holds on the server.
    ///
    /// # Errors
    ///
    /// Any error of [`AttributeClient::history_read`].
    pub async fn release(&self, sequence: &mut HistoryReadSequence) -> Result<(), ServiceError> {
        let Some(request) = sequence.release_request()? else {
            return Ok(());
        };
        match self.history_read(request).await {
            Ok(done) => sequence.apply(done.response).map(|_| ()),
            Err(err) => {
                sequence.abandon();
                Err(err)
            }
        }
    }

    /// Reads `nodes` until every node is exhausted or failed, following
    /// continuation points.
    ///
    /// Results are in `nodes` order. A node that fails mid-way keeps the pages
    /// it already returned and reports the failing status; the cursor it may
    /// have left on the server is released before returning.
    ///
    /// # Errors
    ///
    /// - `ContinuationError::TooManyRoundTrips` when the server keeps returning
    ///   continuation points; open cursors are released first.
    /// - Any error of [`AttributeClient::history_read`]; open cursors are
    ///   released on a best-effort basis.
    pub async fn read_history_to_end(
        &self,
        details: HistoryReadDetails,
        nodes: Vec<NodeId>,
    ) -> Result<Vec<NodeHistory>, ServiceError> {
        let mut sequence =
            HistoryReadSequence::new(details, nodes.into_iter().map(HistoryReadValueId::new).collect());
        let mut collected: Vec<NodeHistory> = sequence
            .nodes()
            .iter()
            .map(|n| NodeHistory {
                node_id: n.node_id.clone(),
                status: StatusCode::Good,
                data: None,
            })
            .collect();

        let mut round_trips = 0;
        loop {
            if round_trips == self.options.max_history_round_trips && !sequence.is_complete() {
                warn!(round_trips, open = sequence.open_count(), "history read round-trip cap reached");
                self.release(&mut sequence).await?;
                return Err(ContinuationError::TooManyRoundTrips(round_trips).into());
            }
            let pages = match self.step(&mut sequence).await {
                Ok(Some(pages)) => pages,
                Ok(None) => break,
                Err(err) => {
                    if let Err(release_err) = self.release(&mut sequence).await {
                        debug!(error = %release_err, "release after failed history read also failed");
                    }
                    return Err(err);
                }
            };
            round_trips += 1;
            for page in pages {
                let entry = &mut collected[page.node_index];
                entry.status = page.status;
                let Some(more) = page.data else { continue };
                if let Some(acc) = entry.data.as_mut() {
                    if !acc.extend(more) {
                        warn!(node = %entry.node_id, "history page kind changed mid-sequence; page dropped");
                    }
                } else {
                    entry.data = Some(more);
                }
            }
        }
        if let Err(err) = self.release(&mut sequence).await {
            debug!(error = %err, "releasing cursors of failed nodes failed");
        }
        debug!(round_trips, nodes = collected.len(), "history read complete");
        Ok(collected)
    }
}

// ---------------------------------------------------------------------------
// Shared request/response checks
// ---------------------------------------------------------------------------

fn prepare<Q: ServiceRequest>(request: &Q) -> Result<(), ServiceError> {
    request.validate().map_err(|err| {
        debug!(service = Q::SERVICE, error = %err, "request rejected before submission");
        ServiceError::from(err)
    })
}

fn finish<Q: ServiceRequest>(
    request: Q,
    response: Q::Response,
) -> Result<Completion<Q::Response>, ServiceError> {
    if let Err(err) = request.validate_response(&response) {
        warn!(service = Q::SERVICE, error = %err, "malformed response");
        return Err(err.into());
    }
    let service_result = response.response_header().service_result;
    if service_result.is_bad() {
        warn!(service = Q::SERVICE, %service_result, "service call failed");
        return Err(ServiceError::Fault(service_result));
    }
    debug!(service = Q::SERVICE, results = response.result_count(), "service call complete");
    Ok(Completion {
        context: request.context().cloned(),
        response,
    })
}
