//! Client side of the history-read continuation protocol.
//!
//! Each node in a sequence moves through
//!
//! ```text
//! Initial --read--> InProgress(token) --read--> ... --read--> Exhausted
//!    |                   |    \
//!    |                   |     `--release--> Released
//!    `---(Bad status)----+--> Failed(status)
//! ```
//!
//! Tokens are opaque and owned by the server; the sequence only carries them
//! from one response into the next request. All cursor state lives in the
//! sequence value itself, so independent sequences (even over the same node)
//! never interfere.
//!
//! An expired or unknown token comes back as `BadContinuationPointInvalid` and
//! moves the node to `Failed`: the position is lost and the node has to be
//! [`restart`](HistoryReadSequence::restart)ed from `Initial`. Any other Bad
//! status on a node that was `InProgress` also fails it, but the server may
//! still hold that cursor, so its token stays queued for the next release.

use tracing::{debug, warn};

use crate::data_value::TimestampsToReturn;
use crate::error::{ContinuationError, ServiceError, ValidationError};
use crate::identifiers::ByteString;
use crate::messages::{
    HistoryData, HistoryReadDetails, HistoryReadRequest, HistoryReadResponse, HistoryReadValueId,
};
use crate::status::StatusCode;

/// Where one node of a sequence stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationState {
    /// Nothing read yet; the next read starts at the beginning of the range.
    Initial,
    /// The server holds a cursor; resume with this token.
    InProgress(ByteString),
    /// All data has been read.
    Exhausted,
    /// The cursor was abandoned through a release request.
    Released,
    /// The node failed with this status; its position is lost.
    Failed(StatusCode),
}

impl ContinuationState {
    /// True while the server holds a cursor for the node.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::InProgress(_))
    }

    /// True when the node still has reads to issue.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Initial | Self::InProgress(_))
    }
}

/// Data returned for one node by one round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    /// Index of the node in the sequence (not in the request).
    pub node_index: usize,
    pub status: StatusCode,
    pub data: Option<HistoryData>,
}

#[derive(Debug, Clone)]
struct InFlight {
    /// Sequence index of each request entry, in request order.
    nodes: Vec<usize>,
    release: bool,
}

/// A multi-round-trip history read over a fixed set of nodes and fixed details.
#[derive(Debug, Clone)]
pub struct HistoryReadSequence {
    details: HistoryReadDetails,
    timestamps_to_return: TimestampsToReturn,
    nodes: Vec<HistoryReadValueId>,
    states: Vec<ContinuationState>,
    /// Tokens of failed nodes that the server may still hold.
    held: Vec<Option<ByteString>>,
    in_flight: Option<InFlight>,
}

impl HistoryReadSequence {
    /// Starts a sequence. Nodes that already carry a continuation point resume
    /// from it; all others start `Initial`.
    #[must_use]
    pub fn new(details: HistoryReadDetails, mut nodes: Vec<HistoryReadValueId>) -> Self {
        let states = nodes
            .iter_mut()
            .map(|node| {
                let token = std::mem::take(&mut node.continuation_point);
                if token.is_empty() {
                    ContinuationState::Initial
                } else {
                    ContinuationState::InProgress(token)
                }
            })
            .collect();
        let held = vec![None; nodes.len()];
        Self {
            details,
            timestamps_to_return: TimestampsToReturn::Both,
            nodes,
            states,
            held,
            in_flight: None,
        }
    }

    #[must_use]
    pub fn with_timestamps(mut self, timestamps_to_return: TimestampsToReturn) -> Self {
        self.timestamps_to_return = timestamps_to_return;
        self
    }

    #[must_use]
    pub fn details(&self) -> &HistoryReadDetails {
        &self.details
    }

    #[must_use]
    pub fn nodes(&self) -> &[HistoryReadValueId] {
        &self.nodes
    }

    #[must_use]
    pub fn states(&self) -> &[ContinuationState] {
        &self.states
    }

    #[must_use]
    pub fn state(&self, index: usize) -> Option<&ContinuationState> {
        self.states.get(index)
    }

    /// Number of cursors the server may still hold for this sequence,
    /// including those of failed nodes awaiting release.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_open()).count() + self.held.iter().flatten().count()
    }

    /// True when no node has reads left to issue.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.states.iter().any(ContinuationState::is_pending)
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Builds the next read for every pending node.
    ///
    /// Returns `Ok(None)` when the sequence is complete. The sequence expects
    /// the response to this request (or [`abandon`](Self::abandon)) next.
    ///
    /// # Errors
    ///
    /// Returns `ContinuationError::RequestInFlight` if the previous request is
    /// still unanswered.
    pub fn next_request(&mut self) -> Result<Option<HistoryReadRequest>, ContinuationError> {
        if self.in_flight.is_some() {
            return Err(ContinuationError::RequestInFlight);
        }
        let pending: Vec<usize> = (0..self.states.len())
            .filter(|&i| self.states[i].is_pending())
            .collect();
        if pending.is_empty() {
            return Ok(None);
        }
        let nodes_to_read = pending
            .iter()
            .map(|&i| {
                let mut node = self.nodes[i].clone();
                if let ContinuationState::InProgress(token) = &self.states[i] {
                    node.continuation_point = token.clone();
                }
                node
            })
            .collect();
        let mut request = HistoryReadRequest::new(self.details.clone(), nodes_to_read);
        request.timestamps_to_return = self.timestamps_to_return;
        self.in_flight = Some(InFlight {
            nodes: pending,
            release: false,
        });
        Ok(Some(request))
    }

    /// Builds a request releasing every open cursor, and the cursors failed
    /// nodes may have left behind.
    ///
    /// Returns `Ok(None)` when no cursor is open.
    ///
    /// # Errors
    ///
    /// Returns `ContinuationError::RequestInFlight` if the previous request is
    /// still unanswered.
    pub fn release_request(&mut self) -> Result<Option<HistoryReadRequest>, ContinuationError> {
        if self.in_flight.is_some() {
            return Err(ContinuationError::RequestInFlight);
        }
        let mut entries: Vec<(usize, ByteString)> = Vec::new();
        for i in 0..self.states.len() {
            if let ContinuationState::InProgress(token) = &self.states[i] {
                entries.push((i, token.clone()));
            }
            if let Some(token) = &self.held[i] {
                entries.push((i, token.clone()));
            }
        }
        if entries.is_empty() {
            return Ok(None);
        }
        let tokens = entries
            .iter()
            .map(|(i, token)| (self.nodes[*i].node_id.clone(), token.clone()));
        let mut request = HistoryReadRequest::release(self.details.clone(), tokens);
        request.timestamps_to_return = self.timestamps_to_return;
        self.in_flight = Some(InFlight {
            nodes: entries.into_iter().map(|(i, _)| i).collect(),
            release: true,
        });
        Ok(Some(request))
    }

    /// Forgets the outstanding request without changing any node state.
    ///
    /// Open cursors stay open server-side until released or expired.
    pub fn abandon(&mut self) {
        self.in_flight = None;
    }

    /// Applies the response to the outstanding request.
    ///
    /// Returns one page per request entry, in request order. A release
    /// returns no pages.
    ///
    /// # Errors
    ///
    /// - `ContinuationError::NothingInFlight` if no request is outstanding.
    /// - `ServiceError::Fault` if the service result is Bad; node states are
    ///   unchanged and the request is no longer outstanding.
    /// - `ServiceError::Validation` if the response does not line up with the
    ///   request; node states are unchanged.
    pub fn apply(&mut self, response: HistoryReadResponse) -> Result<Vec<HistoryPage>, ServiceError> {
        let in_flight = self
            .in_flight
            .take()
            .ok_or(ContinuationError::NothingInFlight)?;

        let service_result = response.header.service_result;
        if service_result.is_bad() {
            warn!(%service_result, nodes = in_flight.nodes.len(), "history read failed at service level");
            return Err(ServiceError::Fault(service_result));
        }
        if response.results.len() != in_flight.nodes.len() {
            return Err(ValidationError::ResultCountMismatch {
                service: "HistoryRead",
                expected: in_flight.nodes.len(),
                actual: response.results.len(),
            }
            .into());
        }

        if in_flight.release {
            // Release is idempotent: an already-expired cursor is gone either way.
            for &i in &in_flight.nodes {
                self.held[i] = None;
                if self.states[i].is_open() {
                    self.states[i] = ContinuationState::Released;
                }
            }
            debug!(released = in_flight.nodes.len(), "continuation points released");
            return Ok(Vec::new());
        }

        for (index, result) in response.results.iter().enumerate() {
            if let Some(data) = &result.history_data {
                if !self.details.accepts(data) {
                    return Err(ValidationError::HistoryDataMismatch {
                        index,
                        requested: self.details.name(),
                        found: data.name(),
                    }
                    .into());
                }
            }
        }

        let mut pages = Vec::with_capacity(response.results.len());
        for (&i, result) in in_flight.nodes.iter().zip(response.results) {
            let status = result.status_code;
            let previous = std::mem::replace(&mut self.states[i], ContinuationState::Initial);
            self.states[i] = if status.is_bad() {
                if status.matches(StatusCode::BadContinuationPointInvalid) {
                    warn!(node = %self.nodes[i].node_id, "continuation point rejected, node must restart");
                } else if let ContinuationState::InProgress(token) = previous {
                    debug!(node = %self.nodes[i].node_id, %status, "node failed mid-sequence, cursor kept for release");
                    self.held[i] = Some(token);
                }
                ContinuationState::Failed(status)
            } else if result.has_more() {
                ContinuationState::InProgress(result.continuation_point)
            } else {
                ContinuationState::Exhausted
            };
            pages.push(HistoryPage {
                node_index: i,
                status,
                data: result.history_data,
            });
        }
        Ok(pages)
    }

    /// Puts a finished node back to `Initial` so the next request re-reads it
    /// from the start.
    ///
    /// # Errors
    ///
    /// - `ContinuationError::UnknownNode` for an index outside the sequence.
    /// - `ContinuationError::RequestInFlight` while a request is outstanding.
    pub fn restart(&mut self, index: usize) -> Result<(), ContinuationError> {
        if self.in_flight.is_some() {
            return Err(ContinuationError::RequestInFlight);
        }
        let state = self
            .states
            .get_mut(index)
            .ok_or(ContinuationError::UnknownNode(index))?;
        *state = ContinuationState::Initial;
        Ok(())
    }

    /// Replaces the read details and restarts every node.
    ///
    /// # Errors
    ///
    /// - `ContinuationError::DetailsChanged` while any cursor is open; release
    ///   them first.
    /// - `ContinuationError::RequestInFlight` while a request is outstanding.
    pub fn change_details(&mut self, details: HistoryReadDetails) -> Result<(), ContinuationError> {
        if self.in_flight.is_some() {
            return Err(ContinuationError::RequestInFlight);
        }
        let open = self.open_count();
        if open > 0 {
            return Err(ContinuationError::DetailsChanged { open });
        }
        self.details = details;
        self.states.fill(ContinuationState::Initial);
        Ok(())
    }
}
