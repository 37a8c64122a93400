//! In-memory implementation of the attribute service set.
//!
//! [`MemoryServer`] serves an [`AddressSpace`] through the [`AttributeService`]
//! transport trait. Every call is answered:
//!
//! 1. **Admission**: empty input fails with `BadNothingToDo`, oversized input
//!    with `BadTooManyOperations`; result arrays are then left empty.
//! 2. **Per-item processing**: each item gets exactly one result slot, in
//!    request order. Item failures never affect neighbouring items.
//! 3. **Diagnostics**: when the request asks for operation-level diagnostics,
//!    one `DiagnosticInfo` is returned per result.

pub mod config;
mod history_read;
mod history_update;
mod read;
mod write;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use ua_attribute_core::{
    AttributeService, ClockSource, DiagnosticInfo, HistoryReadRequest, HistoryReadResponse,
    HistoryUpdateRequest, HistoryUpdateResponse, ReadRequest, ReadResponse, RequestHeader,
    ResponseHeader, StatusCode, SystemClock, UtcTime, WriteRequest, WriteResponse,
};

use crate::address_space::AddressSpace;
use crate::continuation::ContinuationRegistry;

pub use config::ServerConfig;

/// Return-diagnostics bits requesting operation-level diagnostics.
const OPERATION_DIAGNOSTICS_MASK: u32 = 0x0000_03E0;

pub struct MemoryServer {
    config: ServerConfig,
    space: Arc<AddressSpace>,
    continuations: ContinuationRegistry,
    clock: Arc<dyn ClockSource>,
}

impl MemoryServer {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds a server whose timestamps and cursor expiry follow `clock`.
    #[must_use]
    pub fn with_clock(config: ServerConfig, clock: Arc<dyn ClockSource>) -> Self {
        Self::with_address_space(config, Arc::new(AddressSpace::new()), clock)
    }

    #[must_use]
    pub fn with_address_space(
        config: ServerConfig,
        space: Arc<AddressSpace>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = config.continuation_point_timeout.as_millis() as u64;
        let continuations =
            ContinuationRegistry::new(Arc::clone(&clock), timeout_ms, config.max_continuation_points);
        Self {
            config,
            space,
            continuations,
            clock,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn address_space(&self) -> &Arc<AddressSpace> {
        &self.space
    }

    #[must_use]
    pub fn continuation_points(&self) -> &ContinuationRegistry {
        &self.continuations
    }

    fn now(&self) -> UtcTime {
        UtcTime::from_unix_millis(self.clock.now())
    }

    fn header(&self, request: &RequestHeader, service_result: StatusCode) -> ResponseHeader {
        ResponseHeader {
            timestamp: Some(self.now()),
            ..ResponseHeader::service_result(request, service_result)
        }
    }
}

/// Service-level admission check on the number of items.
fn admit(service: &'static str, count: usize, limit: usize) -> Result<(), StatusCode> {
    if count == 0 {
        debug!(service, "request has nothing to do");
        return Err(StatusCode::BadNothingToDo);
    }
    if count > limit {
        debug!(service, count, limit, "request exceeds operation limit");
        return Err(StatusCode::BadTooManyOperations);
    }
    Ok(())
}

/// One diagnostic per result when operation-level diagnostics were requested.
fn diagnostics(request: &RequestHeader, statuses: impl IntoIterator<Item = StatusCode>) -> Vec<DiagnosticInfo> {
    if request.return_diagnostics & OPERATION_DIAGNOSTICS_MASK == 0 {
        return Vec::new();
    }
    statuses
        .into_iter()
        .map(|status| DiagnosticInfo {
            additional_info: (!status.is_good()).then(|| status.to_string()),
            ..Default::default()
        })
        .collect()
}

#[async_trait]
impl AttributeService for MemoryServer {
    async fn read(&self, request: ReadRequest) -> anyhow::Result<ReadResponse> {
        if let Err(status) = admit("Read", request.nodes_to_read.len(), self.config.max_nodes_per_read) {
            return Ok(ReadResponse {
                header: self.header(&request.header, status),
                ..Default::default()
            });
        }
        if request.max_age.is_nan() || request.max_age < 0.0 {
            return Ok(ReadResponse {
                header: self.header(&request.header, StatusCode::BadMaxAgeInvalid),
                ..Default::default()
            });
        }
        let results: Vec<_> = request
            .nodes_to_read
            .iter()
            .map(|item| self.read_item(item, request.timestamps_to_return))
            .collect();
        let diagnostic_infos = diagnostics(&request.header, results.iter().map(|dv| dv.status()));
        Ok(ReadResponse {
            header: self.header(&request.header, StatusCode::Good),
            results,
            diagnostic_infos,
        })
    }

    async fn write(&self, request: WriteRequest) -> anyhow::Result<WriteResponse> {
        if let Err(status) = admit("Write", request.nodes_to_write.len(), self.config.max_nodes_per_write) {
            return Ok(WriteResponse {
                header: self.header(&request.header, status),
                ..Default::default()
            });
        }
        let results: Vec<_> = request
            .nodes_to_write
            .iter()
            .map(|item| self.write_item(item))
            .collect();
        let diagnostic_infos = diagnostics(&request.header, results.iter().copied());
        Ok(WriteResponse {
            header: self.header(&request.header, StatusCode::Good),
            results,
            diagnostic_infos,
        })
    }

    async fn history_read(&self, request: HistoryReadRequest) -> anyhow::Result<HistoryReadResponse> {
        let admitted = admit(
            "HistoryRead",
            request.nodes_to_read.len(),
            self.config.max_nodes_per_history_read,
        )
        .and_then(|()| history_read::check_timestamps(&request));
        if let Err(status) = admitted {
            return Ok(HistoryReadResponse {
                header: self.header(&request.header, status),
                ..Default::default()
            });
        }
        let results: Vec<_> = request
            .nodes_to_read
            .iter()
            .map(|item| self.history_read_item(&request, item))
            .collect();
        let diagnostic_infos = diagnostics(&request.header, results.iter().map(|r| r.status_code));
        Ok(HistoryReadResponse {
            header: self.header(&request.header, StatusCode::Good),
            results,
            diagnostic_infos,
        })
    }

    async fn history_update(&self, request: HistoryUpdateRequest) -> anyhow::Result<HistoryUpdateResponse> {
        if let Err(status) = admit(
            "HistoryUpdate",
            request.history_update_details.len(),
            self.config.max_nodes_per_history_update,
        ) {
            return Ok(HistoryUpdateResponse {
                header: self.header(&request.header, status),
                ..Default::default()
            });
        }
        let results: Vec<_> = request
            .history_update_details
            .iter()
            .map(|details| self.history_update_item(details))
            .collect();
        let diagnostic_infos = diagnostics(&request.header, results.iter().map(|r| r.status_code));
        Ok(HistoryUpdateResponse {
            header: self.header(&request.header, StatusCode::Good),
            results,
            diagnostic_infos,
        })
    }
}

#[cfg(test)]
mod tests {
    use ua_attribute_core::{DataValue, NodeId, ReadValueId, WriteValue};

    use super::*;
    use crate::address_space::VariableNode;

    fn server() -> MemoryServer {
        let server = MemoryServer::new(ServerConfig {
            max_nodes_per_read: 2,
            ..Default::default()
        });
        server
            .address_space()
            .insert(NodeId::numeric(2, 1), VariableNode::new(1.0));
        server
    }

    #[tokio::test]
    async fn empty_read_has_nothing_to_do() {
        let resp = server().read(ReadRequest::new(Vec::new())).await.unwrap();
        assert_eq!(resp.header.service_result, StatusCode::BadNothingToDo);
        assert!(resp.results.is_empty());
    }

    #[tokio::test]
    async fn oversized_read_is_refused() {
        let nodes = (0..3).map(|i| ReadValueId::new(NodeId::numeric(2, i))).collect();
        let resp = server().read(ReadRequest::new(nodes)).await.unwrap();
        assert_eq!(resp.header.service_result, StatusCode::BadTooManyOperations);
        assert!(resp.results.is_empty());
    }

    #[tokio::test]
    async fn negative_max_age_is_a_service_fault() {
        let mut req = ReadRequest::for_node(NodeId::numeric(2, 1));
        req.max_age = -5.0;
        let resp = server().read(req).await.unwrap();
        assert_eq!(resp.header.service_result, StatusCode::BadMaxAgeInvalid);
    }

    #[tokio::test]
    async fn response_echoes_request_handle() {
        let mut req = ReadRequest::for_node(NodeId::numeric(2, 1));
        req.header = RequestHeader::with_handle(77);
        let resp = server().read(req).await.unwrap();
        assert_eq!(resp.header.request_handle, 77);
        assert!(resp.diagnostic_infos.is_empty());
    }

    #[tokio::test]
    async fn operation_diagnostics_are_parallel_to_results() {
        let mut req = WriteRequest::new(vec![
            WriteValue::new(NodeId::numeric(2, 1), DataValue::new_now(2.0)),
            WriteValue::new(NodeId::numeric(2, 9), DataValue::new_now(2.0)),
        ]);
        req.header.return_diagnostics = 0x20;
        let resp = server().write(req).await.unwrap();
        assert_eq!(resp.diagnostic_infos.len(), resp.results.len());
        assert_eq!(resp.diagnostic_infos[0].additional_info, None);
        assert!(resp.diagnostic_infos[1].additional_info.is_some());
    }
}
