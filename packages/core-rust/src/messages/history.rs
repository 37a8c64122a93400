//! History read and history update contracts.
//!
//! The polymorphic payloads (`HistoryReadDetails`, `HistoryData`,
//! `HistoryUpdateDetails`) are closed, internally tagged enums: the `type` key
//! on the wire selects the variant.
//!
//! # Continuation points
//!
//! A `HistoryReadResult` with a non-empty `continuation_point` has more data.
//! The caller resumes by sending the token back verbatim in the matching
//! `HistoryReadValueId`, with the same read details. Setting
//! `release_continuation_points` discards the server cursors named by the
//! tokens without reading. See [`crate::continuation`] for the client-side
//! state machine.

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::data_value::{DataValue, TimestampsToReturn, Variant};
use crate::error::ValidationError;
use crate::header::{DiagnosticInfo, RequestHeader, ResponseHeader};
use crate::identifiers::{ByteString, NodeId, QualifiedName};
use crate::service::{check_diagnostics, check_envelope, ServiceRequest, ServiceResponse};
use crate::status::StatusCode;
use crate::time::UtcTime;

// ---------------------------------------------------------------------------
// Read details
// ---------------------------------------------------------------------------

/// Raw (or modified) values between two bounds.
///
/// At least two of `start_time`, `end_time` and `num_values_per_node` must be
/// given. A start after the end reads backwards in time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRawModifiedDetails {
    pub is_read_modified: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_time: Option<UtcTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_time: Option<UtcTime>,
    /// Maximum values per node per call; zero means no limit.
    pub num_values_per_node: u32,
    pub return_bounds: bool,
}

/// Knobs of the aggregate calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateConfiguration {
    pub use_server_capabilities_defaults: bool,
    pub treat_uncertain_as_bad: bool,
    pub percent_data_bad: u8,
    pub percent_data_good: u8,
    pub use_sloped_extrapolation: bool,
}

impl Default for AggregateConfiguration {
    fn default() -> Self {
        Self {
            use_server_capabilities_defaults: true,
            treat_uncertain_as_bad: true,
            percent_data_bad: 100,
            percent_data_good: 100,
            use_sloped_extrapolation: false,
        }
    }
}

/// Aggregated values over fixed intervals.
///
/// `aggregate_type[i]` is the aggregate applied to `nodes_to_read[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadProcessedDetails {
    pub start_time: UtcTime,
    pub end_time: UtcTime,
    /// Interval length in milliseconds; zero means one interval spanning the range.
    pub processing_interval: f64,
    pub aggregate_type: Vec<NodeId>,
    #[serde(default)]
    pub aggregate_configuration: AggregateConfiguration,
}

/// Values at specific instants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadAtTimeDetails {
    pub req_times: Vec<UtcTime>,
    pub use_simple_bounds: bool,
}

/// A field to select from historical events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleAttributeOperand {
    pub type_definition_id: NodeId,
    pub browse_path: Vec<QualifiedName>,
    #[serde(default = "super::read::value_attribute")]
    pub attribute_id: u32,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub index_range: String,
}

/// Event fields to return. Where-clause filtering is not modeled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    pub select_clauses: Vec<SimpleAttributeOperand>,
}

/// Historical events between two bounds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadEventDetails {
    pub num_values_per_node: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_time: Option<UtcTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_time: Option<UtcTime>,
    pub filter: EventFilter,
}

/// Annotations attached to values at specific instants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadAnnotationDataDetails {
    pub req_times: Vec<UtcTime>,
}

/// What a history read asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HistoryReadDetails {
    ReadRaw(ReadRawModifiedDetails),
    ReadProcessed(ReadProcessedDetails),
    ReadAtTime(ReadAtTimeDetails),
    ReadEvents(ReadEventDetails),
    ReadAnnotations(ReadAnnotationDataDetails),
}

fn bound_count(start: Option<UtcTime>, end: Option<UtcTime>, num_values: u32) -> usize {
    usize::from(start.is_some()) + usize::from(end.is_some()) + usize::from(num_values > 0)
}

impl HistoryReadDetails {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadRaw(d) if d.is_read_modified => "ReadModified",
            Self::ReadRaw(_) => "ReadRaw",
            Self::ReadProcessed(_) => "ReadProcessed",
            Self::ReadAtTime(_) => "ReadAtTime",
            Self::ReadEvents(_) => "ReadEvents",
            Self::ReadAnnotations(_) => "ReadAnnotations",
        }
    }

    /// Whether `data` is the payload kind these details produce.
    #[must_use]
    pub fn accepts(&self, data: &HistoryData) -> bool {
        match (self, data) {
            (Self::ReadRaw(d), HistoryData::ModifiedData { .. }) => d.is_read_modified,
            (
                Self::ReadRaw(_) | Self::ReadProcessed(_) | Self::ReadAtTime(_),
                HistoryData::Data { .. },
            )
            | (Self::ReadEvents(_), HistoryData::Events { .. })
            | (Self::ReadAnnotations(_), HistoryData::Annotations { .. }) => true,
            _ => false,
        }
    }

    /// Checks the details against a request reading `node_count` nodes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidArgument` when the details cannot be served.
    pub fn validate(&self, node_count: usize) -> Result<(), ValidationError> {
        match self {
            Self::ReadRaw(d) => {
                if bound_count(d.start_time, d.end_time, d.num_values_per_node) < 2 {
                    return Err(ValidationError::invalid(
                        "raw history read needs two of startTime, endTime and numValuesPerNode",
                    ));
                }
            }
            Self::ReadProcessed(d) => {
                if d.processing_interval.is_nan() || d.processing_interval < 0.0 {
                    return Err(ValidationError::invalid(
                        "processingInterval must be a non-negative duration",
                    ));
                }
                if d.aggregate_type.len() != node_count {
                    return Err(ValidationError::invalid(format!(
                        "processed history read names {} aggregates for {node_count} nodes",
                        d.aggregate_type.len()
                    )));
                }
            }
            Self::ReadAtTime(ReadAtTimeDetails { req_times, .. })
            | Self::ReadAnnotations(ReadAnnotationDataDetails { req_times }) => {
                if req_times.is_empty() {
                    return Err(ValidationError::invalid("reqTimes must not be empty"));
                }
            }
            Self::ReadEvents(d) => {
                if bound_count(d.start_time, d.end_time, d.num_values_per_node) < 2 {
                    return Err(ValidationError::invalid(
                        "event history read needs two of startTime, endTime and numValuesPerNode",
                    ));
                }
                if d.filter.select_clauses.is_empty() {
                    return Err(ValidationError::invalid(
                        "event filter must select at least one field",
                    ));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// History data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryUpdateType {
    Insert,
    Replace,
    Update,
    Delete,
}

/// Who changed a historical value, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationInfo {
    pub modification_time: UtcTime,
    pub update_type: HistoryUpdateType,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub user_name: String,
}

/// Selected fields of one historical event, in select-clause order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEventFieldList {
    pub event_fields: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub message: String,
    pub user_name: String,
    pub annotation_time: UtcTime,
}

/// Payload of a history read result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum HistoryData {
    Data {
        data_values: Vec<DataValue>,
    },
    ModifiedData {
        data_values: Vec<DataValue>,
        modification_infos: Vec<ModificationInfo>,
    },
    Events {
        events: Vec<HistoryEventFieldList>,
    },
    Annotations {
        annotations: Vec<Annotation>,
    },
}

impl HistoryData {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Data { .. } => "Data",
            Self::ModifiedData { .. } => "ModifiedData",
            Self::Events { .. } => "Events",
            Self::Annotations { .. } => "Annotations",
        }
    }

    /// Number of entries in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Data { data_values } | Self::ModifiedData { data_values, .. } => {
                data_values.len()
            }
            Self::Events { events } => events.len(),
            Self::Annotations { annotations } => annotations.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the entries of a later page of the same kind.
    ///
    /// Returns `false` (and leaves `self` unchanged) when the kinds differ.
    pub fn extend(&mut self, page: HistoryData) -> bool {
        match (self, page) {
            (Self::Data { data_values }, Self::Data { data_values: more }) => {
                data_values.extend(more);
            }
            (
                Self::ModifiedData {
                    data_values,
                    modification_infos,
                },
                Self::ModifiedData {
                    data_values: more_values,
                    modification_infos: more_infos,
                },
            ) => {
                data_values.extend(more_values);
                modification_infos.extend(more_infos);
            }
            (Self::Events { events }, Self::Events { events: more }) => events.extend(more),
            (Self::Annotations { annotations }, Self::Annotations { annotations: more }) => {
                annotations.extend(more);
            }
            _ => return false,
        }
        true
    }
}

// ---------------------------------------------------------------------------
// History read request / response
// ---------------------------------------------------------------------------

/// One node of a history read, optionally resuming a previous page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReadValueId {
    pub node_id: NodeId,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub index_range: String,
    #[serde(skip_serializing_if = "QualifiedName::is_null", default)]
    pub data_encoding: QualifiedName,
    /// Empty on the first call for a node.
    #[serde(default)]
    pub continuation_point: ByteString,
}

impl HistoryReadValueId {
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            ..Default::default()
        }
    }

    /// Resumes (or names for release) the server cursor `continuation_point`.
    #[must_use]
    pub fn resume(node_id: NodeId, continuation_point: ByteString) -> Self {
        Self {
            node_id,
            continuation_point,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReadRequest {
    pub header: RequestHeader,
    pub history_read_details: HistoryReadDetails,
    pub timestamps_to_return: TimestampsToReturn,
    pub release_continuation_points: bool,
    pub nodes_to_read: Vec<HistoryReadValueId>,
    #[serde(skip)]
    pub context: Option<RequestContext>,
}

impl HistoryReadRequest {
    #[must_use]
    pub fn new(history_read_details: HistoryReadDetails, nodes_to_read: Vec<HistoryReadValueId>) -> Self {
        Self {
            header: RequestHeader::default(),
            history_read_details,
            timestamps_to_return: TimestampsToReturn::Both,
            release_continuation_points: false,
            nodes_to_read,
            context: None,
        }
    }

    /// A request that only discards the server cursors named by `tokens`.
    #[must_use]
    pub fn release(
        history_read_details: HistoryReadDetails,
        tokens: impl IntoIterator<Item = (NodeId, ByteString)>,
    ) -> Self {
        let nodes = tokens
            .into_iter()
            .map(|(node_id, token)| HistoryReadValueId::resume(node_id, token))
            .collect();
        Self {
            release_continuation_points: true,
            ..Self::new(history_read_details, nodes)
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Outcome of a history read for one node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReadResult {
    pub status_code: StatusCode,
    /// Empty when no more data is available.
    #[serde(default)]
    pub continuation_point: ByteString,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub history_data: Option<HistoryData>,
}

impl HistoryReadResult {
    #[must_use]
    pub fn failed(status_code: StatusCode) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    /// True when the caller may re-issue the read to fetch more.
    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.continuation_point.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReadResponse {
    pub header: ResponseHeader,
    pub results: Vec<HistoryReadResult>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl HistoryReadResponse {
    /// Strict aggregate verdict; see [`crate::aggregate::ResultPolicy`].
    #[must_use]
    pub fn is_good(&self) -> bool {
        crate::aggregate::is_good(self)
    }
}

impl ServiceRequest for HistoryReadRequest {
    type Response = HistoryReadResponse;

    const SERVICE: &'static str = "HistoryRead";

    fn request_header(&self) -> &RequestHeader {
        &self.header
    }

    fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    fn item_count(&self) -> usize {
        self.nodes_to_read.len()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.nodes_to_read.is_empty() {
            return Err(ValidationError::invalid("nodesToRead must not be empty"));
        }
        if self.release_continuation_points {
            if let Some(i) = self
                .nodes_to_read
                .iter()
                .position(|n| n.continuation_point.is_empty())
            {
                return Err(ValidationError::invalid(format!(
                    "release request entry {i} carries no continuation point"
                )));
            }
            return Ok(());
        }
        self.history_read_details.validate(self.nodes_to_read.len())
    }

    fn validate_response(&self, response: &HistoryReadResponse) -> Result<(), ValidationError> {
        if !check_envelope(Self::SERVICE, self.item_count(), response)? || self.release_continuation_points {
            return Ok(());
        }
        for (index, result) in response.results.iter().enumerate() {
            if let Some(data) = &result.history_data {
                if !self.history_read_details.accepts(data) {
                    return Err(ValidationError::HistoryDataMismatch {
                        index,
                        requested: self.history_read_details.name(),
                        found: data.name(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl ServiceResponse for HistoryReadResponse {
    fn response_header(&self) -> &ResponseHeader {
        &self.header
    }

    fn result_count(&self) -> usize {
        self.results.len()
    }

    fn diagnostic_count(&self) -> usize {
        self.diagnostic_infos.len()
    }

    fn item_statuses(&self) -> Vec<StatusCode> {
        self.results.iter().map(|r| r.status_code).collect()
    }
}

// ---------------------------------------------------------------------------
// History update
// ---------------------------------------------------------------------------

/// How an update treats existing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformUpdateType {
    /// Add entries; existing timestamps fail with `BadEntryExists`.
    Insert,
    /// Overwrite entries; missing timestamps fail with `BadNoEntryExists`.
    Replace,
    /// Insert or replace.
    Update,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDataDetails {
    pub node_id: NodeId,
    pub perform_insert_replace: PerformUpdateType,
    pub update_values: Vec<DataValue>,
}

/// Same shape as [`UpdateDataDetails`], applied to annotations and other
/// structured history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStructureDataDetails {
    pub node_id: NodeId,
    pub perform_insert_replace: PerformUpdateType,
    pub update_values: Vec<DataValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventDetails {
    pub node_id: NodeId,
    pub perform_insert_replace: PerformUpdateType,
    pub filter: EventFilter,
    pub event_data: Vec<HistoryEventFieldList>,
}

/// Deletes every raw (or modified) value in `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRawModifiedDetails {
    pub node_id: NodeId,
    pub is_delete_modified: bool,
    pub start_time: UtcTime,
    pub end_time: UtcTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAtTimeDetails {
    pub node_id: NodeId,
    pub req_times: Vec<UtcTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventDetails {
    pub node_id: NodeId,
    pub event_ids: Vec<ByteString>,
}

/// One self-describing history update operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HistoryUpdateDetails {
    UpdateData(UpdateDataDetails),
    UpdateStructureData(UpdateStructureDataDetails),
    UpdateEvent(UpdateEventDetails),
    DeleteRawModified(DeleteRawModifiedDetails),
    DeleteAtTime(DeleteAtTimeDetails),
    DeleteEvent(DeleteEventDetails),
}

impl HistoryUpdateDetails {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateData(_) => "UpdateData",
            Self::UpdateStructureData(_) => "UpdateStructureData",
            Self::UpdateEvent(_) => "UpdateEvent",
            Self::DeleteRawModified(_) => "DeleteRawModified",
            Self::DeleteAtTime(_) => "DeleteAtTime",
            Self::DeleteEvent(_) => "DeleteEvent",
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        match self {
            Self::UpdateData(d) => &d.node_id,
            Self::UpdateStructureData(d) => &d.node_id,
            Self::UpdateEvent(d) => &d.node_id,
            Self::DeleteRawModified(d) => &d.node_id,
            Self::DeleteAtTime(d) => &d.node_id,
            Self::DeleteEvent(d) => &d.node_id,
        }
    }

    /// Number of sub-items, each of which gets an `operation_results` slot.
    /// Raw deletes address a time span rather than items, so they have none.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        match self {
            Self::UpdateData(d) => d.update_values.len(),
            Self::UpdateStructureData(d) => d.update_values.len(),
            Self::UpdateEvent(d) => d.event_data.len(),
            Self::DeleteRawModified(_) => 0,
            Self::DeleteAtTime(d) => d.req_times.len(),
            Self::DeleteEvent(d) => d.event_ids.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryUpdateRequest {
    pub header: RequestHeader,
    pub history_update_details: Vec<HistoryUpdateDetails>,
    #[serde(skip)]
    pub context: Option<RequestContext>,
}

impl HistoryUpdateRequest {
    #[must_use]
    pub fn new(history_update_details: Vec<HistoryUpdateDetails>) -> Self {
        Self {
            header: RequestHeader::default(),
            history_update_details,
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Outcome of one update operation; `operation_results[j]` answers sub-item `j`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryUpdateResult {
    pub status_code: StatusCode,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub operation_results: Vec<StatusCode>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl HistoryUpdateResult {
    #[must_use]
    pub fn failed(status_code: StatusCode) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryUpdateResponse {
    pub header: ResponseHeader,
    pub results: Vec<HistoryUpdateResult>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl HistoryUpdateResponse {
    /// Strict aggregate verdict; see [`crate::aggregate::ResultPolicy`].
    #[must_use]
    pub fn is_good(&self) -> bool {
        crate::aggregate::is_good(self)
    }
}

impl ServiceRequest for HistoryUpdateRequest {
    type Response = HistoryUpdateResponse;

    const SERVICE: &'static str = "HistoryUpdate";

    fn request_header(&self) -> &RequestHeader {
        &self.header
    }

    fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    fn item_count(&self) -> usize {
        self.history_update_details.len()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.history_update_details.is_empty() {
            return Err(ValidationError::invalid(
                "historyUpdateDetails must not be empty",
            ));
        }
        for (i, details) in self.history_update_details.iter().enumerate() {
            let itemless = details.operation_count() == 0
                && !matches!(details, HistoryUpdateDetails::DeleteRawModified(_));
            if itemless {
                return Err(ValidationError::invalid(format!(
                    "{} at index {i} carries no items",
                    details.name()
                )));
            }
        }
        Ok(())
    }

    fn validate_response(&self, response: &HistoryUpdateResponse) -> Result<(), ValidationError> {
        if !check_envelope(Self::SERVICE, self.item_count(), response)? {
            return Ok(());
        }
        for (index, (details, result)) in self
            .history_update_details
            .iter()
            .zip(&response.results)
            .enumerate()
        {
            check_diagnostics(
                "HistoryUpdate operation",
                result.operation_results.len(),
                result.diagnostic_infos.len(),
            )?;
            let expected = details.operation_count();
            let actual = result.operation_results.len();
            // A failed operation may skip its sub-results entirely.
            let skipped = result.status_code.is_bad() && actual == 0;
            if actual != expected && !skipped {
                return Err(ValidationError::OperationResultMismatch {
                    index,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl ServiceResponse for HistoryUpdateResponse {
    fn response_header(&self) -> &ResponseHeader {
        &self.header
    }

    fn result_count(&self) -> usize {
        self.results.len()
    }

    fn diagnostic_count(&self) -> usize {
        self.diagnostic_infos.len()
    }

    fn item_statuses(&self) -> Vec<StatusCode> {
        self.results
            .iter()
            .flat_map(|r| std::iter::once(r.status_code).chain(r.operation_results.iter().copied()))
            .collect()
    }
}
