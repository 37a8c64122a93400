//! Read service contracts.

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::data_value::{DataValue, TimestampsToReturn};
use crate::error::ValidationError;
use crate::header::{DiagnosticInfo, RequestHeader, ResponseHeader};
use crate::identifiers::{NodeId, QualifiedName, VALUE_ATTRIBUTE_ID};
use crate::service::{check_envelope, ServiceRequest, ServiceResponse};
use crate::status::StatusCode;

pub(crate) fn value_attribute() -> u32 {
    VALUE_ATTRIBUTE_ID
}

/// Reference to one attribute of one node.
///
/// The attribute id is not range-checked here; the server reports unknown
/// codes per item as `BadAttributeIdInvalid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadValueId {
    pub node_id: NodeId,
    #[serde(default = "value_attribute")]
    pub attribute_id: u32,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub index_range: String,
    #[serde(skip_serializing_if = "QualifiedName::is_null", default)]
    pub data_encoding: QualifiedName,
}

impl ReadValueId {
    /// References the `Value` attribute of `node_id`.
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self::attribute(node_id, VALUE_ATTRIBUTE_ID)
    }

    #[must_use]
    pub fn attribute(node_id: NodeId, attribute_id: impl Into<u32>) -> Self {
        Self {
            node_id,
            attribute_id: attribute_id.into(),
            index_range: String::new(),
            data_encoding: QualifiedName::default(),
        }
    }

    #[must_use]
    pub fn with_index_range(mut self, index_range: impl Into<String>) -> Self {
        self.index_range = index_range.into();
        self
    }
}

impl Default for ReadValueId {
    fn default() -> Self {
        Self::new(NodeId::null())
    }
}

impl From<NodeId> for ReadValueId {
    fn from(node_id: NodeId) -> Self {
        Self::new(node_id)
    }
}

/// Read request: one or more attribute references plus read options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    pub header: RequestHeader,
    /// Maximum acceptable age of a cached value, in milliseconds. Zero forces a
    /// fresh read.
    pub max_age: f64,
    pub timestamps_to_return: TimestampsToReturn,
    pub nodes_to_read: Vec<ReadValueId>,
    #[serde(skip)]
    pub context: Option<RequestContext>,
}

impl ReadRequest {
    #[must_use]
    pub fn new(nodes_to_read: Vec<ReadValueId>) -> Self {
        Self {
            header: RequestHeader::default(),
            max_age: 0.0,
            timestamps_to_return: TimestampsToReturn::Both,
            nodes_to_read,
            context: None,
        }
    }

    /// Reads the `Value` attribute of a single node.
    #[must_use]
    pub fn for_node(node_id: NodeId) -> Self {
        Self::new(vec![ReadValueId::new(node_id)])
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Read response; `results[i]` answers `nodes_to_read[i]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    pub header: ResponseHeader,
    pub results: Vec<DataValue>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl ReadResponse {
    /// Strict aggregate verdict; see [`crate::aggregate::ResultPolicy`].
    #[must_use]
    pub fn is_good(&self) -> bool {
        crate::aggregate::is_good(self)
    }
}

impl ServiceRequest for ReadRequest {
    type Response = ReadResponse;

    const SERVICE: &'static str = "Read";

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
        if self.max_age.is_nan() || self.max_age < 0.0 {
            return Err(ValidationError::invalid(format!(
                "maxAge must be a non-negative duration, got {}",
                self.max_age
            )));
        }
        Ok(())
    }

    fn validate_response(&self, response: &ReadResponse) -> Result<(), ValidationError> {
        if !check_envelope(Self::SERVICE, self.item_count(), response)? {
            return Ok(());
        }
        match response.results.iter().position(|dv| !dv.is_consistent()) {
            Some(index) => Err(ValidationError::GoodWithoutValue { index }),
            None => Ok(()),
        }
    }
}

impl ServiceResponse for ReadResponse {
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
        self.results.iter().map(DataValue::status).collect()
    }
}
