//! Write service contracts.

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::data_value::DataValue;
use crate::error::ValidationError;
use crate::header::{DiagnosticInfo, RequestHeader, ResponseHeader};
use crate::identifiers::{NodeId, VALUE_ATTRIBUTE_ID};
use crate::service::{check_envelope, ServiceRequest, ServiceResponse};
use crate::status::StatusCode;

use super::read::value_attribute;

/// A value to write into one attribute of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteValue {
    pub node_id: NodeId,
    #[serde(default = "value_attribute")]
    pub attribute_id: u32,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub index_range: String,
    pub value: DataValue,
}

impl WriteValue {
    /// Writes `value` into the `Value` attribute of `node_id`.
    #[must_use]
    pub fn new(node_id: NodeId, value: DataValue) -> Self {
        Self {
            node_id,
            attribute_id: VALUE_ATTRIBUTE_ID,
            index_range: String::new(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    pub header: RequestHeader,
    pub nodes_to_write: Vec<WriteValue>,
    #[serde(skip)]
    pub context: Option<RequestContext>,
}

impl WriteRequest {
    #[must_use]
    pub fn new(nodes_to_write: Vec<WriteValue>) -> Self {
        Self {
            header: RequestHeader::default(),
            nodes_to_write,
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }
}

impl From<WriteValue> for WriteRequest {
    fn from(value: WriteValue) -> Self {
        Self::new(vec![value])
    }
}

/// Write response; `results[i]` is the outcome of `nodes_to_write[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub header: ResponseHeader,
    pub results: Vec<StatusCode>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl WriteResponse {
    /// Strict aggregate verdict; see [`crate::aggregate::ResultPolicy`].
    #[must_use]
    pub fn is_good(&self) -> bool {
        crate::aggregate::is_good(self)
    }
}

impl ServiceRequest for WriteRequest {
    type Response = WriteResponse;

    const SERVICE: &'static str = "Write";

    fn request_header(&self) -> &RequestHeader {
        &self.header
    }

    fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    fn item_count(&self) -> usize {
        self.nodes_to_write.len()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.nodes_to_write.is_empty() {
            return Err(ValidationError::invalid("nodesToWrite must not be empty"));
        }
        Ok(())
    }

    fn validate_response(&self, response: &WriteResponse) -> Result<(), ValidationError> {
        check_envelope(Self::SERVICE, self.item_count(), response).map(|_| ())
    }
}

impl ServiceResponse for WriteResponse {
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
        self.results.clone()
    }
}
