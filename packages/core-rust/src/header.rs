//! Request/response headers and diagnostic information.

use serde::{Deserialize, Serialize};

use crate::identifiers::NodeId;
use crate::status::StatusCode;
use crate::time::UtcTime;

/// Verbose explanation accompanying a [`StatusCode`].
///
/// String fields are indexes into the response header's `string_table`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub symbolic_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub namespace_uri: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub locale: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub localized_text: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub additional_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inner_status_code: Option<StatusCode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

/// Common header of every request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeader {
    pub authentication_token: NodeId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<UtcTime>,
    pub request_handle: u32,
    /// Bit mask selecting which diagnostics the server should return.
    pub return_diagnostics: u32,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub audit_entry_id: String,
    /// Milliseconds; zero means no hint.
    pub timeout_hint: u32,
}

impl RequestHeader {
    #[must_use]
    pub fn with_handle(request_handle: u32) -> Self {
        Self {
            timestamp: Some(UtcTime::now()),
            request_handle,
            ..Default::default()
        }
    }
}

/// Common header of every response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeader {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<UtcTime>,
    pub request_handle: u32,
    pub service_result: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub service_diagnostics: Option<DiagnosticInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub string_table: Vec<String>,
}

impl ResponseHeader {
    /// A Good header answering `request`.
    #[must_use]
    pub fn good(request: &RequestHeader) -> Self {
        Self::service_result(request, StatusCode::Good)
    }

    #[must_use]
    pub fn service_result(request: &RequestHeader, service_result: StatusCode) -> Self {
        Self {
            timestamp: Some(UtcTime::now()),
            request_handle: request.request_handle,
            service_result,
            service_diagnostics: None,
            string_table: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_echoes_request_handle() {
        let request = RequestHeader::with_handle(42);
        let header = ResponseHeader::service_result(&request, StatusCode::BadTimeout);
        assert_eq!(header.request_handle, 42);
        assert_eq!(header.service_result, StatusCode::BadTimeout);
        assert!(ResponseHeader::good(&request).service_result.is_good());
    }

    #[test]
    fn response_header_camel_case_field_names() {
        let header = ResponseHeader::good(&RequestHeader::default());
        let bytes = rmp_serde::to_vec_named(&header).unwrap();
        let val: rmpv::Value = rmp_serde::from_slice(&bytes).unwrap();
        let keys: Vec<&str> = val
            .as_map()
            .expect("should be a map")
            .iter()
            .filter_map(|(k, _)| k.as_str())
            .collect();
        assert!(keys.contains(&"requestHandle"), "got: {keys:?}");
        assert!(keys.contains(&"serviceResult"), "got: {keys:?}");
        assert!(!keys.contains(&"stringTable"), "empty string table is omitted");
    }
}
