//! Value containers: the closed `Variant` type and the timestamped `DataValue`.

use serde::{Deserialize, Serialize};

use crate::identifiers::ByteString;
use crate::status::StatusCode;
use crate::time::UtcTime;

/// Runtime value of an attribute.
///
/// Closed set of the scalar types this crate exchanges, plus one-dimensional
/// arrays. Structured types travel as `ByteString` bodies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    #[default]
    Empty,
    Boolean(bool),
    Byte(u8),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    Double(f64),
    String(String),
    DateTime(UtcTime),
    ByteString(ByteString),
    StatusCode(StatusCode),
    Array(Vec<Variant>),
}

impl Variant {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Name of the variant's type, used for type-mismatch checks on write.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Empty => "Empty",
            Variant::Boolean(_) => "Boolean",
            Variant::Byte(_) => "Byte",
            Variant::Int32(_) => "Int32",
            Variant::UInt32(_) => "UInt32",
            Variant::Int64(_) => "Int64",
            Variant::Double(_) => "Double",
            Variant::String(_) => "String",
            Variant::DateTime(_) => "DateTime",
            Variant::ByteString(_) => "ByteString",
            Variant::StatusCode(_) => "StatusCode",
            Variant::Array(_) => "Array",
        }
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Boolean(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int32(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Double(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_string())
    }
}

/// Which timestamps a server should return with each value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimestampsToReturn {
    Source,
    Server,
    #[default]
    Both,
    Neither,
}

/// A value together with its quality status and timestamps.
///
/// `status` of `None` is the protocol's implicit Good.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<Variant>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<StatusCode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_timestamp: Option<UtcTime>,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub source_picoseconds: u16,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub server_timestamp: Option<UtcTime>,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub server_picoseconds: u16,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(v: &u16) -> bool {
    *v == 0
}

impl DataValue {
    /// A Good value stamped with `source_timestamp` and the current server time.
    #[must_use]
    pub fn new_at(value: impl Into<Variant>, source_timestamp: UtcTime) -> Self {
        Self {
            value: Some(value.into()),
            status: None,
            source_timestamp: Some(source_timestamp),
            server_timestamp: Some(UtcTime::now()),
            ..Default::default()
        }
    }

    /// A Good value with both timestamps set to now.
    #[must_use]
    pub fn new_now(value: impl Into<Variant>) -> Self {
        Self::new_at(value, UtcTime::now())
    }

    /// A value-less result carrying only a status.
    #[must_use]
    pub fn bad(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::Good)
    }

    /// Good implies a value is present.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.status().is_good() || self.value.is_some()
    }

    /// Drops the timestamps the caller did not ask for.
    #[must_use]
    pub fn filter_timestamps(mut self, which: TimestampsToReturn) -> Self {
        match which {
            TimestampsToReturn::Both => {}
            TimestampsToReturn::Source => {
                self.server_timestamp = None;
                self.server_picoseconds = 0;
            }
            TimestampsToReturn::Server => {
                self.source_timestamp = None;
                self.source_picoseconds = 0;
            }
            TimestampsToReturn::Neither => {
                self.server_timestamp = None;
                self.server_picoseconds = 0;
                self.source_timestamp = None;
                self.source_picoseconds = 0;
            }
        }
        self
    }
}
