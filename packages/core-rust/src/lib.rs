//! Attribute service set: Read, Write, `HistoryRead` and `HistoryUpdate`
//! contracts, response validation, the aggregate "is good" verdict, and the
//! client side of the history continuation-point protocol.

pub mod aggregate;
pub mod client;
pub mod context;
pub mod continuation;
pub mod data_value;
pub mod error;
pub mod header;
pub mod identifiers;
pub mod messages;
pub mod numeric_range;
pub mod service;
pub mod status;
pub mod time;

pub use aggregate::{is_good, ResultPolicy};
pub use client::{AttributeClient, ClientOptions, Completion, NodeHistory};
pub use context::RequestContext;
pub use continuation::{ContinuationState, HistoryPage, HistoryReadSequence};
pub use data_value::{DataValue, TimestampsToReturn, Variant};
pub use error::{ContinuationError, ServiceError, ValidationError};
pub use header::{DiagnosticInfo, RequestHeader, ResponseHeader};
pub use identifiers::{
    AttributeId, ByteString, Identifier, NodeId, NodeIdParseError, QualifiedName,
    VALUE_ATTRIBUTE_ID,
};
pub use messages::{
    AggregateConfiguration, Annotation, DeleteAtTimeDetails, DeleteEventDetails,
    DeleteRawModifiedDetails, EventFilter, HistoryData, HistoryEventFieldList, HistoryReadDetails,
    HistoryReadRequest, HistoryReadResponse, HistoryReadResult, HistoryReadValueId,
    HistoryUpdateDetails, HistoryUpdateRequest, HistoryUpdateResponse, HistoryUpdateResult,
    HistoryUpdateType, ModificationInfo, PerformUpdateType, ReadAnnotationDataDetails,
    ReadAtTimeDetails, ReadEventDetails, ReadProcessedDetails, ReadRawModifiedDetails, ReadRequest,
    ReadResponse, ReadValueId, SimpleAttributeOperand, UpdateDataDetails, UpdateEventDetails,
    UpdateStructureDataDetails, WriteRequest, WriteResponse, WriteValue,
};
pub use numeric_range::NumericRange;
pub use service::{AttributeService, ServiceRequest, ServiceResponse};
pub use status::{Severity, StatusCode};
pub use time::{ClockSource, SystemClock, UtcTime};
