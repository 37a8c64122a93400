//! Request/response contracts of the attribute service set.
//!
//! Each submodule holds one service pair (history read and update share a
//! module because they share their payload types). All structs use
//! `#[serde(rename_all = "camelCase")]` so field names match the protocol's.

pub mod history;
pub mod read;
pub mod write;

pub use history::{
    AggregateConfiguration, Annotation, DeleteAtTimeDetails, DeleteEventDetails,
    DeleteRawModifiedDetails, EventFilter, HistoryData, HistoryEventFieldList,
    HistoryReadDetails, HistoryReadRequest, HistoryReadResponse, HistoryReadResult,
    HistoryReadValueId, HistoryUpdateDetails, HistoryUpdateRequest, HistoryUpdateResponse,
    HistoryUpdateResult, HistoryUpdateType, ModificationInfo, PerformUpdateType,
    ReadAnnotationDataDetails, ReadAtTimeDetails, ReadEventDetails, ReadProcessedDetails,
    ReadRawModifiedDetails, SimpleAttributeOperand, UpdateDataDetails, UpdateEventDetails,
    UpdateStructureDataDetails,
};
pub use read::{ReadRequest, ReadResponse, ReadValueId};
pub use write::{WriteRequest, WriteResponse, WriteValue};
