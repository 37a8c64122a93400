//! History read: raw paging, at-time lookups, and cursor release.
//!
//! A raw read is a window over the archive keys, walked forwards when the
//! start precedes the end and backwards otherwise. Each page takes at most
//! `numValuesPerNode` values (or the configured page size when that is zero);
//! when values remain, the rest of the window is parked in the continuation
//! registry and its token returned with the page.

use std::collections::BTreeMap;
use std::ops::Bound;

use ua_attribute_core::{
    ByteString, DataValue, HistoryData, HistoryReadDetails, HistoryReadRequest, HistoryReadResult,
    HistoryReadValueId, NumericRange, ReadAtTimeDetails, ReadRawModifiedDetails, StatusCode,
    TimestampsToReturn, UtcTime,
};

use super::MemoryServer;
use crate::address_space::{access, VariableNode};
use crate::continuation::Position;

/// History reads must return at least one timestamp.
pub(super) fn check_timestamps(request: &HistoryReadRequest) -> Result<(), StatusCode> {
    if request.timestamps_to_return == TimestampsToReturn::Neither
        && !request.release_continuation_points
    {
        return Err(StatusCode::BadTimestampsToReturnInvalid);
    }
    Ok(())
}

#[derive(Debug)]
struct Page {
    values: Vec<DataValue>,
    next: Option<Position>,
}

impl MemoryServer {
    pub(super) fn history_read_item(
        &self,
        request: &HistoryReadRequest,
        item: &HistoryReadValueId,
    ) -> HistoryReadResult {
        if request.release_continuation_points {
            self.continuations.release(&item.continuation_point);
            return HistoryReadResult::default();
        }
        self.read_history(request, item)
            .unwrap_or_else(HistoryReadResult::failed)
    }

    fn read_history(
        &self,
        request: &HistoryReadRequest,
        item: &HistoryReadValueId,
    ) -> Result<HistoryReadResult, StatusCode> {
        let details = &request.history_read_details;
        // Caller errors must leave the token live.
        if !item.data_encoding.is_null() {
            return Err(StatusCode::BadDataEncodingInvalid);
        }
        let range = NumericRange::parse(&item.index_range)?;
        let resume = if item.continuation_point.is_empty() {
            None
        } else {
            Some(
                self.continuations
                    .resume(&item.continuation_point, &item.node_id, details)?,
            )
        };
        let page_size = self.config.max_values_per_page.max(1);

        let page = self
            .space
            .with_node(&item.node_id, |node| read_page(node, details, resume, page_size))
            .unwrap_or(Err(StatusCode::BadNodeIdUnknown))?;

        let data_values: Vec<DataValue> = page
            .values
            .into_iter()
            .map(|dv| slice_value(dv, &range).filter_timestamps(request.timestamps_to_return))
            .collect();
        let continuation_point = match page.next {
            Some(position) => self.continuations.issue(&item.node_id, details, position)?,
            None => ByteString::null(),
        };
        let status_code = if data_values.is_empty() && continuation_point.is_empty() {
            StatusCode::GoodNoData
        } else {
            StatusCode::Good
        };
        Ok(HistoryReadResult {
            status_code,
            continuation_point,
            history_data: Some(HistoryData::Data { data_values }),
        })
    }
}

fn read_page(
    node: &VariableNode,
    details: &HistoryReadDetails,
    resume: Option<Position>,
    page_size: usize,
) -> Result<Page, StatusCode> {
    if !node.historizing {
        return Err(StatusCode::BadHistoryOperationUnsupported);
    }
    if !node.can(access::HISTORY_READ) {
        return Err(StatusCode::BadNotReadable);
    }
    match details {
        HistoryReadDetails::ReadRaw(d) if d.is_read_modified => {
            Err(StatusCode::BadHistoryOperationUnsupported)
        }
        HistoryReadDetails::ReadRaw(d) => {
            let position = match resume {
                Some(position) => position,
                None => raw_window(d)?,
            };
            let limit = match usize::try_from(d.num_values_per_node) {
                Ok(0) | Err(_) => page_size,
                Ok(n) => n.min(page_size),
            };
            raw_page(node.history(), position, limit)
        }
        HistoryReadDetails::ReadAtTime(d) => {
            let next = match resume {
                Some(Position::AtTime { next }) => next,
                None => 0,
                Some(_) => return Err(StatusCode::BadContinuationPointInvalid),
            };
            Ok(at_time_page(node.history(), d, next, page_size))
        }
        HistoryReadDetails::ReadProcessed(_)
        | HistoryReadDetails::ReadEvents(_)
        | HistoryReadDetails::ReadAnnotations(_) => Err(StatusCode::BadHistoryOperationUnsupported),
    }
}

/// Initial window of a raw read.
fn raw_window(d: &ReadRawModifiedDetails) -> Result<Position, StatusCode> {
    let start = d.start_time.map(UtcTime::ticks);
    let end = d.end_time.map(UtcTime::ticks);
    let bounded = d.num_values_per_node > 0;
    let (lower, upper, backward) = match (start, end) {
        (Some(s), Some(e)) if s == e => (Bound::Included(s), Bound::Included(e), false),
        (Some(s), Some(e)) if s < e => (Bound::Included(s), Bound::Excluded(e), false),
        (Some(s), Some(e)) => (Bound::Excluded(e), Bound::Included(s), true),
        (Some(s), None) if bounded => (Bound::Included(s), Bound::Unbounded, false),
        (None, Some(e)) if bounded => (Bound::Unbounded, Bound::Included(e), true),
        _ => return Err(StatusCode::BadHistoryOperationInvalid),
    };
    Ok(Position::Raw {
        lower,
        upper,
        backward,
    })
}

fn raw_page(
    history: &BTreeMap<i64, DataValue>,
    position: Position,
    limit: usize,
) -> Result<Page, StatusCode> {
    let Position::Raw {
        lower,
        upper,
        backward,
    } = position
    else {
        return Err(StatusCode::BadContinuationPointInvalid);
    };
    if window_is_empty(lower, upper) {
        return Ok(Page {
            values: Vec::new(),
            next: None,
        });
    }

    let window = history.range((lower, upper));
    let mut taken: Vec<(i64, &DataValue)> = if backward {
        window.rev().take(limit.saturating_add(1)).map(|(k, v)| (*k, v)).collect()
    } else {
        window.take(limit.saturating_add(1)).map(|(k, v)| (*k, v)).collect()
    };
    let more = taken.len() > limit;
    taken.truncate(limit);

    let next = match (more, taken.last()) {
        (true, Some(&(last, _))) => Some(if backward {
            Position::Raw {
                lower,
                upper: Bound::Excluded(last),
                backward,
            }
        } else {
            Position::Raw {
                lower: Bound::Excluded(last),
                upper,
                backward,
            }
        }),
        _ => None,
    };
    Ok(Page {
        values: taken.into_iter().map(|(_, v)| v.clone()).collect(),
        next,
    })
}

/// True for windows `BTreeMap::range` would reject.
fn window_is_empty(lower: Bound<i64>, upper: Bound<i64>) -> bool {
    match (lower, upper) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
        (Bound::Included(a) | Bound::Excluded(a), Bound::Included(b) | Bound::Excluded(b))
            if a < b =>
        {
            false
        }
        (Bound::Included(a), Bound::Included(b)) => a > b,
        _ => true,
    }
}

/// Values at the requested times. A time without an exact entry gets the
/// last earlier value (stepped) stamped with the requested time, or
/// `BadNoData` when nothing precedes it.
fn at_time_page(
    history: &BTreeMap<i64, DataValue>,
    d: &ReadAtTimeDetails,
    next: usize,
    page_size: usize,
) -> Page {
    let end = d.req_times.len().min(next.saturating_add(page_size));
    let values = d
        .req_times
        .get(next..end)
        .unwrap_or_default()
        .iter()
        .map(|t| match history.range(..=t.ticks()).next_back() {
            Some((key, dv)) if *key == t.ticks() => dv.clone(),
            Some((_, dv)) => DataValue {
                source_timestamp: Some(*t),
                ..dv.clone()
            },
            None => DataValue {
                source_timestamp: Some(*t),
                ..DataValue::bad(StatusCode::BadNoData)
            },
        })
        .collect();
    Page {
        values,
        next: (end < d.req_times.len()).then_some(Position::AtTime { next: end }),
    }
}

fn slice_value(mut dv: DataValue, range: &NumericRange) -> DataValue {
    if range.is_whole() {
        return dv;
    }
    let sliced = dv
        .value
        .as_ref()
        .ok_or(StatusCode::BadIndexRangeNoData)
        .and_then(|v| range.apply(v));
    match sliced {
        Ok(v) => dv.value = Some(v),
        Err(status) => {
            dv.value = None;
            dv.status = Some(status);
        }
    }
    dv
}
