use std::collections::BTreeMap;

use tracing::debug;
use ua_attribute_core::{
    DataValue, DeleteAtTimeDetails, DeleteRawModifiedDetails, HistoryUpdateDetails,
    HistoryUpdateResult, PerformUpdateType, StatusCode, UpdateDataDetails,
};

use super::MemoryServer;
use crate::address_space::{access, VariableNode};

impl MemoryServer {
    pub(super) fn history_update_item(
        &self,
        details: &HistoryUpdateDetails,
    ) -> HistoryUpdateResult {
        let node_id = details.node_id();
        let result = self
            .space
            .with_node_mut(node_id, |node| update_node(node, details))
            .unwrap_or_else(|| HistoryUpdateResult::failed(StatusCode::BadNodeIdUnknown));
        debug!(
            node = %node_id,
            operation = details.name(),
            status = %result.status_code,
            operations = result.operation_results.len(),
            "history update"
        );
        result
    }
}

fn update_node(node: &mut VariableNode, details: &HistoryUpdateDetails) -> HistoryUpdateResult {
    if !node.historizing {
        return HistoryUpdateResult::failed(StatusCode::BadHistoryOperationUnsupported);
    }
    if !node.can(access::HISTORY_WRITE) {
        return HistoryUpdateResult::failed(StatusCode::BadNotWritable);
    }
    match details {
        HistoryUpdateDetails::UpdateData(d) => update_data(node.history_mut(), d),
        HistoryUpdateDetails::DeleteRawModified(d) => delete_raw(node.history_mut(), d),
        HistoryUpdateDetails::DeleteAtTime(d) => delete_at_time(node.history_mut(), d),
        HistoryUpdateDetails::UpdateStructureData(_)
        | HistoryUpdateDetails::UpdateEvent(_)
        | HistoryUpdateDetails::DeleteEvent(_) => {
            HistoryUpdateResult::failed(StatusCode::BadHistoryOperationUnsupported)
        }
    }
}

fn update_data(
    history: &mut BTreeMap<i64, DataValue>,
    d: &UpdateDataDetails,
) -> HistoryUpdateResult {
    let operation_results = d
        .update_values
        .iter()
        .map(|value| {
            let Some(key) = value.source_timestamp.map(|t| t.ticks()) else {
                return StatusCode::BadInvalidTimestamp;
            };
            let exists = history.contains_key(&key);
            match (d.perform_insert_replace, exists) {
                (PerformUpdateType::Insert, true) => StatusCode::BadEntryExists,
                (PerformUpdateType::Replace | PerformUpdateType::Remove, false) => {
                    StatusCode::BadNoEntryExists
                }
                (PerformUpdateType::Remove, true) => {
                    history.remove(&key);
                    StatusCode::Good
                }
                (PerformUpdateType::Insert | PerformUpdateType::Update, false) => {
                    history.insert(key, value.clone());
                    StatusCode::GoodEntryInserted
                }
                (PerformUpdateType::Replace | PerformUpdateType::Update, true) => {
                    history.insert(key, value.clone());
                    StatusCode::GoodEntryReplaced
                }
            }
        })
        .collect();
    HistoryUpdateResult {
        status_code: StatusCode::Good,
        operation_results,
        diagnostic_infos: Vec::new(),
    }
}

fn delete_raw(
    history: &mut BTreeMap<i64, DataValue>,
    d: &DeleteRawModifiedDetails,
) -> HistoryUpdateResult {
    if d.is_delete_modified {
        return HistoryUpdateResult::failed(StatusCode::BadHistoryOperationUnsupported);
    }
    let (start, end) = (d.start_time.ticks(), d.end_time.ticks());
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    let before = history.len();
    history.retain(|key, _| *key < lo || *key >= hi);
    let status_code = if history.len() == before {
        StatusCode::GoodNoData
    } else {
        StatusCode::Good
    };
    HistoryUpdateResult {
        status_code,
        ..Default::default()
    }
}

fn delete_at_time(
    history: &mut BTreeMap<i64, DataValue>,
    d: &DeleteAtTimeDetails,
) -> HistoryUpdateResult {
    let operation_results = d
        .req_times
        .iter()
        .map(|t| match history.remove(&t.ticks()) {
            Some(_) => StatusCode::Good,
            None => StatusCode::BadNoEntryExists,
        })
        .collect();
    HistoryUpdateResult {
        status_code: StatusCode::Good,
        operation_results,
        diagnostic_infos: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use ua_attribute_core::{EventFilter, NodeId, UpdateEventDetails, UtcTime, Variant};

    use super::*;
    use crate::service::ServerConfig;

    fn t(ms: u64) -> UtcTime {
        UtcTime::from_unix_millis(ms)
    }

    fn node() -> NodeId {
        NodeId::numeric(2, 1)
    }

    fn server_with(times: &[u64]) -> MemoryServer {
        let server = MemoryServer::new(ServerConfig::default());
        let mut var = VariableNode::new(0.0).historizing();
        for &ms in times {
            var.record(DataValue::new_at(1.0, t(ms)), t(ms));
        }
        server.address_space().insert(node(), var);
        server
    }

    fn update(kind: PerformUpdateType, times: &[u64]) -> HistoryUpdateDetails {
        HistoryUpdateDetails::UpdateData(UpdateDataDetails {
            node_id: node(),
            perform_insert_replace: kind,
            update_values: times.iter().map(|&ms| DataValue::new_at(2.0, t(ms))).collect(),
        })
    }

    fn archived(server: &MemoryServer) -> Vec<u64> {
        server
            .address_space()
            .with_node(&node(), |n| {
                n.history()
                    .values()
                    .filter_map(|dv| dv.source_timestamp)
                    .map(UtcTime::to_unix_millis)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn insert_reports_each_value() {
        let server = server_with(&[10]);
        let result = server.history_update_item(&update(PerformUpdateType::Insert, &[10, 20]));
        assert_eq!(result.status_code, StatusCode::Good);
        assert_eq!(
            result.operation_results,
            vec![StatusCode::BadEntryExists, StatusCode::GoodEntryInserted]
        );
        assert_eq!(archived(&server), vec![10, 20]);
    }

    #[test]
    fn replace_needs_an_existing_entry() {
        let server = server_with(&[10]);
        let result = server.history_update_item(&update(PerformUpdateType::Replace, &[10, 20]));
        assert_eq!(
            result.operation_results,
            vec![StatusCode::GoodEntryReplaced, StatusCode::BadNoEntryExists]
        );
        let replaced = server
            .address_space()
            .with_node(&node(), |n| n.history()[&t(10).ticks()].value.clone())
            .flatten();
        assert_eq!(replaced, Some(Variant::Double(2.0)));
    }

    #[test]
    fn update_inserts_or_replaces() {
        let server = server_with(&[10]);
        let result = server.history_update_item(&update(PerformUpdateType::Update, &[10, 20]));
        assert_eq!(
            result.operation_results,
            vec![StatusCode::GoodEntryReplaced, StatusCode::GoodEntryInserted]
        );
    }

    #[test]
    fn remove_drops_matching_entries() {
        let server = server_with(&[10, 20]);
        let result = server.history_update_item(&update(PerformUpdateType::Remove, &[10, 30]));
        assert_eq!(
            result.operation_results,
            vec![StatusCode::Good, StatusCode::BadNoEntryExists]
        );
        assert_eq!(archived(&server), vec![20]);
    }

    #[test]
    fn value_without_source_timestamp_is_rejected() {
        let server = server_with(&[]);
        let details = HistoryUpdateDetails::UpdateData(UpdateDataDetails {
            node_id: node(),
            perform_insert_replace: PerformUpdateType::Insert,
            update_values: vec![DataValue::default()],
        });
        let result = server.history_update_item(&details);
        assert_eq!(result.operation_results, vec![StatusCode::BadInvalidTimestamp]);
    }

    #[test]
    fn delete_raw_clears_a_half_open_span() {
        let server = server_with(&[10, 20, 30]);
        let result = server.history_update_item(&HistoryUpdateDetails::DeleteRawModified(
            DeleteRawModifiedDetails {
                node_id: node(),
                is_delete_modified: false,
                start_time: t(10),
                end_time: t(30),
            },
        ));
        assert_eq!(result.status_code, StatusCode::Good);
        assert!(result.operation_results.is_empty());
        assert_eq!(archived(&server), vec![30]);
    }

    #[test]
    fn delete_at_time_reports_each_time() {
        let server = server_with(&[10, 20]);
        let result = server.history_update_item(&HistoryUpdateDetails::DeleteAtTime(
            DeleteAtTimeDetails {
                node_id: node(),
                req_times: vec![t(20), t(25)],
            },
        ));
        assert_eq!(
            result.operation_results,
            vec![StatusCode::Good, StatusCode::BadNoEntryExists]
        );
    }

    #[test]
    fn event_updates_are_unsupported() {
        let server = server_with(&[]);
        let result = server.history_update_item(&HistoryUpdateDetails::UpdateEvent(
            UpdateEventDetails {
                node_id: node(),
                perform_insert_replace: PerformUpdateType::Insert,
                filter: EventFilter::default(),
                event_data: Vec::new(),
            },
        ));
        assert_eq!(result.status_code, StatusCode::BadHistoryOperationUnsupported);
    }

    #[test]
    fn unknown_and_non_historizing_nodes() {
        let server = server_with(&[]);
        server
            .address_space()
            .insert(NodeId::numeric(2, 2), VariableNode::new(0.0));
        let mut details = update(PerformUpdateType::Insert, &[10]);
        if let HistoryUpdateDetails::UpdateData(d) = &mut details {
            d.node_id = NodeId::numeric(2, 9);
        }
        assert_eq!(
            server.history_update_item(&details).status_code,
            StatusCode::BadNodeIdUnknown
        );
        if let HistoryUpdateDetails::UpdateData(d) = &mut details {
            d.node_id = NodeId::numeric(2, 2);
        }
        assert_eq!(
            server.history_update_item(&details).status_code,
            StatusCode::BadHistoryOperationUnsupported
        );
    }
}
