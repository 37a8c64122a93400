//! Continuation-point behavior of the in-memory server, driven through the
//! validating client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ua_attribute_core::{
    AttributeClient, AttributeService, ByteString, ContinuationState, DataValue, HistoryData,
    HistoryReadDetails, HistoryReadRequest, HistoryReadSequence, HistoryReadValueId, NodeId,
    QualifiedName, ReadAtTimeDetails, ReadRawModifiedDetails, ServiceError, StatusCode,
    TimestampsToReturn, UtcTime,
};
use ua_attribute_server::{MemoryServer, ServerConfig, VariableNode};

struct ManualClock(AtomicU64);

impl ua_attribute_core::ClockSource for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

impl ManualClock {
    fn advance(&self, by: Duration) {
        #[allow(clippy::cast_possible_truncation)]
        self.0.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

const BASE: u64 = 1_700_000_000_000;

fn t(offset_ms: u64) -> UtcTime {
    UtcTime::from_unix_millis(BASE + offset_ms)
}

fn node(i: u32) -> NodeId {
    NodeId::numeric(2, i)
}

/// Server with nodes 1 and 2 archiving `values` samples one second apart.
fn setup(values: u32, config: ServerConfig) -> (Arc<ManualClock>, Arc<MemoryServer>) {
    let clock = Arc::new(ManualClock(AtomicU64::new(BASE + 1_000_000)));
    let server = MemoryServer::with_clock(config, clock.clone());
    for id in [1, 2] {
        let mut var = VariableNode::new(0.0).historizing();
        for i in 0..values {
            let at = t(u64::from(i) * 1_000);
            var.record(DataValue::new_at(f64::from(i), at), at);
        }
        server.address_space().insert(node(id), var);
    }
    (clock, Arc::new(server))
}

fn raw(page: u32) -> HistoryReadDetails {
    HistoryReadDetails::ReadRaw(ReadRawModifiedDetails {
        start_time: Some(t(0)),
        end_time: Some(t(1_000_000)),
        num_values_per_node: page,
        ..Default::default()
    })
}

fn values(data: Option<&HistoryData>) -> Vec<f64> {
    match data {
        Some(HistoryData::Data { data_values }) => data_values
            .iter()
            .filter_map(|dv| match dv.value {
                Some(ua_attribute_core::Variant::Double(v)) => Some(v),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn token_from_first_page_resumes_the_read() {
    let (_, server) = setup(5, ServerConfig::default());
    let r1 = HistoryReadRequest::new(raw(2), vec![HistoryReadValueId::new(node(1))]);
    let resp1 = server.history_read(r1).await.unwrap();
    let first = &resp1.results[0];
    assert_eq!(first.status_code, StatusCode::Good);
    assert!(first.has_more());
    assert_eq!(values(first.history_data.as_ref()), vec![0.0, 1.0]);

    let r2 = HistoryReadRequest::new(
        raw(2),
        vec![HistoryReadValueId::resume(node(1), first.continuation_point.clone())],
    );
    let resp2 = server.history_read(r2).await.unwrap();
    let second = &resp2.results[0];
    assert!(second.has_more());
    assert_ne!(second.continuation_point, first.continuation_point);
    assert_eq!(values(second.history_data.as_ref()), vec![2.0, 3.0]);

    let r3 = HistoryReadRequest::new(
        raw(2),
        vec![HistoryReadValueId::resume(node(1), second.continuation_point.clone())],
    );
    let resp3 = server.history_read(r3).await.unwrap();
    assert!(!resp3.results[0].has_more());
    assert_eq!(values(resp3.results[0].history_data.as_ref()), vec![4.0]);
    assert!(server.continuation_points().is_empty());
}

#[tokio::test]
async fn client_reads_several_nodes_to_the_end() {
    let (_, server) = setup(7, ServerConfig::default());
    let client = AttributeClient::new(server);
    let out = client
        .read_history_to_end(raw(3), vec![node(1), node(2)])
        .await
        .unwrap();
    let expected: Vec<f64> = (0..7).map(f64::from).collect();
    assert_eq!(values(out[0].data.as_ref()), expected);
    assert_eq!(values(out[1].data.as_ref()), expected);
    assert!(out.iter().all(|n| n.status.is_good()));
}

#[tokio::test]
async fn expired_token_is_invalid_and_terminal() {
    let (clock, server) = setup(5, ServerConfig::default());
    let client = AttributeClient::new(Arc::clone(&server));
    let mut seq = HistoryReadSequence::new(raw(2), vec![HistoryReadValueId::new(node(1))]);
    client.step(&mut seq).await.unwrap();
    assert!(seq.state(0).unwrap().is_open());

    clock.advance(Duration::from_secs(61));
    let pages = client.step(&mut seq).await.unwrap().unwrap();
    assert_eq!(pages[0].status, StatusCode::BadContinuationPointInvalid);
    assert_eq!(
        seq.state(0),
        Some(&ContinuationState::Failed(StatusCode::BadContinuationPointInvalid))
    );
    assert!(client.step(&mut seq).await.unwrap().is_none());

    seq.restart(0).unwrap();
    let pages = client.step(&mut seq).await.unwrap().unwrap();
    assert_eq!(values(pages[0].data.as_ref()), vec![0.0, 1.0]);
}

#[tokio::test]
async fn releasing_an_expired_token_still_succeeds() {
    let (clock, server) = setup(5, ServerConfig::default());
    let r1 = HistoryReadRequest::new(raw(2), vec![HistoryReadValueId::new(node(1))]);
    let t1 = server.history_read(r1).await.unwrap().results[0]
        .continuation_point
        .clone();
    clock.advance(Duration::from_secs(120));

    let release = HistoryReadRequest::release(raw(2), [(node(1), t1)]);
    let resp = server.history_read(release).await.unwrap();
    assert_eq!(resp.header.service_result, StatusCode::Good);
    assert_eq!(resp.results.len(), 1);
    assert!(resp.is_good());
}

#[tokio::test]
async fn release_frees_the_cursor_for_reuse() {
    let (_, server) = setup(5, ServerConfig {
        max_continuation_points: 1,
        ..Default::default()
    });
    let client = AttributeClient::new(Arc::clone(&server));

    let mut a = HistoryReadSequence::new(raw(2), vec![HistoryReadValueId::new(node(1))]);
    client.step(&mut a).await.unwrap();
    assert_eq!(server.continuation_points().len(), 1);

    let mut b = HistoryReadSequence::new(raw(2), vec![HistoryReadValueId::new(node(2))]);
    let pages = client.step(&mut b).await.unwrap().unwrap();
    assert_eq!(pages[0].status, StatusCode::BadNoContinuationPoints);

    client.release(&mut a).await.unwrap();
    assert_eq!(a.state(0), Some(&ContinuationState::Released));
    assert!(server.continuation_points().is_empty());

    b.restart(0).unwrap();
    let pages = client.step(&mut b).await.unwrap().unwrap();
    assert_eq!(pages[0].status, StatusCode::Good);
}

#[tokio::test]
async fn rejected_item_keeps_its_token_live() {
    let (_, server) = setup(5, ServerConfig::default());
    let r1 = HistoryReadRequest::new(raw(2), vec![HistoryReadValueId::new(node(1))]);
    let t1 = server.history_read(r1).await.unwrap().results[0]
        .continuation_point
        .clone();

    let mut bad_encoding = HistoryReadValueId::resume(node(1), t1.clone());
    bad_encoding.data_encoding = QualifiedName::new(0, "Bogus");
    let mut bad_range = HistoryReadValueId::resume(node(1), t1.clone());
    bad_range.index_range = "9:1".to_string();
    let rejected = server
        .history_read(HistoryReadRequest::new(raw(2), vec![bad_encoding, bad_range]))
        .await
        .unwrap();
    assert_eq!(rejected.results[0].status_code, StatusCode::BadDataEncodingInvalid);
    assert_eq!(rejected.results[1].status_code, StatusCode::BadIndexRangeInvalid);
    assert_eq!(server.continuation_points().len(), 1);

    let retry = HistoryReadRequest::new(raw(2), vec![HistoryReadValueId::resume(node(1), t1)]);
    let resp = server.history_read(retry).await.unwrap();
    assert_eq!(resp.results[0].status_code, StatusCode::Good);
    assert_eq!(values(resp.results[0].history_data.as_ref()), vec![2.0, 3.0]);
}

#[tokio::test]
async fn changed_details_invalidate_the_token() {
    let (_, server) = setup(5, ServerConfig::default());
    let r1 = HistoryReadRequest::new(raw(2), vec![HistoryReadValueId::new(node(1))]);
    let t1 = server.history_read(r1).await.unwrap().results[0]
        .continuation_point
        .clone();
    let r2 = HistoryReadRequest::new(raw(3), vec![HistoryReadValueId::resume(node(1), t1)]);
    let resp = server.history_read(r2).await.unwrap();
    assert_eq!(resp.results[0].status_code, StatusCode::BadContinuationPointInvalid);
}

#[tokio::test]
async fn concurrent_sequences_over_one_node_are_independent() {
    let (_, server) = setup(4, ServerConfig::default());
    let client = AttributeClient::new(server);
    let mut a = HistoryReadSequence::new(raw(2), vec![HistoryReadValueId::new(node(1))]);
    let mut b = HistoryReadSequence::new(raw(2), vec![HistoryReadValueId::new(node(1))]);

    let a1 = client.step(&mut a).await.unwrap().unwrap();
    let b1 = client.step(&mut b).await.unwrap().unwrap();
    let a2 = client.step(&mut a).await.unwrap().unwrap();
    let b2 = client.step(&mut b).await.unwrap().unwrap();

    assert_eq!(values(a1[0].data.as_ref()), values(b1[0].data.as_ref()));
    assert_eq!(values(a2[0].data.as_ref()), vec![2.0, 3.0]);
    assert_eq!(values(b2[0].data.as_ref()), vec![2.0, 3.0]);
}

#[tokio::test]
async fn garbage_token_is_reported_per_item() {
    let (_, server) = setup(3, ServerConfig::default());
    let req = HistoryReadRequest::new(
        raw(2),
        vec![
            HistoryReadValueId::resume(node(1), ByteString(b"not-a-token".to_vec())),
            HistoryReadValueId::new(node(2)),
        ],
    );
    let resp = server.history_read(req).await.unwrap();
    assert_eq!(resp.results[0].status_code, StatusCode::BadContinuationPointInvalid);
    assert_eq!(resp.results[1].status_code, StatusCode::Good);
    assert!(!resp.is_good());
}

#[tokio::test]
async fn at_time_read_returns_one_value_per_time() {
    let (_, server) = setup(3, ServerConfig::default());
    let details = HistoryReadDetails::ReadAtTime(ReadAtTimeDetails {
        req_times: vec![t(0), t(1_500), t(2_000)],
        use_simple_bounds: true,
    });
    let client = AttributeClient::new(server);
    let out = client.read_history_to_end(details, vec![node(1)]).await.unwrap();
    assert_eq!(values(out[0].data.as_ref()), vec![0.0, 1.0, 2.0]);
}

#[tokio::test]
async fn unsupported_reads_and_unknown_nodes() {
    let (_, server) = setup(1, ServerConfig::default());
    let mut modified = ReadRawModifiedDetails {
        start_time: Some(t(0)),
        end_time: Some(t(10_000)),
        ..Default::default()
    };
    modified.is_read_modified = true;
    let req = HistoryReadRequest::new(
        HistoryReadDetails::ReadRaw(modified),
        vec![HistoryReadValueId::new(node(1)), HistoryReadValueId::new(node(9))],
    );
    let resp = server.history_read(req).await.unwrap();
    assert_eq!(resp.results[0].status_code, StatusCode::BadHistoryOperationUnsupported);
    assert_eq!(resp.results[1].status_code, StatusCode::BadNodeIdUnknown);
}

#[tokio::test]
async fn neither_timestamp_is_a_service_fault() {
    let (_, server) = setup(1, ServerConfig::default());
    let mut req = HistoryReadRequest::new(raw(2), vec![HistoryReadValueId::new(node(1))]);
    req.timestamps_to_return = TimestampsToReturn::Neither;
    let client = AttributeClient::new(server);
    let err = client.history_read(req).await.unwrap_err();
    assert!(matches!(err, ServiceError::Fault(StatusCode::BadTimestampsToReturnInvalid)));
}
