//! Seeds a historizing node, writes a run of values through the client, pages
//! the history back, and releases a cursor left open mid-sequence.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use ua_attribute_core::{
    AttributeClient, DataValue, HistoryReadDetails, HistoryReadSequence, HistoryReadValueId,
    NodeId, ReadRawModifiedDetails, ReadRequest, UtcTime, WriteRequest, WriteValue,
};
use ua_attribute_server::logging::init_logging;
use ua_attribute_server::{MemoryServer, ServerConfig, VariableNode};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of values to write into the demo node
    #[arg(long, env = "DEMO_VALUES", default_value_t = 25)]
    values: u32,

    /// Values returned per history read round trip
    #[arg(long, env = "DEMO_PAGE_SIZE", default_value_t = 10)]
    page_size: u32,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_filter);

    let server = MemoryServer::new(ServerConfig::default());
    let node = NodeId::string(2, "Demo.Temperature");
    server
        .address_space()
        .insert(node.clone(), VariableNode::new(0.0).historizing());
    let client = AttributeClient::new(Arc::new(server));

    let base = UtcTime::now().to_unix_millis();
    let writes: Vec<_> = (0..args.values)
        .map(|i| {
            let at = UtcTime::from_unix_millis(base + u64::from(i) * 1_000);
            WriteValue::new(node.clone(), DataValue::new_at(20.0 + f64::from(i) / 10.0, at))
        })
        .collect();
    for write in writes {
        let done = client.write(WriteRequest::from(write)).await?;
        anyhow::ensure!(done.response.is_good(), "write failed: {:?}", done.response.results);
    }

    let current = client.read(ReadRequest::for_node(node.clone())).await?;
    let value = current
        .response
        .results
        .first()
        .and_then(|dv| dv.value.clone())
        .context("read returned no value")?;
    info!(?value, "current value");

    let details = HistoryReadDetails::ReadRaw(ReadRawModifiedDetails {
        start_time: Some(UtcTime::from_unix_millis(base)),
        end_time: Some(UtcTime::from_unix_millis(base + u64::from(args.values) * 1_000)),
        num_values_per_node: args.page_size,
        ..Default::default()
    });

    let history = client
        .read_history_to_end(details.clone(), vec![node.clone()])
        .await?;
    for entry in &history {
        let count = entry.data.as_ref().map_or(0, ua_attribute_core::HistoryData::len);
        info!(node = %entry.node_id, status = %entry.status, count, "history read to end");
    }

    let mut abandoned = HistoryReadSequence::new(details, vec![HistoryReadValueId::new(node)]);
    if let Some(page) = client.step(&mut abandoned).await? {
        info!(pages = page.len(), open = abandoned.open_count(), "read one page, abandoning");
    }
    client.release(&mut abandoned).await?;
    info!(open = abandoned.open_count(), "cursor released");
    Ok(())
}
