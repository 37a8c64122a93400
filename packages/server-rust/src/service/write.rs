use tracing::trace;
use ua_attribute_core::{AttributeId, StatusCode, UtcTime, Variant, WriteValue};

use super::MemoryServer;
use crate::address_space::{access, VariableNode};

impl MemoryServer {
    pub(super) fn write_item(&self, item: &WriteValue) -> StatusCode {
        let now = self.now();
        let status = self
            .space
            .with_node_mut(&item.node_id, |node| write_value(node, item, now))
            .unwrap_or(StatusCode::BadNodeIdUnknown);
        trace!(node = %item.node_id, %status, "write");
        status
    }
}

fn write_value(node: &mut VariableNode, item: &WriteValue, now: UtcTime) -> StatusCode {
    match AttributeId::try_from(item.attribute_id) {
        Err(_) => return StatusCode::BadAttributeIdInvalid,
        Ok(AttributeId::Value) => {}
        Ok(_) => return StatusCode::BadNotWritable,
    }
    if !node.can(access::CURRENT_WRITE) {
        return StatusCode::BadNotWritable;
    }
    if !item.index_range.is_empty() {
        return StatusCode::BadWriteNotSupported;
    }
    let Some(incoming) = &item.value.value else {
        return StatusCode::BadTypeMismatch;
    };
    let current = node.value.value.as_ref().unwrap_or(&Variant::Empty);
    if !current.is_empty() && current.type_name() != incoming.type_name() {
        return StatusCode::BadTypeMismatch;
    }

    let mut value = item.value.clone();
    value.source_timestamp.get_or_insert(now);
    value.server_timestamp = Some(now);
    if node.historizing {
        node.record(value.clone(), now);
    }
    node.value = value;
    StatusCode::Good
}
