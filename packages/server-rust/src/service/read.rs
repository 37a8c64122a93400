use ua_attribute_core::{
    AttributeId, DataValue, NumericRange, ReadValueId, StatusCode, TimestampsToReturn, Variant,
};

use super::MemoryServer;
use crate::address_space::{access, VariableNode};

impl MemoryServer {
    pub(super) fn read_item(&self, item: &ReadValueId, timestamps: TimestampsToReturn) -> DataValue {
        let now = self.now();
        let outcome = self
            .space
            .with_node(&item.node_id, |node| read_attribute(node, item))
            .unwrap_or(Err(StatusCode::BadNodeIdUnknown));
        match outcome {
            Ok(mut value) => {
                value.server_timestamp = Some(now);
                value.filter_timestamps(timestamps)
            }
            Err(status) => DataValue::bad(status),
        }
    }
}

fn read_attribute(node: &VariableNode, item: &ReadValueId) -> Result<DataValue, StatusCode> {
    let attribute =
        AttributeId::try_from(item.attribute_id).map_err(|_| StatusCode::BadAttributeIdInvalid)?;
    if attribute != AttributeId::Value {
        if !item.index_range.is_empty() {
            return Err(StatusCode::BadIndexRangeNoData);
        }
        let value = match attribute {
            AttributeId::AccessLevel | AttributeId::UserAccessLevel => {
                Variant::Byte(node.access_level)
            }
            AttributeId::Historizing => Variant::Boolean(node.historizing),
            _ => return Err(StatusCode::BadAttributeIdInvalid),
        };
        return Ok(DataValue {
            value: Some(value),
            ..Default::default()
        });
    }

    if !node.can(access::CURRENT_READ) {
        return Err(StatusCode::BadNotReadable);
    }
    if !item.data_encoding.is_null() {
        return Err(StatusCode::BadDataEncodingInvalid);
    }
    let range = NumericRange::parse(&item.index_range)?;
    let mut value = node.value.clone();
    if !range.is_whole() {
        let current = value.value.as_ref().ok_or(StatusCode::BadIndexRangeNoData)?;
        value.value = Some(range.apply(current)?);
    }
    Ok(value)
}
