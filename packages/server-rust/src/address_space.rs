//! Concurrent store of variable nodes backed by [`DashMap`].
//!
//! Each node carries its current value, an access-level mask, and, when
//! historizing, a time-ordered archive keyed by source timestamp ticks.

use std::collections::BTreeMap;

use dashmap::DashMap;
use ua_attribute_core::{DataValue, NodeId, UtcTime, Variant};

/// Access-level bits of a variable node.
pub mod access {
    pub const CURRENT_READ: u8 = 0x01;
    pub const CURRENT_WRITE: u8 = 0x02;
    pub const HISTORY_READ: u8 = 0x04;
    pub const HISTORY_WRITE: u8 = 0x08;
}

#[derive(Debug, Clone)]
pub struct VariableNode {
    pub value: DataValue,
    pub access_level: u8,
    pub historizing: bool,
    history: BTreeMap<i64, DataValue>,
}

impl VariableNode {
    /// A readable, writable, non-historizing variable.
    #[must_use]
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: DataValue {
                value: Some(value.into()),
                ..Default::default()
            },
            access_level: access::CURRENT_READ | access::CURRENT_WRITE,
            historizing: false,
            history: BTreeMap::new(),
        }
    }

    /// Turns on archiving of written values and grants history access.
    #[must_use]
    pub fn historizing(mut self) -> Self {
        self.historizing = true;
        self.access_level |= access::HISTORY_READ | access::HISTORY_WRITE;
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.access_level &= !(access::CURRENT_WRITE | access::HISTORY_WRITE);
        self
    }

    #[must_use]
    pub fn can(&self, bits: u8) -> bool {
        self.access_level & bits == bits
    }

    /// Archive ordered by source timestamp.
    #[must_use]
    pub fn history(&self) -> &BTreeMap<i64, DataValue> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut BTreeMap<i64, DataValue> {
        &mut self.history
    }

    /// Archives `value` under its source timestamp (falling back to `now`).
    /// Returns the previous entry at that timestamp, if any.
    pub fn record(&mut self, value: DataValue, now: UtcTime) -> Option<DataValue> {
        let key = archive_key(&value).unwrap_or(now.ticks());
        self.history.insert(key, value)
    }
}

/// Archive key of a value: its source timestamp, else its server timestamp.
#[must_use]
pub fn archive_key(value: &DataValue) -> Option<i64> {
    value
        .source_timestamp
        .or(value.server_timestamp)
        .map(UtcTime::ticks)
}

/// All nodes served by one server.
#[derive(Debug, Default)]
pub struct AddressSpace {
    nodes: DashMap<NodeId, VariableNode>,
}

impl AddressSpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a node.
    pub fn insert(&self, node_id: NodeId, node: VariableNode) -> Option<VariableNode> {
        self.nodes.insert(node_id, node)
    }

    pub fn remove(&self, node_id: &NodeId) -> Option<VariableNode> {
        self.nodes.remove(node_id).map(|(_, node)| node)
    }

    #[must_use]
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Runs `f` against the node, or returns `None` if it does not exist.
    pub fn with_node<R>(&self, node_id: &NodeId, f: impl FnOnce(&VariableNode) -> R) -> Option<R> {
        self.nodes.get(node_id).map(|node| f(node.value()))
    }

    /// Runs `f` against the node with exclusive access.
    pub fn with_node_mut<R>(
        &self,
        node_id: &NodeId,
        f: impl FnOnce(&mut VariableNode) -> R,
    ) -> Option<R> {
        self.nodes.get_mut(node_id).map(|mut node| f(node.value_mut()))
    }
}
