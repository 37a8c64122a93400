//! Opaque identifier types shared by every service message.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ByteString
// ---------------------------------------------------------------------------

/// Opaque byte sequence. An empty `ByteString` stands for the protocol's null value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteString(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl ByteString {
    #[must_use]
    pub fn null() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// The identifier part of a [`NodeId`]. Its kind is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(uuid::Uuid),
    Opaque(ByteString),
}

/// Namespace-qualified identifier of a node in the server's address space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: Identifier,
}

impl NodeId {
    #[must_use]
    pub fn new(namespace: u16, identifier: Identifier) -> Self {
        Self { namespace, identifier }
    }

    #[must_use]
    pub fn numeric(namespace: u16, id: u32) -> Self {
        Self::new(namespace, Identifier::Numeric(id))
    }

    #[must_use]
    pub fn string(namespace: u16, id: impl Into<String>) -> Self {
        Self::new(namespace, Identifier::String(id.into()))
    }

    /// The null node id (`ns=0;i=0`).
    #[must_use]
    pub fn null() -> Self {
        Self::numeric(0, 0)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier == Identifier::Numeric(0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self::numeric(0, id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        match &self.identifier {
            Identifier::Numeric(id) => write!(f, "i={id}"),
            Identifier::String(id) => write!(f, "s={id}"),
            Identifier::Guid(id) => write!(f, "g={id}"),
            Identifier::Opaque(id) => write!(f, "b={}", BASE64.encode(id.as_bytes())),
        }
    }
}

/// Failure to parse the textual `ns=<n>;<kind>=<id>` node id form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeIdParseError {
    #[error("invalid namespace index: {0}")]
    Namespace(String),
    #[error("missing identifier kind prefix (expected i=, s=, g= or b=)")]
    MissingKind,
    #[error("invalid {kind} identifier: {value}")]
    Identifier { kind: char, value: String },
}

impl FromStr for NodeId {
    type Err = NodeIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, rest) = match s.strip_prefix("ns=") {
            Some(tail) => {
                let (ns, rest) = tail
                    .split_once(';')
                    .ok_or_else(|| NodeIdParseError::Namespace(tail.to_string()))?;
                let ns = ns
                    .parse::<u16>()
                    .map_err(|_| NodeIdParseError::Namespace(ns.to_string()))?;
                (ns, rest)
            }
            None => (0, s),
        };

        let (kind, value) = rest.split_once('=').ok_or(NodeIdParseError::MissingKind)?;
        let invalid = |kind: char| NodeIdParseError::Identifier {
            kind,
            value: value.to_string(),
        };
        let identifier = match kind {
            "i" => Identifier::Numeric(value.parse().map_err(|_| invalid('i'))?),
            "s" => Identifier::String(value.to_string()),
            "g" => Identifier::Guid(value.parse().map_err(|_| invalid('g'))?),
            "b" => Identifier::Opaque(ByteString(
                BASE64.decode(value).map_err(|_| invalid('b'))?,
            )),
            _ => return Err(NodeIdParseError::MissingKind),
        };
        Ok(Self::new(namespace, identifier))
    }
}

// ---------------------------------------------------------------------------
// QualifiedName
// ---------------------------------------------------------------------------

/// A name qualified by a namespace index (used for data encodings).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedName {
    pub namespace_index: u16,
    pub name: String,
}

impl QualifiedName {
    #[must_use]
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && self.name.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AttributeId
// ---------------------------------------------------------------------------

/// Numeric code of the `Value` attribute, the default target of reads and writes.
pub const VALUE_ATTRIBUTE_ID: u32 = 13;

/// Node attributes addressable through the attribute services.
///
/// Message structs carry the raw `u32` so that out-of-range codes still reach
/// the server, which reports them as `BadAttributeIdInvalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AttributeId {
    NodeId = 1,
    NodeClass = 2,
    BrowseName = 3,
    DisplayName = 4,
    Description = 5,
    WriteMask = 6,
    UserWriteMask = 7,
    IsAbstract = 8,
    Symmetric = 9,
    InverseName = 10,
    ContainsNoLoops = 11,
    EventNotifier = 12,
    Value = 13,
    DataType = 14,
    ValueRank = 15,
    ArrayDimensions = 16,
    AccessLevel = 17,
    UserAccessLevel = 18,
    MinimumSamplingInterval = 19,
    Historizing = 20,
    Executable = 21,
    UserExecutable = 22,
}

impl TryFrom<u32> for AttributeId {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use AttributeId::{
            AccessLevel, ArrayDimensions, BrowseName, ContainsNoLoops, DataType, Description,
            DisplayName, EventNotifier, Executable, Historizing, InverseName, IsAbstract,
            MinimumSamplingInterval, NodeClass, Symmetric, UserAccessLevel, UserExecutable,
            UserWriteMask, Value, ValueRank, WriteMask,
        };
        Ok(match value {
            1 => AttributeId::NodeId,
            2 => NodeClass,
            3 => BrowseName,
            4 => DisplayName,
            5 => Description,
            6 => WriteMask,
            7 => UserWriteMask,
            8 => IsAbstract,
            9 => Symmetric,
            10 => InverseName,
            11 => ContainsNoLoops,
            12 => EventNotifier,
            13 => Value,
            14 => DataType,
            15 => ValueRank,
            16 => ArrayDimensions,
            17 => AccessLevel,
            18 => UserAccessLevel,
            19 => MinimumSamplingInterval,
            20 => Historizing,
            21 => Executable,
            22 => UserExecutable,
            other => return Err(other),
        })
    }
}

impl From<AttributeId> for u32 {
    fn from(id: AttributeId) -> Self {
        id as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_text_forms() {
        assert_eq!(NodeId::numeric(0, 85).to_string(), "i=85");
        assert_eq!(NodeId::string(2, "Boiler.Temp").to_string(), "ns=2;s=Boiler.Temp");
        assert_eq!(
            NodeId::new(1, Identifier::Opaque(ByteString(vec![1, 2, 3]))).to_string(),
            "ns=1;b=AQID"
        );
    }

    #[test]
    fn node_id_parses_what_it_prints() {
        for text in [
            "i=2258",
            "ns=3;s=Line 1;Station 2",
            "ns=1;g=72962b91-fa75-4ae6-8d28-b404dc7daf63",
            "ns=4;b=AQID",
        ] {
            let parsed: NodeId = text.parse().unwrap();
            assert_eq!(parsed.to_string(), text);
        }
    }

    #[test]
    fn node_id_parse_errors() {
        assert_eq!(
            "ns=x;i=1".parse::<NodeId>(),
            Err(NodeIdParseError::Namespace("x".into()))
        );
        assert_eq!("q=1".parse::<NodeId>(), Err(NodeIdParseError::MissingKind));
        assert!(matches!(
            "i=abc".parse::<NodeId>(),
            Err(NodeIdParseError::Identifier { kind: 'i', .. })
        ));
    }

    #[test]
    fn attribute_id_range_is_one_to_twenty_two() {
        assert_eq!(AttributeId::try_from(13), Ok(AttributeId::Value));
        assert_eq!(AttributeId::try_from(1), Ok(AttributeId::NodeId));
        assert_eq!(AttributeId::try_from(22), Ok(AttributeId::UserExecutable));
        assert_eq!(AttributeId::try_from(0), Err(0));
        assert_eq!(AttributeId::try_from(23), Err(23));
        assert_eq!(u32::from(AttributeId::Value), VALUE_ATTRIBUTE_ID);
    }

    #[test]
    fn byte_string_serializes_as_binary() {
        let token = ByteString(vec![0xDE, 0xAD]);
        let bytes = rmp_serde::to_vec_named(&token).unwrap();
        let raw: rmpv::Value = rmpv::decode::read_value(&mut &bytes[..]).unwrap();
        assert!(matches!(raw, rmpv::Value::Binary(ref b) if b == &[0xDE, 0xAD]));
    }

    #[test]
    fn null_values() {
        assert!(NodeId::default().is_null());
        assert!(QualifiedName::default().is_null());
        assert!(ByteString::null().is_empty());
    }
}
