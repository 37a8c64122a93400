use serde::{Deserialize, Serialize};

use crate::identifiers::ByteString;

/// Caller-supplied correlation token attached to a request.
///
/// Never sent to the server: the transport hands it back unchanged so the
/// caller can match a completion to the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestContext {
    Id(u64),
    Name(String),
    Bytes(ByteString),
}
