//! In-memory server for the attribute service set: a concurrent address space
//! of variable nodes with value history, and the server side of the
//! continuation-point protocol.

pub mod address_space;
pub mod continuation;
pub mod logging;
pub mod service;

pub use address_space::{access, AddressSpace, VariableNode};
pub use continuation::{ContinuationRegistry, Position};
pub use service::{MemoryServer, ServerConfig};
