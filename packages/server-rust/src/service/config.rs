use std::time::Duration;

/// Limits and timeouts of the in-memory attribute server.
///
/// Requests with more items than the matching `max_nodes_per_*` limit fail at
/// service level with `BadTooManyOperations`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_nodes_per_read: usize,
    pub max_nodes_per_write: usize,
    pub max_nodes_per_history_read: usize,
    pub max_nodes_per_history_update: usize,
    /// Live continuation points across all callers; further cursors are
    /// refused with `BadNoContinuationPoints`.
    pub max_continuation_points: usize,
    /// Idle time after which a continuation point expires.
    pub continuation_point_timeout: Duration,
    /// Page size used when a raw read leaves `numValuesPerNode` at zero.
    pub max_values_per_page: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_nodes_per_read: 1000,
            max_nodes_per_write: 1000,
            max_nodes_per_history_read: 100,
            max_nodes_per_history_update: 100,
            max_continuation_points: 10,
            continuation_point_timeout: Duration::from_secs(60),
            max_values_per_page: 1000,
        }
    }
}
