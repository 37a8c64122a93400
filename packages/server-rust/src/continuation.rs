//! Server-held history read cursors.
//!
//! A continuation point is an opaque random token (a v4 UUID) naming a cursor
//! bound to one node and one set of read details. Tokens are single-use: a
//! resume consumes the cursor and the next page, if any, comes with a fresh
//! token. Cursors idle for longer than the configured timeout expire.

use std::collections::HashMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use ua_attribute_core::{ByteString, ClockSource, HistoryReadDetails, NodeId, StatusCode};
use uuid::Uuid;

/// Where a paged read resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Remaining window of a raw read, in archive key ticks.
    Raw {
        lower: Bound<i64>,
        upper: Bound<i64>,
        backward: bool,
    },
    /// Index of the next requested time of an at-time read.
    AtTime { next: usize },
}

#[derive(Debug, Clone)]
struct Cursor {
    node_id: NodeId,
    details: HistoryReadDetails,
    position: Position,
    touched_at: u64,
}

pub struct ContinuationRegistry {
    cursors: Mutex<HashMap<Uuid, Cursor>>,
    clock: Arc<dyn ClockSource>,
    timeout_ms: u64,
    max_cursors: usize,
}

impl ContinuationRegistry {
    #[must_use]
    pub fn new(clock: Arc<dyn ClockSource>, timeout_ms: u64, max_cursors: usize) -> Self {
        Self {
            cursors: Mutex::new(HashMap::new()),
            clock,
            timeout_ms,
            max_cursors,
        }
    }

    /// Stores a cursor and returns its token.
    ///
    /// # Errors
    ///
    /// Returns `BadNoContinuationPoints` when the live-cursor cap is reached.
    pub fn issue(
        &self,
        node_id: &NodeId,
        details: &HistoryReadDetails,
        position: Position,
    ) -> Result<ByteString, StatusCode> {
        let now = self.clock.now();
        let mut cursors = self.cursors.lock();
        self.purge_locked(&mut cursors, now);
        if cursors.len() >= self.max_cursors {
            debug!(node = %node_id, live = cursors.len(), "continuation point refused");
            return Err(StatusCode::BadNoContinuationPoints);
        }
        let token = Uuid::new_v4();
        cursors.insert(
            token,
            Cursor {
                node_id: node_id.clone(),
                details: details.clone(),
                position,
                touched_at: now,
            },
        );
        debug!(node = %node_id, %token, "continuation point issued");
        Ok(ByteString(token.as_bytes().to_vec()))
    }

    /// Consumes the cursor named by `token`.
    ///
    /// # Errors
    ///
    /// Returns `BadContinuationPointInvalid` when the token is unknown, expired,
    /// or was issued for a different node or different read details. A cursor
    /// presented with the wrong node or details is discarded.
    pub fn resume(
        &self,
        token: &ByteString,
        node_id: &NodeId,
        details: &HistoryReadDetails,
    ) -> Result<Position, StatusCode> {
        let key = parse_token(token)?;
        let now = self.clock.now();
        let mut cursors = self.cursors.lock();
        self.purge_locked(&mut cursors, now);
        let cursor = cursors
            .remove(&key)
            .ok_or(StatusCode::BadContinuationPointInvalid)?;
        if cursor.node_id != *node_id || cursor.details != *details {
            debug!(node = %node_id, token = %key, "continuation point presented with different node or details");
            return Err(StatusCode::BadContinuationPointInvalid);
        }
        Ok(cursor.position)
    }

    /// Discards the cursor named by `token`. Releasing an unknown or expired
    /// token is not an error.
    ///
    /// Returns whether a live cursor was dropped.
    pub fn release(&self, token: &ByteString) -> bool {
        let Ok(key) = parse_token(token) else {
            return false;
        };
        let released = self.cursors.lock().remove(&key).is_some();
        debug!(token = %key, released, "continuation point release");
        released
    }

    /// Number of live (unexpired) cursors.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut cursors = self.cursors.lock();
        self.purge_locked(&mut cursors, self.clock.now());
        cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_locked(&self, cursors: &mut HashMap<Uuid, Cursor>, now: u64) {
        let timeout = self.timeout_ms;
        cursors.retain(|token, cursor| {
            let live = now.saturating_sub(cursor.touched_at) < timeout;
            if !live {
                debug!(node = %cursor.node_id, %token, "continuation point expired");
            }
            live
        });
    }
}

fn parse_token(token: &ByteString) -> Result<Uuid, StatusCode> {
    Uuid::from_slice(token.as_bytes()).map_err(|_| StatusCode::BadContinuationPointInvalid)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use ua_attribute_core::{ReadAtTimeDetails, ReadRawModifiedDetails, UtcTime};

    use super::*;

    struct ManualClock(AtomicU64);

    impl ClockSource for ManualClock {
        fn now(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn registry(max: usize) -> (Arc<ManualClock>, ContinuationRegistry) {
        let clock = Arc::new(ManualClock(AtomicU64::new(1_000)));
        let registry = ContinuationRegistry::new(clock.clone(), 60_000, max);
        (clock, registry)
    }

    fn details() -> HistoryReadDetails {
        HistoryReadDetails::ReadRaw(ReadRawModifiedDetails {
            start_time: Some(UtcTime::from_unix_millis(0)),
            num_values_per_node: 2,
            ..Default::default()
        })
    }

    fn position() -> Position {
        Position::Raw {
            lower: Bound::Excluded(5),
            upper: Bound::Unbounded,
            backward: false,
        }
    }

    #[test]
    fn resume_consumes_the_cursor() {
        let (_, reg) = registry(10);
        let node = NodeId::numeric(2, 1);
        let token = reg.issue(&node, &details(), position()).unwrap();
        assert_eq!(token.as_bytes().len(), 16);
        assert_eq!(reg.resume(&token, &node, &details()), Ok(position()));
        assert_eq!(
            reg.resume(&token, &node, &details()),
            Err(StatusCode::BadContinuationPointInvalid)
        );
    }

    #[test]
    fn tokens_are_distinct() {
        let (_, reg) = registry(10);
        let node = NodeId::numeric(2, 1);
        let a = reg.issue(&node, &details(), position()).unwrap();
        let b = reg.issue(&node, &details(), position()).unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn expired_cursor_is_invalid() {
        let (clock, reg) = registry(10);
        let node = NodeId::numeric(2, 1);
        let token = reg.issue(&node, &details(), position()).unwrap();
        clock.0.fetch_add(60_000, Ordering::SeqCst);
        assert_eq!(
            reg.resume(&token, &node, &details()),
            Err(StatusCode::BadContinuationPointInvalid)
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn changed_details_invalidate_the_cursor() {
        let (_, reg) = registry(10);
        let node = NodeId::numeric(2, 1);
        let token = reg.issue(&node, &details(), position()).unwrap();
        let other = HistoryReadDetails::ReadAtTime(ReadAtTimeDetails {
            req_times: vec![UtcTime::from_unix_millis(1)],
            use_simple_bounds: true,
        });
        assert_eq!(
            reg.resume(&token, &node, &other),
            Err(StatusCode::BadContinuationPointInvalid)
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn wrong_node_invalidates_the_cursor() {
        let (_, reg) = registry(10);
        let token = reg.issue(&NodeId::numeric(2, 1), &details(), position()).unwrap();
        assert_eq!(
            reg.resume(&token, &NodeId::numeric(2, 2), &details()),
            Err(StatusCode::BadContinuationPointInvalid)
        );
    }

    #[test]
    fn cap_refuses_new_cursors_until_one_is_released() {
        let (_, reg) = registry(1);
        let node = NodeId::numeric(2, 1);
        let token = reg.issue(&node, &details(), position()).unwrap();
        assert_eq!(
            reg.issue(&node, &details(), position()),
            Err(StatusCode::BadNoContinuationPoints)
        );
        assert!(reg.release(&token));
        assert!(reg.issue(&node, &details(), position()).is_ok());
    }

    #[test]
    fn release_is_idempotent() {
        let (_, reg) = registry(10);
        let token = reg.issue(&NodeId::numeric(2, 1), &details(), position()).unwrap();
        assert!(reg.release(&token));
        assert!(!reg.release(&token));
        assert!(!reg.release(&ByteString(b"garbage".to_vec())));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let (_, reg) = registry(10);
        assert_eq!(
            reg.resume(&ByteString(vec![1, 2, 3]), &NodeId::numeric(2, 1), &details()),
            Err(StatusCode::BadContinuationPointInvalid)
        );
    }
}
