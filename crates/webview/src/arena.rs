//! Pending-call arena
//!
//! Every in-flight `send` owns one slot. Ids come from a counter that only moves
//! forward, so an id is never handed out twice even after its slot is freed.
//!
//! ## Memory Layout
//!
//! ```text
//! last_id: 7
//! calls:   { 5 → PendingCall, 7 → PendingCall }
//!            ↑ 6 already settled, its slot is gone
//! ```

use ahash::AHashMap;
use protocol::CallbackId;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::error::CallError;

pub type CallResult = std::result::Result<Value, CallError>;

/// One call waiting for its reply
#[derive(Debug)]
pub struct PendingCall {
    pub method: String,
    pub created: Instant,
    tx: oneshot::Sender<CallResult>,
}

impl PendingCall {
    /// Hand the outcome to whoever awaits the call. A dropped receiver is fine.
    pub fn settle(self, result: CallResult) {
        let _ = self.tx.send(result);
    }

    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }
}

#[derive(Debug, Default)]
pub struct PendingCalls {
    last_id: CallbackId,
    calls: AHashMap<CallbackId, PendingCall>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next id for `method`. The first id is 1.
    pub fn allocate(&mut self, method: &str, tx: oneshot::Sender<CallResult>) -> CallbackId {
        self.last_id += 1;
        self.calls.insert(
            self.last_id,
            PendingCall {
                method: method.to_string(),
                created: Instant::now(),
                tx,
            },
        );
        self.last_id
    }

    /// Remove and return the call for `id`. `None` for unknown or settled ids.
    pub fn take(&mut self, id: CallbackId) -> Option<PendingCall> {
        self.calls.remove(&id)
    }

    /// Empty the arena, oldest id first
    pub fn drain(&mut self) -> Vec<(CallbackId, PendingCall)> {
        let mut calls: Vec<_> = self.calls.drain().collect();
        calls.sort_unstable_by_key(|(id, _)| *id);
        calls
    }

    /// Oldest call still waiting, for diagnostics
    pub fn oldest(&self) -> Option<(CallbackId, &PendingCall)> {
        self.calls
            .iter()
            .min_by_key(|(id, _)| **id)
            .map(|(id, call)| (*id, call))
    }

    pub fn last_id(&self) -> CallbackId {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
