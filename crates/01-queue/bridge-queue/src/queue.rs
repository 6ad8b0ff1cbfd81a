//! Outbound call buffer.
//!
//! Calls are stored column-wise: module ids, method ids, and parameter lists
//! live in three parallel vectors that always have the same length. The host
//! side consumes a batch in exactly this shape.

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

use crate::value::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingQueue {
    module_ids: Vec<u32>,
    method_ids: Vec<u32>,
    params: Vec<Vec<Value>>,
    call_id: u64,
}

impl PendingQueue {
    /// Creates an empty queue stamped with the current call counter.
    pub fn new(call_id: u64) -> Self {
        Self {
            call_id,
            ..Self::default()
        }
    }

    pub fn push(&mut self, module_id: u32, method_id: u32, params: Vec<Value>) {
        self.module_ids.push(module_id);
        self.method_ids.push(method_id);
        self.params.push(params);
    }

    pub fn len(&self) -> usize {
        self.module_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.module_ids.is_empty()
    }

    /// Call counter value at the time this queue was created.
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    /// Replaces `self` with a fresh queue carrying `call_id` and returns the
    /// detached batch.
    pub fn swap(&mut self, call_id: u64) -> FlushedQueue {
        let detached = std::mem::replace(self, PendingQueue::new(call_id));
        FlushedQueue { inner: detached }
    }
}

/// A detached batch of outbound calls ready to cross the boundary.
///
/// Serializes as `[moduleIds, methodIds, params, callId]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FlushedQueue {
    inner: PendingQueue,
}

impl FlushedQueue {
    pub fn module_ids(&self) -> &[u32] {
        &self.inner.module_ids
    }

    pub fn method_ids(&self) -> &[u32] {
        &self.inner.method_ids
    }

    pub fn params(&self) -> &[Vec<Value>] {
        &self.inner.params
    }

    pub fn call_id(&self) -> u64 {
        self.inner.call_id
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn calls(&self) -> impl Iterator<Item = QueuedCall<'_>> + '_ {
        self.inner
            .module_ids
            .iter()
            .zip(&self.inner.method_ids)
            .zip(&self.inner.params)
            .map(|((&module_id, &method_id), params)| QueuedCall {
                module_id,
                method_id,
                params,
            })
    }
}

impl Serialize for FlushedQueue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.inner.module_ids)?;
        tuple.serialize_element(&self.inner.method_ids)?;
        tuple.serialize_element(&self.inner.params)?;
        tuple.serialize_element(&self.inner.call_id)?;
        tuple.end()
    }
}

/// Borrowed view of one row of a [`FlushedQueue`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueuedCall<'a> {
    pub module_id: u32,
    pub method_id: u32,
    pub params: &'a [Value],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_detaches_and_keeps_counter() {
        let mut queue = PendingQueue::new(0);
        queue.push(5, 2, vec![Value::from("hello")]);
        queue.push(6, 0, Vec::new());

        let flushed = queue.swap(9);
        assert!(queue.is_empty());
        assert_eq!(queue.call_id(), 9);
        assert_eq!(flushed.module_ids(), &[5, 6]);
        assert_eq!(flushed.method_ids(), &[2, 0]);
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed.call_id(), 0);
    }

    #[test]
    fn serializes_as_wire_tuple() {
        let mut queue = PendingQueue::new(3);
        queue.push(1, 4, vec![Value::from(true), Value::from(7)]);
        let json = serde_json::to_string(&queue.swap(3)).expect("serialize");
        assert_eq!(json, "[[1],[4],[[true,7]],3]");
    }

    #[test]
    fn rows_line_up() {
        let mut queue = PendingQueue::new(0);
        queue.push(1, 10, vec![Value::from("a")]);
        queue.push(2, 20, vec![Value::from("b")]);
        let flushed = queue.swap(0);
        let rows: Vec<_> = flushed
            .calls()
            .map(|c| (c.module_id, c.method_id, c.params[0].as_str().map(str::to_owned)))
            .collect();
        assert_eq!(
            rows,
            vec![(1, 10, Some("a".to_owned())), (2, 20, Some("b".to_owned()))]
        );
    }
}
