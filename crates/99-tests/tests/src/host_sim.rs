//! Minimal stand-in for the host side of the bridge.

use std::collections::{HashMap, VecDeque};

use anyhow::{anyhow, Result};
use bridge_queue::{FlushedQueue, Value};

/// How the host answers a method. Answered methods are expected to carry a
/// failure id followed by a success id as their last two parameters.
#[derive(Clone, Debug)]
pub enum Reply {
    /// Invoke the success callback with the call's own arguments.
    Succeed,
    /// Invoke the failure callback with this reason.
    Fail(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeenCall {
    pub module_id: u32,
    pub method_id: u32,
    pub params: Vec<Value>,
}

#[derive(Default)]
pub struct HostSim {
    replies: HashMap<(u32, u32), Reply>,
    seen: Vec<SeenCall>,
}

impl HostSim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, module_id: u32, method_id: u32, reply: Reply) -> Self {
        self.replies.insert((module_id, method_id), reply);
        self
    }

    pub fn seen(&self) -> &[SeenCall] {
        &self.seen
    }

    /// Processes `first` and every batch produced by answering it, returning
    /// the number of batches handled.
    pub fn pump(&mut self, first: Option<FlushedQueue>) -> Result<usize> {
        let mut work: VecDeque<FlushedQueue> = first.into_iter().collect();
        let mut rounds = 0;
        while let Some(batch) = work.pop_front() {
            rounds += 1;
            for call in batch.calls() {
                self.seen.push(SeenCall {
                    module_id: call.module_id,
                    method_id: call.method_id,
                    params: call.params.to_vec(),
                });
                let Some(reply) = self.replies.get(&(call.module_id, call.method_id)) else {
                    continue;
                };
                let (args, ids) = split_callback_ids(call.params)?;
                let next = match reply {
                    Reply::Succeed => batched_bridge::invoke_callback_and_return_flushed_queue(
                        ids.1,
                        args.to_vec(),
                    )?,
                    Reply::Fail(reason) => batched_bridge::invoke_callback_and_return_flushed_queue(
                        ids.0,
                        vec![Value::from(reason.as_str())],
                    )?,
                };
                work.extend(next);
            }
        }
        Ok(rounds)
    }
}

fn split_callback_ids(params: &[Value]) -> Result<(&[Value], (u64, u64))> {
    match params {
        [args @ .., fail, succ] => {
            let fail = fail
                .as_u64()
                .ok_or_else(|| anyhow!("failure id missing in {params:?}"))?;
            let succ = succ
                .as_u64()
                .ok_or_else(|| anyhow!("success id missing in {params:?}"))?;
            Ok((args, (fail, succ)))
        }
        _ => Err(anyhow!("answered call has no callback ids: {params:?}")),
    }
}
