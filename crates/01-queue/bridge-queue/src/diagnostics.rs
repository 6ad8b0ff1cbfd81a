//! Development-only bookkeeping used to label calls in errors and traces.
//!
//! Nothing here influences dispatch.

use std::collections::{HashMap, VecDeque};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CallRecord {
    call_id: u64,
    module_id: u32,
    method_id: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct RemoteModule {
    name: String,
    methods: Vec<String>,
}

/// Names resolved for a call id, when the ring still remembers it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallLabel {
    pub module: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug)]
pub struct Diagnostics {
    recent: VecDeque<CallRecord>,
    limit: usize,
    remote_modules: HashMap<u32, RemoteModule>,
}

impl Diagnostics {
    pub fn new(limit: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(limit),
            limit,
            remote_modules: HashMap::new(),
        }
    }

    /// Remembers which host method `call_id` targets, evicting the oldest
    /// record once the window is full.
    pub fn record_call(&mut self, call_id: u64, module_id: u32, method_id: u32) {
        if self.limit == 0 {
            return;
        }
        while self.recent.len() >= self.limit {
            self.recent.pop_front();
        }
        self.recent.push_back(CallRecord {
            call_id,
            module_id,
            method_id,
        });
    }

    pub fn lookup_call(&self, call_id: u64) -> Option<(u32, u32)> {
        self.recent
            .iter()
            .rev()
            .find(|r| r.call_id == call_id)
            .map(|r| (r.module_id, r.method_id))
    }

    pub fn label_call(&self, call_id: u64) -> Option<CallLabel> {
        let (module_id, method_id) = self.lookup_call(call_id)?;
        Some(CallLabel {
            module: self.module_name(module_id).map(str::to_owned),
            method: self.method_name(module_id, method_id).map(str::to_owned),
        })
    }

    pub fn create_debug_lookup(&mut self, module_id: u32, name: String, methods: Vec<String>) {
        self.remote_modules
            .insert(module_id, RemoteModule { name, methods });
    }

    pub fn module_name(&self, module_id: u32) -> Option<&str> {
        self.remote_modules
            .get(&module_id)
            .map(|m| m.name.as_str())
    }

    pub fn method_name(&self, module_id: u32, method_id: u32) -> Option<&str> {
        self.remote_modules
            .get(&module_id)?
            .methods
            .get(method_id as usize)
            .map(String::as_str)
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }
}
