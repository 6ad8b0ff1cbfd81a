//! Callback identifier encoding.
//!
//! A pending call that carries callbacks is identified by its call id. Each
//! callback travels across the boundary as a single integer that packs the
//! call id together with the callback kind:
//!
//! ```text
//! encoded = (call_id << 1) | flag      flag = 1 success, 0 failure
//! ```
//!
//! This layout is a stable contract with the host side and must not change.
//! Call ids are limited to 63 bits.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    Failure,
    Success,
}

impl CallbackKind {
    const fn flag(self) -> u64 {
        match self {
            CallbackKind::Failure => 0,
            CallbackKind::Success => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId {
    pub call_id: u64,
    pub kind: CallbackKind,
}

impl CallbackId {
    pub const fn new(call_id: u64, kind: CallbackKind) -> Self {
        Self { call_id, kind }
    }

    pub const fn success(call_id: u64) -> Self {
        Self::new(call_id, CallbackKind::Success)
    }

    pub const fn failure(call_id: u64) -> Self {
        Self::new(call_id, CallbackKind::Failure)
    }

    pub const fn encode(self) -> u64 {
        (self.call_id << 1) | self.kind.flag()
    }

    pub const fn decode(encoded: u64) -> Self {
        let kind = if encoded & 1 == 1 {
            CallbackKind::Success
        } else {
            CallbackKind::Failure
        };
        Self {
            call_id: encoded >> 1,
            kind,
        }
    }
}
