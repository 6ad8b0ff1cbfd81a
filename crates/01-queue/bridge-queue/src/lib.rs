//! Batched message queue for calls between a script context and its host.
//!
//! Outbound calls are buffered column-wise and shipped in batches; inbound
//! calls are dispatched to named [`CallableModule`]s; asynchronous replies are
//! correlated through encoded [`CallbackId`]s.

pub mod callback_id;
pub mod callbacks;
pub mod config;
pub mod diagnostics;
pub mod error;
mod guard;
pub mod hooks;
pub mod message_queue;
pub mod modules;
pub mod queue;
pub mod spy;
pub mod validate;
pub mod value;

pub use callback_id::{CallbackId, CallbackKind};
pub use callbacks::Callback;
pub use config::{QueueConfig, DEBUG_INFO_LIMIT, MIN_TIME_BETWEEN_FLUSHES_MS};
pub use error::{BridgeError, BridgeResult};
pub use hooks::{
    Clock, DebuggerProbe, DebuggerState, FatalErrorReporter, FlushSink, LogReporter, LogTracer,
    ManualClock, NoopTracer, SystemClock, Tracer,
};
pub use message_queue::{ImmediatesCallback, MessageQueue, MessageQueueBuilder, PENDING_QUEUE_COUNTER};
pub use modules::{CallableModule, MethodTable};
pub use queue::{FlushedQueue, QueuedCall};
pub use spy::{log_spy, Direction, MethodLabel, Spy, SpyData};
pub use value::{render_args, FunctionRef, Value};
