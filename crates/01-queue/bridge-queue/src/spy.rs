//! Observer hook that sees every call crossing the bridge.

use std::fmt;
use std::rc::Rc;

use crate::value::{render_args, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Host calling into script: inbound calls and callback completions.
    ToScript,
    /// Script calling out to the host.
    ToHost,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodLabel {
    Name(String),
    Id(u64),
}

impl fmt::Display for MethodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodLabel::Name(name) => f.write_str(name),
            MethodLabel::Id(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpyData {
    pub direction: Direction,
    pub module: Option<String>,
    pub method: MethodLabel,
    pub args: Vec<Value>,
}

impl fmt::Display for SpyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            Direction::ToScript => "host->script",
            Direction::ToHost => "script->host",
        };
        write!(f, "{arrow} : ")?;
        if let Some(module) = &self.module {
            write!(f, "{module}.")?;
        }
        write!(f, "{}({})", self.method, render_args(&self.args))
    }
}

pub type Spy = Rc<dyn Fn(&SpyData)>;

/// Spy that logs every crossing at info level.
pub fn log_spy() -> Spy {
    Rc::new(|data: &SpyData| tracing::info!("{data}"))
}
