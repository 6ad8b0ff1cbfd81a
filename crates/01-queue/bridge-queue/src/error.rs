use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while dispatching across the bridge.
///
/// The first four variants are contract violations by one side of the
/// boundary; `Handler` and `Panic` wrap failures raised by user code that ran
/// inside a guarded entry point.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("module {module} is not a registered callable module (calling {method})")]
    ModuleNotRegistered { module: String, method: String },

    #[error("method {method} does not exist on module {module}")]
    MethodNotFound { module: String, method: String },

    #[error("{}", describe_missing_callback(.id, .module, .method))]
    CallbackNotFound {
        id: u64,
        module: Option<String>,
        method: Option<String>,
    },

    #[error("{rendered} is not usable as a host method argument")]
    InvalidArgument { rendered: String },

    #[error("{label} failed: {source:#}")]
    Handler {
        label: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{label} panicked: {message}")]
    Panic { label: String, message: String },
}

impl BridgeError {
    pub fn handler(label: impl Into<String>, source: anyhow::Error) -> Self {
        BridgeError::Handler {
            label: label.into(),
            source,
        }
    }

    /// Returns true for errors caused by a caller breaking the bridge contract
    /// rather than by user code failing at runtime.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            BridgeError::ModuleNotRegistered { .. }
                | BridgeError::MethodNotFound { .. }
                | BridgeError::CallbackNotFound { .. }
                | BridgeError::InvalidArgument { .. }
        )
    }
}

fn describe_missing_callback(id: &u64, module: &Option<String>, method: &Option<String>) -> String {
    match (module.as_deref(), method.as_deref()) {
        (Some(module), Some(method)) => format!(
            "the callback {method}() exists in module {module}, but only one callback may be \
             registered to a function in a host module"
        ),
        (module, method) => format!(
            "callback with id {id}: {}.{}() not found",
            module.unwrap_or("<unknown>"),
            method.unwrap_or("<unknown>")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_callback_message_names_known_call() {
        let err = BridgeError::CallbackNotFound {
            id: 7,
            module: Some("Storage".into()),
            method: Some("read".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("read()"), "{msg}");
        assert!(msg.contains("Storage"), "{msg}");
    }

    #[test]
    fn missing_callback_message_falls_back_to_id() {
        let err = BridgeError::CallbackNotFound {
            id: 9,
            module: None,
            method: None,
        };
        assert_eq!(
            err.to_string(),
            "callback with id 9: <unknown>.<unknown>() not found"
        );
    }

    #[test]
    fn handler_errors_are_not_contract_violations() {
        let err = BridgeError::handler("Echo.ping", anyhow::anyhow!("boom"));
        assert!(!err.is_contract_violation());
        assert_eq!(err.to_string(), "Echo.ping failed: boom");
    }
}
