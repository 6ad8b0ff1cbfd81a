use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{BridgeError, BridgeResult};
use crate::hooks::{DebuggerProbe, FatalErrorReporter};

/// Runs an inbound entry point body.
///
/// When a debugger asked to pause on throw, errors are returned to the caller
/// and panics unwind from their origin. Otherwise both are handed to the
/// reporter and `Ok(None)` is returned so the entry point can carry on.
pub(crate) fn guard<T>(
    debugger: &dyn DebuggerProbe,
    reporter: &dyn FatalErrorReporter,
    label: &str,
    body: impl FnOnce() -> BridgeResult<T>,
) -> BridgeResult<Option<T>> {
    if debugger.should_pause_on_throw() {
        return body().map(Some);
    }

    let error = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => return Ok(Some(value)),
        Ok(Err(err)) => err,
        Err(payload) => BridgeError::Panic {
            label: label.to_owned(),
            message: panic_payload_to_string(payload.as_ref()),
        },
    };
    reporter.report_fatal_error(&error);
    Ok(None)
}

fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}
