use std::io::Write;

use anyhow::Result;
use bridge_queue::{render_args, FlushedQueue};

use crate::script::{to_values, Script, Step};

/// Runs every step against the installed bridge, writing each drained batch
/// (or `null`) as one JSON line.
pub fn run(script: Script, out: &mut impl Write) -> Result<()> {
    for step in script.steps {
        let batch = run_step(step)?;
        serde_json::to_writer(&mut *out, &batch)?;
        writeln!(out)?;
    }
    Ok(())
}

fn run_step(step: Step) -> Result<Option<FlushedQueue>> {
    let batch = match step {
        Step::Call {
            module,
            method,
            args,
        } => {
            let (result, batch) = batched_bridge::call_function_return_result_and_flushed_queue(
                &module,
                &method,
                to_values(args),
            )?;
            match result {
                Some(value) => tracing::info!(%module, %method, result = %value, "call returned"),
                None => tracing::warn!(%module, %method, "call failed"),
            }
            batch
        }
        Step::Callback { id, args } => {
            let args = to_values(args);
            tracing::debug!(id, args = %render_args(&args), "invoking callback");
            batched_bridge::invoke_callback_and_return_flushed_queue(id, args)?
        }
        Step::Flush => batched_bridge::flushed_queue()?,
    };
    Ok(batch)
}
