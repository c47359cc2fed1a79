//! Console API
//!
//! Implements console.log, console.warn, console.error, etc. Output goes to
//! a [`ConsoleSink`]; the default sink logs through `tracing`.

use rquickjs::{function::Rest, Ctx, Function, Object, Value};

use crate::value::format_value;

/// Console methods installed on the global `console` object
pub const CONSOLE_METHODS: [&str; 6] = ["log", "info", "warn", "error", "debug", "trace"];

/// Receives formatted console output
pub trait ConsoleSink {
    /// `method` is the console method name (`"log"`, `"warn"`, ...)
    fn message(&self, method: &str, text: &str);
}

/// Sink that forwards console output to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn message(&self, method: &str, text: &str) {
        match method {
            "error" => tracing::error!("[JS] {}", text),
            "warn" => tracing::warn!("[JS] {}", text),
            "debug" | "trace" => tracing::debug!("[JS] {}", text),
            _ => tracing::info!("[JS] {}", text),
        }
    }
}

/// Install console API into the global object
pub fn install_console<S>(ctx: &Ctx, sink: S) -> Result<(), rquickjs::Error>
where
    S: ConsoleSink + Clone + 'static,
{
    let console = Object::new(ctx.clone())?;

    for method in CONSOLE_METHODS {
        let sink = sink.clone();
        console.set(
            method,
            Function::new(ctx.clone(), move |args: Rest<Value>| {
                sink.message(method, &join_args(&args.0));
                Ok::<(), rquickjs::Error>(())
            })?,
        )?;
    }

    ctx.globals().set("console", console)?;
    Ok(())
}

fn join_args(values: &[Value]) -> String {
    let mut output = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        format_value(&mut output, value);
    }
    output
}
