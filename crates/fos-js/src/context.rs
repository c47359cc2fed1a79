//! Script context
//!
//! One QuickJS runtime and context per window. The host installs its
//! surface (values, functions, console) once; callers then evaluate source
//! and call back into captured script functions.

use rquickjs::{function::Rest, Context, Ctx, Exception, Function, Object, Runtime, Value};

use crate::console::{self, ConsoleSink};
use crate::value::ScriptFunction;
use crate::{JsError, JsValue};

/// Memory cap for one script runtime
const MEMORY_LIMIT: usize = 32 * 1024 * 1024;

/// How much script a window runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptingMode {
    /// No script context is ever created
    #[default]
    Disabled,
    /// Caller-supplied script runs in the sandbox
    OutsideOnly,
    /// Additionally runs inline `<script>` elements of the document
    Dangerously,
}

impl ScriptingMode {
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }

    pub fn runs_document_scripts(self) -> bool {
        matches!(self, Self::Dangerously)
    }
}

/// QuickJS sandbox bound to one window
pub struct ScriptContext {
    context: Context,
    _runtime: Runtime,
    mode: ScriptingMode,
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl ScriptContext {
    /// Create a new context; fails when scripting is disabled
    pub fn new(mode: ScriptingMode) -> Result<Self, JsError> {
        if !mode.is_enabled() {
            return Err(JsError::Disabled);
        }

        let runtime = Runtime::new().map_err(|e| JsError::Runtime(e.to_string()))?;
        runtime.set_memory_limit(MEMORY_LIMIT);
        let context = Context::full(&runtime).map_err(|e| JsError::Runtime(e.to_string()))?;

        tracing::debug!(?mode, "Created script context");
        Ok(Self {
            context,
            _runtime: runtime,
            mode,
        })
    }

    pub fn mode(&self) -> ScriptingMode {
        self.mode
    }

    /// Set plain values on the global object
    pub fn install_globals<'a, I>(&self, entries: I) -> Result<(), JsError>
    where
        I: IntoIterator<Item = (&'a str, JsValue)>,
    {
        self.context.with(|ctx| {
            let globals = ctx.globals();
            for (name, value) in entries {
                globals.set(name, value).map_err(|e| map_error(&ctx, e))?;
            }
            Ok(())
        })
    }

    /// Expose a host function as a global
    ///
    /// A returned `JsError` is thrown into script as the matching error type.
    pub fn install_function<F>(&self, name: &str, f: F) -> Result<(), JsError>
    where
        F: Fn(Vec<JsValue>) -> Result<JsValue, JsError> + 'static,
    {
        self.context.with(|ctx| {
            let func = Function::new(ctx.clone(), move |ctx: Ctx, args: Rest<JsValue>| {
                f(args.0).map_err(|error| throw(&ctx, error))
            })
            .map_err(|e| map_error(&ctx, e))?;
            ctx.globals().set(name, func).map_err(|e| map_error(&ctx, e))
        })
    }

    /// Install `console` routed to `sink`
    pub fn install_console<S>(&self, sink: S) -> Result<(), JsError>
    where
        S: ConsoleSink + Clone + 'static,
    {
        self.context
            .with(|ctx| console::install_console(&ctx, sink).map_err(|e| map_error(&ctx, e)))
    }

    /// Evaluate source as a global script
    pub fn evaluate(&self, source: &str) -> Result<JsValue, JsError> {
        self.context.with(|ctx| {
            let result: Value = ctx.eval(source).map_err(|e| map_error(&ctx, e))?;
            rquickjs::FromJs::from_js(&ctx, result).map_err(|e| map_error(&ctx, e))
        })
    }

    /// Call a previously captured script function with `this` = undefined
    pub fn call(&self, function: &ScriptFunction, args: Vec<JsValue>) -> Result<JsValue, JsError> {
        self.context.with(|ctx| {
            let func = function.0.clone().restore(&ctx).map_err(|e| map_error(&ctx, e))?;
            func.call::<_, JsValue>((Rest(args),)).map_err(|e| map_error(&ctx, e))
        })
    }

    /// Run `f` against the current global object
    pub fn with_global_proxy<R>(&self, f: impl for<'js> FnOnce(&Ctx<'js>, Object<'js>) -> R) -> R {
        self.context.with(|ctx| {
            let globals = ctx.globals();
            f(&ctx, globals)
        })
    }

    /// Read a global by name
    pub fn global(&self, name: &str) -> Result<JsValue, JsError> {
        self.with_global_proxy(|ctx, globals| {
            globals.get::<_, JsValue>(name).map_err(|e| map_error(ctx, e))
        })
    }
}

/// Convert a host error into a pending script exception
fn throw(ctx: &Ctx, error: JsError) -> rquickjs::Error {
    match error {
        JsError::TypeError(message) => Exception::throw_type(ctx, &message),
        JsError::Syntax(message) => Exception::throw_syntax(ctx, &message),
        JsError::Runtime(message) => Exception::throw_message(ctx, &message),
        JsError::Disabled => Exception::throw_message(ctx, "Scripting is disabled"),
    }
}

/// Convert a QuickJS error, taking the pending exception if there is one
fn map_error(ctx: &Ctx, error: rquickjs::Error) -> JsError {
    if !matches!(error, rquickjs::Error::Exception) {
        return JsError::Runtime(error.to_string());
    }

    let caught = ctx.catch();
    let (name, message) = match caught.as_object() {
        Some(object) => (
            object.get::<_, String>("name").unwrap_or_default(),
            object.get::<_, String>("message").unwrap_or_default(),
        ),
        None => {
            let thrown = JsValue::from_js_lossy(ctx, caught);
            (String::new(), thrown.to_display_string())
        }
    };

    match name.as_str() {
        "SyntaxError" => JsError::Syntax(message),
        "TypeError" => JsError::TypeError(message),
        "" => JsError::Runtime(message),
        _ => JsError::Runtime(format!("{name}: {message}")),
    }
}

impl JsValue {
    fn from_js_lossy<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Self {
        rquickjs::FromJs::from_js(ctx, value).unwrap_or(Self::Undefined)
    }
}
