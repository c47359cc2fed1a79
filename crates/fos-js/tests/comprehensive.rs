//! Comprehensive tests for the script bridge

use std::cell::RefCell;
use std::rc::Rc;

use fos_js::*;

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<String>>>);

impl ConsoleSink for Recorder {
    fn message(&self, method: &str, text: &str) {
        self.0.borrow_mut().push(format!("{method}:{text}"));
    }
}

fn context() -> ScriptContext {
    ScriptContext::new(ScriptingMode::OutsideOnly).unwrap()
}

// ============================================================================
// MODES
// ============================================================================

#[test]
fn test_modes() {
    assert!(!ScriptingMode::Disabled.is_enabled());
    assert!(ScriptingMode::OutsideOnly.is_enabled());
    assert!(!ScriptingMode::OutsideOnly.runs_document_scripts());
    assert!(ScriptingMode::Dangerously.runs_document_scripts());
    assert_eq!(ScriptingMode::default(), ScriptingMode::Disabled);

    let ctx = ScriptContext::new(ScriptingMode::Dangerously).unwrap();
    assert_eq!(ctx.mode(), ScriptingMode::Dangerously);
}

// ============================================================================
// CONSOLE
// ============================================================================

#[test]
fn test_console_routes_to_sink() {
    let ctx = context();
    let recorder = Recorder::default();
    ctx.install_console(recorder.clone()).unwrap();

    ctx.evaluate("console.log('a', 1); console.error('bad')").unwrap();
    assert_eq!(*recorder.0.borrow(), ["log:a 1", "error:bad"]);
}

#[test]
fn test_console_every_method() {
    let ctx = context();
    let recorder = Recorder::default();
    ctx.install_console(recorder.clone()).unwrap();

    for method in CONSOLE_METHODS {
        ctx.evaluate(&format!("console.{method}('x')")).unwrap();
    }
    assert_eq!(recorder.0.borrow().len(), CONSOLE_METHODS.len());
}

#[test]
fn test_tracing_console_installs() {
    let ctx = context();
    ctx.install_console(TracingConsole).unwrap();
    assert_eq!(ctx.evaluate("typeof console.warn").unwrap(), JsValue::from("function"));
}

// ============================================================================
// HOST SURFACE
// ============================================================================

#[test]
fn test_globals_and_functions_together() {
    let ctx = context();
    ctx.install_globals([("innerWidth", JsValue::Number(1024.0)), ("self", JsValue::Object)])
        .unwrap();
    ctx.install_function("greet", |args| {
        let who = args.first().map(JsValue::to_display_string).unwrap_or_default();
        Ok(JsValue::String(format!("hello {who}")))
    })
    .unwrap();

    assert_eq!(ctx.evaluate("innerWidth / 2").unwrap(), JsValue::Number(512.0));
    assert_eq!(ctx.evaluate("typeof self").unwrap(), JsValue::from("object"));
    assert_eq!(ctx.evaluate("greet('w')").unwrap(), JsValue::from("hello w"));
}

#[test]
fn test_host_function_returns_captured_function() {
    let ctx = context();
    let stash: Rc<RefCell<Option<JsValue>>> = Rc::default();
    let put = Rc::clone(&stash);
    ctx.install_function("put", move |mut args| {
        *put.borrow_mut() = args.pop();
        Ok(JsValue::Undefined)
    })
    .unwrap();
    let get = Rc::clone(&stash);
    ctx.install_function("get", move |_| Ok(get.borrow().clone().unwrap_or(JsValue::Null)))
        .unwrap();

    ctx.evaluate("put(function () { return 9; })").unwrap();
    assert_eq!(ctx.evaluate("get()()").unwrap(), JsValue::Number(9.0));
}

#[test]
fn test_global_proxy_reresolved() {
    let ctx = context();
    ctx.evaluate("globalThis.counter = 1").unwrap();
    let first = ctx.with_global_proxy(|_, g| g.get::<_, i32>("counter").unwrap());
    ctx.evaluate("counter = 2").unwrap();
    let second = ctx.with_global_proxy(|_, g| g.get::<_, i32>("counter").unwrap());
    assert_eq!((first, second), (1, 2));
}

#[test]
fn test_call_error_propagates() {
    let ctx = context();
    let f = match ctx.evaluate("(function () { throw new TypeError('t'); })").unwrap() {
        JsValue::Function(f) => f,
        other => panic!("unexpected {other:?}"),
    };
    assert!(matches!(ctx.call(&f, vec![]), Err(JsError::TypeError(m)) if m == "t"));
}
