//! Comprehensive edge case tests for fos-js
//!
//! Tests for edge cases, error handling, and stress testing.

use fos_js::*;

// ============================================================================
// RUNTIME EDGE CASES
// ============================================================================

#[test]
fn test_empty_code() {
    let result = eval("");
    assert!(result.is_ok());
}

#[test]
fn test_whitespace_only() {
    let result = eval("   \n\t  ");
    assert!(result.is_ok());
}

#[test]
fn test_comment_only() {
    assert!(eval("// just a comment").is_ok());
    assert!(eval("/* block comment */").is_ok());
}

#[test]
fn test_multiline_code() {
    let code = r#"
        var a = 1;
        var b = 2;
        var c = a + b;
        c
    "#;
    assert_eq!(eval(code).unwrap(), JsValue::Number(3.0));
}

#[test]
fn test_float_result() {
    assert_eq!(eval("1 / 4").unwrap(), JsValue::Number(0.25));
}

#[test]
fn test_unicode_strings() {
    assert_eq!(eval("'日本' + '語'").unwrap(), JsValue::from("日本語"));
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[test]
fn test_syntax_error() {
    assert!(matches!(eval("function ("), Err(JsError::Syntax(_))));
}

#[test]
fn test_reference_error_is_runtime() {
    match eval("notDefined + 1") {
        Err(JsError::Runtime(message)) => assert!(message.starts_with("ReferenceError")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_thrown_primitive() {
    match eval("throw 'plain'") {
        Err(JsError::Runtime(message)) => assert_eq!(message, "plain"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_context_survives_error() {
    let ctx = ScriptContext::new(ScriptingMode::OutsideOnly).unwrap();
    ctx.evaluate("var kept = 1").unwrap();
    assert!(ctx.evaluate("throw new Error('x')").is_err());
    assert_eq!(ctx.evaluate("kept").unwrap(), JsValue::Number(1.0));
}

#[test]
fn test_disabled_error_message() {
    let err = ScriptContext::new(ScriptingMode::Disabled).unwrap_err();
    assert_eq!(err.to_string(), "Scripting is disabled");
}

// ============================================================================
// STRESS TESTS
// ============================================================================

#[test]
fn test_loop_heavy() {
    let result = eval("var s = 0; for (var i = 0; i < 100000; i++) { s += i; } s").unwrap();
    assert_eq!(result, JsValue::Number(4_999_950_000.0));
}

#[test]
fn test_many_host_calls() {
    let ctx = ScriptContext::new(ScriptingMode::OutsideOnly).unwrap();
    ctx.install_function("double", |args| {
        let n = args.first().map(JsValue::to_number).unwrap_or(f64::NAN);
        Ok(JsValue::Number(n * 2.0))
    })
    .unwrap();
    let result = ctx
        .evaluate("var t = 0; for (var i = 0; i < 1000; i++) { t += double(i); } t")
        .unwrap();
    assert_eq!(result, JsValue::Number(999_000.0));
}
