//! fOS JavaScript Runtime
//!
//! QuickJS-based script bridge for the headless window.
//!
//! Features:
//! - QuickJS runtime via rquickjs
//! - Console API routed to a [`ConsoleSink`]
//! - Host functions and values installed on the global object
//! - Script functions kept alive for later calls (timer callbacks)

mod console;
mod context;
mod value;

pub use console::{ConsoleSink, TracingConsole, CONSOLE_METHODS};
pub use context::{ScriptContext, ScriptingMode};
pub use value::ScriptFunction;

/// Evaluate JavaScript in a throwaway context
pub fn eval(code: &str) -> Result<JsValue, JsError> {
    let context = ScriptContext::new(ScriptingMode::OutsideOnly)?;
    context.evaluate(code)
}

/// JavaScript value
#[derive(Debug, Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object,
    Array,
    Function(ScriptFunction),
}

impl JsValue {
    /// String form used when a value is handed to a string-only API
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Object => "[object Object]".to_string(),
            Self::Array => String::new(),
            Self::Function(_) => "function".to_string(),
        }
    }

    /// ToNumber, NaN for anything not numeric
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// JavaScript error
#[derive(Debug, thiserror::Error)]
pub enum JsError {
    #[error("JavaScript error: {0}")]
    Runtime(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Scripting is disabled")]
    Disabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_simple() {
        let result = eval("1 + 1").unwrap();
        match result {
            JsValue::Number(n) => assert_eq!(n, 2.0),
            _ => panic!("Expected number"),
        }
    }

    #[test]
    fn test_display_string() {
        assert_eq!(JsValue::Number(16.0).to_display_string(), "16");
        assert_eq!(JsValue::Number(0.5).to_display_string(), "0.5");
        assert_eq!(JsValue::Null.to_display_string(), "null");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(JsValue::from(" 12 ").to_number(), 12.0);
        assert_eq!(JsValue::from("").to_number(), 0.0);
        assert!(JsValue::from("abc").to_number().is_nan());
        assert!(JsValue::Undefined.to_number().is_nan());
    }
}
