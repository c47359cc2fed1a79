//! Conversions between QuickJS values and [`JsValue`]

use std::fmt;

use rquickjs::{Array, Ctx, FromJs, IntoJs, Object, Persistent, Value};

use crate::JsValue;

/// A script function kept alive outside the evaluation that produced it
#[derive(Clone)]
pub struct ScriptFunction(pub(crate) Persistent<rquickjs::Function<'static>>);

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScriptFunction(..)")
    }
}

impl<'js> FromJs<'js> for JsValue {
    fn from_js(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Self> {
        if value.is_undefined() {
            return Ok(Self::Undefined);
        }
        if value.is_null() {
            return Ok(Self::Null);
        }
        if let Some(b) = value.as_bool() {
            return Ok(Self::Bool(b));
        }
        if let Some(n) = value.as_int() {
            return Ok(Self::Number(f64::from(n)));
        }
        if let Some(n) = value.as_float() {
            return Ok(Self::Number(n));
        }
        if let Some(s) = value.as_string() {
            return Ok(Self::String(s.to_string()?));
        }
        if let Some(func) = value.as_function() {
            let saved = Persistent::save(ctx, func.clone());
            return Ok(Self::Function(ScriptFunction(saved)));
        }
        if value.is_array() {
            return Ok(Self::Array);
        }
        if value.is_object() {
            return Ok(Self::Object);
        }
        // symbols, big ints
        Ok(Self::Undefined)
    }
}

impl<'js> IntoJs<'js> for JsValue {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        Ok(match self {
            Self::Undefined => Value::new_undefined(ctx.clone()),
            Self::Null => Value::new_null(ctx.clone()),
            Self::Bool(b) => Value::new_bool(ctx.clone(), b),
            Self::Number(n) => Value::new_number(ctx.clone(), n),
            Self::String(s) => rquickjs::String::from_str(ctx.clone(), &s)?.into_value(),
            Self::Object => Object::new(ctx.clone())?.into_value(),
            Self::Array => Array::new(ctx.clone())?.into_value(),
            Self::Function(func) => func.0.restore(ctx)?.into_value(),
        })
    }
}

/// Format a raw value the way the console prints it
pub(crate) fn format_value(out: &mut String, value: &Value) {
    use std::fmt::Write;

    if value.is_undefined() {
        out.push_str("undefined");
    } else if value.is_null() {
        out.push_str("null");
    } else if let Some(b) = value.as_bool() {
        write!(out, "{b}").ok();
    } else if let Some(n) = value.as_int() {
        write!(out, "{n}").ok();
    } else if let Some(n) = value.as_float() {
        write!(out, "{n}").ok();
    } else if let Some(s) = value.as_string() {
        if let Ok(s) = s.to_string() {
            out.push_str(&s);
        }
    } else if value.is_array() {
        out.push_str("[Array]");
    } else if value.is_function() {
        out.push_str("[Function]");
    } else if value.is_object() {
        out.push_str("[Object]");
    } else {
        out.push_str("[unknown]");
    }
}
