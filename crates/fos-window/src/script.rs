//! Script bridge
//!
//! Installs the window surface into its QuickJS context. Native functions
//! hold a weak handle to the window and never dispatch events or re-enter
//! script synchronously; anything observable happens on a later turn.

use std::rc::{Rc, Weak};

use fos_dom::{ns, DomError, Event};
use fos_js::{JsError, JsValue, ScriptContext};
use serde_json::{json, Value};

use crate::console::ScriptConsole;
use crate::error::WindowError;
use crate::timers::{FrameHandler, TimerHandler};
use crate::window::{upgrade, Window, WindowInner};

/// Script-visible parts of the window built on top of the natives
const PRELUDE: &str = r#"
(function (g) {
  g.window = g;
  g.self = g;
  g.frames = g;

  Object.defineProperty(g, 'name', {
    get: function () { return __fosName(); },
    set: function (value) { __fosSetName(String(value)); },
    configurable: true
  });
  Object.defineProperty(g, 'length', {
    get: function () { return __fosLength(); },
    configurable: true
  });
  Object.defineProperty(g, 'location', {
    get: function () { return JSON.parse(__fosLocation()); },
    configurable: true
  });
  Object.defineProperty(g, 'origin', {
    get: function () { return __fosOrigin(); },
    configurable: true
  });

  g.navigator = JSON.parse(__fosNavigator);
  g.performance = { now: function () { return __fosPerformanceNow(); } };

  function toEvent(json) {
    var raw = JSON.parse(json);
    var event = { type: raw.type, target: g, currentTarget: g };
    if (raw.type === 'message') {
      event.data = raw.data;
    }
    if (raw.type === 'popstate') {
      event.state = raw.state;
    }
    return event;
  }

  var registered = [];
  g.addEventListener = function (type, callback) {
    if (typeof callback !== 'function') return;
    type = String(type);
    for (var i = 0; i < registered.length; i++) {
      if (registered[i].type === type && registered[i].callback === callback) return;
    }
    var slot = __fosAddEventListener(type, function (json) {
      callback.call(g, toEvent(json));
    });
    registered.push({ type: type, callback: callback, slot: slot });
  };
  g.removeEventListener = function (type, callback) {
    type = String(type);
    for (var i = 0; i < registered.length; i++) {
      if (registered[i].type === type && registered[i].callback === callback) {
        __fosRemoveEventListener(registered[i].slot);
        registered.splice(i, 1);
        return;
      }
    }
  };
  g.__fosDispatchHandler = function (type, json) {
    var handler = g['on' + type];
    if (typeof handler === 'function') handler.call(g, toEvent(json));
  };

  g.postMessage = function (message, targetOrigin) {
    if (arguments.length < 2) {
      throw new TypeError("Failed to execute 'postMessage': 2 arguments required.");
    }
    __fosPostMessage(JSON.stringify(message === undefined ? null : message), String(targetOrigin));
  };

  function optionalUrl(url) {
    return url === undefined || url === null ? null : String(url);
  }
  g.history = {
    pushState: function (state, title, url) {
      __fosHistory('push', JSON.stringify(state === undefined ? null : state), String(title), optionalUrl(url));
    },
    replaceState: function (state, title, url) {
      __fosHistory('replace', JSON.stringify(state === undefined ? null : state), String(title), optionalUrl(url));
    },
    back: function () { __fosHistory('go', -1); },
    forward: function () { __fosHistory('go', 1); },
    go: function (delta) { __fosHistory('go', Number(delta) || 0); },
    get length() { return __fosHistory('length'); },
    get state() { return JSON.parse(__fosHistory('state')); }
  };
})(globalThis);
"#;

/// MIME types run as classic scripts
const JAVASCRIPT_TYPES: &[&str] = &[
    "application/ecmascript",
    "application/javascript",
    "application/x-ecmascript",
    "application/x-javascript",
    "text/ecmascript",
    "text/javascript",
    "text/javascript1.0",
    "text/javascript1.5",
    "text/jscript",
    "text/livescript",
    "text/x-ecmascript",
    "text/x-javascript",
];

fn is_javascript_type(script_type: Option<&str>) -> bool {
    match script_type.map(str::trim) {
        None | Some("") => true,
        Some(mime) => JAVASCRIPT_TYPES.iter().any(|t| t.eq_ignore_ascii_case(mime)),
    }
}

/// Map a window error onto the script error it throws as
fn to_js_error(error: WindowError) -> JsError {
    match error {
        WindowError::Dom(DomError::Syntax(message)) => JsError::Syntax(message),
        WindowError::Dom(DomError::Type(message)) => JsError::TypeError(message),
        WindowError::Script(error) => error,
        other => JsError::Runtime(other.to_string()),
    }
}

fn event_json(event: &Event) -> String {
    json!({
        "type": event.event_type,
        "data": event.data(),
        "state": event.state(),
    })
    .to_string()
}

fn location_json(window: &Window) -> String {
    let Some(url) = window.location() else {
        return "null".to_string();
    };
    let hash = match url.fragment() {
        Some(fragment) if !fragment.is_empty() => format!("#{fragment}"),
        _ => String::new(),
    };
    let search = match url.query() {
        Some(query) if !query.is_empty() => format!("?{query}"),
        _ => String::new(),
    };
    let hostname = url.host_str().unwrap_or_default();
    let port = url.port().map(|p| p.to_string()).unwrap_or_default();
    let host = if port.is_empty() {
        hostname.to_string()
    } else {
        format!("{hostname}:{port}")
    };
    json!({
        "href": url.as_str(),
        "protocol": format!("{}:", url.scheme()),
        "host": host,
        "hostname": hostname,
        "port": port,
        "pathname": url.path(),
        "search": search,
        "hash": hash,
        "origin": url.origin().ascii_serialization(),
    })
    .to_string()
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

fn parse_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or(Value::Null)
}

/// Timer ids arrive as numbers; anything else matches no timer
fn timer_id(value: &JsValue) -> Option<u32> {
    let n = value.to_number();
    (n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX)).then(|| n as u32)
}

impl Window {
    /// The window's script context, created on first use
    pub fn script_context(&self) -> Result<&ScriptContext, WindowError> {
        if self.is_closed() {
            return Err(WindowError::Closed);
        }
        if self.0.script.get().is_none() {
            let mode = self.0.options.scripting;
            if !mode.is_enabled() {
                return Err(WindowError::ScriptingDisabled);
            }
            let context = ScriptContext::new(mode)?;
            self.install_surface(&context)?;
            // unused when a nested call already initialized it
            let _ = self.0.script.set(context);
        }
        self.0.script.get().ok_or(WindowError::ScriptingDisabled)
    }

    /// Evaluate `source` as a global script of this window
    pub fn evaluate(&self, source: &str) -> Result<JsValue, WindowError> {
        let context = self.script_context()?;
        Ok(context.evaluate(source)?)
    }

    pub(crate) fn run_document_scripts(&self) {
        let sources: Vec<String> = match self.document() {
            Some(document) => document
                .tree()
                .descendants(document.root())
                .filter(|(_, node)| {
                    node.as_element().is_some_and(|el| {
                        el.is(ns::HTML, "script") && el.get_attr("src").is_none() && is_javascript_type(el.get_attr("type"))
                    })
                })
                .filter_map(|(id, _)| document.text_content(id))
                .collect(),
            None => return,
        };

        tracing::debug!(count = sources.len(), "Running document scripts");
        for source in sources {
            if let Err(error) = self.evaluate(&source) {
                self.report_error(error.into());
            }
        }
    }

    /// Invoke the script-side `on<type>` handler, if the context exists
    pub(crate) fn dispatch_to_script_handler(&self, event: &Event) {
        let Some(context) = self.0.script.get() else {
            return;
        };
        let result = match context.global("__fosDispatchHandler") {
            Ok(JsValue::Function(dispatch)) => context
                .call(&dispatch, vec![event.event_type.as_str().into(), event_json(event).into()])
                .map(drop),
            Ok(_) => Ok(()),
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            self.report_error(error.into());
        }
    }

    fn install_surface(&self, context: &ScriptContext) -> Result<(), WindowError> {
        let weak = self.0.self_ref.clone();

        context.install_console(ScriptConsole(Rc::clone(&self.0.options.sink)))?;
        context.install_globals([
            ("innerWidth", JsValue::from(f64::from(self.inner_width()))),
            ("innerHeight", JsValue::from(f64::from(self.inner_height()))),
            ("outerWidth", JsValue::from(f64::from(self.outer_width()))),
            ("outerHeight", JsValue::from(f64::from(self.outer_height()))),
            ("devicePixelRatio", JsValue::from(self.device_pixel_ratio())),
            ("scrollX", JsValue::from(self.scroll_x())),
            ("scrollY", JsValue::from(self.scroll_y())),
            ("pageXOffset", JsValue::from(self.page_x_offset())),
            ("pageYOffset", JsValue::from(self.page_y_offset())),
            ("screenX", JsValue::from(f64::from(self.screen_x()))),
            ("screenY", JsValue::from(f64::from(self.screen_y()))),
            ("screenLeft", JsValue::from(f64::from(self.screen_x()))),
            ("screenTop", JsValue::from(f64::from(self.screen_y()))),
            ("__fosNavigator", JsValue::from(self.navigator().to_json().to_string())),
        ])?;

        install(context, &weak, "__fosName", |w, _| Ok(w.name().into()))?;
        install(context, &weak, "__fosSetName", |w, args| {
            w.set_name(&arg(&args, 0).to_display_string());
            Ok(JsValue::Undefined)
        })?;
        install(context, &weak, "__fosLength", |w, _| Ok((w.length() as f64).into()))?;
        install(context, &weak, "__fosLocation", |w, _| Ok(location_json(w).into()))?;
        install(context, &weak, "__fosOrigin", |w, _| Ok(w.origin().into()))?;
        install(context, &weak, "__fosPerformanceNow", |w, _| Ok(w.performance_now().into()))?;

        self.install_timers(context, &weak)?;
        self.install_events(context, &weak)?;
        install_history(context, &weak)?;

        install(context, &weak, "btoa", |w, args| {
            let data = arg(&args, 0).to_display_string();
            w.btoa(&data).map(JsValue::from).map_err(|e| to_js_error(e.into()))
        })?;
        install(context, &weak, "atob", |w, args| {
            let data = arg(&args, 0).to_display_string();
            w.atob(&data).map(JsValue::from).map_err(|e| to_js_error(e.into()))
        })?;

        install_legacy(context, &weak)?;

        context.evaluate(PRELUDE)?;
        tracing::debug!(name = %self.name(), "Installed window script surface");
        Ok(())
    }

    fn install_timers(&self, context: &ScriptContext, weak: &Weak<WindowInner>) -> Result<(), WindowError> {
        fn handler(args: &[JsValue]) -> TimerHandler {
            match arg(args, 0) {
                JsValue::Function(function) => TimerHandler::Script(function, args.iter().skip(2).cloned().collect()),
                other => TimerHandler::Source(other.to_display_string()),
            }
        }
        fn id_or_undefined(id: Option<u32>) -> JsValue {
            id.map_or(JsValue::Undefined, |id| f64::from(id).into())
        }

        install(context, weak, "setTimeout", |w, args| {
            let delay = arg(&args, 1).to_number();
            Ok(id_or_undefined(w.set_timeout(handler(&args), delay)))
        })?;
        install(context, weak, "setInterval", |w, args| {
            let delay = arg(&args, 1).to_number();
            Ok(id_or_undefined(w.set_interval(handler(&args), delay)))
        })?;
        install(context, weak, "clearTimeout", |w, args| {
            if let Some(id) = timer_id(&arg(&args, 0)) {
                w.clear_timeout(id);
            }
            Ok(JsValue::Undefined)
        })?;
        install(context, weak, "clearInterval", |w, args| {
            if let Some(id) = timer_id(&arg(&args, 0)) {
                w.clear_interval(id);
            }
            Ok(JsValue::Undefined)
        })?;

        install(context, weak, "requestAnimationFrame", |w, args| match arg(&args, 0) {
            JsValue::Function(function) => {
                Ok(id_or_undefined(w.request_animation_frame(FrameHandler::Script(function))))
            }
            _ => Err(JsError::TypeError(
                "Failed to execute 'requestAnimationFrame': parameter 1 is not of type 'Function'.".into(),
            )),
        })?;
        install(context, weak, "cancelAnimationFrame", |w, args| {
            if let Some(id) = timer_id(&arg(&args, 0)) {
                w.cancel_animation_frame(id);
            }
            Ok(JsValue::Undefined)
        })?;
        Ok(())
    }

    fn install_events(&self, context: &ScriptContext, weak: &Weak<WindowInner>) -> Result<(), WindowError> {
        install(context, weak, "__fosAddEventListener", |w, args| {
            let event_type = arg(&args, 0).to_display_string();
            let JsValue::Function(callback) = arg(&args, 1) else {
                return Ok(JsValue::Undefined);
            };

            let target = w.0.self_ref.clone();
            let id = w.add_event_listener(&event_type, move |event| {
                let Some(window) = upgrade(&target) else {
                    return Ok(());
                };
                let context = window.script_context()?;
                context.call(&callback, vec![event_json(event).into()])?;
                Ok(())
            });

            let mut slots = w.0.script_listeners.borrow_mut();
            slots.push(Some(id));
            Ok(((slots.len() - 1) as f64).into())
        })?;
        install(context, weak, "__fosRemoveEventListener", |w, args| {
            let slot = timer_id(&arg(&args, 0)).map(|slot| slot as usize);
            let id = slot.and_then(|slot| w.0.script_listeners.borrow_mut().get_mut(slot)?.take());
            if let Some(id) = id {
                w.remove_event_listener(id);
            }
            Ok(JsValue::Undefined)
        })?;
        install(context, weak, "__fosPostMessage", |w, args| {
            let data = parse_json(&arg(&args, 0).to_display_string());
            let origin = arg(&args, 1).to_display_string();
            w.post_message(data, &origin).map_err(to_js_error)?;
            Ok(JsValue::Undefined)
        })?;
        Ok(())
    }
}

fn install_history(context: &ScriptContext, weak: &Weak<WindowInner>) -> Result<(), WindowError> {
    install(context, weak, "__fosHistory", |w, args| {
        let op = arg(&args, 0).to_display_string();
        match op.as_str() {
            "push" | "replace" => {
                let state = Some(parse_json(&arg(&args, 1).to_display_string()));
                let title = arg(&args, 2).to_display_string();
                let url = arg(&args, 3).as_str().map(str::to_string);
                let result = if op == "push" {
                    w.push_state(state, &title, url.as_deref())
                } else {
                    w.replace_state(state, &title, url.as_deref())
                };
                result.map_err(to_js_error)?;
                Ok(JsValue::Undefined)
            }
            "go" => {
                let delta = arg(&args, 1).to_number();
                w.go(if delta.is_finite() { delta.trunc() as i64 } else { 0 });
                Ok(JsValue::Undefined)
            }
            "length" => Ok((w.history_length() as f64).into()),
            "state" => Ok(w.history_state().unwrap_or(Value::Null).to_string().into()),
            other => Err(JsError::TypeError(format!("Unknown history operation '{other}'"))),
        }
    })
}

fn install_legacy(context: &ScriptContext, weak: &Weak<WindowInner>) -> Result<(), WindowError> {
    install(context, weak, "alert", |w, args| {
        w.alert(&arg(&args, 0).to_display_string());
        Ok(JsValue::Undefined)
    })?;
    install(context, weak, "confirm", |w, args| {
        Ok(w.confirm(&arg(&args, 0).to_display_string()).into())
    })?;
    install(context, weak, "prompt", |w, args| {
        let answer = w.prompt(&arg(&args, 0).to_display_string(), &arg(&args, 1).to_display_string());
        Ok(answer.map_or(JsValue::Null, JsValue::from))
    })?;
    install(context, weak, "open", |w, args| {
        w.open(&arg(&args, 0).to_display_string(), &arg(&args, 1).to_display_string());
        Ok(JsValue::Null)
    })?;

    let unit: [(&str, fn(&Window)); 6] = [
        ("print", Window::print),
        ("focus", Window::focus),
        ("blur", Window::blur),
        ("createPopup", Window::create_popup),
        ("captureEvents", Window::capture_events),
        ("releaseEvents", Window::release_events),
    ];
    for (name, method) in unit {
        install(context, weak, name, move |w, _| {
            method(w);
            Ok(JsValue::Undefined)
        })?;
    }

    let geometry: [(&str, &str); 7] = [
        ("moveTo", "window.moveTo"),
        ("moveBy", "window.moveBy"),
        ("resizeTo", "window.resizeTo"),
        ("resizeBy", "window.resizeBy"),
        ("scroll", "window.scroll"),
        ("scrollTo", "window.scrollTo"),
        ("scrollBy", "window.scrollBy"),
    ];
    for (name, what) in geometry {
        install(context, weak, name, move |w, _| {
            w.not_implemented(what);
            Ok(JsValue::Undefined)
        })?;
    }
    Ok(())
}

/// Install a native bound to the window behind `weak`
fn install<F>(context: &ScriptContext, weak: &Weak<WindowInner>, name: &str, f: F) -> Result<(), WindowError>
where
    F: Fn(&Window, Vec<JsValue>) -> Result<JsValue, JsError> + 'static,
{
    let weak = weak.clone();
    context.install_function(name, move |args| match upgrade(&weak) {
        Some(window) => f(&window, args),
        None => Err(JsError::Runtime("The window has been closed".into())),
    })?;
    Ok(())
}
