//! Drive a scripted headless window on the virtual clock
//!
//! Run with `RUST_LOG=debug` to see the window's tracing output.

use std::rc::Rc;
use std::time::Duration;

use fos_window::{ScriptingMode, VirtualClock, VirtualConsole, Window, WindowOptions};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Headless demo</title></head>
<body>
  <p id="greeting">Hello</p>
  <script>
    var ticks = 0;
    var timer = setInterval(function () {
      ticks++;
      console.log('tick', ticks);
      if (ticks === 3) {
        clearInterval(timer);
        postMessage({ done: true, ticks: ticks }, '*');
      }
    }, 100);
    onmessage = function (e) { console.info('message', JSON.stringify(e.data)); };
    onload = function () { console.info('loaded', location.href); };
  </script>
</body>
</html>"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let clock = Rc::new(VirtualClock::new());
    let console = Rc::new(VirtualConsole::new());
    console.on("log", |args| println!("[log] {}", args.join(" ")));
    console.on("info", |args| println!("[info] {}", args.join(" ")));
    console.send_to_tracing();

    let window = Window::from_markup(
        PAGE,
        WindowOptions {
            name: "demo".into(),
            url: "https://example.com/demo".into(),
            scripting: ScriptingMode::Dangerously,
            scheduler: clock.clone(),
            sink: console,
            ..Default::default()
        },
    )?;

    if let Some(document) = window.document() {
        println!("title: {}", document.title());
    }

    let ran = clock.advance(Duration::from_secs(1));
    println!("ran {ran} tasks, {} still pending", clock.pending());

    window.push_state(None, "next", Some("/next"))?;
    println!("history length {} at {:?}", window.history_length(), window.location().map(String::from));

    window.close();
    Ok(())
}
