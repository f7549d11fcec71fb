//! In-process stand-in for a DevTools inspector.
//!
//! `JsRemote` evaluates expressions in an embedded JavaScript engine running
//! on its own thread, the way a remote execution context would. After every
//! evaluation it calls `globalThis.__tick()` if defined, which lets a fake
//! panel finish its operation a few round trips after being started.

#![allow(dead_code)]

use async_trait::async_trait;
use boa_engine::{Context, Source};
use serde_json::Value;
use snare_browser::CommandChannel;
use snare_core::{EvaluateOptions, EvaluationResponse, RemoteExpression, Result};
use std::sync::mpsc;
use std::sync::Mutex;

enum Request {
    Evaluate {
        source: String,
        options: EvaluateOptions,
        reply: mpsc::Sender<EvaluationResponse>,
    },
    Inspect {
        source: String,
        reply: mpsc::Sender<Option<Value>>,
    },
}

pub struct JsRemote {
    tx: Mutex<mpsc::Sender<Request>>,
}

impl JsRemote {
    /// Start a context and run `prelude` in it
    pub fn start(prelude: &str) -> Self {
        let (tx, rx) = mpsc::channel::<Request>();
        let prelude = prelude.to_string();

        std::thread::spawn(move || {
            let mut ctx = Context::default();
            if let Err(e) = ctx.eval(Source::from_bytes(prelude.as_bytes())) {
                panic!("prelude failed: {}", e);
            }

            while let Ok(request) = rx.recv() {
                match request {
                    Request::Evaluate {
                        source,
                        options,
                        reply,
                    } => {
                        let _ = reply.send(evaluate(&mut ctx, &source, options));
                    }
                    Request::Inspect { source, reply } => {
                        let _ = reply.send(read_json(&mut ctx, &source));
                    }
                }
            }
        });

        Self { tx: Mutex::new(tx) }
    }

    /// Evaluate `source` locally in the remote context and return it as JSON
    pub fn inspect(&self, source: &str) -> Option<Value> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .lock()
            .unwrap()
            .send(Request::Inspect {
                source: source.to_string(),
                reply,
            })
            .unwrap();
        rx.recv().unwrap()
    }
}

#[async_trait]
impl CommandChannel for JsRemote {
    async fn enable(&self) -> Result<()> {
        Ok(())
    }

    async fn send_command(
        &self,
        expression: &RemoteExpression,
        options: EvaluateOptions,
    ) -> Result<EvaluationResponse> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .lock()
            .unwrap()
            .send(Request::Evaluate {
                source: expression.to_string(),
                options,
                reply,
            })
            .unwrap();
        Ok(rx.recv().unwrap())
    }
}

fn run_and_tick(ctx: &mut Context) {
    ctx.run_jobs();
    let _ = ctx.eval(Source::from_bytes(
        "if (typeof globalThis.__tick === 'function') { globalThis.__tick(); }".as_bytes(),
    ));
    ctx.run_jobs();
}

/// `JSON.stringify(source)` parsed back; `None` for `undefined`
fn read_json(ctx: &mut Context, source: &str) -> Option<Value> {
    let wrapped = format!("JSON.stringify(({}))", source);
    let value = ctx.eval(Source::from_bytes(wrapped.as_bytes())).ok()?;
    let text = value.as_string()?.to_std_string_escaped();
    serde_json::from_str(&text).ok()
}

fn evaluate(ctx: &mut Context, source: &str, options: EvaluateOptions) -> EvaluationResponse {
    let script = if options.await_promise {
        format!(
            r#"globalThis.__out = undefined;
try {{
  Promise.resolve(({})).then(
    (v) => {{ globalThis.__out = {{ ok: true, json: JSON.stringify(v) }}; }},
    (e) => {{ globalThis.__out = {{ ok: false, message: String(e) }}; }}
  );
}} catch (e) {{
  globalThis.__out = {{ ok: false, message: String(e) }};
}}"#,
            source
        )
    } else {
        format!(
            r#"try {{
  globalThis.__out = {{ ok: true, json: JSON.stringify(({})) }};
}} catch (e) {{
  globalThis.__out = {{ ok: false, message: String(e) }};
}}"#,
            source
        )
    };

    if let Err(e) = ctx.eval(Source::from_bytes(script.as_bytes())) {
        return EvaluationResponse::exception(e.to_string());
    }
    run_and_tick(ctx);

    match read_json(ctx, "globalThis.__out") {
        None => EvaluationResponse::exception("Promise was never settled"),
        Some(out) => {
            if out["ok"] == Value::Bool(true) {
                match out.get("json").and_then(Value::as_str) {
                    Some(json) => match serde_json::from_str(json) {
                        Ok(value) => EvaluationResponse::with_value(value),
                        Err(e) => EvaluationResponse::exception(e.to_string()),
                    },
                    None => EvaluationResponse::undefined(),
                }
            } else {
                EvaluationResponse::exception(
                    out["message"].as_str().unwrap_or("unknown error").to_string(),
                )
            }
        }
    }
}

/// A fake DevTools front-end with a Lighthouse-like panel.
///
/// The start button stays disabled for the first `ready_after` calls to
/// `showView`. Once clicked, the panel reports `{score: 0.9}` through
/// `_buildReportUI` after `emit_delay` further evaluations.
pub fn inspector_prelude(ready_after: u32, emit_delay: u32) -> String {
    format!(
        r#"
globalThis.clicks = 0;
globalThis.showViewCalls = 0;
globalThis.reportsBuilt = 0;
globalThis.readyAfter = {ready_after};
globalThis.emitDelay = {emit_delay};
globalThis.pendingReport = -1;

const startButton = {{
  get disabled() {{ return globalThis.showViewCalls <= globalThis.readyAfter; }},
  click() {{
    globalThis.clicks += 1;
    globalThis.pendingReport = globalThis.emitDelay;
  }},
}};

class LighthousePanel {{
  constructor() {{
    this.contentElement = {{
      querySelector: (selector) => (selector === 'button' ? startButton : null),
    }};
  }}
  _buildReportUI(lhr, artifacts) {{
    globalThis.reportsBuilt += 1;
    this.lastReport = lhr;
    return 'rendered';
  }}
}}
LighthousePanel.prototype.version = 3;

globalThis.UI = {{
  ViewManager: {{
    instance: () => ({{
      showView: (id) => {{
        if (id === 'lighthouse') {{
          globalThis.showViewCalls += 1;
        }}
      }},
    }}),
  }},
  panels: {{ lighthouse: new LighthousePanel() }},
}};
globalThis.originalBuild = LighthousePanel.prototype._buildReportUI;

globalThis.__tick = () => {{
  if (globalThis.pendingReport > 0) {{
    globalThis.pendingReport -= 1;
  }} else if (globalThis.pendingReport === 0) {{
    globalThis.pendingReport = -1;
    globalThis.lastRender = UI.panels.lighthouse._buildReportUI({{ score: 0.9 }}, {{ traces: [] }});
  }}
}};
"#
    )
}
