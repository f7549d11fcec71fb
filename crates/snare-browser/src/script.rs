//! Remote script templates
//!
//! Every expression snare sends is rendered from one of the templates below.
//! Templates carry named `{{slot}}` placeholders; values are bound through
//! [`Slot`] so that strings become JSON literals and object paths are checked
//! before they reach the remote context.

use crate::error::{BrowserError, Result};
use regex::Regex;
use snare_core::{RemoteConfig, RemoteExpression};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Message thrown remotely when the sniffed property is not a function
pub const MISSING_METHOD_MARKER: &str = "Cannot find method to override";

/// Message prefix thrown remotely when the capture callback fails
pub const OVERRIDE_FAILURE_MARKER: &str = "Exception in overridden method";

/// Message thrown by the trigger while the start control is disabled
pub const DISABLED_MARKER: &str = "Start button disabled";

/// One-shot method override. Evaluates to a function
/// `(receiver, methodName, capture) => void`.
const INSTALL_SNIFFER: &str = r#"function (receiver, methodName, capture) {
  const original = receiver === undefined || receiver === null ? undefined : receiver[methodName];
  if (typeof original !== 'function') {
    throw new Error('Cannot find method to override: ' + methodName);
  }
  let fired = false;
  receiver[methodName] = function (...args) {
    if (fired) {
      return original.apply(this, args);
    }
    fired = true;
    let result;
    try {
      result = original.apply(this, args);
    } finally {
      receiver[methodName] = original;
    }
    try {
      capture.apply(this, [...args, result]);
    } catch (err) {
      const detail = err instanceof Error ? err.message : String(err);
      throw new Error("Exception in overridden method '" + methodName + "': " + detail);
    }
    return result;
  };
}"#;

/// Installs the sniffer and evaluates to the promise of the captured argument.
const SNIFF_AND_AWAIT: &str = r#"new Promise((resolve) => {
  const install = {{install}};
  const receiver = (() => { try { return {{receiver}}; } catch (_) { return undefined; } })();
  install(receiver, {{method}}, (...captured) => resolve(captured[{{capture_index}}]));
})"#;

/// Installs the sniffer and parks the pending promise on a global slot.
const ARM_SNIFFER: &str = r#"(() => {
  const install = {{install}};
  const receiver = (() => { try { return {{receiver}}; } catch (_) { return undefined; } })();
  let resolveCapture;
  const pending = new Promise((resolve) => { resolveCapture = resolve; });
  install(receiver, {{method}}, (...captured) => resolveCapture(captured[{{capture_index}}]));
  globalThis[{{slot}}] = pending;
  return true;
})()"#;

/// Takes the parked promise off its slot.
const AWAIT_ARMED: &str = r#"(() => {
  const pending = globalThis[{{slot}}];
  if (!pending) {
    throw new Error('No capture armed in ' + {{slot}});
  }
  delete globalThis[{{slot}}];
  return pending;
})()"#;

/// Shows the view and clicks its start control, throwing while it is disabled.
const START_OPERATION: &str = r#"(() => {
  UI.ViewManager.instance().showView({{view_id}});
  const panel = {{panel}};
  const button = panel && panel.contentElement && panel.contentElement.querySelector({{selector}});
  if (!button) {
    throw new Error('Start control not found: ' + {{selector}});
  }
  if (button.disabled) {
    throw new Error('Start button disabled');
  }
  button.click();
})()"#;

fn slot_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([a-z_]+)\}\}").unwrap())
}

fn path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap()
    })
}

/// A value bound to a template slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Dotted property path such as `UI.panels.lighthouse`, inserted verbatim
    Path(String),
    /// String literal, JSON-encoded
    Str(String),
    /// Non-negative integer literal
    Index(usize),
    /// Already-rendered script, inserted verbatim
    Script(String),
}

impl Slot {
    fn render(&self) -> Result<String> {
        match self {
            Slot::Path(path) => {
                if path_regex().is_match(path) {
                    Ok(path.clone())
                } else {
                    Err(BrowserError::InvalidScript(format!(
                        "not a property path: {:?}",
                        path
                    )))
                }
            }
            Slot::Str(s) => Ok(serde_json::to_string(s)?),
            Slot::Index(i) => Ok(i.to_string()),
            Slot::Script(source) => Ok(source.clone()),
        }
    }
}

/// A named script with `{{slot}}` placeholders
#[derive(Debug, Clone, Copy)]
pub struct ScriptTemplate {
    name: &'static str,
    source: &'static str,
}

impl ScriptTemplate {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    /// Slot names in order of first appearance
    pub fn slots(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for caps in slot_regex().captures_iter(self.source) {
            if let Some(m) = caps.get(1) {
                if !names.contains(&m.as_str()) {
                    names.push(m.as_str());
                }
            }
        }
        names
    }

    /// Render the template. Every slot must be bound and every binding used.
    pub fn render(&self, bindings: &[(&str, Slot)]) -> Result<String> {
        let slots = self.slots();

        let mut rendered: HashMap<&str, String> = HashMap::new();
        for (name, slot) in bindings {
            if !slots.iter().any(|s| *s == *name) {
                return Err(BrowserError::InvalidScript(format!(
                    "template '{}' has no slot '{}'",
                    self.name, name
                )));
            }
            rendered.insert(*name, slot.render()?);
        }

        if let Some(missing) = slots.iter().find(|s| !rendered.contains_key(*s)) {
            return Err(BrowserError::InvalidScript(format!(
                "template '{}' has unbound slot '{}'",
                self.name, missing
            )));
        }

        let output = slot_regex().replace_all(self.source, |caps: &regex::Captures<'_>| {
            rendered.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(output.into_owned())
    }
}

/// Where a sniffer is installed and which argument it keeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnifferTarget {
    pub receiver_path: String,
    pub method_name: String,
    pub capture_index: usize,
}

impl SnifferTarget {
    pub fn from_config(remote: &RemoteConfig) -> Self {
        Self {
            receiver_path: remote.receiver_path.clone(),
            method_name: remote.method_name.clone(),
            capture_index: remote.capture_index,
        }
    }

    fn bindings(&self) -> Result<Vec<(&'static str, Slot)>> {
        let install = install_function_expression()?;
        Ok(vec![
            ("install", Slot::Script(install.to_string())),
            ("receiver", Slot::Path(self.receiver_path.clone())),
            ("method", Slot::Str(self.method_name.clone())),
            ("capture_index", Slot::Index(self.capture_index)),
        ])
    }
}

/// Expression evaluating to the bare install function
/// `(receiver, methodName, capture) => void`, for callers bringing their own capture
pub fn install_function_expression() -> Result<RemoteExpression> {
    let source = ScriptTemplate::new("install_sniffer", INSTALL_SNIFFER).render(&[])?;
    Ok(RemoteExpression::new(format!("({})", source)))
}

/// Expression that installs the sniffer and evaluates to the captured value's promise
pub fn sniff_expression(target: &SnifferTarget) -> Result<RemoteExpression> {
    let bindings = target.bindings()?;
    let source = ScriptTemplate::new("sniff_and_await", SNIFF_AND_AWAIT).render(&bindings)?;
    Ok(RemoteExpression::new(source))
}

/// Expression that installs the sniffer and stores its promise in `globalThis[slot]`
pub fn arm_expression(target: &SnifferTarget, slot: &str) -> Result<RemoteExpression> {
    let mut bindings = target.bindings()?;
    bindings.push(("slot", Slot::Str(slot.to_string())));
    let source = ScriptTemplate::new("arm_sniffer", ARM_SNIFFER).render(&bindings)?;
    Ok(RemoteExpression::new(source))
}

/// Expression that evaluates to the promise stored by [`arm_expression`]
pub fn await_armed_expression(slot: &str) -> Result<RemoteExpression> {
    let source = ScriptTemplate::new("await_armed", AWAIT_ARMED)
        .render(&[("slot", Slot::Str(slot.to_string()))])?;
    Ok(RemoteExpression::new(source))
}

/// Expression that shows the view and clicks its start control
pub fn start_expression(remote: &RemoteConfig) -> Result<RemoteExpression> {
    let source = ScriptTemplate::new("start_operation", START_OPERATION).render(&[
        ("view_id", Slot::Str(remote.view_id.clone())),
        ("panel", Slot::Path(remote.panel_path.clone())),
        ("selector", Slot::Str(remote.button_selector.clone())),
    ])?;
    Ok(RemoteExpression::new(source))
}
