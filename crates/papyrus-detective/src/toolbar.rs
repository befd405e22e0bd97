//! The toolbar fragment and where it goes.

use std::path::Path;

use minijinja::Value;
use serde::Serialize;

use crate::loader::LoadHistoryEntry;
use crate::origin::TemplateOrigin;

/// Name the toolbar template is registered under.
pub const TOOLBAR_TEMPLATE_NAME: &str = "detective.html";

/// Splice `fragment` into `output` right before the first `marker`.
///
/// Returns `None` when the marker does not occur.
pub fn insert_before(output: &str, marker: &str, fragment: &str) -> Option<String> {
    let idx = output.find(marker)?;
    let mut html = String::with_capacity(output.len() + fragment.len());
    html.push_str(&output[..idx]);
    html.push_str(fragment);
    html.push_str(&output[idx..]);
    Some(html)
}

/// One row of the toolbar.
#[derive(Debug, Serialize)]
struct ToolbarEntry<'a> {
    name: &'a str,
    path: Option<&'a Path>,
    origin: Option<&'a TemplateOrigin>,
    context: Option<String>,
}

/// Build the context the toolbar template is rendered with.
pub fn toolbar_context(history: &[LoadHistoryEntry]) -> Value {
    let load_history: Vec<ToolbarEntry<'_>> = history
        .iter()
        .map(|entry| ToolbarEntry {
            name: &entry.name,
            path: entry.path.as_deref(),
            origin: entry.origin.as_ref(),
            context: entry.context.as_ref().map(pretty_context),
        })
        .collect();
    minijinja::context! { load_history => Value::from_serialize(&load_history) }
}

fn pretty_context(context: &Value) -> String {
    serde_json::to_string_pretty(context).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

/// `resolvepath` filter: canonical form of a path, or the input if it has none.
pub fn resolve_path(value: String) -> String {
    Path::new(&value)
        .canonicalize()
        .map(|p| p.display().to_string())
        .unwrap_or(value)
}

pub(crate) const TOOLBAR_TEMPLATE: &str = r##"<div id="papyrus-detective">
<style>
#papyrus-detective { position: fixed; bottom: 0; right: 0; max-width: 48rem; max-height: 70vh; overflow: auto; z-index: 9999; font: 13px/1.4 ui-monospace, monospace; background: #1f2328; color: #e6edf3; border-top-left-radius: 6px; }
#papyrus-detective summary { cursor: pointer; padding: 0.4rem 0.8rem; }
#papyrus-detective ol { margin: 0; padding: 0 0.8rem 0.8rem 2.2rem; }
#papyrus-detective li { margin-top: 0.5rem; }
#papyrus-detective code { color: #7ee787; }
#papyrus-detective .pd-path, #papyrus-detective .pd-origin { color: #9198a1; }
#papyrus-detective pre { margin: 0.3rem 0; padding: 0.5rem; background: #0d1117; white-space: pre-wrap; }
</style>
<details>
  <summary>Template debug: {{ load_history | length }} loaded</summary>
  <ol>
  {%- for entry in load_history %}
    <li>
      <div><code>{{ entry.name }}</code> <span class="pd-path">{% if entry.path %}{{ entry.path | resolvepath }}{% else %}built-in{% endif %}</span></div>
      {%- if entry.origin %}
      <div class="pd-origin" title="{{ entry.origin.path }}">{{ entry.origin.kind }} at <code>{{ entry.origin.name }}:{{ entry.origin.lineno }}</code> <code>{{ entry.origin.line }}</code></div>
      {%- else %}
      <div class="pd-origin">root template</div>
      {%- endif %}
      {%- if entry.context %}
      <details><summary>context</summary><pre>{{ entry.context }}</pre></details>
      {%- endif %}
    </li>
  {%- endfor %}
  </ol>
</details>
</div>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inserts_before_first_marker() {
        let html = insert_before("<body>a</body></body>", "</body>", "<x/>").unwrap();
        assert_eq!(html, "<body>a<x/></body></body>");
    }

    #[test]
    fn missing_marker_is_none() {
        assert!(insert_before("<body></body>", "</html>", "<x/>").is_none());
    }

    #[test]
    fn resolve_path_falls_back_to_input() {
        assert_eq!(resolve_path("no/such/file.html".to_string()), "no/such/file.html");
    }
}
