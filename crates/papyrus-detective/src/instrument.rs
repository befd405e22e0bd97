//! Hooks spliced into template sources so a session can follow execution.
//!
//! A loaded source gets a call to [`ENTER_HOOK`] at its very start and a call
//! to [`FRAME_HOOK`] right before each of its reference directives. The calls
//! render as nothing and never add a line break, so the output and every line
//! number stay as they were.

use crate::origin::Reference;

/// Called once each time a template starts executing.
pub const ENTER_HOOK: &str = "__detective_enter";

/// Called right before a directive that may load another template.
pub const FRAME_HOOK: &str = "__detective_frame";

/// Return `source` with the session hooks spliced in.
///
/// `references` must come from scanning the same `source`.
pub fn instrument(source: &str, references: &[Reference]) -> String {
    let mut out = String::with_capacity(source.len() + 32 * (references.len() + 1));
    out.push_str(&hook_call(ENTER_HOOK, false));

    let mut copied = 0;
    for reference in references {
        let at = reference.offset;
        out.push_str(&source[copied..at]);
        // `{%-` trims the whitespace before it; the hook has to do that now.
        out.push_str(&hook_call(FRAME_HOOK, source[at..].starts_with("{%-")));
        copied = at;
    }
    out.push_str(&source[copied..]);
    out
}

fn hook_call(hook: &str, trim_before: bool) -> String {
    let open = if trim_before { "{{-" } else { "{{" };
    format!("{open} {hook}() }}}}")
}
