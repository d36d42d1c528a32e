//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Strip a markdown code fence around a model reply, if present.
/// Models sometimes wrap JSON in ```json ... ``` even when asked not to.
pub fn strip_code_fences(output: &str) -> &str {
  let mut s = output.trim();
  if let Some(rest) = s.strip_prefix("```json") {
    s = rest;
  } else if let Some(rest) = s.strip_prefix("```") {
    s = rest;
  }
  if let Some(rest) = s.strip_suffix("```") {
    s = rest;
  }
  s.trim()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
#[allow(dead_code)]
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max { s.to_string() } else { format!("{}… ({} bytes total)", &s[..max], s.len()) }
}
