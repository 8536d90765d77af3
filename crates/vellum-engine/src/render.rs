//! A minimal `{{ placeholder }}` renderer.

use serde_json::Value;
use vellum_core::{Result, template::Renderer};

/// Replaces `{{ key }}` and dotted `{{ a.b }}` placeholders with values from
/// a JSON context. Strings are inserted verbatim, other scalars in their JSON
/// form. Unknown or non-scalar placeholders are left as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl Renderer for PlaceholderRenderer {
  fn render(&self, content: &str, context: &Value) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("{{") {
      out.push_str(&rest[..start]);
      let after = &rest[start + 2..];
      let Some(end) = after.find("}}") else {
        out.push_str(&rest[start..]);
        return Ok(out);
      };

      let raw = &rest[start..start + 2 + end + 2];
      match lookup(context, after[..end].trim()) {
        Some(value) => out.push_str(&value),
        None => out.push_str(raw),
      }
      rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
  }
}

fn lookup(context: &Value, path: &str) -> Option<String> {
  if path.is_empty() {
    return None;
  }
  let value = path
    .split('.')
    .try_fold(context, |node, key| node.get(key))?;
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn substitutes_nested_keys() {
    let ctx = json!({ "client": { "name": "Ada" }, "total": 1200 });
    let out = PlaceholderRenderer
      .render("Dear {{ client.name }}, total {{total}}.", &ctx)
      .unwrap();
    assert_eq!(out, "Dear Ada, total 1200.");
  }

  #[test]
  fn unknown_placeholders_survive() {
    let ctx = json!({});
    let out = PlaceholderRenderer.render("Hi {{ who }}!", &ctx).unwrap();
    assert_eq!(out, "Hi {{ who }}!");
  }

  #[test]
  fn unterminated_placeholder_is_copied() {
    let ctx = json!({ "a": "x" });
    let out = PlaceholderRenderer.render("{{a}} and {{ b", &ctx).unwrap();
    assert_eq!(out, "x and {{ b");
  }
}
