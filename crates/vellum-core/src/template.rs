//! Collaborators consumed by the engine: the template store and the renderer.
//!
//! Both are read-only from the engine's point of view.

use std::future::Future;

use crate::Result;

/// Supplies initial document bodies.
pub trait TemplateSource: Send + Sync + 'static {
  /// Fetch the body of `template_ref`. Fails with
  /// [`Error::TemplateNotFound`](crate::Error::TemplateNotFound) if unknown.
  fn fetch_template<'a>(
    &'a self,
    template_ref: &'a str,
  ) -> impl Future<Output = Result<String>> + Send + 'a;
}

/// Turns a content blob plus a data context into displayable output.
/// Implementations must be pure.
pub trait Renderer: Send + Sync + 'static {
  fn render(&self, content: &str, context: &serde_json::Value) -> Result<String>;
}
