use std::{collections::HashMap, sync::RwLock};

use vellum_core::{Error, Result, template::TemplateSource};

/// A template source held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryTemplates {
  templates: RwLock<HashMap<String, String>>,
}

impl MemoryTemplates {
  pub fn new() -> Self { Self::default() }

  /// Add or replace a template body.
  pub fn insert(&self, template_ref: impl Into<String>, body: impl Into<String>) {
    self
      .templates
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .insert(template_ref.into(), body.into());
  }
}

impl TemplateSource for MemoryTemplates {
  async fn fetch_template<'a>(&'a self, template_ref: &'a str) -> Result<String> {
    self
      .templates
      .read()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .get(template_ref)
      .cloned()
      .ok_or_else(|| Error::TemplateNotFound(template_ref.to_owned()))
  }
}
