//! A [`TemplateSource`] backed by a directory of plain files.

use std::{io, path::PathBuf};

use vellum_core::{Error, Result, template::TemplateSource};

/// Serves `<root>/<template_ref>` as the template body.
///
/// References must be a single plain file name; anything that could escape
/// `root` is rejected as a validation error.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
  root: PathBuf,
}

impl DirectoryTemplates {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }
}

fn is_plain_name(template_ref: &str) -> bool {
  !template_ref.is_empty()
    && !template_ref.starts_with('.')
    && !template_ref.contains(['/', '\\', '\0'])
}

impl TemplateSource for DirectoryTemplates {
  async fn fetch_template<'a>(&'a self, template_ref: &'a str) -> Result<String> {
    if !is_plain_name(template_ref) {
      return Err(Error::Validation(format!(
        "invalid template reference {template_ref:?}"
      )));
    }

    match tokio::fs::read_to_string(self.root.join(template_ref)).await {
      Ok(body) => Ok(body),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        Err(Error::TemplateNotFound(template_ref.to_owned()))
      }
      Err(e) => Err(Error::Storage(Box::new(e))),
    }
  }
}
