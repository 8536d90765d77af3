use std::sync::Arc;

use uuid::Uuid;
use vellum_core::{
  Result,
  store::DocumentStore,
  version::{Page, Version},
};

/// A lazy, finite, restartable newest-first walk over a document's versions.
///
/// Each [`next_page`](Self::next_page) issues one store query. Paging is
/// keyed on version number, so versions appended during the walk are not
/// visited until [`restart`](Self::restart).
pub struct VersionHistory<S> {
  store:       Arc<S>,
  document_id: Uuid,
  page_size:   usize,
  before:      Option<u32>,
  done:        bool,
}

impl<S> VersionHistory<S>
where
  S: DocumentStore,
{
  pub(crate) fn new(store: Arc<S>, document_id: Uuid, page_size: usize) -> Self {
    Self {
      store,
      document_id,
      page_size: page_size.max(1),
      before: None,
      done: false,
    }
  }

  /// The next page, or `None` once version 1 has been returned.
  pub async fn next_page(&mut self) -> Result<Option<Vec<Version>>> {
    if self.done {
      return Ok(None);
    }

    let page = Page { limit: self.page_size, before: self.before };
    let versions = self
      .store
      .list_versions(self.document_id, page)
      .await
      .map_err(Into::into)?;

    match versions.last() {
      None => {
        self.done = true;
        Ok(None)
      }
      Some(oldest) => {
        self.before = Some(oldest.version_number);
        self.done = oldest.version_number <= 1;
        Ok(Some(versions))
      }
    }
  }

  /// Rewind to the newest version.
  pub fn restart(&mut self) {
    self.before = None;
    self.done = false;
  }
}
