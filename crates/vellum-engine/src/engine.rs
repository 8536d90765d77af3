//! [`Engine`], the document operation surface.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;
use vellum_core::{
  Error, Result, consent,
  document::{Actor, Document, DocumentSource, NewDocument, Party, Revision},
  lifecycle::{self, Operation},
  notify::{ChangeNotifier, DocumentChanged},
  store::DocumentStore,
  template::{Renderer, TemplateSource},
  version::{ChangeType, NewVersion, Page, Version},
};

use crate::{
  EngineConfig, PlaceholderRenderer, VersionHistory, notify::dispatch,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// What a write expects to find when it loads the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
  /// The document is still at this version.
  Version(u32),
  /// The document is still at this version and in this status.
  Revision(Revision),
}

impl From<u32> for Precondition {
  fn from(version: u32) -> Self { Self::Version(version) }
}

impl From<Revision> for Precondition {
  fn from(revision: Revision) -> Self { Self::Revision(revision) }
}

/// A content change requested through [`Engine::edit_document`].
#[derive(Debug, Clone)]
pub struct DocumentEdit {
  pub content:          String,
  pub change_type:      ChangeType,
  pub change_reason:    Option<String>,
  /// When set, the edit fails with a conflict unless the document still
  /// matches.
  pub expected:         Option<Precondition>,
}

impl DocumentEdit {
  /// A plain manual edit with no reason and no version precondition.
  pub fn manual(content: impl Into<String>) -> Self {
    Self {
      content:          content.into(),
      change_type:      ChangeType::ManualEdit,
      change_reason:    None,
      expected:         None,
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The document-state engine.
///
/// Cloning is cheap; all collaborators are reference-counted.
pub struct Engine<S, T, N> {
  store:     Arc<S>,
  templates: Arc<T>,
  notifier:  Arc<N>,
  renderer:  Arc<dyn Renderer>,
  config:    EngineConfig,
}

impl<S, T, N> Clone for Engine<S, T, N> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      templates: Arc::clone(&self.templates),
      notifier:  Arc::clone(&self.notifier),
      renderer:  Arc::clone(&self.renderer),
      config:    self.config.clone(),
    }
  }
}

impl<S, T, N> Engine<S, T, N>
where
  S: DocumentStore,
  T: TemplateSource,
  N: ChangeNotifier,
{
  pub fn new(store: Arc<S>, templates: Arc<T>, notifier: Arc<N>) -> Self {
    Self {
      store,
      templates,
      notifier,
      renderer: Arc::new(PlaceholderRenderer),
      config: EngineConfig::default(),
    }
  }

  pub fn with_config(mut self, config: EngineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_renderer(mut self, renderer: impl Renderer) -> Self {
    self.renderer = Arc::new(renderer);
    self
  }

  // ── Creation ──────────────────────────────────────────────────────────────

  /// Create the subject's `Draft` document with version 1.
  pub async fn generate_document(
    &self,
    subject_id: Uuid,
    source: DocumentSource,
    actor: &Actor,
  ) -> Result<Document> {
    lifecycle::genesis(actor.party)?;

    let (content, template_ref, change_type) = match source {
      DocumentSource::Template(template_ref) => {
        let body = self.templates.fetch_template(&template_ref).await?;
        (body, Some(template_ref), ChangeType::AutoRegenerate)
      }
      DocumentSource::Content(content) => (content, None, ChangeType::ManualEdit),
    };
    lifecycle::require_content(&content)?;

    let (document, _) = self
      .store
      .create_document(NewDocument {
        subject_id,
        content,
        template_ref,
        change_type,
        created_by: actor.id.clone(),
      })
      .await
      .map_err(Into::into)?;

    info!(
      document_id = %document.document_id,
      %subject_id,
      actor = %actor.id,
      "generated document"
    );
    self.announce(DocumentChanged::updated(&document));
    Ok(document)
  }

  // ── Content ───────────────────────────────────────────────────────────────

  /// Write a new version. Status is unchanged, including in `Published`.
  pub async fn edit_document(
    &self,
    document_id: Uuid,
    edit: DocumentEdit,
    actor: &Actor,
  ) -> Result<Document> {
    let current = self.load(document_id, edit.expected).await?;
    lifecycle::revise(&current, Operation::Edit, actor.party, &edit.content)?;

    self
      .write_version(&current, Operation::Edit, actor, NewVersion {
        content:       edit.content,
        change_type:   edit.change_type,
        change_reason: edit.change_reason,
        created_by:    actor.id.clone(),
      })
      .await
  }

  /// Re-fetch the document's template and write it as a new version.
  ///
  /// Returns the document untouched when the template body equals the
  /// current content.
  pub async fn regenerate_document(
    &self,
    document_id: Uuid,
    actor: &Actor,
    expected: Option<Precondition>,
  ) -> Result<Document> {
    let current = self.load(document_id, expected).await?;
    lifecycle::transition(current.status, Operation::Regenerate, actor.party)?;

    let Some(template_ref) = current.template_ref.clone() else {
      return Err(Error::Validation(format!(
        "document {document_id} was not generated from a template"
      )));
    };
    let body = self.templates.fetch_template(&template_ref).await?;
    if body == current.content {
      return Ok(current);
    }
    lifecycle::revise(&current, Operation::Regenerate, actor.party, &body)?;

    self
      .write_version(&current, Operation::Regenerate, actor, NewVersion {
        content:       body,
        change_type:   ChangeType::TemplateUpdate,
        change_reason: Some(format!("regenerated from template {template_ref}")),
        created_by:    actor.id.clone(),
      })
      .await
  }

  // ── Status ────────────────────────────────────────────────────────────────

  pub async fn publish_document(
    &self,
    document_id: Uuid,
    actor: &Actor,
    expected: Option<Precondition>,
  ) -> Result<Document> {
    let party = actor.party;
    self
      .move_status(document_id, Operation::Publish, actor, expected, |doc, at| {
        lifecycle::advance(doc, Operation::Publish, party, at)
      })
      .await
  }

  pub async fn sign_document(
    &self,
    document_id: Uuid,
    actor: &Actor,
    expected: Option<Precondition>,
  ) -> Result<Document> {
    let party = actor.party;
    self
      .move_status(document_id, Operation::Sign, actor, expected, |doc, at| {
        lifecycle::advance(doc, Operation::Sign, party, at)
      })
      .await
  }

  /// Remove a document that has not been signed.
  pub async fn delete_document(
    &self,
    document_id: Uuid,
    actor: &Actor,
    expected: Option<Precondition>,
  ) -> Result<()> {
    let current = self.load(document_id, expected).await?;
    lifecycle::remove(&current, actor.party)?;

    self
      .store
      .delete_document(current.revision())
      .await
      .map_err(|e| reconcile(e.into(), &current, Operation::Delete, actor.party))?;

    info!(%document_id, actor = %actor.id, "deleted document");
    self.announce(DocumentChanged::deleted(&current, Utc::now()));
    Ok(())
  }

  // ── Cancellation consent ──────────────────────────────────────────────────

  pub async fn request_cancellation(
    &self,
    document_id: Uuid,
    actor: &Actor,
    reason: &str,
    expected: Option<Precondition>,
  ) -> Result<Document> {
    let party = actor.party;
    let min = self.config.min_cancellation_reason;
    self
      .move_status(
        document_id,
        Operation::RequestCancellation,
        actor,
        expected,
        |doc, at| consent::request(doc, party, reason, min, at),
      )
      .await
  }

  pub async fn confirm_cancellation(
    &self,
    document_id: Uuid,
    actor: &Actor,
    expected: Option<Precondition>,
  ) -> Result<Document> {
    let party = actor.party;
    self
      .move_status(
        document_id,
        Operation::ConfirmCancellation,
        actor,
        expected,
        |doc, at| consent::confirm(doc, party, at),
      )
      .await
  }

  pub async fn reject_cancellation(
    &self,
    document_id: Uuid,
    actor: &Actor,
    expected: Option<Precondition>,
  ) -> Result<Document> {
    let party = actor.party;
    self
      .move_status(
        document_id,
        Operation::RejectCancellation,
        actor,
        expected,
        |doc, at| consent::reject(doc, party, at),
      )
      .await
  }

  pub async fn withdraw_cancellation(
    &self,
    document_id: Uuid,
    actor: &Actor,
    expected: Option<Precondition>,
  ) -> Result<Document> {
    let party = actor.party;
    self
      .move_status(
        document_id,
        Operation::WithdrawCancellation,
        actor,
        expected,
        |doc, at| consent::withdraw(doc, party, at),
      )
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get_document(&self, document_id: Uuid) -> Result<Document> {
    self.load(document_id, None).await
  }

  /// The subject's single non-cancelled document.
  pub async fn get_active_document(&self, subject_id: Uuid) -> Result<Document> {
    self
      .store
      .active_document(subject_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::NoActiveDocument(subject_id))
  }

  /// Every document the subject has had, cancelled ones included.
  pub async fn list_all_documents(&self, subject_id: Uuid) -> Result<Vec<Document>> {
    self.store.list_documents(subject_id).await.map_err(Into::into)
  }

  /// One newest-first page of the document's versions.
  pub async fn list_versions(
    &self,
    document_id: Uuid,
    page: Page,
  ) -> Result<Vec<Version>> {
    self.load(document_id, None).await?;
    self
      .store
      .list_versions(document_id, page)
      .await
      .map_err(Into::into)
  }

  pub async fn get_version(
    &self,
    document_id: Uuid,
    version_number: u32,
  ) -> Result<Version> {
    if let Some(version) = self
      .store
      .get_version(document_id, version_number)
      .await
      .map_err(Into::into)?
    {
      return Ok(version);
    }
    self.load(document_id, None).await?;
    Err(Error::VersionNotFound { document_id, version: version_number })
  }

  /// A restartable pager over the document's versions.
  pub async fn version_history(
    &self,
    document_id: Uuid,
    page_size: usize,
  ) -> Result<VersionHistory<S>> {
    self.load(document_id, None).await?;
    Ok(VersionHistory::new(Arc::clone(&self.store), document_id, page_size))
  }

  /// Render the current content against `context` via the configured
  /// [`Renderer`].
  pub async fn render_document(
    &self,
    document_id: Uuid,
    context: &serde_json::Value,
  ) -> Result<String> {
    let document = self.load(document_id, None).await?;
    self.renderer.render(&document.content, context)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn load(
    &self,
    document_id: Uuid,
    expected: Option<Precondition>,
  ) -> Result<Document> {
    let document = self
      .store
      .get_document(document_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::DocumentNotFound(document_id))?;

    let (version, status) = match expected {
      None => return Ok(document),
      Some(Precondition::Version(version)) => (version, None),
      Some(Precondition::Revision(revision)) => (revision.version, Some(revision.status)),
    };
    if version != document.current_version {
      return Err(Error::ConcurrentVersionConflict {
        document_id,
        expected: version,
        found: document.current_version,
      });
    }
    if let Some(status) = status
      && status != document.status
    {
      return Err(Error::StatusChanged {
        document_id,
        expected: status,
        found: document.status,
      });
    }
    Ok(document)
  }

  async fn write_version(
    &self,
    current: &Document,
    operation: Operation,
    actor: &Actor,
    input: NewVersion,
  ) -> Result<Document> {
    let (document, version) = self
      .store
      .append_version(current.revision(), input)
      .await
      .map_err(|e| reconcile(e.into(), current, operation, actor.party))?;

    info!(
      document_id = %document.document_id,
      version = version.version_number,
      change_type = %version.change_type,
      status = %document.status,
      actor = %actor.id,
      "appended version"
    );
    self.announce(DocumentChanged::updated(&document));
    Ok(document)
  }

  async fn move_status<F>(
    &self,
    document_id: Uuid,
    operation: Operation,
    actor: &Actor,
    expected: Option<Precondition>,
    apply: F,
  ) -> Result<Document>
  where
    F: FnOnce(&Document, DateTime<Utc>) -> Result<Document>,
  {
    let current = self.load(document_id, expected).await?;
    let next = apply(&current, Utc::now())?;

    let document = self
      .store
      .update_document(current.revision(), next)
      .await
      .map_err(|e| reconcile(e.into(), &current, operation, actor.party))?;

    info!(
      %document_id,
      from = %current.status,
      to = %document.status,
      actor = %actor.id,
      "{operation}"
    );
    self.announce(DocumentChanged::updated(&document));
    Ok(document)
  }

  fn announce(&self, event: DocumentChanged) {
    // Detached: the write has committed and the caller does not wait.
    dispatch(Arc::clone(&self.notifier), event, self.config.notify_timeout);
  }
}

/// Re-check an operation against a status that moved underneath it. If the
/// operation is no longer legal the caller gets that reason; otherwise the
/// write simply lost a race and may be retried.
fn reconcile(err: Error, current: &Document, operation: Operation, party: Party) -> Error {
  match err {
    Error::StatusChanged { document_id, found, .. } => {
      match lifecycle::transition(found, operation, party) {
        Err(e) => e,
        Ok(_) => Error::ConcurrentVersionConflict {
          document_id,
          expected: current.current_version,
          found:    current.current_version,
        },
      }
    }
    other => other,
  }
}
