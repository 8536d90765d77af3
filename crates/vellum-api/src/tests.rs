//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::{sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{HeaderMap, Request, StatusCode, header},
};
use futures_util::StreamExt as _;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;
use vellum_core::document::{Actor, DocumentSource};
use vellum_engine::{BroadcastNotifier, Engine, MemoryTemplates};
use vellum_store_sqlite::SqliteStore;

use crate::{
  actor::{ACTOR_ID, ACTOR_PARTY},
  api_router,
};

type TestEngine = Engine<SqliteStore, MemoryTemplates, BroadcastNotifier>;

const OWNER: (&str, &str) = ("studio", "owner");
const CLIENT: (&str, &str) = ("client", "counterparty");

struct Harness {
  engine: TestEngine,
  events: BroadcastNotifier,
}

struct Reply {
  status:  StatusCode,
  headers: HeaderMap,
  body:    Value,
}

impl Harness {
  async fn new() -> Self {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let templates = MemoryTemplates::new();
    templates.insert("basic", "Dear {{ client.name }}, see terms.");
    let events = BroadcastNotifier::new(16);
    let engine =
      Engine::new(Arc::new(store), Arc::new(templates), Arc::new(events.clone()));
    Self { engine, events }
  }

  async fn send(
    &self,
    method: &str,
    uri: &str,
    actor: Option<(&str, &str)>,
    extra: &[(header::HeaderName, &str)],
    body: Option<Value>,
  ) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, party)) = actor {
      builder = builder.header(ACTOR_ID, id).header(ACTOR_PARTY, party);
    }
    for (k, v) in extra {
      builder = builder.header(k, *v);
    }
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = api_router(self.engine.clone(), self.events.clone())
      .oneshot(req)
      .await
      .unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let body = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, headers, body }
  }

  async fn create(&self, subject_id: Uuid) -> Reply {
    self
      .send(
        "POST",
        "/documents",
        Some(OWNER),
        &[],
        Some(json!({
          "subject_id": subject_id,
          "source": { "kind": "content", "value": "Terms v1" },
        })),
      )
      .await
  }
}

fn id_of(reply: &Reply) -> String {
  reply.body["document_id"].as_str().unwrap().to_owned()
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_lifecycle_over_http() {
  let h = Harness::new().await;
  let subject = Uuid::new_v4();

  let created = h.create(subject).await;
  assert_eq!(created.status, StatusCode::CREATED);
  assert!(created.headers.contains_key(header::ETAG));
  assert_eq!(created.body["status"], "draft");
  let id = id_of(&created);

  let r = h.send("POST", &format!("/documents/{id}/publish"), Some(OWNER), &[], None).await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body["status"], "published");

  let r = h.send("POST", &format!("/documents/{id}/sign"), Some(CLIENT), &[], None).await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body["status"], "signed");

  let r = h
    .send(
      "POST",
      &format!("/documents/{id}/cancellation"),
      Some(CLIENT),
      &[],
      Some(json!({ "reason": "venue closed for renovation" })),
    )
    .await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body["status"], "cancellation_requested_by_counterparty");

  let r = h
    .send("POST", &format!("/documents/{id}/cancellation/confirm"), Some(OWNER), &[], None)
    .await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body["status"], "cancelled");

  let r = h.send("GET", &format!("/subjects/{subject}/document"), None, &[], None).await;
  assert_eq!(r.status, StatusCode::NOT_FOUND);
  assert_eq!(r.body["kind"], "not_found");

  let r = h.send("GET", &format!("/subjects/{subject}/documents"), None, &[], None).await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_draft_returns_no_content() {
  let h = Harness::new().await;
  let id = id_of(&h.create(Uuid::new_v4()).await);

  let r = h.send("DELETE", &format!("/documents/{id}"), Some(OWNER), &[], None).await;
  assert_eq!(r.status, StatusCode::NO_CONTENT);

  let r = h.send("GET", &format!("/documents/{id}"), None, &[], None).await;
  assert_eq!(r.status, StatusCode::NOT_FOUND);
}

// ─── Actor headers ────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_or_bad_actor_headers_are_rejected() {
  let h = Harness::new().await;
  let body = json!({
    "subject_id": Uuid::new_v4(),
    "source": { "kind": "content", "value": "Terms" },
  });

  let r = h.send("POST", "/documents", None, &[], Some(body.clone())).await;
  assert_eq!(r.status, StatusCode::BAD_REQUEST);
  assert_eq!(r.body["kind"], "bad_request");

  let r = h
    .send("POST", "/documents", Some(("studio", "notary")), &[], Some(body))
    .await;
  assert_eq!(r.status, StatusCode::BAD_REQUEST);
}

// ─── Error mapping ────────────────────────────────────────────────────────────

#[tokio::test]
async fn domain_errors_map_to_statuses() {
  let h = Harness::new().await;
  let subject = Uuid::new_v4();
  let id = id_of(&h.create(subject).await);

  // Second active document for the subject.
  let r = h.create(subject).await;
  assert_eq!(r.status, StatusCode::CONFLICT);
  assert_eq!(r.body["kind"], "active_document_exists");

  // Counterparty cannot publish.
  let r = h.send("POST", &format!("/documents/{id}/publish"), Some(CLIENT), &[], None).await;
  assert_eq!(r.status, StatusCode::CONFLICT);
  assert_eq!(r.body["kind"], "invalid_transition");
  assert_eq!(r.body["retryable"], false);

  // Blank content.
  let r = h
    .send(
      "PUT",
      &format!("/documents/{id}/content"),
      Some(OWNER),
      &[],
      Some(json!({ "content": "  " })),
    )
    .await;
  assert_eq!(r.status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(r.body["kind"], "validation_error");

  h.send("POST", &format!("/documents/{id}/publish"), Some(OWNER), &[], None).await;
  h.send("POST", &format!("/documents/{id}/sign"), Some(CLIENT), &[], None).await;

  // Short reason.
  let r = h
    .send(
      "POST",
      &format!("/documents/{id}/cancellation"),
      Some(OWNER),
      &[],
      Some(json!({ "reason": "nope" })),
    )
    .await;
  assert_eq!(r.status, StatusCode::UNPROCESSABLE_ENTITY);

  h.send(
    "POST",
    &format!("/documents/{id}/cancellation"),
    Some(OWNER),
    &[],
    Some(json!({ "reason": "client moved the date" })),
  )
  .await;

  let r = h
    .send("POST", &format!("/documents/{id}/cancellation/confirm"), Some(OWNER), &[], None)
    .await;
  assert_eq!(r.status, StatusCode::CONFLICT);
  assert_eq!(r.body["kind"], "self_confirmation_forbidden");
}

// ─── Preconditions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn if_match_guards_writes() {
  let h = Harness::new().await;
  let created = h.create(Uuid::new_v4()).await;
  let id = id_of(&created);
  let first_tag = created.headers[header::ETAG].to_str().unwrap().to_owned();

  let r = h
    .send(
      "PUT",
      &format!("/documents/{id}/content"),
      Some(OWNER),
      &[(header::IF_MATCH, first_tag.as_str())],
      Some(json!({ "content": "Terms v2" })),
    )
    .await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body["current_version"], 2);
  assert_ne!(r.headers[header::ETAG].to_str().unwrap(), first_tag);

  let r = h
    .send(
      "PUT",
      &format!("/documents/{id}/content"),
      Some(OWNER),
      &[(header::IF_MATCH, first_tag.as_str())],
      Some(json!({ "content": "Terms from a stale tab" })),
    )
    .await;
  assert_eq!(r.status, StatusCode::PRECONDITION_FAILED);
  assert_eq!(r.body["retryable"], true);

  let r = h
    .send(
      "PUT",
      &format!("/documents/{id}/content"),
      Some(OWNER),
      &[],
      Some(json!({ "content": "Terms v3", "expected_version": 1 })),
    )
    .await;
  assert_eq!(r.status, StatusCode::PRECONDITION_FAILED);
  assert_eq!(r.body["kind"], "concurrent_version_conflict");
}

#[tokio::test]
async fn status_move_stales_the_tag() {
  let h = Harness::new().await;
  let created = h.create(Uuid::new_v4()).await;
  let id = id_of(&created);
  let draft_tag = created.headers[header::ETAG].to_str().unwrap().to_owned();

  let r = h
    .send("POST", &format!("/documents/{id}/publish"), Some(OWNER), &[], None)
    .await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body["current_version"], 1);

  let r = h
    .send(
      "PUT",
      &format!("/documents/{id}/content"),
      Some(OWNER),
      &[(header::IF_MATCH, draft_tag.as_str())],
      Some(json!({ "content": "Terms edited as a draft" })),
    )
    .await;
  assert_eq!(r.status, StatusCode::PRECONDITION_FAILED);

  let r = h.send("GET", &format!("/documents/{id}"), None, &[], None).await;
  assert_eq!(r.body["current_version"], 1);
}

// ─── Versions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn versions_page_newest_first() {
  let h = Harness::new().await;
  let id = id_of(&h.create(Uuid::new_v4()).await);
  for n in 2..=4 {
    h.send(
      "PUT",
      &format!("/documents/{id}/content"),
      Some(OWNER),
      &[],
      Some(json!({ "content": format!("Terms v{n}"), "change_reason": "tweak" })),
    )
    .await;
  }

  let r = h.send("GET", &format!("/documents/{id}/versions?limit=2"), None, &[], None).await;
  let numbers: Vec<u64> = r
    .body
    .as_array()
    .unwrap()
    .iter()
    .map(|v| v["version_number"].as_u64().unwrap())
    .collect();
  assert_eq!(numbers, [4, 3]);

  let r = h
    .send("GET", &format!("/documents/{id}/versions?limit=2&before=3"), None, &[], None)
    .await;
  assert_eq!(r.body.as_array().unwrap().len(), 2);
  assert_eq!(r.body[0]["version_number"], 2);

  let r = h.send("GET", &format!("/documents/{id}/versions/1"), None, &[], None).await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body["content"], "Terms v1");

  let r = h.send("GET", &format!("/documents/{id}/versions/9"), None, &[], None).await;
  assert_eq!(r.status, StatusCode::NOT_FOUND);
}

// ─── Render ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn render_fills_placeholders() {
  let h = Harness::new().await;
  let r = h
    .send(
      "POST",
      "/documents",
      Some(OWNER),
      &[],
      Some(json!({
        "subject_id": Uuid::new_v4(),
        "source": { "kind": "template", "value": "basic" },
      })),
    )
    .await;
  let id = id_of(&r);

  let r = h
    .send(
      "POST",
      &format!("/documents/{id}/render"),
      None,
      &[],
      Some(json!({ "client": { "name": "Ada" } })),
    )
    .await;
  assert_eq!(r.status, StatusCode::OK);
  assert_eq!(r.body["rendered"], "Dear Ada, see terms.");
}

// ─── Events ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn events_stream_forwards_changes() {
  let h = Harness::new().await;
  let req = Request::builder().uri("/events").body(Body::empty()).unwrap();
  let resp = api_router(h.engine.clone(), h.events.clone())
    .oneshot(req)
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(
    resp.headers()[header::CONTENT_TYPE].to_str().unwrap(),
    "text/event-stream"
  );

  let doc = h
    .engine
    .generate_document(
      Uuid::new_v4(),
      DocumentSource::Content("Terms".into()),
      &Actor::owner("studio"),
    )
    .await
    .unwrap();

  let mut frames = resp.into_body().into_data_stream();
  let frame = tokio::time::timeout(Duration::from_secs(1), frames.next())
    .await
    .expect("event in time")
    .unwrap()
    .unwrap();
  let text = String::from_utf8(frame.to_vec()).unwrap();
  assert!(text.contains("event: document_changed"), "{text}");
  assert!(text.contains(&doc.document_id.to_string()), "{text}");
}
