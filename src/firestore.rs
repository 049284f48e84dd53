//! Firestore-backed script store (REST documents API).
//!
//! Records live in the `canvas` collection. Encoding is a plain JSON to
//! Firestore typed-value mapping, with the two timestamps written as native
//! `timestampValue`. Ownership is enforced with a read-before-write: every
//! record carries `ownerId`, and a record never leaves its owner's view.
//! Writes from other processes are visible on the next read; the revision
//! channel only reflects writes that went through this process.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::watch;
use tracing::instrument;

use crate::domain::{RecordPatch, ScriptRecord};
use crate::error::CanvasError;
use crate::store::{require_owner, ScriptStore};

const COLLECTION: &str = "canvas";

pub struct FirestoreStore {
  client: reqwest::Client,
  base_url: String,
  project_id: String,
  auth_token: Option<String>,
  revision: watch::Sender<u64>,
}

impl FirestoreStore {
  /// Construct the store if we find FIREBASE_PROJECT_ID; otherwise None.
  pub fn from_env() -> Option<Self> {
    let project_id = std::env::var("FIREBASE_PROJECT_ID").ok()?;
    let base_url = std::env::var("FIRESTORE_BASE_URL")
      .unwrap_or_else(|_| "https://firestore.googleapis.com/v1".into());
    let auth_token = std::env::var("FIRESTORE_AUTH_TOKEN").ok();

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .ok()?;

    let (revision, _) = watch::channel(0);
    Some(Self { client, base_url, project_id, auth_token, revision })
  }

  fn documents_url(&self) -> String {
    format!("{}/projects/{}/databases/(default)/documents", self.base_url, self.project_id)
  }

  fn doc_url(&self, id: &str) -> String {
    format!("{}/{}/{}", self.documents_url(), COLLECTION, id)
  }

  fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    let req = req
      .header(USER_AGENT, "educanvas-backend/0.1")
      .header(CONTENT_TYPE, "application/json");
    match &self.auth_token {
      Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
      None => req,
    }
  }

  fn bump(&self) {
    self.revision.send_modify(|rev| *rev += 1);
  }

  async fn read_error(res: reqwest::Response) -> CanvasError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let msg = extract_firestore_error(&body).unwrap_or(body);
    map_status(status, &msg)
  }

  /// Fetch without the ownership check; the gateway methods layer it on.
  async fn fetch_raw(&self, id: &str) -> Result<ScriptRecord, CanvasError> {
    let res = self.authorize(self.client.get(self.doc_url(id))).send().await?;
    if !res.status().is_success() {
      return Err(Self::read_error(res).await);
    }
    let doc: FirestoreDocument = res.json().await
      .map_err(|e| CanvasError::Unavailable(format!("unreadable Firestore response: {e}")))?;
    decode_record(&doc)
  }
}

#[async_trait]
impl ScriptStore for FirestoreStore {
  #[instrument(level = "info", skip(self, record))]
  async fn create(&self, owner: &str, mut record: ScriptRecord) -> Result<String, CanvasError> {
    require_owner(owner)?;
    let now = Utc::now();
    record.id = None;
    record.owner_id = owner.to_string();
    record.created_at = now;
    record.last_modified = now;

    let url = format!("{}/{}", self.documents_url(), COLLECTION);
    let res = self.authorize(self.client.post(&url))
      .json(&json!({ "fields": record_fields(&record)? }))
      .send().await?;
    if !res.status().is_success() {
      return Err(Self::read_error(res).await);
    }
    let doc: FirestoreDocument = res.json().await
      .map_err(|e| CanvasError::Unavailable(format!("unreadable Firestore response: {e}")))?;
    let id = doc.id().ok_or_else(|| {
      CanvasError::Unavailable("created document came back without a name".into())
    })?;
    self.bump();
    Ok(id)
  }

  #[instrument(level = "info", skip(self, patch))]
  async fn update(&self, owner: &str, id: &str, patch: RecordPatch) -> Result<(), CanvasError> {
    require_owner(owner)?;
    let current = self.fetch_raw(id).await?;
    if current.owner_id != owner {
      return Err(foreign(id));
    }

    let mut fields = Map::new();
    if let Some(v) = &patch.title { fields.insert("title".into(), json!({ "stringValue": v })); }
    if let Some(v) = &patch.subject { fields.insert("subject".into(), json!({ "stringValue": v })); }
    if let Some(v) = &patch.level { fields.insert("level".into(), json!({ "stringValue": v })); }
    if let Some(v) = &patch.year { fields.insert("year".into(), json!({ "stringValue": v })); }
    if let Some(v) = &patch.bimester { fields.insert("bimester".into(), json!({ "stringValue": v })); }
    if let Some(v) = &patch.game_type { fields.insert("gameType".into(), json!({ "stringValue": v })); }
    if let Some(v) = patch.include_quiz { fields.insert("includeQuiz".into(), json!({ "booleanValue": v })); }
    if let Some(v) = patch.questions_count {
      fields.insert("questionsCount".into(), json!({ "integerValue": v.to_string() }));
    }
    if let Some(v) = &patch.idea_text { fields.insert("ideaText".into(), json!({ "stringValue": v })); }
    if let Some(v) = &patch.generated_content {
      let value = serde_json::to_value(v)
        .map_err(|e| CanvasError::Unavailable(format!("unencodable document: {e}")))?;
      fields.insert("generatedContent".into(), encode_value(&value));
    }
    if let Some(v) = patch.status { fields.insert("status".into(), json!({ "stringValue": v })); }
    fields.insert("lastModified".into(), json!({ "timestampValue": rfc3339(Utc::now()) }));

    // Masked write: only the named paths change, so unset patch fields can
    // never clear stored data.
    let mut query: Vec<(&str, String)> =
      fields.keys().map(|k| ("updateMask.fieldPaths", k.clone())).collect();
    query.push(("currentDocument.exists", "true".into()));

    let res = self.authorize(self.client.patch(self.doc_url(id)))
      .query(&query)
      .json(&json!({ "fields": fields }))
      .send().await?;
    if !res.status().is_success() {
      return Err(Self::read_error(res).await);
    }
    self.bump();
    Ok(())
  }

  #[instrument(level = "info", skip(self))]
  async fn delete(&self, owner: &str, id: &str) -> Result<(), CanvasError> {
    require_owner(owner)?;
    let current = self.fetch_raw(id).await?;
    if current.owner_id != owner {
      return Err(foreign(id));
    }
    let res = self.authorize(self.client.delete(self.doc_url(id)))
      .query(&[("currentDocument.exists", "true")])
      .send().await?;
    if !res.status().is_success() {
      return Err(Self::read_error(res).await);
    }
    self.bump();
    Ok(())
  }

  async fn fetch(&self, owner: &str, id: &str) -> Result<ScriptRecord, CanvasError> {
    require_owner(owner)?;
    let record = self.fetch_raw(id).await?;
    if record.owner_id != owner {
      return Err(foreign(id));
    }
    Ok(record)
  }

  #[instrument(level = "debug", skip(self))]
  async fn list(&self, owner: &str) -> Result<Vec<ScriptRecord>, CanvasError> {
    require_owner(owner)?;
    let url = format!("{}:runQuery", self.documents_url());
    let body = json!({
      "structuredQuery": {
        "from": [{ "collectionId": COLLECTION }],
        "where": {
          "fieldFilter": {
            "field": { "fieldPath": "ownerId" },
            "op": "EQUAL",
            "value": { "stringValue": owner }
          }
        }
      }
    });
    let res = self.authorize(self.client.post(&url)).json(&body).send().await?;
    if !res.status().is_success() {
      return Err(Self::read_error(res).await);
    }
    let rows: Vec<QueryRow> = res.json().await
      .map_err(|e| CanvasError::Unavailable(format!("unreadable Firestore response: {e}")))?;

    let mut out = Vec::new();
    for row in &rows {
      if let Some(doc) = &row.document {
        out.push(decode_record(doc)?);
      }
    }
    // Newest modification first, ordered here rather than in the query.
    out.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    Ok(out)
  }

  fn watch(&self) -> watch::Receiver<u64> {
    self.revision.subscribe()
  }
}

// --- Wire types and value codec ---

#[derive(Deserialize)]
struct FirestoreDocument {
  name: String,
  #[serde(default)]
  fields: Map<String, Value>,
}

impl FirestoreDocument {
  fn id(&self) -> Option<String> {
    self.name.rsplit('/').next().filter(|s| !s.is_empty()).map(str::to_string)
  }
}

#[derive(Deserialize)]
struct QueryRow {
  #[serde(default)]
  document: Option<FirestoreDocument>,
}

/// Full field map for a record. The id never becomes a field (it lives in
/// the document path) and timestamps go out as native values.
fn record_fields(record: &ScriptRecord) -> Result<Map<String, Value>, CanvasError> {
  let value = serde_json::to_value(record)
    .map_err(|e| CanvasError::Unavailable(format!("unencodable record: {e}")))?;
  let Value::Object(object) = value else {
    return Err(CanvasError::Unavailable("record did not encode to an object".into()));
  };
  let mut fields: Map<String, Value> = object
    .iter()
    .filter(|(k, _)| k.as_str() != "id")
    .map(|(k, v)| (k.clone(), encode_value(v)))
    .collect();
  fields.insert("createdAt".into(), json!({ "timestampValue": rfc3339(record.created_at) }));
  fields.insert("lastModified".into(), json!({ "timestampValue": rfc3339(record.last_modified) }));
  Ok(fields)
}

fn decode_record(doc: &FirestoreDocument) -> Result<ScriptRecord, CanvasError> {
  let mut object: Map<String, Value> =
    doc.fields.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect();
  let id = doc.id().ok_or_else(|| CanvasError::Unavailable("document has no name".into()))?;
  // The path is authoritative for the id, whatever the fields say.
  object.insert("id".into(), Value::String(id));
  serde_json::from_value(Value::Object(object))
    .map_err(|e| CanvasError::Unavailable(format!("stored record does not decode: {e}")))
}

fn encode_value(value: &Value) -> Value {
  match value {
    Value::Null => json!({ "nullValue": null }),
    Value::Bool(b) => json!({ "booleanValue": b }),
    Value::Number(n) => match n.as_i64() {
      // int64 travels as a decimal string on this API
      Some(i) => json!({ "integerValue": i.to_string() }),
      None => json!({ "doubleValue": n.as_f64() }),
    },
    Value::String(s) => json!({ "stringValue": s }),
    Value::Array(items) => {
      let values: Vec<Value> = items.iter().map(encode_value).collect();
      json!({ "arrayValue": { "values": values } })
    }
    Value::Object(map) => {
      let fields: Map<String, Value> =
        map.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect();
      json!({ "mapValue": { "fields": fields } })
    }
  }
}

fn decode_value(value: &Value) -> Value {
  let Some(obj) = value.as_object() else { return Value::Null };
  if let Some(s) = obj.get("stringValue").and_then(Value::as_str) {
    return Value::String(s.to_string());
  }
  if let Some(b) = obj.get("booleanValue").and_then(Value::as_bool) {
    return Value::Bool(b);
  }
  if let Some(raw) = obj.get("integerValue") {
    let n = raw.as_str().and_then(|s| s.parse::<i64>().ok()).or_else(|| raw.as_i64());
    if let Some(n) = n {
      return Value::Number(n.into());
    }
  }
  if let Some(d) = obj.get("doubleValue").and_then(Value::as_f64) {
    return serde_json::Number::from_f64(d).map(Value::Number).unwrap_or(Value::Null);
  }
  if let Some(ts) = obj.get("timestampValue").and_then(Value::as_str) {
    return Value::String(ts.to_string());
  }
  if let Some(array) = obj.get("arrayValue") {
    let values = array.get("values").and_then(Value::as_array).cloned().unwrap_or_default();
    return Value::Array(values.iter().map(decode_value).collect());
  }
  if let Some(map) = obj.get("mapValue") {
    let fields = map.get("fields").and_then(Value::as_object).cloned().unwrap_or_default();
    return Value::Object(fields.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect());
  }
  Value::Null
}

fn rfc3339(t: DateTime<Utc>) -> String {
  t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_status(status: StatusCode, msg: &str) -> CanvasError {
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
      CanvasError::WriteDenied(format!("Firestore rejected the credentials: {msg}"))
    }
    StatusCode::NOT_FOUND => CanvasError::NotFound(msg.to_string()),
    _ => CanvasError::Unavailable(format!("Firestore HTTP {status}: {msg}")),
  }
}

fn foreign(id: &str) -> CanvasError {
  CanvasError::WriteDenied(format!("script {id} belongs to another user"))
}

/// Try to extract a clean error message from a Firestore error body.
fn extract_firestore_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{
    BoardGameData, BoardHouse, CanvasDocument, ContentInfo, CurriculumInfo, HouseKind, Mechanic,
    NarrativeInfo, RecordStatus, StyleInfo,
  };

  fn record() -> ScriptRecord {
    let stamp = DateTime::parse_from_rfc3339("2026-08-21T12:00:00Z")
      .expect("timestamp")
      .with_timezone(&Utc);
    ScriptRecord {
      id: Some("abc123".into()),
      owner_id: "u1".into(),
      title: "Expedição Nilo".into(),
      subject: "História".into(),
      level: "Ensino Fundamental 2".into(),
      year: "6º Ano".into(),
      bimester: "2º Bimestre".into(),
      game_type: "Jogo de Tabuleiro".into(),
      include_quiz: false,
      questions_count: 5,
      idea_text: "Egito Antigo".into(),
      generated_content: CanvasDocument {
        curriculum: CurriculumInfo { theme: "Egito Antigo".into(), ..Default::default() },
        style: StyleInfo::default(),
        mechanic: Mechanic::BoardGame(BoardGameData {
          total_houses: 10,
          players_config: "2 Jogadores".into(),
          dice_config: "1 Dado D6".into(),
          houses: vec![BoardHouse {
            number: 1,
            kind: HouseKind::Start,
            title: "Início".into(),
            description: "Partida".into(),
            action: None,
          }],
        }),
        narrative: NarrativeInfo::default(),
        content: ContentInfo::default(),
        title_suggestion: "Expedição Nilo".into(),
        quiz: vec![],
      },
      status: RecordStatus::Active,
      created_at: stamp,
      last_modified: stamp,
    }
  }

  #[test]
  fn records_round_trip_through_the_value_codec() {
    let rec = record();
    let fields = record_fields(&rec).expect("encode");
    assert!(!fields.contains_key("id"), "the id lives in the path, not the fields");
    let doc = FirestoreDocument {
      name: "projects/p/databases/(default)/documents/canvas/abc123".into(),
      fields,
    };
    let back = decode_record(&doc).expect("decode");
    assert_eq!(back, rec);
  }

  #[test]
  fn typed_values_keep_their_wire_encodings() {
    let rec = record();
    let fields = record_fields(&rec).expect("encode");
    assert_eq!(fields["questionsCount"]["integerValue"], "5", "int64 is string-encoded");
    assert_eq!(fields["includeQuiz"]["booleanValue"], false);
    assert_eq!(fields["status"]["stringValue"], "active");
    assert_eq!(
      fields["createdAt"]["timestampValue"],
      "2026-08-21T12:00:00.000000Z"
    );
    let houses = &fields["generatedContent"]["mapValue"]["fields"]["boardGame"]["mapValue"]["fields"]
      ["houses"]["arrayValue"]["values"];
    assert_eq!(houses[0]["mapValue"]["fields"]["number"]["integerValue"], "1");
  }

  #[test]
  fn empty_containers_decode_to_empty() {
    assert_eq!(decode_value(&json!({ "arrayValue": {} })), json!([]));
    assert_eq!(decode_value(&json!({ "mapValue": {} })), json!({}));
    assert_eq!(decode_value(&json!({ "nullValue": null })), Value::Null);
  }

  #[test]
  fn statuses_map_to_the_error_taxonomy() {
    assert!(matches!(map_status(StatusCode::FORBIDDEN, "x"), CanvasError::WriteDenied(_)));
    assert!(matches!(map_status(StatusCode::NOT_FOUND, "x"), CanvasError::NotFound(_)));
    assert!(matches!(map_status(StatusCode::TOO_MANY_REQUESTS, "x"), CanvasError::Unavailable(_)));
    assert!(matches!(map_status(StatusCode::INTERNAL_SERVER_ERROR, "x"), CanvasError::Unavailable(_)));
  }

  #[test]
  fn document_ids_come_from_the_resource_name() {
    let doc = FirestoreDocument {
      name: "projects/p/databases/(default)/documents/canvas/xyz".into(),
      fields: Map::new(),
    };
    assert_eq!(doc.id().as_deref(), Some("xyz"));
  }
}
