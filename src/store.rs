//! Script persistence: the gateway trait plus the in-memory fallback store.
//!
//! Both backends share merge semantics through `RecordPatch::apply_to`, and
//! both bump a revision channel after their own writes so editing sessions
//! can refresh script lists without polling. Ownership is enforced here:
//! records are only reachable by the user that created them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::domain::{RecordPatch, ScriptRecord};
use crate::error::CanvasError;

#[async_trait]
pub trait ScriptStore: Send + Sync {
  /// Persist a new record for `owner` and return the backend-assigned id.
  /// Ownership and both timestamps are stamped by the store, never by
  /// callers.
  async fn create(&self, owner: &str, record: ScriptRecord) -> Result<String, CanvasError>;
  /// Merge `patch` into an existing record. Fields the patch leaves unset
  /// keep their stored value.
  async fn update(&self, owner: &str, id: &str, patch: RecordPatch) -> Result<(), CanvasError>;
  /// Permanently remove a record.
  async fn delete(&self, owner: &str, id: &str) -> Result<(), CanvasError>;
  async fn fetch(&self, owner: &str, id: &str) -> Result<ScriptRecord, CanvasError>;
  /// All of `owner`'s records, newest modification first.
  async fn list(&self, owner: &str) -> Result<Vec<ScriptRecord>, CanvasError>;
  /// Revision counter bumped after every local write. Subscribers re-list
  /// when it moves; remote writers do not show up here.
  fn watch(&self) -> watch::Receiver<u64>;
}

/// Unauthenticated callers get no further than this check.
pub fn require_owner(owner: &str) -> Result<(), CanvasError> {
  if owner.trim().is_empty() {
    return Err(CanvasError::WriteDenied("missing user identity".into()));
  }
  Ok(())
}

/// Volatile fallback used when no Firestore project is configured. Keeps the
/// full gateway semantics so the rest of the service cannot tell the
/// difference, but everything is lost on restart.
pub struct MemoryStore {
  records: RwLock<HashMap<String, ScriptRecord>>,
  revision: watch::Sender<u64>,
}

impl MemoryStore {
  pub fn new() -> Self {
    let (revision, _) = watch::channel(0);
    Self { records: RwLock::new(HashMap::new()), revision }
  }

  fn bump(&self) {
    self.revision.send_modify(|rev| *rev += 1);
  }
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl ScriptStore for MemoryStore {
  async fn create(&self, owner: &str, mut record: ScriptRecord) -> Result<String, CanvasError> {
    require_owner(owner)?;
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    record.id = Some(id.clone());
    record.owner_id = owner.to_string();
    record.created_at = now;
    record.last_modified = now;
    self.records.write().await.insert(id.clone(), record);
    self.bump();
    Ok(id)
  }

  async fn update(&self, owner: &str, id: &str, patch: RecordPatch) -> Result<(), CanvasError> {
    require_owner(owner)?;
    {
      let mut records = self.records.write().await;
      let record = records.get_mut(id).ok_or_else(|| not_found(id))?;
      if record.owner_id != owner {
        return Err(foreign(id));
      }
      patch.apply_to(record);
      record.last_modified = Utc::now();
    }
    self.bump();
    Ok(())
  }

  async fn delete(&self, owner: &str, id: &str) -> Result<(), CanvasError> {
    require_owner(owner)?;
    {
      let mut records = self.records.write().await;
      match records.get(id) {
        None => return Err(not_found(id)),
        Some(r) if r.owner_id != owner => return Err(foreign(id)),
        Some(_) => records.remove(id),
      };
    }
    self.bump();
    Ok(())
  }

  async fn fetch(&self, owner: &str, id: &str) -> Result<ScriptRecord, CanvasError> {
    require_owner(owner)?;
    let records = self.records.read().await;
    let record = records.get(id).ok_or_else(|| not_found(id))?;
    if record.owner_id != owner {
      return Err(foreign(id));
    }
    Ok(record.clone())
  }

  async fn list(&self, owner: &str) -> Result<Vec<ScriptRecord>, CanvasError> {
    require_owner(owner)?;
    let records = self.records.read().await;
    let mut out: Vec<ScriptRecord> =
      records.values().filter(|r| r.owner_id == owner).cloned().collect();
    out.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    Ok(out)
  }

  fn watch(&self) -> watch::Receiver<u64> {
    self.revision.subscribe()
  }
}

fn not_found(id: &str) -> CanvasError {
  CanvasError::NotFound(format!("no script with id {id}"))
}

fn foreign(id: &str) -> CanvasError {
  CanvasError::WriteDenied(format!("script {id} belongs to another user"))
}
