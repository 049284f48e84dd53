//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic; we reply with a single JSON message per request.
//! The connection also carries the editing session: the open script, its draft
//! document, and the last saved copy the dirty flag is computed against.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::domain::CanvasDocument;
use crate::edit::{apply_edit, is_dirty, EditOp};
use crate::error::CanvasError;
use crate::logic::*;
use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::store::require_owner;

/// Per-connection editing state. Nothing here is shared; two tabs editing the
/// same script are two sessions with their own drafts.
#[derive(Default)]
struct WsSession {
  owner: Option<String>,
  script_id: Option<String>,
  draft: Option<CanvasDocument>,
  last_saved: Option<CanvasDocument>,
  watching: bool,
}

impl WsSession {
  fn owner(&self) -> Result<String, CanvasError> {
    self.owner.clone().ok_or_else(|| {
      CanvasError::WriteDenied("no user identity on this connection (send hello first)".into())
    })
  }

  fn open_script_id(&self) -> Result<String, CanvasError> {
    self.script_id.clone().ok_or_else(no_open_script)
  }

  fn adopt(&mut self, id: Option<String>, content: &CanvasDocument) {
    self.script_id = id;
    self.draft = Some(content.clone());
    self.last_saved = Some(content.clone());
  }

  fn dirty(&self) -> bool {
    is_dirty(self.draft.as_ref(), self.last_saved.as_ref())
  }
}

fn no_open_script() -> CanvasError {
  CanvasError::InvalidRequest("no script open on this connection".into())
}

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "educanvas_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "educanvas_backend", "WebSocket connected");
  let mut session = WsSession::default();
  let mut revisions = state.store.watch();

  loop {
    tokio::select! {
      incoming = socket.recv() => {
        let Some(Ok(msg)) = incoming else { break };
        match msg {
          Message::Text(txt) => {
            // Parse, dispatch, serialize response.
            let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(incoming) => {
                debug!(target: "educanvas_backend", "WS received: {:?}", &incoming);
                match handle_client_ws(incoming, &state, &mut session).await {
                  Ok(reply) => reply,
                  Err(e) => {
                    error!(target: "canvas", code = e.code(), error = %e, "WS request failed");
                    ServerWsMessage::Error { code: e.code().into(), message: e.to_string() }
                  }
                }
              }
              Err(e) => ServerWsMessage::Error {
                code: "invalid_request".into(),
                message: format!("Invalid JSON: {}", e),
              },
            };

            if let Err(e) = send_json(&mut socket, &reply_msg).await {
              error!(target: "educanvas_backend", error = %e, "WS send error");
              break;
            }
          }
          Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
          Message::Close(_) => break,
          _ => {}
        }
      }

      // Store changed: push a refreshed list to subscribed, identified clients.
      changed = revisions.changed(), if session.watching && session.owner.is_some() => {
        if changed.is_err() {
          break;
        }
        let owner = match session.owner() {
          Ok(owner) => owner,
          Err(_) => continue,
        };
        match list_scripts(&state, &owner).await {
          Ok(scripts) => {
            let push = ServerWsMessage::Scripts { scripts: scripts.iter().map(to_out).collect() };
            if let Err(e) = send_json(&mut socket, &push).await {
              error!(target: "educanvas_backend", error = %e, "WS send error");
              break;
            }
          }
          Err(e) => {
            error!(target: "canvas", error = %e, "WS scripts push failed");
          }
        }
      }
    }
  }
  info!(target: "educanvas_backend", "WebSocket disconnected");
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "code": "internal", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await
}

#[instrument(level = "info", skip(state, session))]
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  session: &mut WsSession,
) -> Result<ServerWsMessage, CanvasError> {
  match msg {
    ClientWsMessage::Ping => Ok(ServerWsMessage::Pong),

    ClientWsMessage::Hello { user_id } => {
      require_owner(&user_id)?;
      info!(target: "educanvas_backend", %user_id, "WS identity set");
      session.owner = Some(user_id.clone());
      let scripts = list_scripts(state, &user_id).await?;
      Ok(ServerWsMessage::Scripts { scripts: scripts.iter().map(to_out).collect() })
    }

    ClientWsMessage::OpenScript { script_id } => {
      let owner = session.owner()?;
      let rec = fetch_script(state, &owner, &script_id).await?;
      info!(target: "canvas", id = %script_id, "WS script opened");
      session.adopt(Some(script_id), &rec.generated_content);
      Ok(ServerWsMessage::Script { script: to_out(&rec), dirty: false })
    }

    ClientWsMessage::Generate(g) => {
      let owner = session.owner()?;
      let script_id = g.script_id.clone();
      let rec = generate_script(state, &owner, g.to_params(), script_id).await?;
      session.adopt(rec.id.clone(), &rec.generated_content);
      Ok(ServerWsMessage::Script { script: to_out(&rec), dirty: false })
    }

    ClientWsMessage::EditField { path, value } => {
      let draft = session.draft.as_ref().ok_or_else(no_open_script)?;
      session.draft = Some(apply_edit(draft, &EditOp::SetField { path, value })?);
      Ok(ServerWsMessage::Edited { dirty: session.dirty() })
    }

    ClientWsMessage::EditElement { collection, index, field, value } => {
      let draft = session.draft.as_ref().ok_or_else(no_open_script)?;
      let op = EditOp::SetElementField { collection, index, field, value };
      session.draft = Some(apply_edit(draft, &op)?);
      Ok(ServerWsMessage::Edited { dirty: session.dirty() })
    }

    ClientWsMessage::Save => {
      let owner = session.owner()?;
      let id = session.open_script_id()?;
      let draft = session.draft.clone().ok_or_else(no_open_script)?;
      let rec = save_edits(state, &owner, &id, draft).await?;
      info!(target: "canvas", %id, "WS save persisted");
      session.adopt(Some(id), &rec.generated_content);
      Ok(ServerWsMessage::Saved { script: to_out(&rec) })
    }

    ClientWsMessage::WatchScripts => {
      let owner = session.owner()?;
      session.watching = true;
      let scripts = list_scripts(state, &owner).await?;
      Ok(ServerWsMessage::Scripts { scripts: scripts.iter().map(to_out).collect() })
    }
  }
}
