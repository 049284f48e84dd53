//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating a canvas and persisting it (create or in-place regenerate)
//!   - Saving manual edits back to the stored record
//!   - Regenerating the quiz of an existing script
//!   - Script lifecycle: trash, restore, permanent delete, list
//!
//! Generation is all-or-nothing: a response that fails validation persists
//! nothing and the stored record (if any) stays as it was. Failures are
//! reported to the caller, never retried here.

use chrono::Utc;
use tracing::{error, info, instrument};

use crate::domain::{CanvasDocument, GenerateParams, RecordPatch, RecordStatus, ScriptRecord};
use crate::error::CanvasError;
use crate::parse::{parse_canvas, parse_quiz};
use crate::plan::plan_for;
use crate::prompt::{build_canvas_request, build_quiz_request};
use crate::state::AppState;
use crate::store::require_owner;
use crate::util::trunc_for_log;

/// Generate a canvas from the form parameters and persist it. With a
/// `script_id` the existing record is replaced in place (request parameters
/// included, status back to active); without one a new record is created.
#[instrument(
  level = "info",
  skip(state, params),
  fields(game_type = %params.game_type, subject = %params.subject, include_quiz = params.include_quiz, regenerating = script_id.is_some())
)]
pub async fn generate_script(
  state: &AppState,
  owner: &str,
  params: GenerateParams,
  script_id: Option<String>,
) -> Result<ScriptRecord, CanvasError> {
  require_owner(owner)?;
  let generator = disabled_unless_configured(state)?;

  let plan = plan_for(&params.game_type, params.amount_levels);
  let request = build_canvas_request(&state.prompts, &params, plan);

  let start = std::time::Instant::now();
  let raw = match generator.generate(&request).await {
    Ok(raw) => raw,
    Err(e) => {
      error!(target: "canvas", elapsed = ?start.elapsed(), error = %e, "Generation call failed");
      return Err(e);
    }
  };
  let document = match parse_canvas(&raw, plan.kind) {
    Ok(doc) => doc,
    Err(e) => {
      error!(
        target: "canvas",
        elapsed = ?start.elapsed(),
        error = %e,
        raw_preview = %trunc_for_log(&raw, 160),
        "Generated content failed validation; nothing was persisted"
      );
      return Err(e);
    }
  };
  info!(target: "canvas", elapsed = ?start.elapsed(), variant = ?document.mechanic.kind(), "Canvas generated");

  let title = if document.title_suggestion.trim().is_empty() {
    format!("Roteiro de {} - {}", params.subject, params.year)
  } else {
    document.title_suggestion.clone()
  };

  let record_id = match script_id {
    Some(id) => {
      let patch = RecordPatch {
        title: Some(title),
        subject: Some(params.subject.clone()),
        level: Some(params.level.clone()),
        year: Some(params.year.clone()),
        bimester: Some(params.bimester.clone()),
        game_type: Some(params.game_type.clone()),
        include_quiz: Some(params.include_quiz),
        questions_count: Some(params.questions_count),
        idea_text: Some(params.idea_text.clone()),
        generated_content: Some(document),
        status: Some(RecordStatus::Active),
      };
      state.store.update(owner, &id, patch).await?;
      id
    }
    None => {
      let record = ScriptRecord {
        id: None,
        owner_id: owner.to_string(),
        title,
        subject: params.subject.clone(),
        level: params.level.clone(),
        year: params.year.clone(),
        bimester: params.bimester.clone(),
        game_type: params.game_type.clone(),
        include_quiz: params.include_quiz,
        questions_count: params.questions_count,
        idea_text: params.idea_text.clone(),
        generated_content: document,
        status: RecordStatus::Active,
        created_at: Utc::now(),
        last_modified: Utc::now(),
      };
      state.store.create(owner, record).await?
    }
  };

  state.store.fetch(owner, &record_id).await
}

/// Persist manual edits: the edited document replaces the stored one and the
/// record title follows the document's title suggestion, as typed.
#[instrument(level = "info", skip(state, content), fields(%id))]
pub async fn save_edits(
  state: &AppState,
  owner: &str,
  id: &str,
  content: CanvasDocument,
) -> Result<ScriptRecord, CanvasError> {
  let patch = RecordPatch {
    title: Some(content.title_suggestion.clone()),
    generated_content: Some(content),
    ..Default::default()
  };
  state.store.update(owner, id, patch).await?;
  state.store.fetch(owner, id).await
}

/// Regenerate only the quiz of an existing script, from its synopsis.
#[instrument(level = "info", skip(state), fields(%id, questions_count))]
pub async fn regenerate_quiz(
  state: &AppState,
  owner: &str,
  id: &str,
  questions_count: u32,
) -> Result<ScriptRecord, CanvasError> {
  let generator = disabled_unless_configured(state)?;
  let record = state.store.fetch(owner, id).await?;

  let request = build_quiz_request(&state.prompts, &record.generated_content, questions_count);
  let raw = generator.generate(&request).await?;
  let quiz = parse_quiz(&raw)?;
  info!(target: "canvas", %id, questions = quiz.len(), "Quiz regenerated");

  let mut document = record.generated_content;
  document.quiz = quiz;
  let patch = RecordPatch {
    include_quiz: Some(true),
    questions_count: Some(questions_count),
    generated_content: Some(document),
    ..Default::default()
  };
  state.store.update(owner, id, patch).await?;
  state.store.fetch(owner, id).await
}

/// Soft delete: the record stays stored and restorable.
#[instrument(level = "info", skip(state), fields(%id))]
pub async fn move_to_trash(state: &AppState, owner: &str, id: &str) -> Result<ScriptRecord, CanvasError> {
  set_status(state, owner, id, RecordStatus::Deleted).await
}

/// Bring a trashed record back to the active list.
#[instrument(level = "info", skip(state), fields(%id))]
pub async fn restore_script(state: &AppState, owner: &str, id: &str) -> Result<ScriptRecord, CanvasError> {
  set_status(state, owner, id, RecordStatus::Active).await
}

/// Permanent removal. Callers are expected to have confirmed this with the
/// user; there is no undo.
#[instrument(level = "info", skip(state), fields(%id))]
pub async fn delete_forever(state: &AppState, owner: &str, id: &str) -> Result<(), CanvasError> {
  state.store.delete(owner, id).await
}

pub async fn fetch_script(state: &AppState, owner: &str, id: &str) -> Result<ScriptRecord, CanvasError> {
  state.store.fetch(owner, id).await
}

pub async fn list_scripts(state: &AppState, owner: &str) -> Result<Vec<ScriptRecord>, CanvasError> {
  state.store.list(owner).await
}

async fn set_status(
  state: &AppState,
  owner: &str,
  id: &str,
  status: RecordStatus,
) -> Result<ScriptRecord, CanvasError> {
  let patch = RecordPatch { status: Some(status), ..Default::default() };
  state.store.update(owner, id, patch).await?;
  state.store.fetch(owner, id).await
}

fn disabled_unless_configured(state: &AppState) -> Result<&dyn crate::gemini::TextGenerator, CanvasError> {
  match &state.generator {
    Some(generator) => Ok(generator.as_ref()),
    None => Err(CanvasError::Unavailable("generation is disabled: no backend configured".into())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Arc, Mutex};

  use async_trait::async_trait;
  use serde_json::json;

  use crate::config::Prompts;
  use crate::domain::{Mechanic, VariantKind};
  use crate::gemini::TextGenerator;
  use crate::prompt::GenerationRequest;
  use crate::store::MemoryStore;

  struct FakeGenerator {
    responses: Mutex<Vec<Result<String, CanvasError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
  }

  #[async_trait]
  impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CanvasError> {
      self.requests.lock().expect("lock").push(request.clone());
      self.responses.lock().expect("lock").remove(0)
    }
  }

  fn state_with(responses: Vec<Result<String, CanvasError>>) -> (AppState, Arc<FakeGenerator>) {
    let generator = Arc::new(FakeGenerator {
      responses: Mutex::new(responses),
      requests: Mutex::new(vec![]),
    });
    let state = AppState {
      store: Arc::new(MemoryStore::new()),
      generator: Some(generator.clone()),
      prompts: Arc::new(Prompts::default()),
    };
    (state, generator)
  }

  fn board_params() -> GenerateParams {
    GenerateParams {
      level: "Ensino Fundamental 2".into(),
      subject: "História".into(),
      year: "6º Ano".into(),
      bimester: "2º Bimestre".into(),
      game_type: "Jogo de Tabuleiro".into(),
      idea_text: "Egito Antigo".into(),
      include_quiz: false,
      questions_count: 5,
      amount_levels: Some(3),
    }
  }

  fn board_response(title: &str) -> String {
    json!({
      "curriculum": { "subject": "História", "theme": "Egito Antigo" },
      "style": { "genre": "Aventura" },
      "gameRules": { "gameplay_loop": "Responda e avance" },
      "narrative": { "synopsis": "Arqueólogos exploram o Nilo" },
      "content": { "intro": "Bem-vindos ao Egito" },
      "title_suggestion": title,
      "boardGame": {
        "totalHouses": 10,
        "playersConfig": "2 Jogadores",
        "diceConfig": "1 Dado D6",
        "houses": [
          { "number": 1, "type": "start", "title": "Início", "description": "Partida" },
          { "number": 10, "type": "finish", "title": "Chegada", "description": "Vitória" }
        ]
      }
    })
    .to_string()
  }

  #[tokio::test]
  async fn generate_persists_a_complete_script() {
    let (state, generator) = state_with(vec![Ok(board_response("Expedição Nilo"))]);
    let rec = generate_script(&state, "u1", board_params(), None).await.expect("generate");

    assert!(rec.id.is_some());
    assert_eq!(rec.title, "Expedição Nilo");
    assert_eq!(rec.status, RecordStatus::Active);
    assert_eq!(rec.generated_content.mechanic.kind(), VariantKind::BoardGame);
    assert_eq!(rec.generated_content.mechanic.level_count_hint(), Some(10));

    // The three-house request got floored to ten in the instruction.
    let requests = generator.requests.lock().expect("lock");
    assert!(requests[0].instruction.contains("EXATAMENTE 10 CASAS FIXAS"));

    let listed = state.store.list("u1").await.expect("list");
    assert_eq!(listed.len(), 1);
  }

  #[tokio::test]
  async fn failed_validation_persists_nothing() {
    let (state, _) = state_with(vec![Ok("sem estrutura nenhuma".into())]);
    let err = generate_script(&state, "u1", board_params(), None).await.unwrap_err();
    assert!(matches!(err, CanvasError::MalformedContent(_)));
    assert!(state.store.list("u1").await.expect("list").is_empty());
  }

  #[tokio::test]
  async fn blank_titles_fall_back_to_subject_and_year() {
    let (state, _) = state_with(vec![Ok(board_response(""))]);
    let rec = generate_script(&state, "u1", board_params(), None).await.expect("generate");
    assert_eq!(rec.title, "Roteiro de História - 6º Ano");
  }

  #[tokio::test]
  async fn regenerating_replaces_the_record_in_place() {
    let (state, _) = state_with(vec![
      Ok(board_response("Primeira versão")),
      Ok(board_response("Segunda versão")),
    ]);
    let first = generate_script(&state, "u1", board_params(), None).await.expect("generate");
    let id = first.id.clone().expect("id");

    let mut params = board_params();
    params.idea_text = "Egito Antigo, foco no Nilo".into();
    let second = generate_script(&state, "u1", params, Some(id.clone())).await.expect("regenerate");

    assert_eq!(second.id.as_deref(), Some(id.as_str()));
    assert_eq!(second.title, "Segunda versão");
    assert_eq!(second.idea_text, "Egito Antigo, foco no Nilo");
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(state.store.list("u1").await.expect("list").len(), 1);
  }

  #[tokio::test]
  async fn disabled_generation_answers_unavailable() {
    let (base, _) = state_with(vec![]);
    let state = AppState { generator: None, ..base };
    let err = generate_script(&state, "u1", board_params(), None).await.unwrap_err();
    assert!(matches!(err, CanvasError::Unavailable(_)));
  }

  #[tokio::test]
  async fn anonymous_callers_never_reach_the_backend() {
    let (state, generator) = state_with(vec![Ok(board_response("x"))]);
    let err = generate_script(&state, "  ", board_params(), None).await.unwrap_err();
    assert!(matches!(err, CanvasError::WriteDenied(_)));
    assert!(generator.requests.lock().expect("lock").is_empty());
  }

  #[tokio::test]
  async fn manual_saves_replace_content_and_title() {
    let (state, _) = state_with(vec![Ok(board_response("Antes"))]);
    let rec = generate_script(&state, "u1", board_params(), None).await.expect("generate");
    let id = rec.id.clone().expect("id");

    let mut edited = rec.generated_content.clone();
    edited.title_suggestion = "Depois".into();
    if let Mechanic::BoardGame(b) = &mut edited.mechanic {
      b.houses[0].title = "Largada".into();
    }
    let saved = save_edits(&state, "u1", &id, edited.clone()).await.expect("save");
    assert_eq!(saved.title, "Depois");
    assert_eq!(saved.generated_content, edited);
    assert_eq!(saved.idea_text, rec.idea_text, "request parameters stay untouched");
  }

  #[tokio::test]
  async fn quiz_regeneration_attaches_questions() {
    let quiz = json!([
      { "question": "Qual rio?", "options": ["Nilo", "Amazonas"], "correctAnswer": 0 },
      { "question": "Qual escrita?", "options": ["Cuneiforme", "Hieróglifos"], "correctAnswer": 1 }
    ])
    .to_string();
    let (state, generator) = state_with(vec![Ok(board_response("Expedição")), Ok(quiz)]);
    let rec = generate_script(&state, "u1", board_params(), None).await.expect("generate");
    let id = rec.id.clone().expect("id");

    let updated = regenerate_quiz(&state, "u1", &id, 2).await.expect("quiz");
    assert_eq!(updated.generated_content.quiz.len(), 2);
    assert!(updated.include_quiz);
    assert_eq!(updated.questions_count, 2);

    let requests = generator.requests.lock().expect("lock");
    assert!(requests[1].instruction.contains("Arqueólogos exploram o Nilo"));
    assert_eq!(requests[1].response_schema["type"], "ARRAY");
  }

  #[tokio::test]
  async fn lifecycle_trash_restore_then_delete() {
    let (state, _) = state_with(vec![Ok(board_response("Efêmero"))]);
    let rec = generate_script(&state, "u1", board_params(), None).await.expect("generate");
    let id = rec.id.clone().expect("id");

    let trashed = move_to_trash(&state, "u1", &id).await.expect("trash");
    assert_eq!(trashed.status, RecordStatus::Deleted);
    assert_eq!(trashed.title, rec.title, "soft delete touches nothing else");

    let restored = restore_script(&state, "u1", &id).await.expect("restore");
    assert_eq!(restored.status, RecordStatus::Active);

    delete_forever(&state, "u1", &id).await.expect("delete");
    assert!(matches!(
      fetch_script(&state, "u1", &id).await.unwrap_err(),
      CanvasError::NotFound(_)
    ));
  }
}
