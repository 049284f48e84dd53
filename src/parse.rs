//! Turns raw generated text into a validated `CanvasDocument`.
//!
//! Generation backends wrap JSON in markdown fences often enough that the
//! parser strips them first. Decoding is tolerant about missing text fields
//! (they default to empty) but strict about shape: wrong types, a missing
//! section, or a missing planned variant block all fail the whole run.

use serde_json::Value;
use uuid::Uuid;

use crate::domain::{CanvasDocument, Mechanic, QuizQuestion, RawCanvas, VariantKind};
use crate::error::CanvasError;
use crate::util::strip_code_fences;

/// Parse one generation result against the planned variant. Blocks for other
/// variants are dropped, the planned one must be present.
pub fn parse_canvas(raw: &str, expected: VariantKind) -> Result<CanvasDocument, CanvasError> {
  let text = strip_code_fences(raw);
  let value: Value = serde_json::from_str(text)
    .map_err(|e| CanvasError::MalformedContent(format!("invalid JSON: {e}")))?;
  if !value.is_object() {
    return Err(CanvasError::MalformedContent("response is not a JSON object".into()));
  }
  let raw_canvas: RawCanvas = serde_json::from_value(value)
    .map_err(|e| CanvasError::MalformedContent(e.to_string()))?;

  let curriculum = raw_canvas.curriculum.ok_or_else(|| missing("curriculum"))?;
  let style = raw_canvas.style.ok_or_else(|| missing("style"))?;
  let narrative = raw_canvas.narrative.ok_or_else(|| missing("narrative"))?;
  let content = raw_canvas.content.ok_or_else(|| missing("content"))?;

  // Only the planned block is read; whatever else the model produced on top
  // of the schema is ignored.
  let mechanic = match expected {
    VariantKind::TargetShooting => {
      let mut data = raw_canvas.target_shooting.ok_or_else(|| missing("targetShooting"))?;
      for target in &mut data.targets {
        if target.id.is_empty() {
          target.id = Uuid::new_v4().to_string();
        }
      }
      Mechanic::TargetShooting(data)
    }
    VariantKind::BoardGame => {
      Mechanic::BoardGame(raw_canvas.board_game.ok_or_else(|| missing("boardGame"))?)
    }
    VariantKind::DragDrop => {
      Mechanic::DragDrop(raw_canvas.drag_drop.ok_or_else(|| missing("dragDrop"))?)
    }
    VariantKind::Rules => {
      Mechanic::Rules(raw_canvas.game_rules.ok_or_else(|| missing("gameRules"))?)
    }
  };

  Ok(CanvasDocument {
    curriculum,
    style,
    mechanic,
    narrative,
    content,
    title_suggestion: raw_canvas.title_suggestion.unwrap_or_default(),
    quiz: raw_canvas.quiz.unwrap_or_default(),
  })
}

/// Parse a standalone quiz result (top-level JSON array). An empty response
/// counts as an empty quiz, matching how the form treats it.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>, CanvasError> {
  let text = strip_code_fences(raw);
  if text.is_empty() {
    return Ok(vec![]);
  }
  serde_json::from_str(text)
    .map_err(|e| CanvasError::MalformedContent(format!("invalid quiz payload: {e}")))
}

fn missing(section: &str) -> CanvasError {
  CanvasError::MalformedContent(format!("missing section: {section}"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  /// Board-game payload the way the generator actually answers: planned block
  /// plus the always-requested rule sheet.
  fn board_payload() -> Value {
    json!({
      "curriculum": { "subject": "História", "theme": "Egito Antigo" },
      "style": { "genre": "Aventura" },
      "gameRules": { "gameplay_loop": "Responda e avance" },
      "narrative": { "synopsis": "Arqueólogos exploram o Nilo" },
      "content": { "intro": "Bem-vindos ao Egito" },
      "title_suggestion": "Expedição Nilo",
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
  }

  #[test]
  fn parses_a_fenced_payload() {
    let fenced = format!("```json\n{}\n```", board_payload());
    let doc = parse_canvas(&fenced, VariantKind::BoardGame).expect("parse");
    assert_eq!(doc.title_suggestion, "Expedição Nilo");
    assert_eq!(doc.mechanic.kind(), VariantKind::BoardGame);
  }

  #[test]
  fn drops_stray_variant_blocks() {
    let doc = parse_canvas(&board_payload().to_string(), VariantKind::BoardGame).expect("parse");
    let out = serde_json::to_value(&doc).expect("serialize");
    let obj = out.as_object().expect("object");
    assert!(obj.contains_key("boardGame"));
    assert!(!obj.contains_key("gameRules"), "rule sheet must not survive a board plan");
  }

  #[test]
  fn missing_planned_block_fails_the_run() {
    let err = parse_canvas(&board_payload().to_string(), VariantKind::DragDrop).unwrap_err();
    match err {
      CanvasError::MalformedContent(msg) => assert!(msg.contains("dragDrop"), "got: {msg}"),
      other => panic!("expected MalformedContent, got {other:?}"),
    }
  }

  #[test]
  fn missing_section_fails_the_run() {
    let mut payload = board_payload();
    payload.as_object_mut().expect("object").remove("narrative");
    let err = parse_canvas(&payload.to_string(), VariantKind::BoardGame).unwrap_err();
    match err {
      CanvasError::MalformedContent(msg) => assert!(msg.contains("narrative"), "got: {msg}"),
      other => panic!("expected MalformedContent, got {other:?}"),
    }
  }

  #[test]
  fn rejects_non_object_payloads() {
    let err = parse_canvas("[1, 2, 3]", VariantKind::Rules).unwrap_err();
    match err {
      CanvasError::MalformedContent(msg) => assert!(msg.contains("not a JSON object")),
      other => panic!("expected MalformedContent, got {other:?}"),
    }
    assert!(matches!(
      parse_canvas("not json at all", VariantKind::Rules).unwrap_err(),
      CanvasError::MalformedContent(_)
    ));
  }

  #[test]
  fn fills_missing_target_ids() {
    let payload = json!({
      "curriculum": {}, "style": {}, "narrative": {}, "content": {},
      "title_suggestion": "Alvos do Sistema Solar",
      "targetShooting": {
        "timeLimit": "60s",
        "difficulty": "Médio",
        "levelsCount": "3 Níveis/Alvos",
        "targets": [
          { "id": "t-1", "title": "Marte", "description": "Planeta", "points": 10, "type": "correct" },
          { "title": "Lua", "description": "Satélite", "points": -5, "type": "wrong" }
        ]
      }
    });
    let doc = parse_canvas(&payload.to_string(), VariantKind::TargetShooting).expect("parse");
    match &doc.mechanic {
      Mechanic::TargetShooting(data) => {
        assert_eq!(data.targets[0].id, "t-1");
        assert!(!data.targets[1].id.is_empty(), "generated targets get an id");
      }
      other => panic!("expected target shooting, got {other:?}"),
    }
  }

  #[test]
  fn quiz_block_rides_along_when_present() {
    let mut payload = board_payload();
    payload.as_object_mut().expect("object").insert(
      "quiz".into(),
      json!([{ "question": "Qual rio?", "options": ["Nilo", "Amazonas"], "correctAnswer": 0 }]),
    );
    let doc = parse_canvas(&payload.to_string(), VariantKind::BoardGame).expect("parse");
    assert_eq!(doc.quiz.len(), 1);
    assert_eq!(doc.quiz[0].correct_answer, 0);
  }

  #[test]
  fn quiz_payloads_parse_as_arrays() {
    let raw = "```json\n[{\"question\": \"Qual rio?\", \"options\": [\"Nilo\"], \"correctAnswer\": 0}]\n```";
    let quiz = parse_quiz(raw).expect("parse");
    assert_eq!(quiz.len(), 1);
    assert_eq!(parse_quiz("").expect("empty"), vec![]);
    assert!(matches!(parse_quiz("{}").unwrap_err(), CanvasError::MalformedContent(_)));
  }
}
