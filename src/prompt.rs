//! Builds generation requests: a model instruction assembled from the
//! configured templates plus a response schema in the Gemini dialect
//! (uppercase type tags).
//!
//! The canvas schema always demands the shared sections and the `gameRules`
//! sheet. A specialized plan adds exactly its own block on top, never the
//! other specialized blocks; the quiz shape is added only when asked for.

use serde_json::{json, Value};

use crate::config::Prompts;
use crate::domain::{CanvasDocument, GenerateParams, VariantKind};
use crate::plan::VariantPlan;
use crate::util::fill_template;

/// Everything the generation backend needs for one call. Built up front so
/// the same request can be logged, inspected in tests, and sent as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
  pub instruction: String,
  pub response_schema: Value,
  /// None keeps the backend default (quiz regeneration wants that).
  pub temperature: Option<f32>,
}

/// Assemble the full-canvas request for one generation run.
pub fn build_canvas_request(
  prompts: &Prompts,
  params: &GenerateParams,
  plan: VariantPlan,
) -> GenerationRequest {
  let n = plan.level_count.to_string();
  let idea = params.idea_text.trim();
  let context = if idea.is_empty() { prompts.default_context.as_str() } else { idea };

  let mut instruction = fill_template(&prompts.canvas_preamble, &[
    ("level", params.level.as_str()),
    ("year", params.year.as_str()),
    ("subject", params.subject.as_str()),
    ("bimester", params.bimester.as_str()),
    ("game_type", params.game_type.as_str()),
    ("context", context),
  ]);

  let directive = match plan.kind {
    VariantKind::TargetShooting => &prompts.target_shooting_directive,
    VariantKind::BoardGame => &prompts.board_game_directive,
    VariantKind::DragDrop => &prompts.drag_drop_directive,
    VariantKind::Rules => &prompts.generic_rules_directive,
  };
  instruction.push_str("\n\n");
  instruction.push_str(&fill_template(directive, &[("level_count", n.as_str())]));

  if params.include_quiz {
    let count = params.questions_count.to_string();
    instruction.push_str("\n\n");
    instruction.push_str(&fill_template(&prompts.quiz_directive, &[
      ("questions_count", count.as_str()),
    ]));
  }

  GenerationRequest {
    instruction,
    response_schema: canvas_response_schema(plan, params.include_quiz),
    temperature: Some(0.7),
  }
}

/// Assemble the standalone quiz request for an already-saved script. The
/// synopsis is the only context the model gets, as in the original flow.
pub fn build_quiz_request(
  prompts: &Prompts,
  doc: &CanvasDocument,
  questions_count: u32,
) -> GenerationRequest {
  let count = questions_count.to_string();
  let instruction = fill_template(&prompts.quiz_regen_template, &[
    ("questions_count", count.as_str()),
    ("synopsis", doc.narrative.synopsis.as_str()),
  ]);
  GenerationRequest {
    instruction,
    response_schema: quiz_schema(),
    temperature: None,
  }
}

fn canvas_response_schema(plan: VariantPlan, include_quiz: bool) -> Value {
  let mut properties = serde_json::Map::new();
  properties.insert("curriculum".into(), curriculum_schema());
  properties.insert("style".into(), style_schema());
  properties.insert("gameRules".into(), game_rules_schema());
  properties.insert("narrative".into(), narrative_schema());
  properties.insert("content".into(), content_schema());
  properties.insert("title_suggestion".into(), json!({ "type": "STRING" }));

  let mut required =
    vec!["curriculum", "style", "gameRules", "narrative", "content", "title_suggestion"];

  match plan.kind {
    VariantKind::TargetShooting => {
      properties.insert("targetShooting".into(), target_shooting_schema());
      required.push("targetShooting");
    }
    VariantKind::BoardGame => {
      properties.insert("boardGame".into(), board_game_schema(plan.level_count));
      required.push("boardGame");
    }
    VariantKind::DragDrop => {
      properties.insert("dragDrop".into(), drag_drop_schema());
      required.push("dragDrop");
    }
    VariantKind::Rules => {}
  }

  if include_quiz {
    properties.insert("quiz".into(), quiz_schema());
    required.push("quiz");
  }

  json!({ "type": "OBJECT", "properties": properties, "required": required })
}

fn curriculum_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "area": { "type": "STRING" },
      "year_bimester": { "type": "STRING" },
      "subject": { "type": "STRING" },
      "theme": { "type": "STRING" },
      "bncc_codes": { "type": "STRING" },
      "bncc_description": { "type": "STRING" },
      "bibliography": { "type": "STRING" }
    },
    "required": ["area", "year_bimester", "subject", "theme", "bncc_codes", "bncc_description", "bibliography"]
  })
}

fn style_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "genre": { "type": "STRING" },
      "target_audience": { "type": "STRING" },
      "narrative_intro": { "type": "STRING" }
    },
    "required": ["genre", "target_audience", "narrative_intro"]
  })
}

fn game_rules_schema() -> Value {
  json!({
    "type": "OBJECT",
    "description": "Resumo textual das regras",
    "properties": {
      "total_elements": { "type": "STRING" },
      "challenge_elements": { "type": "STRING" },
      "penalty_elements": { "type": "STRING" },
      "reward_elements": { "type": "STRING" },
      "gameplay_loop": { "type": "STRING" }
    },
    "required": ["total_elements", "challenge_elements", "penalty_elements", "reward_elements", "gameplay_loop"]
  })
}

fn narrative_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "synopsis": { "type": "STRING" },
      "characters": { "type": "STRING" },
      "flow": { "type": "STRING" },
      "enemies": { "type": "STRING" },
      "mechanics": { "type": "STRING" }
    },
    "required": ["synopsis", "characters", "flow", "enemies", "mechanics"]
  })
}

fn content_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "intro": { "type": "STRING" },
      "victory_condition": { "type": "STRING" },
      "defeat_condition": { "type": "STRING" }
    },
    "required": ["intro", "victory_condition", "defeat_condition"]
  })
}

fn target_shooting_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "timeLimit": { "type": "STRING" },
      "difficulty": { "type": "STRING" },
      "levelsCount": { "type": "STRING" },
      "targets": {
        "type": "ARRAY",
        "items": {
          "type": "OBJECT",
          "properties": {
            "id": { "type": "STRING" },
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "points": { "type": "NUMBER" },
            "type": { "type": "STRING", "enum": ["correct", "wrong", "info"] }
          },
          "required": ["title", "description", "points", "type"]
        }
      }
    },
    "required": ["timeLimit", "difficulty", "levelsCount", "targets"]
  })
}

fn board_game_schema(total_houses: u32) -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "totalHouses": { "type": "NUMBER", "description": format!("Deve ser {total_houses}") },
      "playersConfig": { "type": "STRING", "description": "Ex: 2 Jogadores" },
      "diceConfig": { "type": "STRING", "description": "Ex: 1 Dado D6" },
      "houses": {
        "type": "ARRAY",
        "items": {
          "type": "OBJECT",
          "properties": {
            "number": { "type": "NUMBER" },
            "type": { "type": "STRING", "enum": ["start", "info", "quiz", "setback", "bonus", "finish"] },
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "action": { "type": "STRING" }
          },
          "required": ["number", "type", "title", "description"]
        }
      }
    },
    "required": ["totalHouses", "houses"]
  })
}

fn drag_drop_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "levels": {
        "type": "ARRAY",
        "items": {
          "type": "OBJECT",
          "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "pairs": {
              "type": "ARRAY",
              "items": {
                "type": "OBJECT",
                "properties": {
                  "item": { "type": "STRING" },
                  "zone": { "type": "STRING" }
                },
                "required": ["item", "zone"]
              }
            }
          },
          "required": ["title", "description", "pairs"]
        }
      }
    },
    "required": ["levels"]
  })
}

fn quiz_schema() -> Value {
  json!({
    "type": "ARRAY",
    "items": {
      "type": "OBJECT",
      "properties": {
        "question": { "type": "STRING" },
        "options": { "type": "ARRAY", "items": { "type": "STRING" } },
        "correctAnswer": { "type": "INTEGER" },
        "explanation": { "type": "STRING" }
      },
      "required": ["question", "options", "correctAnswer"]
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ContentInfo, CurriculumInfo, GameRules, Mechanic, NarrativeInfo, StyleInfo};
  use crate::plan::plan_for;

  fn params(game_type: &str, include_quiz: bool) -> GenerateParams {
    GenerateParams {
      level: "Ensino Fundamental 2".into(),
      subject: "História".into(),
      year: "6º Ano".into(),
      bimester: "2º Bimestre".into(),
      game_type: game_type.into(),
      idea_text: "Egito Antigo".into(),
      include_quiz,
      questions_count: 5,
      amount_levels: Some(3),
    }
  }

  fn schema_keys(req: &GenerationRequest) -> Vec<String> {
    req.response_schema["properties"]
      .as_object()
      .expect("schema properties")
      .keys()
      .cloned()
      .collect()
  }

  #[test]
  fn board_request_carries_the_floored_house_count() {
    let prompts = Prompts::default();
    let p = params("Jogo de Tabuleiro", false);
    let req = build_canvas_request(&prompts, &p, plan_for(&p.game_type, p.amount_levels));
    assert!(req.instruction.contains("EXATAMENTE 10 CASAS FIXAS"), "got: {}", req.instruction);
    assert!(req.instruction.contains("Egito Antigo"));
    let keys = schema_keys(&req);
    assert!(keys.contains(&"boardGame".to_string()));
    assert!(!keys.contains(&"targetShooting".to_string()));
    assert!(!keys.contains(&"dragDrop".to_string()));
    assert!(!keys.contains(&"quiz".to_string()));
    assert_eq!(
      req.response_schema["properties"]["boardGame"]["properties"]["totalHouses"]["description"],
      "Deve ser 10"
    );
  }

  #[test]
  fn target_request_names_the_exact_target_count() {
    let prompts = Prompts::default();
    let p = params("Tiro ao Alvo", false);
    let req = build_canvas_request(&prompts, &p, plan_for(&p.game_type, Some(4)));
    assert!(req.instruction.contains("EXATAMENTE 4 ALVOS"));
    assert!(req.instruction.contains("\"4 Níveis/Alvos\""));
    let required = req.response_schema["required"].as_array().expect("required array");
    assert!(required.iter().any(|v| v == "targetShooting"));
    assert!(required.iter().any(|v| v == "gameRules"));
  }

  #[test]
  fn generic_plan_adds_no_specialized_block() {
    let prompts = Prompts::default();
    let p = params("Roleta", false);
    let req = build_canvas_request(&prompts, &p, plan_for(&p.game_type, None));
    assert!(req.instruction.contains("aproximadamente 5 rodadas"));
    let keys = schema_keys(&req);
    assert!(keys.contains(&"gameRules".to_string()));
    assert!(!keys.contains(&"targetShooting".to_string()));
    assert!(!keys.contains(&"boardGame".to_string()));
    assert!(!keys.contains(&"dragDrop".to_string()));
  }

  #[test]
  fn quiz_section_appears_only_when_requested() {
    let prompts = Prompts::default();
    let with = build_canvas_request(&prompts, &params("Roleta", true), plan_for("Roleta", None));
    let without = build_canvas_request(&prompts, &params("Roleta", false), plan_for("Roleta", None));
    assert!(with.instruction.contains("Crie 5 perguntas"));
    assert!(schema_keys(&with).contains(&"quiz".to_string()));
    assert!(!without.instruction.contains("GERE UM QUIZ"));
    assert!(!schema_keys(&without).contains(&"quiz".to_string()));
  }

  #[test]
  fn blank_idea_text_falls_back_to_the_default_context() {
    let prompts = Prompts::default();
    let mut p = params("Tiro ao Alvo", false);
    p.idea_text = "   ".into();
    let req = build_canvas_request(&prompts, &p, plan_for(&p.game_type, None));
    assert!(req.instruction.contains("Crie um tema criativo e engajador."));
  }

  #[test]
  fn identical_inputs_build_identical_requests() {
    let prompts = Prompts::default();
    let p = params("Jogo de Tabuleiro", true);
    let plan = plan_for(&p.game_type, p.amount_levels);
    assert_eq!(
      build_canvas_request(&prompts, &p, plan),
      build_canvas_request(&prompts, &p, plan)
    );
  }

  #[test]
  fn quiz_regen_request_uses_the_synopsis_and_an_array_schema() {
    let prompts = Prompts::default();
    let doc = CanvasDocument {
      curriculum: CurriculumInfo::default(),
      style: StyleInfo::default(),
      mechanic: Mechanic::Rules(GameRules::default()),
      narrative: NarrativeInfo { synopsis: "A travessia do Nilo".into(), ..Default::default() },
      content: ContentInfo::default(),
      title_suggestion: String::new(),
      quiz: vec![],
    };
    let req = build_quiz_request(&prompts, &doc, 8);
    assert!(req.instruction.contains("8 perguntas"));
    assert!(req.instruction.contains("A travessia do Nilo"));
    assert_eq!(req.response_schema["type"], "ARRAY");
    assert_eq!(req.temperature, None);
  }
}
