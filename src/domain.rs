//! Core data model: the gamified canvas document and the persisted script record.
//!
//! Wire names follow the persisted document shape (top-level camelCase keys,
//! snake_case inside the textual sections), so stored JSON keeps reading the
//! same across backends. The mechanic is a tagged union: a document carries
//! exactly ONE of the four variant blocks, and serializes it as the single
//! original key (`targetShooting` | `boardGame` | `dragDrop` | `gameRules`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which mechanic family a canvas uses. Selection happens on the requested
/// game type (see `plan`); the parser uses it to pick the variant block out
/// of the generated payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
  TargetShooting,
  BoardGame,
  DragDrop,
  Rules,
}

// --- Always-present canvas sections (all-text leaves) ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurriculumInfo {
  #[serde(default)] pub area: String,
  #[serde(default)] pub year_bimester: String,
  #[serde(default)] pub subject: String,
  #[serde(default)] pub theme: String,
  #[serde(default)] pub bncc_codes: String,
  #[serde(default)] pub bncc_description: String,
  #[serde(default)] pub bibliography: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleInfo {
  #[serde(default)] pub genre: String,
  #[serde(default)] pub target_audience: String,
  #[serde(default)] pub narrative_intro: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeInfo {
  #[serde(default)] pub synopsis: String,
  #[serde(default)] pub characters: String,
  #[serde(default)] pub flow: String,
  #[serde(default)] pub enemies: String,
  #[serde(default)] pub mechanics: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentInfo {
  #[serde(default)] pub intro: String,
  #[serde(default)] pub victory_condition: String,
  #[serde(default)] pub defeat_condition: String,
}

// --- Mechanic variants ---

/// Generic rule sheet, used when no specialized mechanic matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRules {
  #[serde(default)] pub total_elements: String,
  #[serde(default)] pub challenge_elements: String,
  #[serde(default)] pub penalty_elements: String,
  #[serde(default)] pub reward_elements: String,
  #[serde(default)] pub gameplay_loop: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
  Correct,
  Wrong,
  Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetItem {
  /// Opaque id; filled in by the parser when the generator omits it.
  #[serde(default)] pub id: String,
  #[serde(default)] pub title: String,
  #[serde(default)] pub description: String,
  /// Signed: wrong targets carry negative points.
  pub points: i64,
  #[serde(rename = "type")] pub kind: TargetKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetShootingData {
  #[serde(default)] pub time_limit: String,
  #[serde(default)] pub difficulty: String,
  #[serde(default)] pub levels_count: String,
  #[serde(default)] pub targets: Vec<TargetItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HouseKind {
  Start,
  Info,
  Quiz,
  Setback,
  Bonus,
  Finish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardHouse {
  pub number: i64,
  #[serde(rename = "type")] pub kind: HouseKind,
  #[serde(default)] pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardGameData {
  pub total_houses: i64,
  #[serde(default)] pub players_config: String,
  #[serde(default)] pub dice_config: String,
  #[serde(default)] pub houses: Vec<BoardHouse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragDropPair {
  #[serde(default)] pub item: String,
  #[serde(default)] pub zone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragDropLevel {
  #[serde(default)] pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub pairs: Vec<DragDropPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragDropData {
  #[serde(default)] pub levels: Vec<DragDropLevel>,
}

/// Exactly one mechanic block per document. External tagging plus the
/// `flatten` on `CanvasDocument` reproduces the original single-key wire
/// shape while the type system rules out zero or two blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Mechanic {
  #[serde(rename = "targetShooting")]
  TargetShooting(TargetShootingData),
  #[serde(rename = "boardGame")]
  BoardGame(BoardGameData),
  #[serde(rename = "dragDrop")]
  DragDrop(DragDropData),
  #[serde(rename = "gameRules")]
  Rules(GameRules),
}

impl Mechanic {
  pub fn kind(&self) -> VariantKind {
    match self {
      Mechanic::TargetShooting(_) => VariantKind::TargetShooting,
      Mechanic::BoardGame(_) => VariantKind::BoardGame,
      Mechanic::DragDrop(_) => VariantKind::DragDrop,
      Mechanic::Rules(_) => VariantKind::Rules,
    }
  }

  /// Requested element count recovered from saved content; the editing form
  /// restores its level slider from this. Rule sheets carry no count.
  pub fn level_count_hint(&self) -> Option<u32> {
    match self {
      Mechanic::TargetShooting(t) => Some(t.targets.len() as u32),
      Mechanic::BoardGame(b) => u32::try_from(b.total_houses).ok(),
      Mechanic::DragDrop(d) => Some(d.levels.len() as u32),
      Mechanic::Rules(_) => None,
    }
  }
}

// --- Quiz ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  #[serde(default)] pub question: String,
  #[serde(default)] pub options: Vec<String>,
  /// Index into `options`. Kept as-is from the generator; bounds are checked
  /// by tests on fixtures, not enforced here.
  pub correct_answer: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

// --- The document ---

/// A complete gamified canvas. Deserialization goes through [`RawCanvas`] so
/// that documents written before the single-variant rule (or by a sloppy
/// backend) still narrow down to exactly one mechanic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCanvas")]
pub struct CanvasDocument {
  pub curriculum: CurriculumInfo,
  pub style: StyleInfo,
  #[serde(flatten)]
  pub mechanic: Mechanic,
  pub narrative: NarrativeInfo,
  pub content: ContentInfo,
  pub title_suggestion: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub quiz: Vec<QuizQuestion>,
}

/// Permissive wire form: every block optional, all four variant keys allowed.
/// The generation parser narrows this by the planned variant; stored documents
/// narrow by precedence in the `TryFrom` below.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCanvas {
  #[serde(default)] pub title_suggestion: Option<String>,
  #[serde(default)] pub curriculum: Option<CurriculumInfo>,
  #[serde(default)] pub style: Option<StyleInfo>,
  #[serde(default)] pub narrative: Option<NarrativeInfo>,
  #[serde(default)] pub content: Option<ContentInfo>,
  #[serde(default, rename = "gameRules")] pub game_rules: Option<GameRules>,
  #[serde(default, rename = "targetShooting")] pub target_shooting: Option<TargetShootingData>,
  #[serde(default, rename = "boardGame")] pub board_game: Option<BoardGameData>,
  #[serde(default, rename = "dragDrop")] pub drag_drop: Option<DragDropData>,
  #[serde(default)] pub quiz: Option<Vec<QuizQuestion>>,
}

impl TryFrom<RawCanvas> for CanvasDocument {
  type Error = String;

  /// Narrowing for stored documents, where no requested variant is known.
  /// Precedence follows the original render order: board game, drag-drop,
  /// target shooting, then the generic rule sheet.
  fn try_from(raw: RawCanvas) -> Result<Self, String> {
    let curriculum = raw.curriculum.ok_or_else(|| "missing section: curriculum".to_string())?;
    let style = raw.style.ok_or_else(|| "missing section: style".to_string())?;
    let narrative = raw.narrative.ok_or_else(|| "missing section: narrative".to_string())?;
    let content = raw.content.ok_or_else(|| "missing section: content".to_string())?;

    let mechanic = if let Some(b) = raw.board_game {
      Mechanic::BoardGame(b)
    } else if let Some(d) = raw.drag_drop {
      Mechanic::DragDrop(d)
    } else if let Some(t) = raw.target_shooting {
      Mechanic::TargetShooting(t)
    } else if let Some(r) = raw.game_rules {
      Mechanic::Rules(r)
    } else {
      return Err("no mechanic block present".to_string());
    };

    Ok(CanvasDocument {
      curriculum,
      style,
      mechanic,
      narrative,
      content,
      title_suggestion: raw.title_suggestion.unwrap_or_default(),
      quiz: raw.quiz.unwrap_or_default(),
    })
  }
}

// --- Persisted record ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
  Active,
  Deleted,
}

impl Default for RecordStatus {
  fn default() -> Self {
    RecordStatus::Active
  }
}

/// One saved script: the teacher's form inputs plus the generated canvas.
/// `id` is absent until the first save; timestamps are set by the store
/// (server-time semantics), never by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub owner_id: String,
  pub title: String,
  pub subject: String,
  pub level: String,
  pub year: String,
  pub bimester: String,
  pub game_type: String,
  pub include_quiz: bool,
  pub questions_count: u32,
  pub idea_text: String,
  pub generated_content: CanvasDocument,
  #[serde(default)]
  pub status: RecordStatus,
  pub created_at: DateTime<Utc>,
  pub last_modified: DateTime<Utc>,
}

/// Partial update for a stored record. Unset fields are left untouched by
/// the gateway; a patch can never clear a field.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
  pub title: Option<String>,
  pub subject: Option<String>,
  pub level: Option<String>,
  pub year: Option<String>,
  pub bimester: Option<String>,
  pub game_type: Option<String>,
  pub include_quiz: Option<bool>,
  pub questions_count: Option<u32>,
  pub idea_text: Option<String>,
  pub generated_content: Option<CanvasDocument>,
  pub status: Option<RecordStatus>,
}

impl RecordPatch {
  /// Merge into an existing record. Shared by both store backends so merge
  /// semantics cannot drift between them.
  pub fn apply_to(&self, rec: &mut ScriptRecord) {
    if let Some(v) = &self.title { rec.title = v.clone(); }
    if let Some(v) = &self.subject { rec.subject = v.clone(); }
    if let Some(v) = &self.level { rec.level = v.clone(); }
    if let Some(v) = &self.year { rec.year = v.clone(); }
    if let Some(v) = &self.bimester { rec.bimester = v.clone(); }
    if let Some(v) = &self.game_type { rec.game_type = v.clone(); }
    if let Some(v) = self.include_quiz { rec.include_quiz = v; }
    if let Some(v) = self.questions_count { rec.questions_count = v; }
    if let Some(v) = &self.idea_text { rec.idea_text = v.clone(); }
    if let Some(v) = &self.generated_content { rec.generated_content = v.clone(); }
    if let Some(v) = self.status { rec.status = v; }
  }
}

/// Generation inputs as the core sees them. `amount_levels` stays optional;
/// the selector owns its normalization.
#[derive(Debug, Clone)]
pub struct GenerateParams {
  pub level: String,
  pub subject: String,
  pub year: String,
  pub bimester: String,
  pub game_type: String,
  pub idea_text: String,
  pub include_quiz: bool,
  pub questions_count: u32,
  pub amount_levels: Option<u32>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn board_doc() -> CanvasDocument {
    CanvasDocument {
      curriculum: CurriculumInfo {
        area: "Ciências Humanas".into(),
        year_bimester: "6º Ano - 2º Bimestre".into(),
        subject: "História".into(),
        theme: "Egito Antigo".into(),
        bncc_codes: "EF06HI07".into(),
        bncc_description: "Sociedades do Nilo".into(),
        bibliography: "BNCC 2018".into(),
      },
      style: StyleInfo {
        genre: "Aventura".into(),
        target_audience: "11-12 anos".into(),
        narrative_intro: "Uma expedição ao Nilo".into(),
      },
      mechanic: Mechanic::BoardGame(BoardGameData {
        total_houses: 10,
        players_config: "2 jogadores".into(),
        dice_config: "1 dado de 6 faces".into(),
        houses: vec![
          BoardHouse { number: 1, kind: HouseKind::Start, title: "Início".into(), description: "Partida".into(), action: None },
          BoardHouse { number: 10, kind: HouseKind::Finish, title: "Chegada".into(), description: "Vitória".into(), action: None },
        ],
      }),
      narrative: NarrativeInfo {
        synopsis: "Arqueólogos exploram o Nilo".into(),
        characters: "A arqueóloga Ana".into(),
        flow: "Do delta às pirâmides".into(),
        enemies: "Tempestades de areia".into(),
        mechanics: "Avance casas respondendo perguntas".into(),
      },
      content: ContentInfo {
        intro: "Bem-vindos ao Egito".into(),
        victory_condition: "Chegar à casa final".into(),
        defeat_condition: "Ficar sem movimentos".into(),
      },
      title_suggestion: "Expedição Nilo".into(),
      quiz: vec![],
    }
  }

  #[test]
  fn document_serializes_with_a_single_variant_key() {
    let value = serde_json::to_value(board_doc()).expect("serialize");
    let obj = value.as_object().expect("object");
    assert!(obj.contains_key("boardGame"));
    assert!(!obj.contains_key("targetShooting"));
    assert!(!obj.contains_key("dragDrop"));
    assert!(!obj.contains_key("gameRules"));
    // An empty quiz never shows up on the wire.
    assert!(!obj.contains_key("quiz"));
  }

  #[test]
  fn document_round_trips_through_json() {
    let doc = board_doc();
    let text = serde_json::to_string(&doc).expect("serialize");
    let back: CanvasDocument = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(doc, back);
  }

  #[test]
  fn stored_narrowing_prefers_board_over_rules() {
    // A document written before the single-variant rule could carry both.
    let mut value = serde_json::to_value(board_doc()).expect("serialize");
    value.as_object_mut().expect("object").insert(
      "gameRules".into(),
      serde_json::json!({
        "total_elements": "10", "challenge_elements": "4",
        "penalty_elements": "2", "reward_elements": "2",
        "gameplay_loop": "Responda e avance"
      }),
    );
    let back: CanvasDocument = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back.mechanic.kind(), VariantKind::BoardGame);
  }

  #[test]
  fn missing_section_is_rejected() {
    let mut value = serde_json::to_value(board_doc()).expect("serialize");
    value.as_object_mut().expect("object").remove("narrative");
    let err = serde_json::from_value::<CanvasDocument>(value).unwrap_err().to_string();
    assert!(err.contains("narrative"), "unexpected error: {err}");
  }

  #[test]
  fn level_count_hint_follows_the_variant() {
    assert_eq!(board_doc().mechanic.level_count_hint(), Some(10));
    assert_eq!(Mechanic::Rules(GameRules::default()).level_count_hint(), None);
  }

  #[test]
  fn patch_merges_without_clearing() {
    let mut rec = ScriptRecord {
      id: Some("r1".into()),
      owner_id: "u1".into(),
      title: "Antes".into(),
      subject: "História".into(),
      level: "Ensino Fundamental 2".into(),
      year: "6º Ano".into(),
      bimester: "2º Bimestre".into(),
      game_type: "Jogo de Tabuleiro".into(),
      include_quiz: true,
      questions_count: 5,
      idea_text: "Egito".into(),
      generated_content: board_doc(),
      status: RecordStatus::Active,
      created_at: chrono::Utc::now(),
      last_modified: chrono::Utc::now(),
    };
    let patch = RecordPatch { title: Some("Depois".into()), ..Default::default() };
    patch.apply_to(&mut rec);
    assert_eq!(rec.title, "Depois");
    assert_eq!(rec.subject, "História");
    assert!(rec.include_quiz);
  }
}
