//! Field-level edits against a canvas document.
//!
//! Edits are copy-on-write: `apply_edit` returns a new document and never
//! touches the input, so a failed edit leaves the caller's draft exactly as
//! it was. Paths address the document's wire shape (`curriculum.theme`,
//! `targetShooting.targets`, `dragDrop.levels.0.pairs`), and text edits only
//! reach text leaves; structural fields like house numbers stay out of reach.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{CanvasDocument, ContentInfo, CurriculumInfo, GameRules, Mechanic, NarrativeInfo, StyleInfo};
use crate::error::CanvasError;

/// One reconciliation command from the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
  /// Replace one text leaf, addressed by a dotted path.
  SetField { path: String, value: String },
  /// Replace one field of one element inside a collection.
  SetElementField { collection: String, index: usize, field: String, value: Value },
}

/// Apply one edit and return the updated document.
pub fn apply_edit(doc: &CanvasDocument, op: &EditOp) -> Result<CanvasDocument, CanvasError> {
  let mut next = doc.clone();
  match op {
    EditOp::SetField { path, value } => set_field(&mut next, path, value)?,
    EditOp::SetElementField { collection, index, field, value } => {
      set_element_field(&mut next, collection, *index, field, value)?
    }
  }
  Ok(next)
}

/// Unsaved-changes flag for an editing session. No open draft means nothing
/// to save; a draft that was never persisted is always dirty.
pub fn is_dirty(current: Option<&CanvasDocument>, last_saved: Option<&CanvasDocument>) -> bool {
  match (current, last_saved) {
    (None, _) => false,
    (Some(_), None) => true,
    (Some(a), Some(b)) => a != b,
  }
}

fn set_field(doc: &mut CanvasDocument, path: &str, value: &str) -> Result<(), CanvasError> {
  let mut parts = path.splitn(2, '.');
  let section = parts.next().unwrap_or_default();
  let field = parts.next();

  let slot: &mut String = match (section, field) {
    ("title_suggestion", None) => &mut doc.title_suggestion,
    ("curriculum", Some(f)) => curriculum_slot(&mut doc.curriculum, f, path)?,
    ("style", Some(f)) => style_slot(&mut doc.style, f, path)?,
    ("narrative", Some(f)) => narrative_slot(&mut doc.narrative, f, path)?,
    ("content", Some(f)) => content_slot(&mut doc.content, f, path)?,
    ("gameRules", Some(f)) => match &mut doc.mechanic {
      Mechanic::Rules(rules) => rules_slot(rules, f, path)?,
      _ => return Err(bad_path(path)),
    },
    ("targetShooting", Some(f)) => match &mut doc.mechanic {
      Mechanic::TargetShooting(data) => match f {
        "timeLimit" => &mut data.time_limit,
        "difficulty" => &mut data.difficulty,
        "levelsCount" => &mut data.levels_count,
        _ => return Err(bad_path(path)),
      },
      _ => return Err(bad_path(path)),
    },
    ("boardGame", Some(f)) => match &mut doc.mechanic {
      Mechanic::BoardGame(data) => match f {
        "playersConfig" => &mut data.players_config,
        "diceConfig" => &mut data.dice_config,
        _ => return Err(bad_path(path)),
      },
      _ => return Err(bad_path(path)),
    },
    _ => return Err(bad_path(path)),
  };
  *slot = value.to_string();
  Ok(())
}

fn set_element_field(
  doc: &mut CanvasDocument,
  collection: &str,
  index: usize,
  field: &str,
  value: &Value,
) -> Result<(), CanvasError> {
  let segments: Vec<&str> = collection.split('.').collect();
  match (segments.as_slice(), &mut doc.mechanic) {
    (["targetShooting", "targets"], Mechanic::TargetShooting(data)) => {
      let len = data.targets.len();
      let target = data.targets.get_mut(index).ok_or(CanvasError::IndexOutOfRange { index, len })?;
      match field {
        "title" => target.title = expect_text(field, value)?,
        "description" => target.description = expect_text(field, value)?,
        "points" => target.points = expect_int(field, value)?,
        "type" => target.kind = expect_variant(field, value)?,
        _ => return Err(bad_field(collection, field)),
      }
    }
    (["boardGame", "houses"], Mechanic::BoardGame(data)) => {
      let len = data.houses.len();
      let house = data.houses.get_mut(index).ok_or(CanvasError::IndexOutOfRange { index, len })?;
      match field {
        "title" => house.title = expect_text(field, value)?,
        "description" => house.description = expect_text(field, value)?,
        "action" => house.action = Some(expect_text(field, value)?),
        "type" => house.kind = expect_variant(field, value)?,
        _ => return Err(bad_field(collection, field)),
      }
    }
    (["dragDrop", "levels"], Mechanic::DragDrop(data)) => {
      let len = data.levels.len();
      let level = data.levels.get_mut(index).ok_or(CanvasError::IndexOutOfRange { index, len })?;
      match field {
        "title" => level.title = expect_text(field, value)?,
        "description" => level.description = expect_text(field, value)?,
        _ => return Err(bad_field(collection, field)),
      }
    }
    (["dragDrop", "levels", level_index, "pairs"], Mechanic::DragDrop(data)) => {
      let li: usize = level_index
        .parse()
        .map_err(|_| CanvasError::InvalidPath(format!("'{level_index}' is not a level index")))?;
      let levels_len = data.levels.len();
      let level = data.levels.get_mut(li).ok_or(CanvasError::IndexOutOfRange { index: li, len: levels_len })?;
      let len = level.pairs.len();
      let pair = level.pairs.get_mut(index).ok_or(CanvasError::IndexOutOfRange { index, len })?;
      match field {
        "item" => pair.item = expect_text(field, value)?,
        "zone" => pair.zone = expect_text(field, value)?,
        _ => return Err(bad_field(collection, field)),
      }
    }
    _ => return Err(CanvasError::InvalidPath(format!("no editable collection at '{collection}'"))),
  }
  Ok(())
}

fn curriculum_slot<'a>(c: &'a mut CurriculumInfo, field: &str, path: &str) -> Result<&'a mut String, CanvasError> {
  Ok(match field {
    "area" => &mut c.area,
    "year_bimester" => &mut c.year_bimester,
    "subject" => &mut c.subject,
    "theme" => &mut c.theme,
    "bncc_codes" => &mut c.bncc_codes,
    "bncc_description" => &mut c.bncc_description,
    "bibliography" => &mut c.bibliography,
    _ => return Err(bad_path(path)),
  })
}

fn style_slot<'a>(s: &'a mut StyleInfo, field: &str, path: &str) -> Result<&'a mut String, CanvasError> {
  Ok(match field {
    "genre" => &mut s.genre,
    "target_audience" => &mut s.target_audience,
    "narrative_intro" => &mut s.narrative_intro,
    _ => return Err(bad_path(path)),
  })
}

fn narrative_slot<'a>(n: &'a mut NarrativeInfo, field: &str, path: &str) -> Result<&'a mut String, CanvasError> {
  Ok(match field {
    "synopsis" => &mut n.synopsis,
    "characters" => &mut n.characters,
    "flow" => &mut n.flow,
    "enemies" => &mut n.enemies,
    "mechanics" => &mut n.mechanics,
    _ => return Err(bad_path(path)),
  })
}

fn content_slot<'a>(c: &'a mut ContentInfo, field: &str, path: &str) -> Result<&'a mut String, CanvasError> {
  Ok(match field {
    "intro" => &mut c.intro,
    "victory_condition" => &mut c.victory_condition,
    "defeat_condition" => &mut c.defeat_condition,
    _ => return Err(bad_path(path)),
  })
}

fn rules_slot<'a>(r: &'a mut GameRules, field: &str, path: &str) -> Result<&'a mut String, CanvasError> {
  Ok(match field {
    "total_elements" => &mut r.total_elements,
    "challenge_elements" => &mut r.challenge_elements,
    "penalty_elements" => &mut r.penalty_elements,
    "reward_elements" => &mut r.reward_elements,
    "gameplay_loop" => &mut r.gameplay_loop,
    _ => return Err(bad_path(path)),
  })
}

fn expect_text(field: &str, value: &Value) -> Result<String, CanvasError> {
  value
    .as_str()
    .map(str::to_string)
    .ok_or_else(|| CanvasError::InvalidPath(format!("field '{field}' takes a string")))
}

fn expect_int(field: &str, value: &Value) -> Result<i64, CanvasError> {
  value
    .as_i64()
    .ok_or_else(|| CanvasError::InvalidPath(format!("field '{field}' takes an integer")))
}

fn expect_variant<T: DeserializeOwned>(field: &str, value: &Value) -> Result<T, CanvasError> {
  serde_json::from_value(value.clone())
    .map_err(|_| CanvasError::InvalidPath(format!("field '{field}' got an unknown value")))
}

fn bad_path(path: &str) -> CanvasError {
  CanvasError::InvalidPath(format!("no editable text field at '{path}'"))
}

fn bad_field(collection: &str, field: &str) -> CanvasError {
  CanvasError::InvalidPath(format!("no editable field '{field}' in '{collection}'"))
}
