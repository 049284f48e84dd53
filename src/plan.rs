//! Variant selection: which mechanic a requested game type gets, and how
//! many elements the generator must produce for it.
//!
//! Dispatch is case-insensitive substring matching over an ordered rule
//! table. First hit wins; game types matching nothing (including every
//! free-text type the form accepts) fall back to the generic rule sheet.

use crate::domain::VariantKind;

/// Element count used when the request does not pin one (or pins zero).
pub const DEFAULT_LEVEL_COUNT: u32 = 5;

/// Board games never shrink below this many houses.
pub const MIN_BOARD_HOUSES: u32 = 10;

/// One dispatch rule: any of `keywords` (stored lowercase) anywhere in the
/// lowercased game type selects `kind`.
struct DispatchRule {
  keywords: &'static [&'static str],
  kind: VariantKind,
}

// Order matters. "Trilha para Arrastar" is a board game, not drag-drop.
const DISPATCH_RULES: &[DispatchRule] = &[
  DispatchRule { keywords: &["tiro ao alvo"], kind: VariantKind::TargetShooting },
  DispatchRule { keywords: &["tabuleiro", "trilha"], kind: VariantKind::BoardGame },
  DispatchRule { keywords: &["arrastar", "drag"], kind: VariantKind::DragDrop },
];

/// What the generator must produce for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantPlan {
  pub kind: VariantKind,
  /// Exact element count for the chosen variant (targets, houses, phases).
  /// For the rule sheet it only guides the "rounds" wording.
  pub level_count: u32,
}

pub fn plan_for(game_type: &str, amount_levels: Option<u32>) -> VariantPlan {
  let n = normalize_level_count(amount_levels);
  let lowered = game_type.to_lowercase();

  let kind = DISPATCH_RULES
    .iter()
    .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k)))
    .map(|rule| rule.kind)
    .unwrap_or(VariantKind::Rules);

  let level_count = match kind {
    VariantKind::BoardGame => n.max(MIN_BOARD_HOUSES),
    _ => n,
  };

  VariantPlan { kind, level_count }
}

fn normalize_level_count(amount_levels: Option<u32>) -> u32 {
  match amount_levels {
    None | Some(0) => DEFAULT_LEVEL_COUNT,
    Some(n) => n,
  }
}
