//! Loading service configuration (prompt templates) from TOML.
//!
//! See `CanvasConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CanvasConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts used to assemble generation instructions. Defaults are the
/// production Portuguese texts (BNCC register). You can override them in
/// TOML if you need to tune tone/structure. Placeholders use `{name}`
/// substitution, see `util::fill_template`.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Canvas generation
  pub canvas_preamble: String,
  pub default_context: String,
  // Per-mechanic directives, one of which is appended to the preamble
  pub target_shooting_directive: String,
  pub board_game_directive: String,
  pub drag_drop_directive: String,
  pub generic_rules_directive: String,
  // Inline quiz (appended when the request asks for one)
  pub quiz_directive: String,
  // Standalone quiz regeneration for an existing script
  pub quiz_regen_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      canvas_preamble: "Atue como um Especialista em Game Design Educacional (focado na BNCC Brasil).\nGere um Roteiro de Jogo Educacional completo baseado nos inputs.\n\nINPUTS:\n- Nível: {level}\n- Ano: {year}\n- Matéria: {subject}\n- Bimestre: {bimester}\n- Tipo de Jogo: {game_type}\n- Contexto Extra: {context}\n\nREQUISITO DE LÓGICA DE JOGO:\nVocê deve criar um modelo lógico de distribuição de elementos para o Tipo de Jogo escolhido.".into(),
      default_context: "Crie um tema criativo e engajador.".into(),
      target_shooting_directive: "ESPECÍFICO PARA TIRO AO ALVO:\nGere uma estrutura com EXATAMENTE {level_count} ALVOS no total.\nMisture alvos corretos (+pontos) e incorretos (-pontos) dentro dessa quantidade.\nDefina 'levelsCount' como \"{level_count} Níveis/Alvos\".".into(),
      board_game_directive: "ESPECÍFICO PARA JOGO DE TABULEIRO:\nCrie uma estrutura de TRILHA LINEAR com EXATAMENTE {level_count} CASAS FIXAS.\n- O jogo é para 2 jogadores usando dados.\n- Casa 1 é SEMPRE \"Início\".\n- A última casa é SEMPRE \"Chegada/Vitória\".\n- Casas intermediárias devem variar entre:\n  * 'info' (curiosidade sobre o tema),\n  * 'quiz' (pergunta sobre o tema, se errar volta uma casa),\n  * 'setback' (punição, ex: perca a vez ou volte casas),\n  * 'bonus' (avance casas ou jogue novamente).".into(),
      drag_drop_directive: "ESPECÍFICO PARA JOGO DE ARRASTAR E SOLTAR (DRAG & DROP):\nCrie uma estrutura com EXATAMENTE {level_count} FASES (Levels).\nCada fase deve ter um desafio diferente de associação.\nExemplo: Fase 1 (Conceitos Básicos), até Fase {level_count} (Desafio Final).\nPara cada fase, defina \"Pares\": o item que é arrastado e a zona onde ele deve ser solto.\nUse itens variados como palavras, frases curtas, números ou descrições de imagens.".into(),
      generic_rules_directive: "Para outros tipos de jogo, defina regras genéricas equilibradas no objeto gameRules, considerando aproximadamente {level_count} rodadas ou elementos principais.".into(),
      quiz_directive: "ALÉM DO CANVAS, GERE UM QUIZ:\n- Crie {questions_count} perguntas de múltipla escolha.".into(),
      quiz_regen_template: "Baseado no seguinte Roteiro, crie um Quiz com {questions_count} perguntas. Contexto: {synopsis}".into(),
    }
  }
}

/// Attempt to load `CanvasConfig` from CANVAS_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_canvas_config_from_env() -> Option<CanvasConfig> {
  let path = std::env::var("CANVAS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<CanvasConfig>(&s) {
      Ok(cfg) => {
        info!(target: "educanvas_backend", %path, "Loaded canvas config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "educanvas_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "educanvas_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
