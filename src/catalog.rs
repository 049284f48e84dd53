//! Built-in education catalogs served read-only to the authoring UI.
//!
//! These feed the form dropdowns (level, subject, year, bimester, suggested
//! game types). They are suggestions, not validation: game type and level
//! stay free text at the API so pasted or custom values keep working.

pub const EDUCATION_LEVELS: &[&str] = &[
  "Ensino Fundamental 1",
  "Ensino Fundamental 2",
  "Ensino Médio",
  "Ensino Superior",
];

pub const BIMESTERS: &[&str] = &[
  "1º Bimestre",
  "2º Bimestre",
  "3º Bimestre",
  "4º Bimestre",
];

/// Suggested game types. The first three map to specialized mechanics; the
/// rest fall through to the generic rule sheet (see `plan`).
pub const GAME_TYPES: &[&str] = &[
  "Tiro ao Alvo",
  "Jogo de Tabuleiro",
  "Jogo de Arrastar e Soltar",
  "Roleta",
  "Jogo da Memória",
  "Caça ao Tesouro",
  "Escape Room (Digital)",
  "Quiz Gamificado",
  "Jogo de Plataforma 2D",
  "Quebra-Cabeça",
];

/// Subjects offered for a given education level. Unknown levels get an empty
/// list, mirroring how the form degrades.
pub fn subjects_for_level(level: &str) -> &'static [&'static str] {
  match level {
    "Ensino Fundamental 1" => &[
      "História", "Geografia", "Ciências", "Língua Portuguesa", "Matemática", "Artes",
      "Educação Física",
    ],
    "Ensino Fundamental 2" => &[
      "História", "Geografia", "Ciências", "Língua Portuguesa", "Matemática", "Artes",
      "Educação Física", "Ensino Religioso", "Língua Inglesa", "Língua Espanhola",
    ],
    "Ensino Médio" => &[
      "Língua Portuguesa", "Língua Inglesa", "Matemática", "Física", "Química", "Biologia",
      "História", "Geografia", "Artes", "Sociologia", "Filosofia", "Educação Física",
    ],
    "Ensino Superior" => &[
      "Administração", "Direito", "Pedagogia", "Engenharia", "Saúde", "Tecnologia", "Geral",
    ],
    _ => &[],
  }
}

/// School years (or semesters) offered for a given education level.
pub fn years_for_level(level: &str) -> &'static [&'static str] {
  match level {
    "Ensino Fundamental 1" => &["1º Ano", "2º Ano", "3º Ano", "4º Ano", "5º Ano"],
    "Ensino Fundamental 2" => &["6º Ano", "7º Ano", "8º Ano", "9º Ano"],
    "Ensino Médio" => &["1º Ano", "2º Ano", "3º Ano"],
    "Ensino Superior" => &[
      "1º Semestre", "2º Semestre", "3º Semestre", "4º Semestre", "5º Semestre", "6º Semestre",
      "7º Semestre", "8º Semestre", "Geral",
    ],
    _ => &[],
  }
}
