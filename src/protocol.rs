//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{
    subjects_for_level, years_for_level, BIMESTERS, EDUCATION_LEVELS, GAME_TYPES,
};
use crate::domain::{CanvasDocument, GenerateParams, RecordStatus, ScriptRecord};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Hello {
        #[serde(rename = "userId")]
        user_id: String,
    },
    OpenScript {
        #[serde(rename = "scriptId")]
        script_id: String,
    },
    Generate(GenerateIn),
    EditField {
        path: String,
        value: String,
    },
    EditElement {
        collection: String,
        index: usize,
        field: String,
        value: serde_json::Value,
    },
    Save,
    WatchScripts,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Script {
        script: ScriptOut,
        dirty: bool,
    },
    Edited {
        dirty: bool,
    },
    Saved {
        script: ScriptOut,
    },
    Scripts {
        scripts: Vec<ScriptOut>,
    },
    Error {
        code: String,
        message: String,
    },
}

/// DTO used by both WS and HTTP for script delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOut {
    pub id: String,
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
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Element count recovered from the stored mechanic; the editing form
    /// restores its level slider from this. Absent for rule sheets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_levels: Option<u32>,
}

/// Convert full `ScriptRecord` (internal) to the public DTO.
pub fn to_out(r: &ScriptRecord) -> ScriptOut {
    ScriptOut {
        id: r.id.clone().unwrap_or_default(),
        title: r.title.clone(),
        subject: r.subject.clone(),
        level: r.level.clone(),
        year: r.year.clone(),
        bimester: r.bimester.clone(),
        game_type: r.game_type.clone(),
        include_quiz: r.include_quiz,
        questions_count: r.questions_count,
        idea_text: r.idea_text.clone(),
        generated_content: r.generated_content.clone(),
        status: r.status,
        created_at: r.created_at,
        last_modified: r.last_modified,
        amount_levels: r.generated_content.mechanic.level_count_hint(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub level: String,
    pub subject: String,
    pub year: String,
    pub bimester: String,
    #[serde(rename = "gameType")]
    pub game_type: String,
    #[serde(rename = "ideaText")]
    pub idea_text: Option<String>,
    #[serde(rename = "includeQuiz")]
    pub include_quiz: Option<bool>,
    #[serde(rename = "questionsCount")]
    pub questions_count: Option<u32>,
    #[serde(rename = "amountLevels")]
    pub amount_levels: Option<u32>,
    /// Present when regenerating an existing script in place.
    #[serde(rename = "scriptId")]
    pub script_id: Option<String>,
}

impl GenerateIn {
    pub fn to_params(&self) -> GenerateParams {
        GenerateParams {
            level: self.level.clone(),
            subject: self.subject.clone(),
            year: self.year.clone(),
            bimester: self.bimester.clone(),
            game_type: self.game_type.clone(),
            idea_text: self.idea_text.clone().unwrap_or_default(),
            include_quiz: self.include_quiz.unwrap_or(false),
            questions_count: questions_or_default(self.questions_count),
            amount_levels: self.amount_levels,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveIn {
    pub content: CanvasDocument,
}

#[derive(Debug, Deserialize)]
pub struct QuizIn {
    #[serde(rename = "questionsCount")]
    pub questions_count: Option<u32>,
}

impl QuizIn {
    pub fn count(&self) -> u32 {
        questions_or_default(self.questions_count)
    }
}

/// A missing or zero question count falls back to five.
fn questions_or_default(n: Option<u32>) -> u32 {
    match n {
        None | Some(0) => 5,
        Some(n) => n,
    }
}

#[derive(Serialize)]
pub struct CatalogOut {
    pub levels: Vec<LevelOut>,
    #[serde(rename = "gameTypes")]
    pub game_types: Vec<&'static str>,
    pub bimesters: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct LevelOut {
    pub name: &'static str,
    pub subjects: Vec<&'static str>,
    pub years: Vec<&'static str>,
}

/// The full selection catalog the creation form is built from.
pub fn catalog_out() -> CatalogOut {
    CatalogOut {
        levels: EDUCATION_LEVELS
            .iter()
            .copied()
            .map(|name| LevelOut {
                name,
                subjects: subjects_for_level(name).to_vec(),
                years: years_for_level(name).to_vec(),
            })
            .collect(),
        game_types: GAME_TYPES.to_vec(),
        bimesters: BIMESTERS.to_vec(),
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
