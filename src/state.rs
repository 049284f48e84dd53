//! Application state: the script store, the generation client, and prompts.
//!
//! Both backends are optional at the environment level. Without a Firestore
//! project the service falls back to the in-memory store; without a Gemini
//! key, generation endpoints answer 503 while reads and edits keep working.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{load_canvas_config_from_env, Prompts};
use crate::firestore::FirestoreStore;
use crate::gemini::{Gemini, TextGenerator};
use crate::store::{MemoryStore, ScriptStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScriptStore>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub prompts: Arc<Prompts>,
}

impl AppState {
    /// Build state from env: load config, pick the store, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_canvas_config_from_env().unwrap_or_default();

        let store: Arc<dyn ScriptStore> = match FirestoreStore::from_env() {
            Some(fs) => {
                info!(target: "educanvas_backend", "Firestore persistence enabled");
                Arc::new(fs)
            }
            None => {
                warn!(target: "educanvas_backend", "FIREBASE_PROJECT_ID not set; scripts are kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let generator: Option<Arc<dyn TextGenerator>> = match Gemini::from_env() {
            Some(gemini) => {
                info!(target: "educanvas_backend", base_url = %gemini.base_url, model = %gemini.model, "Gemini enabled.");
                Some(Arc::new(gemini))
            }
            None => {
                warn!(target: "educanvas_backend", "Gemini disabled (no GEMINI_API_KEY). Generation will answer 503.");
                None
            }
        };

        Self {
            store,
            generator,
            prompts: Arc::new(cfg.prompts),
        }
    }
}
