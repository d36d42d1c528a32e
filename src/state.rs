//! Application state: the game engine and the session store.
//!
//! Sessions live behind a `SessionStore` capability so the boundary layer
//! can swap the backing (in-memory map here, something external in a
//! future deployment). Each session is wrapped in its own mutex; handlers
//! hold it across both agent calls so submissions against one session are
//! serialized while distinct sessions proceed in parallel. Nothing is
//! persisted across a process restart.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{info, instrument};

use crate::config::{load_agent_config_from_env, GameConfig};
use crate::engine::GameEngine;
use crate::evaluator::EvaluationAgent;
use crate::model::GameState;
use crate::openai::{LlmClient, OpenAI};
use crate::responder::TeenResponder;
use crate::scenarios::ScenarioStore;

pub type SharedSession = Arc<tokio::sync::Mutex<GameState>>;

/// Keyed session storage.
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Option<SharedSession>;
    fn put(&self, id: &str, state: GameState);
    fn delete(&self, id: &str) -> bool;
}

/// Default in-memory backing.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    fn put(&self, id: &str, state: GameState) {
        self.sessions
            .write()
            .unwrap()
            .insert(id.to_string(), Arc::new(tokio::sync::Mutex::new(state)));
    }

    fn delete(&self, id: &str) -> bool {
        self.sessions.write().unwrap().remove(id).is_some()
    }
}

pub struct AppState {
    pub engine: GameEngine,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Build state from env: prompts config, scenario store, game budgets,
    /// and the optional OpenAI client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let prompts = load_agent_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();
        let game_config = GameConfig::from_env();
        let store = ScenarioStore::from_env();

        let openai = OpenAI::from_env();
        let (client, eval_model, teen_model): (Option<Arc<dyn LlmClient>>, String, String) =
            match openai {
                Some(oa) => {
                    info!(target: "eduparent_backend", base_url = %oa.base_url,
                        eval_model = %oa.eval_model, teen_model = %oa.teen_model, "OpenAI enabled.");
                    let eval_model = oa.eval_model.clone();
                    let teen_model = oa.teen_model.clone();
                    (Some(Arc::new(oa)), eval_model, teen_model)
                }
                None => {
                    info!(target: "eduparent_backend",
                        "OpenAI disabled (no OPENAI_API_KEY). Agents serve deterministic fallbacks.");
                    (None, "gpt-4o-mini".into(), "gpt-4o-mini".into())
                }
            };

        let engine = GameEngine::new(
            EvaluationAgent::new(client.clone(), eval_model),
            TeenResponder::new(client, teen_model),
            store,
            prompts,
            game_config,
        );

        Self {
            engine,
            sessions: Arc::new(MemorySessionStore::default()),
        }
    }
}
