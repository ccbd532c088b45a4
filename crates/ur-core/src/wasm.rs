//! WebAssembly bindings for the Ur engine.
//!
//! This module exposes a [`Controller`] to JavaScript through wasm-bindgen.
//! Every call that moves the game along returns the [`Outcome`] as JSON. When
//! an outcome carries a `deferred` action, the page should wait `delay_ms` and
//! hand it back through `fireDeferred`.
//!
//! Options are kept in memory here; the page persists them by saving the JSON
//! returned from `checkboxChanged` under its own storage key.

use wasm_bindgen::prelude::*;

use crate::controller::Controller;
use crate::engine::{Deferred, EngineConfig, Outcome};
use crate::game::{Game, GameError};
use crate::options::{GameOptions, MemoryStore};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn outcome_json(result: Result<Outcome, GameError>) -> Result<String, JsValue> {
    let outcome = result.map_err(js_error)?;
    serde_json::to_string(&outcome).map_err(js_error)
}

/// WASM-exposed game session
#[wasm_bindgen]
pub struct WasmGame {
    controller: Controller<MemoryStore>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a session from two player names and the saved options blob (may be empty)
    #[wasm_bindgen(constructor)]
    pub fn new(player_names_json: &str, options_json: &str) -> Result<WasmGame, JsValue> {
        let names: Vec<String> = serde_json::from_str(player_names_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid player names: {}", e)))?;
        let names: [String; 2] = names
            .try_into()
            .map_err(|_| JsValue::from_str("Exactly two player names are required"))?;

        let options = if options_json.trim().is_empty() {
            GameOptions::default()
        } else {
            GameOptions::from_json(options_json).map_err(js_error)?
        };
        let store = MemoryStore::with_options(options).map_err(js_error)?;

        let game = Game::new(names).map_err(js_error)?;
        Ok(WasmGame {
            controller: Controller::new(game, EngineConfig::default(), store),
        })
    }

    pub fn initialize(&mut self) -> Result<String, JsValue> {
        outcome_json(self.controller.initialize())
    }

    #[wasm_bindgen(js_name = startGame)]
    pub fn start_game(&mut self) -> Result<String, JsValue> {
        outcome_json(self.controller.start_game())
    }

    #[wasm_bindgen(js_name = newGame)]
    pub fn new_game(&mut self) -> Result<String, JsValue> {
        outcome_json(self.controller.new_game())
    }

    pub fn roll(&mut self) -> Result<String, JsValue> {
        outcome_json(self.controller.roll())
    }

    #[wasm_bindgen(js_name = passTurn)]
    pub fn pass_turn(&mut self) -> Result<String, JsValue> {
        outcome_json(self.controller.pass_turn())
    }

    #[wasm_bindgen(js_name = pieceMoved)]
    pub fn piece_moved(&mut self, piece: &str, space: &str) -> Result<String, JsValue> {
        outcome_json(self.controller.piece_moved(piece, space))
    }

    /// Returns the options blob to persist
    #[wasm_bindgen(js_name = checkboxChanged)]
    pub fn checkbox_changed(&mut self, name: &str, checked: bool) -> Result<String, JsValue> {
        let options = self
            .controller
            .checkbox_changed(name, checked)
            .map_err(js_error)?;
        options.to_json().map_err(js_error)
    }

    /// Run a deferred action; returns `"null"` when it has gone stale
    #[wasm_bindgen(js_name = fireDeferred)]
    pub fn fire_deferred(&mut self, deferred_json: &str) -> Result<String, JsValue> {
        let deferred: Deferred = serde_json::from_str(deferred_json).map_err(js_error)?;
        let outcome = self.controller.fire_deferred(deferred).map_err(js_error)?;
        serde_json::to_string(&outcome).map_err(js_error)
    }

    /// Get the whole model as JSON (for rendering)
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.controller.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Current state machine state, e.g. `"ReadyToMove"`
    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        self.controller.state().to_string()
    }
}
