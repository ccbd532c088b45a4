//! Entry points for the presentation layer.
//!
//! A [`Controller`] is one game session: it owns the engine, the options, and
//! the store the options persist to. UI handlers call its methods; each call
//! returns the resulting [`Outcome`] for the caller to present.

use crate::actions::GameAction;
use crate::board::SpaceId;
use crate::engine::{Deferred, Engine, EngineConfig, Outcome};
use crate::game::{Game, GameError, GameSnapshot};
use crate::machine::GameState;
use crate::options::{GameOptions, OptionStore};
use crate::player::PieceId;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Controller<S: OptionStore> {
    engine: Engine,
    options: GameOptions,
    store: S,
}

impl<S: OptionStore> Controller<S> {
    /// Create a session, loading options from `store`
    pub fn new(game: Game, config: EngineConfig, store: S) -> Self {
        let options = GameOptions::load(&store);
        debug!(?options, "Loaded options");
        Self {
            engine: Engine::new(game, config),
            options,
            store,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn options(&self) -> GameOptions {
        self.options
    }

    pub fn state(&self) -> GameState {
        self.engine.state()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.engine.game().snapshot(self.engine.state())
    }

    /// Bring a fresh session to the pre-game screen
    pub fn initialize(&mut self) -> Result<Outcome, GameError> {
        self.dispatch(GameAction::Initialize)
    }

    pub fn start_game(&mut self) -> Result<Outcome, GameError> {
        info!("Starting game");
        self.dispatch(GameAction::StartGame)
    }

    pub fn new_game(&mut self) -> Result<Outcome, GameError> {
        info!("Starting new game");
        self.dispatch(GameAction::NewGame)
    }

    pub fn roll(&mut self) -> Result<Outcome, GameError> {
        self.dispatch(GameAction::ThrowDice)
    }

    pub fn pass_turn(&mut self) -> Result<Outcome, GameError> {
        self.dispatch(GameAction::PassTurn)
    }

    /// A piece was dragged onto a space.
    ///
    /// Both ids are resolved against the model and the move must be one of
    /// this roll's legal moves. Nothing is recorded unless a move is
    /// currently allowed.
    pub fn piece_moved(&mut self, piece: &str, space: &str) -> Result<Outcome, GameError> {
        self.engine.check(GameAction::MovePiece)?;

        let piece: PieceId = piece.parse()?;
        let space: SpaceId = space.parse()?;

        let game = self.engine.game_mut();
        game.piece(piece)?;
        let destination = game.board.find(space)?;
        game.stage_move(piece, destination)?;

        debug!(%piece, %space, "Piece dropped");
        self.dispatch(GameAction::MovePiece)
    }

    /// A settings checkbox changed. The new options are saved immediately.
    pub fn checkbox_changed(&mut self, name: &str, checked: bool) -> Result<GameOptions, GameError> {
        self.options.set(name, checked)?;
        self.options.save(&mut self.store)?;
        info!(name, checked, "Option changed");
        Ok(self.options)
    }

    /// Run an automatic action whose delay has elapsed. `None` if it went stale
    /// or the options no longer call for it.
    pub fn fire_deferred(&mut self, deferred: Deferred) -> Result<Option<Outcome>, GameError> {
        self.engine.dispatch_deferred(deferred, &self.options)
    }

    pub fn dispatch(&mut self, action: GameAction) -> Result<Outcome, GameError> {
        self.engine.dispatch(action, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{MemoryStore, OPTIONS_KEY};
    use crate::player::Player;

    fn controller() -> Controller<MemoryStore> {
        let game = Game::with_default_names(3).unwrap();
        let mut controller = Controller::new(game, EngineConfig::default(), MemoryStore::new());
        controller.initialize().unwrap();
        controller.start_game().unwrap();
        controller
    }

    #[test]
    fn test_piece_moved_runs_a_move() {
        let mut controller = controller();
        controller.engine_mut().game_mut().dice.script([3]);
        assert_eq!(controller.roll().unwrap().state, GameState::ReadyToMove);

        let outcome = controller.piece_moved("piece-p1-2", "space-p1-3").unwrap();
        assert_eq!(outcome.state, GameState::EndTurn);
        assert_eq!(
            controller
                .engine()
                .game()
                .position(PieceId::new(Player::One, 2))
                .unwrap(),
            3
        );
    }

    #[test]
    fn test_piece_moved_rejects_bad_ids() {
        let mut controller = controller();
        controller.engine_mut().game_mut().dice.script([3]);
        controller.roll().unwrap();

        assert!(matches!(
            controller.piece_moved("piece-9", "space-p1-3"),
            Err(GameError::InvalidId(_))
        ));
        assert!(matches!(
            controller.piece_moved("piece-p1-2", "space-p1-2"),
            Err(GameError::IllegalMove { .. })
        ));
        assert_eq!(controller.state(), GameState::ReadyToMove);
    }

    #[test]
    fn test_piece_moved_before_roll_is_invalid_transition() {
        let mut controller = controller();
        let err = controller
            .piece_moved("piece-p1-0", "space-p1-1")
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidTransition { .. }));
        assert!(controller.engine().game().turn().unwrap().moving.is_none());
    }

    #[test]
    fn test_checkbox_persists_options() {
        let mut controller = controller();
        let options = controller.checkbox_changed("autoroll", true).unwrap();
        assert!(options.autoroll);
        assert_eq!(
            controller.store.load(OPTIONS_KEY).as_deref(),
            Some(r#"{"autopass":false,"autoroll":true}"#)
        );
        assert!(controller.checkbox_changed("sound", true).is_err());
    }

    #[test]
    fn test_options_loaded_from_store() {
        let store = MemoryStore::with_options(GameOptions {
            autopass: true,
            autoroll: true,
        })
        .unwrap();
        let game = Game::with_default_names(3).unwrap();
        let controller = Controller::new(game, EngineConfig::default(), store);
        assert!(controller.options().autopass);
        assert!(controller.options().autoroll);
    }
}
