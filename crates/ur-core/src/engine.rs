//! The transition loop.
//!
//! [`Engine::dispatch`] validates an action against the current state, runs
//! its effect, enters the destination state, and keeps going for as long as
//! the new state is ephemeral. Only one chain runs at a time: the engine is
//! driven through `&mut self`, so a caller cannot start a second dispatch
//! while one is in progress.

use crate::actions::{GameAction, ViewCommand};
use crate::game::{Game, GameError};
use crate::machine::{kind_of, transition, GameState, NextStep, StateKind};
use crate::options::GameOptions;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

/// Transitions remembered for diagnostics
pub const HISTORY_LIMIT: usize = 64;

/// Default wait before an automatic pass
pub const DEFAULT_AUTO_PASS_DELAY: Duration = Duration::from_millis(1000);

/// One edge taken by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: GameState,
    pub action: GameAction,
    pub to: GameState,
}

/// An automatic action to run after a delay.
///
/// `generation` is the engine generation when it was scheduled; if anything
/// has happened since, the action is stale and should be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deferred {
    pub action: GameAction,
    pub delay_ms: u64,
    pub generation: u64,
}

impl Deferred {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Result of one dispatch chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// View commands, in the order the effects produced them
    pub commands: Vec<ViewCommand>,
    /// Every edge taken
    pub transitions: Vec<Transition>,
    /// State the engine came to rest in
    pub state: GameState,
    /// Automatic action to run later, if the resting state asked for one
    pub deferred: Option<Deferred>,
}

/// Engine timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub auto_pass_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_pass_delay: DEFAULT_AUTO_PASS_DELAY,
        }
    }
}

/// Owns the model and the current state of the turn machine
#[derive(Debug, Clone)]
pub struct Engine {
    game: Game,
    state: GameState,
    /// Bumped on every transition
    generation: u64,
    history: VecDeque<Transition>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(game: Game, config: EngineConfig) -> Self {
        Self {
            game,
            state: GameState::Initial,
            generation: 0,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            config,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Direct model access, for setting up positions and scripting dice
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Most recent transitions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Transition> {
        self.history.iter()
    }

    /// Destination of `action` from the current state, or the error dispatching it would raise.
    pub fn check(&self, action: GameAction) -> Result<GameState, GameError> {
        transition(self.state, action).ok_or(GameError::InvalidTransition {
            state: self.state,
            action,
        })
    }

    /// Run `action` and every automatic action that follows it.
    ///
    /// On failure the engine stays in the last state it successfully entered.
    pub fn dispatch(
        &mut self,
        action: GameAction,
        options: &GameOptions,
    ) -> Result<Outcome, GameError> {
        let mut outcome = Outcome::default();
        let mut action = action;

        loop {
            let taken = self.step(action, &mut outcome.commands).map_err(|e| {
                warn!(state = %self.state, %action, "Transition failed: {}", e);
                e
            })?;
            outcome.transitions.push(taken);

            match self.next_step(options)? {
                NextStep::Wait => break,
                NextStep::Fire(next) => action = next,
                NextStep::Defer(next) => {
                    outcome.deferred = Some(Deferred {
                        action: next,
                        delay_ms: u64::try_from(self.config.auto_pass_delay.as_millis())
                            .unwrap_or(u64::MAX),
                        generation: self.generation,
                    });
                    break;
                }
            }
        }

        outcome.state = self.state;
        Ok(outcome)
    }

    /// Run a deferred action if nothing has happened since it was scheduled
    /// and the resting state still asks for it under the current options.
    ///
    /// Returns `Ok(None)` for a stale or withdrawn action.
    pub fn dispatch_deferred(
        &mut self,
        deferred: Deferred,
        options: &GameOptions,
    ) -> Result<Option<Outcome>, GameError> {
        if deferred.generation != self.generation {
            debug!(
                action = %deferred.action,
                scheduled = deferred.generation,
                current = self.generation,
                "Dropping stale deferred action"
            );
            return Ok(None);
        }
        // Options may have changed while the timer was pending
        if self.next_step(options)? != NextStep::Defer(deferred.action) {
            debug!(action = %deferred.action, state = %self.state, "Dropping withdrawn deferred action");
            return Ok(None);
        }
        self.dispatch(deferred.action, options).map(Some)
    }

    /// Take one edge: validate, run the effect, enter the destination.
    fn step(
        &mut self,
        action: GameAction,
        commands: &mut Vec<ViewCommand>,
    ) -> Result<Transition, GameError> {
        let from = self.state;
        let to = self.check(action)?;

        commands.extend(self.game.apply(action)?);

        self.state = to;
        self.generation += 1;

        let taken = Transition { from, action, to };
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(taken);

        debug!(%from, %action, %to, "Transition");
        Ok(taken)
    }

    /// Decide what follows entering the current state.
    pub fn next_step(&self, options: &GameOptions) -> Result<NextStep, GameError> {
        let step = match kind_of(self.state) {
            StateKind::Terminal => NextStep::Wait,
            StateKind::Unconditional(action) => NextStep::Fire(action),
            StateKind::Conditional { action, condition } => {
                if !condition.holds(&self.game, options)? {
                    NextStep::Wait
                } else if condition.is_deferred() {
                    NextStep::Defer(action)
                } else {
                    NextStep::Fire(action)
                }
            }
            StateKind::Junction(junction) => NextStep::Fire(junction.resolve(&self.game)?),
        };
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::TRANSITIONS;
    use crate::player::{PieceId, Player};

    fn engine() -> Engine {
        Engine::new(Game::with_default_names(5).unwrap(), EngineConfig::default())
    }

    fn manual() -> GameOptions {
        GameOptions::default()
    }

    #[test]
    fn test_initialize_stops_in_pregame() {
        let mut engine = engine();
        let outcome = engine.dispatch(GameAction::Initialize, &manual()).unwrap();
        assert_eq!(outcome.state, GameState::PreGame);
        assert_eq!(outcome.transitions.len(), 1);
    }

    #[test]
    fn test_start_game_chains_to_preroll() {
        let mut engine = engine();
        engine.dispatch(GameAction::Initialize, &manual()).unwrap();
        let outcome = engine.dispatch(GameAction::StartGame, &manual()).unwrap();

        let path: Vec<GameState> = outcome.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            path,
            vec![
                GameState::PlayersReady,
                GameState::TurnStart,
                GameState::PreRoll
            ]
        );
        assert_eq!(engine.state(), GameState::PreRoll);
        assert!(outcome.deferred.is_none());
    }

    #[test]
    fn test_invalid_action_leaves_state_untouched() {
        let mut engine = engine();
        engine.dispatch(GameAction::Initialize, &manual()).unwrap();
        let generation = engine.generation();

        let err = engine.dispatch(GameAction::ThrowDice, &manual()).unwrap_err();
        assert_eq!(
            err,
            GameError::InvalidTransition {
                state: GameState::PreGame,
                action: GameAction::ThrowDice
            }
        );
        assert!(err.to_string().contains("PreGame"));
        assert!(err.to_string().contains("ThrowDice"));
        assert_eq!(engine.state(), GameState::PreGame);
        assert_eq!(engine.generation(), generation);
    }

    #[test]
    fn test_check_matches_table_for_every_pair() {
        let mut engine = engine();
        for state in GameState::ALL {
            engine.state = state;
            for action in GameAction::ALL {
                let expected = TRANSITIONS
                    .iter()
                    .find(|(s, a, _)| *s == state && *a == action)
                    .map(|(_, _, to)| *to);
                assert_eq!(engine.check(action).ok(), expected, "{} / {}", state, action);
            }
        }
    }

    #[test]
    fn test_zero_roll_with_autopass_defers_pass() {
        let mut engine = engine();
        let options = GameOptions {
            autopass: true,
            autoroll: false,
        };
        engine.dispatch(GameAction::Initialize, &options).unwrap();
        engine.dispatch(GameAction::StartGame, &options).unwrap();

        engine.game_mut().dice.script([0]);
        let outcome = engine.dispatch(GameAction::ThrowDice, &options).unwrap();
        assert_eq!(outcome.state, GameState::EndTurn);

        let deferred = outcome.deferred.unwrap();
        assert_eq!(deferred.action, GameAction::PassTurn);
        assert_eq!(deferred.delay(), DEFAULT_AUTO_PASS_DELAY);

        let outcome = engine
            .dispatch_deferred(deferred, &options)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.state, GameState::PreRoll);
        assert_eq!(engine.game().turn().unwrap().player, Player::Two);
    }

    #[test]
    fn test_zero_roll_without_autopass_waits() {
        let mut engine = engine();
        engine.dispatch(GameAction::Initialize, &manual()).unwrap();
        engine.dispatch(GameAction::StartGame, &manual()).unwrap();

        engine.game_mut().dice.script([0]);
        let outcome = engine.dispatch(GameAction::ThrowDice, &manual()).unwrap();
        assert_eq!(outcome.state, GameState::EndTurn);
        assert!(outcome.deferred.is_none());
    }

    #[test]
    fn test_stale_deferred_is_dropped() {
        let mut engine = engine();
        let options = GameOptions {
            autopass: true,
            autoroll: false,
        };
        engine.dispatch(GameAction::Initialize, &options).unwrap();
        engine.dispatch(GameAction::StartGame, &options).unwrap();
        engine.game_mut().dice.script([0]);
        let deferred = engine
            .dispatch(GameAction::ThrowDice, &options)
            .unwrap()
            .deferred
            .unwrap();

        // The player clicks pass before the timer fires
        engine.dispatch(GameAction::PassTurn, &options).unwrap();
        assert_eq!(engine.dispatch_deferred(deferred, &options).unwrap(), None);
        assert_eq!(engine.game().turn().unwrap().number, 2);
    }

    #[test]
    fn test_deferred_pass_dropped_when_autopass_turned_off() {
        let mut engine = engine();
        let options = GameOptions {
            autopass: true,
            autoroll: false,
        };
        engine.dispatch(GameAction::Initialize, &options).unwrap();
        engine.dispatch(GameAction::StartGame, &options).unwrap();
        engine.game_mut().dice.script([0]);
        let deferred = engine
            .dispatch(GameAction::ThrowDice, &options)
            .unwrap()
            .deferred
            .unwrap();

        let options = GameOptions {
            autopass: false,
            autoroll: false,
        };
        assert_eq!(engine.dispatch_deferred(deferred, &options).unwrap(), None);
        assert_eq!(engine.state(), GameState::EndTurn);
        assert_eq!(engine.game().turn().unwrap().player, Player::One);
    }

    #[test]
    fn test_autoroll_continues_into_move_phase() {
        let mut engine = engine();
        let options = GameOptions {
            autopass: false,
            autoroll: true,
        };
        engine.dispatch(GameAction::Initialize, &options).unwrap();
        engine.game_mut().dice.script([2]);
        let outcome = engine.dispatch(GameAction::StartGame, &options).unwrap();
        assert_eq!(outcome.state, GameState::ReadyToMove);
        assert_eq!(engine.game().turn().unwrap().roll, Some(2));
    }

    #[test]
    fn test_mid_chain_failure_keeps_last_entered_state() {
        let mut engine = engine();
        engine.dispatch(GameAction::Initialize, &manual()).unwrap();
        engine.dispatch(GameAction::StartGame, &manual()).unwrap();
        engine.game_mut().dice.script([1]);
        engine.dispatch(GameAction::ThrowDice, &manual()).unwrap();
        assert_eq!(engine.state(), GameState::ReadyToMove);

        // Pretend a knockout happened without recording the victim
        let piece = PieceId::new(Player::One, 0);
        let target = engine.game().board.track(Player::One)[1];
        engine.game_mut().stage_move(piece, target).unwrap();
        engine.state = GameState::Moved;
        engine.game_mut().turn_mut().unwrap().knockout = true;

        let err = engine
            .dispatch(GameAction::KnockoutOpponent, &manual())
            .unwrap_err();
        assert_eq!(err, GameError::MissingKnockedPiece);
        assert_eq!(engine.state(), GameState::Moved);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut engine = engine();
        let options = GameOptions::default();
        engine.dispatch(GameAction::Initialize, &options).unwrap();
        engine.dispatch(GameAction::StartGame, &options).unwrap();

        for _ in 0..40 {
            engine.game_mut().dice.script([0]);
            engine.dispatch(GameAction::ThrowDice, &options).unwrap();
            engine.dispatch(GameAction::PassTurn, &options).unwrap();
        }
        assert_eq!(engine.history().count(), HISTORY_LIMIT);
        let last = engine.history().last().unwrap();
        assert_eq!(last.to, GameState::PreRoll);
    }
}
