//! The turn state machine as data.
//!
//! [`TRANSITIONS`] is the complete edge list. [`kind_of`] says, for each state,
//! whether the engine stops there and waits for input or moves on by itself:
//!
//! - `Terminal`: wait for an external trigger
//! - `Unconditional`: always fire one fixed action
//! - `Conditional`: fire a fixed action only while an option allows it,
//!   otherwise behave as terminal
//! - `Junction`: pick the next action from live game data

use crate::actions::GameAction;
use crate::game::{Game, GameError};
use crate::options::GameOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every vertex of the turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Initial,
    PreGame,
    PlayersReady,
    TurnStart,
    PreRoll,
    Rolled,
    PreMove,
    ReadyToMove,
    PieceDropped,
    Moved,
    PostMove,
    CheckScore,
    EndTurn,
    GameOver,
    PostGame,
}

impl GameState {
    pub const ALL: [GameState; 15] = [
        GameState::Initial,
        GameState::PreGame,
        GameState::PlayersReady,
        GameState::TurnStart,
        GameState::PreRoll,
        GameState::Rolled,
        GameState::PreMove,
        GameState::ReadyToMove,
        GameState::PieceDropped,
        GameState::Moved,
        GameState::PostMove,
        GameState::CheckScore,
        GameState::EndTurn,
        GameState::GameOver,
        GameState::PostGame,
    ];
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// (from, action, to) for every legal edge
pub const TRANSITIONS: &[(GameState, GameAction, GameState)] = &[
    (GameState::Initial, GameAction::Initialize, GameState::PreGame),
    (GameState::PreGame, GameAction::StartGame, GameState::PlayersReady),
    (GameState::PlayersReady, GameAction::SetupGame, GameState::TurnStart),
    (GameState::TurnStart, GameAction::StartingTurn, GameState::PreRoll),
    (GameState::PreRoll, GameAction::ThrowDice, GameState::Rolled),
    (GameState::Rolled, GameAction::EnableLegalMoves, GameState::PreMove),
    (GameState::PreMove, GameAction::TurnEnding, GameState::EndTurn),
    (GameState::PreMove, GameAction::MovesAvailable, GameState::ReadyToMove),
    (GameState::ReadyToMove, GameAction::MovePiece, GameState::PieceDropped),
    (GameState::PieceDropped, GameAction::FreezeBoard, GameState::Moved),
    (GameState::Moved, GameAction::RosetteBonus, GameState::PostMove),
    (GameState::Moved, GameAction::KnockoutOpponent, GameState::PostMove),
    (GameState::Moved, GameAction::MoveFinished, GameState::PostMove),
    (GameState::Moved, GameAction::PieceScored, GameState::CheckScore),
    (GameState::PostMove, GameAction::TurnEnding, GameState::EndTurn),
    (GameState::EndTurn, GameAction::PassTurn, GameState::TurnStart),
    (GameState::CheckScore, GameAction::TurnEnding, GameState::EndTurn),
    (GameState::CheckScore, GameAction::AllFinished, GameState::GameOver),
    (GameState::GameOver, GameAction::ShowWinner, GameState::PostGame),
    (GameState::PostGame, GameAction::NewGame, GameState::PlayersReady),
];

/// Destination of `action` from `from`, if that edge exists
pub fn transition(from: GameState, action: GameAction) -> Option<GameState> {
    TRANSITIONS
        .iter()
        .find(|(state, edge, _)| *state == from && *edge == action)
        .map(|(_, _, to)| *to)
}

/// Actions with an edge out of `state`
pub fn actions_from(state: GameState) -> impl Iterator<Item = GameAction> {
    TRANSITIONS
        .iter()
        .filter(move |(from, _, _)| *from == state)
        .map(|(_, action, _)| *action)
}

/// Option-driven predicates for conditional states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// `autoroll` is on
    AutoRoll,
    /// `autopass` is on and the turn had nothing to move
    AutoPassWithoutMoves,
}

impl Condition {
    pub fn holds(self, game: &Game, options: &GameOptions) -> Result<bool, GameError> {
        match self {
            Condition::AutoRoll => Ok(options.autoroll),
            Condition::AutoPassWithoutMoves => {
                Ok(options.autopass && game.turn()?.no_legal_moves)
            }
        }
    }

    /// Whether the action waits for a delay instead of firing in the same chain
    pub fn is_deferred(self) -> bool {
        matches!(self, Condition::AutoPassWithoutMoves)
    }
}

/// States whose next action depends on game data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Junction {
    PreMove,
    Moved,
    CheckScore,
}

impl Junction {
    /// Pick the outgoing action from the current turn.
    pub fn resolve(self, game: &Game) -> Result<GameAction, GameError> {
        let turn = game.turn()?;

        let action = match self {
            Junction::PreMove => {
                if turn.legal_moves.is_empty() {
                    GameAction::TurnEnding
                } else {
                    GameAction::MovesAvailable
                }
            }
            Junction::Moved => {
                if turn.rosette {
                    GameAction::RosetteBonus
                } else if turn.knockout {
                    GameAction::KnockoutOpponent
                } else if turn.scored {
                    GameAction::PieceScored
                } else {
                    GameAction::MoveFinished
                }
            }
            Junction::CheckScore => {
                if game.all_finished(turn.player) {
                    GameAction::AllFinished
                } else {
                    GameAction::TurnEnding
                }
            }
        };

        Ok(action)
    }
}

/// How the engine leaves a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    Terminal,
    Unconditional(GameAction),
    Conditional {
        action: GameAction,
        condition: Condition,
    },
    Junction(Junction),
}

impl StateKind {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StateKind::Terminal)
    }
}

/// Classification of every state
pub const fn kind_of(state: GameState) -> StateKind {
    match state {
        GameState::Initial
        | GameState::PreGame
        | GameState::ReadyToMove
        | GameState::PostGame => StateKind::Terminal,
        GameState::PlayersReady => StateKind::Unconditional(GameAction::SetupGame),
        GameState::TurnStart => StateKind::Unconditional(GameAction::StartingTurn),
        GameState::PreRoll => StateKind::Conditional {
            action: GameAction::ThrowDice,
            condition: Condition::AutoRoll,
        },
        GameState::Rolled => StateKind::Unconditional(GameAction::EnableLegalMoves),
        GameState::PreMove => StateKind::Junction(Junction::PreMove),
        GameState::PieceDropped => StateKind::Unconditional(GameAction::FreezeBoard),
        GameState::Moved => StateKind::Junction(Junction::Moved),
        GameState::PostMove => StateKind::Unconditional(GameAction::TurnEnding),
        GameState::CheckScore => StateKind::Junction(Junction::CheckScore),
        GameState::EndTurn => StateKind::Conditional {
            action: GameAction::PassTurn,
            condition: Condition::AutoPassWithoutMoves,
        },
        GameState::GameOver => StateKind::Unconditional(GameAction::ShowWinner),
    }
}

/// What the engine does after entering a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Stop and wait for input
    Wait,
    /// Run this action now, in the same chain
    Fire(GameAction),
    /// Run this action later, after the configured delay
    Defer(GameAction),
}
