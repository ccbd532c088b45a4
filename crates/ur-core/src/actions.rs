//! Game actions and the view commands they produce.
//!
//! Actions label the edges of the turn state machine. Running an action's
//! effect mutates the model and yields [`ViewCommand`]s for whatever is
//! presenting the game to carry out.

use crate::board::SpaceId;
use crate::player::{PieceId, Player};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every edge label in the turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Game lifecycle ====================
    /// Bring the controls to their pre-game state
    Initialize,
    /// The start button was pressed
    StartGame,
    /// Reset the board and build the first turn
    SetupGame,

    // ==================== Turn ====================
    /// Announce the acting player
    StartingTurn,
    /// Throw the dice
    ThrowDice,
    /// Work out and expose this roll's legal moves
    EnableLegalMoves,
    /// Nothing more to do this turn
    TurnEnding,
    /// At least one piece can move
    MovesAvailable,
    /// A piece was dropped on a legal destination
    MovePiece,
    /// Stop accepting drags for this roll
    FreezeBoard,

    // ==================== Move resolution ====================
    /// Landed on a rosette: the same player goes again
    RosetteBonus,
    /// Sent an opponent piece back to its start
    KnockoutOpponent,
    /// An ordinary move with no side effects
    MoveFinished,
    /// A piece reached the finish bucket
    PieceScored,
    /// Hand the dice to whoever plays next
    PassTurn,

    // ==================== Game end ====================
    /// Every piece of the acting player is home
    AllFinished,
    ShowWinner,
    NewGame,
}

impl GameAction {
    pub const ALL: [GameAction; 18] = [
        GameAction::Initialize,
        GameAction::StartGame,
        GameAction::SetupGame,
        GameAction::StartingTurn,
        GameAction::ThrowDice,
        GameAction::EnableLegalMoves,
        GameAction::TurnEnding,
        GameAction::MovesAvailable,
        GameAction::MovePiece,
        GameAction::FreezeBoard,
        GameAction::RosetteBonus,
        GameAction::KnockoutOpponent,
        GameAction::MoveFinished,
        GameAction::PieceScored,
        GameAction::PassTurn,
        GameAction::AllFinished,
        GameAction::ShowWinner,
        GameAction::NewGame,
    ];
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Buttons the view exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    /// Throws the dice
    Roller,
    /// Ends the turn
    Passer,
    /// Starts a new game
    Starter,
}

/// Visual state of a piece during the move phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceMark {
    Legal,
    NoLegalMove,
    Neutral,
}

/// Instructions for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ViewCommand {
    /// Enable or disable a button
    SetButton { button: Button, enabled: bool },

    /// Show whose turn it is
    ShowTurn { player: Player, name: String },

    ShowScore { player: Player, score: u32 },

    ShowWinner { player: Player, name: String },

    /// Dice are being thrown
    ShowRolling,

    ShowDice { values: [u8; 4], total: u8 },

    /// Allow dragging `piece` onto `destination`; only valid while `scope` is current
    EnableDrag {
        scope: u32,
        piece: PieceId,
        destination: SpaceId,
    },

    /// Withdraw every drag enabled under `scope`
    ClearDrag { scope: u32 },

    MarkPiece { piece: PieceId, mark: PieceMark },

    /// Draw a piece on a space without animation
    PlacePiece { piece: PieceId, space: SpaceId },

    /// Animate a piece from one space to another; the caller should wait for it
    AnimateMove {
        piece: PieceId,
        from: SpaceId,
        to: SpaceId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Column;

    #[test]
    fn test_view_command_wire_format() {
        let command = ViewCommand::SetButton {
            button: Button::Roller,
            enabled: true,
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["type"], "SetButton");
        assert_eq!(json["payload"]["button"], "Roller");
        assert_eq!(json["payload"]["enabled"], true);
    }

    #[test]
    fn test_animate_move_round_trip() {
        let command = ViewCommand::AnimateMove {
            piece: PieceId::new(Player::Two, 3),
            from: SpaceId::new(Column::Middle, 7),
            to: SpaceId::new(Column::Player2, 0),
        };
        let text = serde_json::to_string(&command).unwrap();
        let back: ViewCommand = serde_json::from_str(&text).unwrap();
        assert_eq!(back, command);
    }

    #[test]
    fn test_action_display_uses_variant_name() {
        assert_eq!(GameAction::KnockoutOpponent.to_string(), "KnockoutOpponent");
    }
}
