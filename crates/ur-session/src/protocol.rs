//! Line protocol between a front end and the session.
//!
//! Each line is one JSON message, tagged like `{"type":"Roll"}` or
//! `{"type":"PieceMoved","payload":{"piece":"piece-p1-0","space":"space-p1-3"}}`.

use serde::{Deserialize, Serialize};
use ur_core::{GameOptions, GameSnapshot, GameState, ViewCommand};
use uuid::Uuid;

/// Messages sent from the front end to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// The roll button was pressed
    Roll,

    /// The pass button was pressed
    PassTurn,

    /// The start button was pressed before the first game
    StartGame,

    /// The start button was pressed after a game ended
    NewGame,

    /// A piece was dropped on a space
    PieceMoved { piece: String, space: String },

    /// A settings checkbox changed
    CheckboxChanged { name: String, checked: bool },

    /// Request the whole model
    Snapshot,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from the session to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// First message of every session
    Welcome { session_id: Uuid },

    /// Something to draw
    View { command: ViewCommand },

    /// The engine came to rest in this state
    State { state: GameState },

    /// Current option flags
    Options { options: GameOptions },

    /// The whole model
    Snapshot { snapshot: Box<GameSnapshot> },

    /// A request was refused
    Error { message: String },

    /// Pong response
    Pong,
}
