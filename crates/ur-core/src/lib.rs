//! Ur - rules engine for the Royal Game of Ur
//!
//! This crate provides the core game logic, including:
//! - Board topology with per-player tracks over a shared middle lane
//! - Pieces, dice, turns and scores
//! - Legal move computation for a dice roll
//! - The turn state machine and the effect of every action
//!
//! # Architecture
//!
//! The engine is platform-agnostic and never draws anything. Effects return
//! [`ViewCommand`]s for the host to carry out, and timed automatic actions come
//! back as [`Deferred`] values for the host to schedule. It can be compiled to:
//! - Native Rust, driven by the `ur-session` runtime
//! - WebAssembly, driven from JavaScript (`wasm` feature)
//!
//! # Modules
//!
//! - [`board`]: Spaces, buckets, and tracks
//! - [`player`]: Players, pieces, and scores
//! - [`dice`]: The four binary dice
//! - [`legal`]: Legal move computation
//! - [`turn`]: Per-turn bookkeeping
//! - [`machine`]: States, actions, and the transition table
//! - [`game`]: The model and action effects
//! - [`engine`]: The transition loop
//! - [`controller`]: Entry points for UI handlers
//! - [`options`]: Persisted option flags

pub mod actions;
pub mod board;
pub mod controller;
pub mod dice;
pub mod engine;
pub mod game;
pub mod legal;
pub mod machine;
pub mod options;
pub mod player;
pub mod turn;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{Button, GameAction, PieceMark, ViewCommand};
pub use board::{Board, Column, Space, SpaceFlags, SpaceId, SpaceIndex, Track, TRACK_LENGTH};
pub use controller::Controller;
pub use dice::Dice;
pub use engine::{Deferred, Engine, EngineConfig, Outcome, Transition};
pub use game::{Game, GameError, GameSnapshot};
pub use legal::{compute_legal_moves, LegalMove, LegalMoves};
pub use machine::{GameState, NextStep, StateKind};
pub use options::{GameOptions, MemoryStore, OptionStore, OPTIONS_KEY};
pub use player::{Piece, PieceId, Player, Score, PIECES_PER_PLAYER};
pub use turn::Turn;
