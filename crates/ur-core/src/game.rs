//! The game model and the effect of every action on it.
//!
//! [`Game`] owns the board, the pieces, the dice, the scores, and the turn
//! records. [`Game::apply`] runs one action's effect: it mutates the model and
//! returns the view commands the presentation layer should carry out. Which
//! action may run when is the engine's business, not this module's.

use crate::actions::{Button, GameAction, PieceMark, ViewCommand};
use crate::board::{Board, BoardJson, SpaceId, SpaceIndex};
use crate::dice::Dice;
use crate::legal::compute_legal_moves;
use crate::machine::GameState;
use crate::player::{Piece, PieceId, Player, Score, PIECES_PER_PLAYER};
use crate::turn::Turn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the rules engine. None of them are recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Invalid transition: no edge from {state} on {action}")]
    InvalidTransition {
        state: GameState,
        action: GameAction,
    },

    #[error("Invalid space {id} ({flags}): {reason}")]
    InvalidSpace {
        id: String,
        flags: String,
        reason: String,
    },

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Unknown piece: {0}")]
    UnknownPiece(String),

    #[error("Unknown space: {0}")]
    UnknownSpace(String),

    #[error("{0} is a bucket; use the multi-occupant accessors")]
    BucketMisuse(String),

    #[error("{0} is not a bucket")]
    NotABucket(String),

    #[error("Knockout fired but no piece was knocked out this turn")]
    MissingKnockedPiece,

    #[error("{piece} cannot move to {space} this turn")]
    IllegalMove { piece: String, space: String },

    #[error("No move has been recorded for this turn")]
    NoMoveRecorded,

    #[error("No turn in progress")]
    NoActiveTurn,

    #[error("No winner has been decided")]
    NoWinner,

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Option storage failed: {0}")]
    Storage(String),
}

/// The complete mutable game model
#[derive(Debug, Clone)]
pub struct Game {
    /// Spaces and tracks
    pub board: Board,
    /// All fourteen pieces, player one's first
    pub pieces: Vec<Piece>,
    pub dice: Dice,
    pub score: Score,
    /// Display names, indexed by [`Player::index`]
    pub names: [String; 2],
    /// Turn being played
    pub current: Option<Turn>,
    /// Turn that `PassTurn` will promote
    pub next: Option<Turn>,
    pub winner: Option<Player>,
    rng: StdRng,
    seed: u64,
}

impl Game {
    /// Create a game with a random dice seed
    pub fn new(names: [String; 2]) -> Result<Self, GameError> {
        let seed = rand::thread_rng().gen();
        Self::with_seed(names, seed)
    }

    /// Create a game whose dice follow `seed` (for deterministic replays)
    pub fn with_seed(names: [String; 2], seed: u64) -> Result<Self, GameError> {
        let mut game = Self {
            board: Board::standard()?,
            pieces: Vec::with_capacity(2 * usize::from(PIECES_PER_PLAYER)),
            dice: Dice::new(),
            score: Score::new(),
            names,
            current: None,
            next: None,
            winner: None,
            rng: StdRng::seed_from_u64(seed),
            seed,
        };
        game.reset()?;
        Ok(game)
    }

    /// Two players called "Player 1" and "Player 2"
    pub fn with_default_names(seed: u64) -> Result<Self, GameError> {
        Self::with_seed(
            [Player::One.to_string(), Player::Two.to_string()],
            seed,
        )
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Put every piece back in its start bucket and forget all turns
    fn reset(&mut self) -> Result<(), GameError> {
        self.board.clear_occupants();
        self.pieces.clear();

        for player in Player::ALL {
            let start = self.board.start_bucket(player);
            for id in PieceId::all_for(player) {
                self.board.space_mut(start).insert_occupant(id)?;
                self.pieces.push(Piece::new(id, start));
            }
        }

        self.score = Score::new();
        self.dice.reset();
        self.current = None;
        self.next = None;
        self.winner = None;
        Ok(())
    }

    pub fn piece(&self, id: PieceId) -> Result<&Piece, GameError> {
        self.pieces
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::UnknownPiece(id.to_string()))
    }

    fn piece_mut(&mut self, id: PieceId) -> Result<&mut Piece, GameError> {
        self.pieces
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::UnknownPiece(id.to_string()))
    }

    pub fn pieces_of(&self, player: Player) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.iter().filter(move |p| p.owner() == player)
    }

    /// Track index a piece is standing on
    pub fn position(&self, id: PieceId) -> Result<u8, GameError> {
        Ok(self.board.space(self.piece(id)?.location).distance())
    }

    pub fn turn(&self) -> Result<&Turn, GameError> {
        self.current.as_ref().ok_or(GameError::NoActiveTurn)
    }

    pub fn turn_mut(&mut self) -> Result<&mut Turn, GameError> {
        self.current.as_mut().ok_or(GameError::NoActiveTurn)
    }

    pub fn name(&self, player: Player) -> &str {
        &self.names[player.index()]
    }

    fn space_id(&self, index: SpaceIndex) -> SpaceId {
        self.board.space(index).id()
    }

    /// True when all of `player`'s pieces sit in their finish bucket
    pub fn all_finished(&self, player: Player) -> bool {
        let finish = self.board.finish_bucket(player);
        self.pieces_of(player)
            .filter(|p| p.location == finish)
            .count()
            == usize::from(PIECES_PER_PLAYER)
    }

    /// Put a piece straight onto a track position, ignoring the rules.
    ///
    /// Used to set up positions. The target must be a bucket or empty.
    pub fn place_piece(&mut self, id: PieceId, distance: u8) -> Result<(), GameError> {
        let target = *self
            .board
            .track(id.owner)
            .get(usize::from(distance))
            .ok_or_else(|| GameError::InvalidId(format!("track index {}", distance)))?;

        let space = self.board.space(target);
        if !space.is_bucket() && space.occupant()?.is_some_and(|other| other != id) {
            return Err(self.illegal(id, target));
        }

        let from = self.piece(id)?.location;
        self.board.space_mut(from).vacate(id);
        self.board.space_mut(target).place(id)?;
        self.piece_mut(id)?.location = target;
        Ok(())
    }

    /// Record the piece dropped by the player and where, ahead of `MovePiece`.
    pub fn stage_move(&mut self, piece: PieceId, destination: SpaceIndex) -> Result<(), GameError> {
        let is_legal = self
            .turn()?
            .legal_moves
            .get(&piece)
            .is_some_and(|m| m.destination == destination);
        if !is_legal {
            return Err(self.illegal(piece, destination));
        }

        let start = self.piece(piece)?.location;
        let turn = self.turn_mut()?;
        turn.moving = Some(piece);
        turn.start_space = Some(start);
        turn.end_space = Some(destination);
        Ok(())
    }

    fn illegal(&self, piece: PieceId, destination: SpaceIndex) -> GameError {
        GameError::IllegalMove {
            piece: piece.to_string(),
            space: self.space_id(destination).to_string(),
        }
    }

    /// Neutral marks for all of a player's pieces
    fn neutral_marks(&self, player: Player) -> Vec<ViewCommand> {
        self.pieces_of(player)
            .map(|p| ViewCommand::MarkPiece {
                piece: p.id,
                mark: PieceMark::Neutral,
            })
            .collect()
    }

    /// Renderer-friendly copy of the whole model
    pub fn snapshot(&self, state: GameState) -> GameSnapshot {
        GameSnapshot {
            state,
            board: self.board.to_json_friendly(),
            turn: self.current.clone(),
            scores: self.score.as_array(),
            dice: self.dice.values(),
            names: self.names.clone(),
            winner: self.winner,
        }
    }

    /// Run the effect of `action`.
    ///
    /// Effects are not transactional: on error the model may be partly updated.
    /// Each effect checks what it needs before it starts mutating.
    pub fn apply(&mut self, action: GameAction) -> Result<Vec<ViewCommand>, GameError> {
        match action {
            GameAction::Initialize => Ok(vec![
                button(Button::Roller, false),
                button(Button::Passer, false),
                button(Button::Starter, true),
            ]),
            GameAction::StartGame | GameAction::NewGame => {
                Ok(vec![button(Button::Starter, false)])
            }
            GameAction::SetupGame => self.setup_game(),
            GameAction::StartingTurn => self.starting_turn(),
            GameAction::ThrowDice => self.throw_dice(),
            GameAction::EnableLegalMoves => self.enable_legal_moves(),
            GameAction::MovesAvailable | GameAction::MoveFinished => Ok(Vec::new()),
            GameAction::TurnEnding => self.turn_ending(),
            GameAction::MovePiece => self.move_piece(),
            GameAction::FreezeBoard => self.freeze_board(),
            GameAction::RosetteBonus => self.rosette_bonus(),
            GameAction::KnockoutOpponent => self.knockout_opponent(),
            GameAction::PieceScored => self.piece_scored(),
            GameAction::AllFinished => self.all_pieces_finished(),
            GameAction::ShowWinner => self.show_winner(),
            GameAction::PassTurn => self.pass_turn(),
        }
    }

    // ==================== Effects ====================

    fn setup_game(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        self.reset()?;

        let first = Turn::new(Player::One, 1);
        self.next = Some(first.following());
        self.current = Some(first);

        let mut commands: Vec<ViewCommand> = self
            .pieces
            .iter()
            .map(|p| ViewCommand::PlacePiece {
                piece: p.id,
                space: self.space_id(p.location),
            })
            .collect();
        commands.extend(Player::ALL.map(|player| ViewCommand::ShowScore { player, score: 0 }));
        Ok(commands)
    }

    fn starting_turn(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let player = self.turn()?.player;
        Ok(vec![
            ViewCommand::ShowTurn {
                player,
                name: self.name(player).to_string(),
            },
            button(Button::Roller, true),
            button(Button::Passer, false),
        ])
    }

    fn throw_dice(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        self.turn()?;
        let total = self.dice.roll(&mut self.rng);
        self.turn_mut()?.roll = Some(total);

        Ok(vec![
            button(Button::Roller, false),
            ViewCommand::ShowRolling,
            ViewCommand::ShowDice {
                values: self.dice.values(),
                total,
            },
        ])
    }

    fn enable_legal_moves(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let turn = self.turn()?;
        let (player, roll, scope) = (turn.player, turn.roll.unwrap_or(0), turn.scope());

        let moves = compute_legal_moves(roll, player, &self.pieces, &self.board);

        let mut commands = Vec::new();
        for piece in self.pieces_of(player) {
            match moves.get(&piece.id) {
                Some(legal) => {
                    commands.push(ViewCommand::MarkPiece {
                        piece: piece.id,
                        mark: PieceMark::Legal,
                    });
                    commands.push(ViewCommand::EnableDrag {
                        scope,
                        piece: piece.id,
                        destination: self.space_id(legal.destination),
                    });
                }
                None => commands.push(ViewCommand::MarkPiece {
                    piece: piece.id,
                    mark: PieceMark::NoLegalMove,
                }),
            }
        }

        let turn = self.turn_mut()?;
        turn.no_legal_moves = moves.is_empty();
        turn.legal_moves = moves;
        Ok(commands)
    }

    fn turn_ending(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let turn = self.turn()?;
        let (player, scope) = (turn.player, turn.scope());

        let mut commands = vec![ViewCommand::ClearDrag { scope }];
        commands.extend(self.neutral_marks(player));
        commands.push(button(Button::Passer, true));
        Ok(commands)
    }

    fn move_piece(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let turn = self.turn()?;
        let mover = turn.moving.ok_or(GameError::NoMoveRecorded)?;
        let end = turn.end_space.ok_or(GameError::NoMoveRecorded)?;
        let is_legal = turn
            .legal_moves
            .get(&mover)
            .is_some_and(|m| m.destination == end);
        if !is_legal {
            return Err(self.illegal(mover, end));
        }

        let start = self.piece(mover)?.location;
        let destination = self.board.space(end);
        let victim = if destination.is_bucket() {
            None
        } else {
            destination.occupant()?
        };
        if victim.is_some_and(|v| v.owner == mover.owner) {
            return Err(self.illegal(mover, end));
        }
        let rosette = destination.is_rosette();
        let scored = destination.is_finish();

        self.board.space_mut(start).vacate(mover);
        self.board.space_mut(end).place(mover)?;
        self.piece_mut(mover)?.location = end;

        if let Some(victim) = victim {
            let home = self.board.start_bucket(victim.owner);
            self.board.space_mut(home).insert_occupant(victim)?;
            self.piece_mut(victim)?.location = home;
        }

        let turn = self.turn_mut()?;
        turn.start_space = Some(start);
        turn.knocked_out = victim;
        turn.knockout = victim.is_some();
        turn.rosette = rosette;
        turn.scored = scored;

        Ok(vec![ViewCommand::PlacePiece {
            piece: mover,
            space: self.space_id(end),
        }])
    }

    fn freeze_board(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let turn = self.turn()?;
        let (player, scope) = (turn.player, turn.scope());

        let mut commands = vec![ViewCommand::ClearDrag { scope }];
        commands.extend(self.neutral_marks(player));
        Ok(commands)
    }

    fn rosette_bonus(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let bonus = self.turn()?.repeat();
        self.next = Some(bonus);
        Ok(Vec::new())
    }

    fn knockout_opponent(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let turn = self.turn()?;
        let victim = turn.knocked_out.ok_or(GameError::MissingKnockedPiece)?;
        let from = turn.end_space.ok_or(GameError::NoMoveRecorded)?;
        let home = self.piece(victim)?.location;

        Ok(vec![ViewCommand::AnimateMove {
            piece: victim,
            from: self.space_id(from),
            to: self.space_id(home),
        }])
    }

    fn piece_scored(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let player = self.turn()?.player;
        let score = self.score.increment(player);
        Ok(vec![ViewCommand::ShowScore { player, score }])
    }

    fn all_pieces_finished(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        self.winner = Some(self.turn()?.player);
        Ok(Vec::new())
    }

    fn show_winner(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let winner = self.winner.ok_or(GameError::NoWinner)?;
        Ok(vec![
            ViewCommand::ShowWinner {
                player: winner,
                name: self.name(winner).to_string(),
            },
            button(Button::Roller, false),
            button(Button::Passer, false),
            button(Button::Starter, true),
        ])
    }

    fn pass_turn(&mut self) -> Result<Vec<ViewCommand>, GameError> {
        let next = self.next.take().ok_or(GameError::NoActiveTurn)?;
        self.next = Some(next.following());
        self.current = Some(next);
        Ok(vec![button(Button::Passer, false)])
    }
}

fn button(button: Button, enabled: bool) -> ViewCommand {
    ViewCommand::SetButton { button, enabled }
}

/// Serializable view of the whole model, for renderers and host bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub state: GameState,
    pub board: BoardJson,
    pub turn: Option<Turn>,
    pub scores: [u32; 2],
    pub dice: [u8; 4],
    pub names: [String; 2],
    pub winner: Option<Player>,
}
