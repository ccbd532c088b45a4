//! Legal move computation.
//!
//! Given a roll, the acting player, and the pieces on the board, work out
//! where each piece could go. A piece's destination is fixed by its current
//! track position and the roll, so every piece has at most one legal move.

use crate::board::{Board, SpaceIndex, TRACK_LENGTH};
use crate::player::{Piece, PieceId, Player};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A piece that can move, and where it would land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalMove {
    pub piece: PieceId,
    pub destination: SpaceIndex,
    /// Track index of the destination
    pub distance: u8,
}

/// Legal moves for one roll, keyed by piece
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LegalMove>", into = "Vec<LegalMove>")]
pub struct LegalMoves(BTreeMap<PieceId, LegalMove>);

impl LegalMoves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, piece: &PieceId) -> Option<&LegalMove> {
        self.0.get(piece)
    }

    pub fn contains(&self, piece: &PieceId) -> bool {
        self.0.contains_key(piece)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LegalMove> {
        self.0.values()
    }

    fn insert(&mut self, legal: LegalMove) {
        self.0.insert(legal.piece, legal);
    }
}

impl From<Vec<LegalMove>> for LegalMoves {
    fn from(moves: Vec<LegalMove>) -> Self {
        Self(moves.into_iter().map(|m| (m.piece, m)).collect())
    }
}

impl From<LegalMoves> for Vec<LegalMove> {
    fn from(moves: LegalMoves) -> Self {
        moves.0.into_values().collect()
    }
}

/// Compute every legal move `player` has for `roll`.
///
/// Pieces belonging to the other player are ignored. A zero roll never has
/// a legal move. Overshooting the finish is illegal; landing exactly on it
/// always is legal. Otherwise the destination must be empty, or hold an
/// opponent's piece on a square that is not a rosette.
pub fn compute_legal_moves<'a>(
    roll: u8,
    player: Player,
    pieces: impl IntoIterator<Item = &'a Piece>,
    board: &Board,
) -> LegalMoves {
    let mut moves = LegalMoves::new();
    if roll == 0 {
        return moves;
    }

    let track = board.track(player);

    for piece in pieces.into_iter().filter(|p| p.owner() == player) {
        let Some(distance) = board.space(piece.location).distance().checked_add(roll) else {
            continue;
        };
        if usize::from(distance) >= TRACK_LENGTH {
            continue;
        }

        let destination = track[usize::from(distance)];
        let space = board.space(destination);

        let legal = if space.is_finish() {
            true
        } else {
            match space.occupant() {
                Ok(None) => true,
                Ok(Some(other)) if other.owner == player => false,
                Ok(Some(_)) => !space.is_rosette(),
                // Only the start bucket is left, and no roll lands there
                Err(_) => false,
            }
        };

        if legal {
            moves.insert(LegalMove {
                piece: piece.id,
                destination,
                distance,
            });
        }
    }

    moves
}
