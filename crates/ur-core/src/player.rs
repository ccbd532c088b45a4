//! Players, pieces, and scores.

use crate::board::{SpaceFlags, SpaceIndex};
use crate::game::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pieces each player brings to the board
pub const PIECES_PER_PLAYER: u8 = 7;

/// One of the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Both players, in turn order
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    pub fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// The space flag marking this player's private squares
    pub fn flag(self) -> SpaceFlags {
        match self {
            Player::One => SpaceFlags::PLAYER1,
            Player::Two => SpaceFlags::PLAYER2,
        }
    }

    /// Zero-based index for per-player arrays
    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Player::One => "p1",
            Player::Two => "p2",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "p1" => Some(Player::One),
            "p2" => Some(Player::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "Player 1"),
            Player::Two => write!(f, "Player 2"),
        }
    }
}

/// Identity of a piece: owner plus sequence number 0-6.
///
/// Textual form is `piece-<p1|p2>-<seq>`, e.g. `piece-p2-4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId {
    pub owner: Player,
    pub seq: u8,
}

impl PieceId {
    pub fn new(owner: Player, seq: u8) -> Self {
        Self { owner, seq }
    }

    /// Every piece id a player owns
    pub fn all_for(owner: Player) -> impl Iterator<Item = PieceId> {
        (0..PIECES_PER_PLAYER).map(move |seq| PieceId::new(owner, seq))
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "piece-{}-{}", self.owner.tag(), self.seq)
    }
}

impl FromStr for PieceId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GameError::InvalidId(s.to_string());
        let rest = s.strip_prefix("piece-").ok_or_else(invalid)?;
        let (tag, seq) = rest.split_once('-').ok_or_else(invalid)?;
        let owner = Player::from_tag(tag).ok_or_else(invalid)?;
        let seq: u8 = seq.parse().map_err(|_| invalid())?;

        if seq >= PIECES_PER_PLAYER {
            return Err(invalid());
        }
        Ok(PieceId::new(owner, seq))
    }
}

/// A piece and where it currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub location: SpaceIndex,
}

impl Piece {
    pub fn new(id: PieceId, location: SpaceIndex) -> Self {
        Self { id, location }
    }

    pub fn owner(&self) -> Player {
        self.id.owner
    }
}

/// Pieces scored per player. Counts only go up until the next game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    counts: [u32; 2],
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player: Player) -> u32 {
        self.counts[player.index()]
    }

    /// Record one more scored piece, returning the new total
    pub fn increment(&mut self, player: Player) -> u32 {
        let count = &mut self.counts[player.index()];
        *count += 1;
        *count
    }

    pub fn as_array(&self) -> [u32; 2] {
        self.counts
    }
}
