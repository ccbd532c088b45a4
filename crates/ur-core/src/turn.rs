//! Per-turn bookkeeping.

use crate::board::SpaceIndex;
use crate::legal::LegalMoves;
use crate::player::{PieceId, Player};
use serde::{Deserialize, Serialize};

/// Everything that happens during one player's turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Player acting this turn
    pub player: Player,
    /// Turn counter, starting at 1 and increasing by one per turn
    pub number: u32,
    /// Dice total, once thrown
    pub roll: Option<u8>,
    /// Moves available for this roll
    pub legal_moves: LegalMoves,
    /// The moved piece landed on a rosette
    pub rosette: bool,
    /// The moved piece knocked out an opponent
    pub knockout: bool,
    /// The moved piece reached the finish bucket
    pub scored: bool,
    /// The roll left the player with nothing to move
    pub no_legal_moves: bool,
    /// Piece being moved
    pub moving: Option<PieceId>,
    pub start_space: Option<SpaceIndex>,
    pub end_space: Option<SpaceIndex>,
    /// Opponent piece sent home by this turn's move
    pub knocked_out: Option<PieceId>,
}

impl Turn {
    pub fn new(player: Player, number: u32) -> Self {
        Self {
            player,
            number,
            roll: None,
            legal_moves: LegalMoves::new(),
            rosette: false,
            knockout: false,
            scored: false,
            no_legal_moves: false,
            moving: None,
            start_space: None,
            end_space: None,
            knocked_out: None,
        }
    }

    /// The opponent's turn that normally comes next
    pub fn following(&self) -> Self {
        Self::new(self.player.opponent(), self.number + 1)
    }

    /// An extra turn for the same player
    pub fn repeat(&self) -> Self {
        Self::new(self.player, self.number + 1)
    }

    /// Drag-and-drop scope for this turn's moves
    pub fn scope(&self) -> u32 {
        self.number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_following_alternates_players() {
        let turn = Turn::new(Player::One, 1);
        let next = turn.following();
        assert_eq!(next.player, Player::Two);
        assert_eq!(next.number, 2);
        assert_eq!(next.following().player, Player::One);
    }

    #[test]
    fn test_repeat_keeps_player() {
        let mut turn = Turn::new(Player::Two, 5);
        turn.rosette = true;
        let bonus = turn.repeat();
        assert_eq!(bonus.player, Player::Two);
        assert_eq!(bonus.number, 6);
        assert!(!bonus.rosette);
    }
}
