//! The four binary dice.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of tetrahedral dice thrown each turn
pub const DICE_COUNT: usize = 4;

/// Four dice, each showing 0 or 1. The roll is their sum, 0 to 4.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    values: [u8; DICE_COUNT],
    rolled: bool,
    /// Totals to hand out before falling back to the rng (replays, tests)
    #[serde(skip)]
    scripted: VecDeque<u8>,
}

impl Dice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Throw all four dice and return the total.
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u8 {
        self.values = match self.scripted.pop_front() {
            Some(total) => Self::faces_for(total),
            None => [0; DICE_COUNT].map(|_| rng.gen_range(0..=1)),
        };
        self.rolled = true;
        self.total()
    }

    /// Queue totals that the next rolls will produce, in order.
    ///
    /// Totals above 4 are clamped.
    pub fn script(&mut self, totals: impl IntoIterator<Item = u8>) {
        self.scripted
            .extend(totals.into_iter().map(|t| t.min(DICE_COUNT as u8)));
    }

    /// Scripted totals not yet consumed
    pub fn scripted_remaining(&self) -> usize {
        self.scripted.len()
    }

    pub fn total(&self) -> u8 {
        self.values.iter().sum()
    }

    pub fn values(&self) -> [u8; DICE_COUNT] {
        self.values
    }

    pub fn is_rolled(&self) -> bool {
        self.rolled
    }

    /// Forget the last throw. Scripted totals are kept.
    pub fn reset(&mut self) {
        self.values = [0; DICE_COUNT];
        self.rolled = false;
    }

    fn faces_for(total: u8) -> [u8; DICE_COUNT] {
        [0u8, 1, 2, 3].map(|i| u8::from(i < total))
    }
}
