//! Board topology: spaces, buckets, and the two player tracks.
//!
//! This module contains:
//! - Space type flags and their validity rules
//! - Value-type space identifiers with a textual form
//! - Single-occupant spaces and multi-occupant buckets
//! - The board arena and each player's 16-slot track
//!
//! Both tracks hold indices into one arena of spaces. Indices 5 to 12 of
//! either track refer to the same eight middle-lane slots, which is the only
//! place where pieces of different players can meet.

use crate::game::GameError;
use crate::player::{PieceId, Player};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitOr, BitOrAssign, RangeInclusive};
use std::str::FromStr;

/// Number of slots in a player's track, start and finish buckets included
pub const TRACK_LENGTH: usize = 16;

/// Track index of the finish bucket
pub const FINISH_INDEX: u8 = 15;

/// Track indices that are rosettes
pub const ROSETTE_INDICES: [u8; 3] = [4, 8, 14];

/// Track indices of the shared middle lane
pub const MIDDLE_LANE: RangeInclusive<u8> = 5..=12;

/// Position of a space in the board arena
pub type SpaceIndex = usize;

/// A player's path from start bucket to finish bucket
pub type Track = [SpaceIndex; TRACK_LENGTH];

/// Bitmask describing what kind of space this is and who owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpaceFlags(u16);

impl SpaceFlags {
    pub const NONE: SpaceFlags = SpaceFlags(0);
    pub const PLAYER1: SpaceFlags = SpaceFlags(1 << 0);
    pub const PLAYER2: SpaceFlags = SpaceFlags(1 << 1);
    pub const ROSETTE: SpaceFlags = SpaceFlags(1 << 2);
    pub const ONRAMP: SpaceFlags = SpaceFlags(1 << 3);
    pub const OFFRAMP: SpaceFlags = SpaceFlags(1 << 4);
    pub const MIDDLE: SpaceFlags = SpaceFlags(1 << 5);
    pub const START: SpaceFlags = SpaceFlags(1 << 6);
    pub const FINISH: SpaceFlags = SpaceFlags(1 << 7);

    /// Location kinds; a valid space has exactly one of these
    const KINDS: [SpaceFlags; 5] = [
        SpaceFlags::ONRAMP,
        SpaceFlags::OFFRAMP,
        SpaceFlags::MIDDLE,
        SpaceFlags::START,
        SpaceFlags::FINISH,
    ];

    const NAMES: [(SpaceFlags, &'static str); 8] = [
        (SpaceFlags::PLAYER1, "PLAYER1"),
        (SpaceFlags::PLAYER2, "PLAYER2"),
        (SpaceFlags::ROSETTE, "ROSETTE"),
        (SpaceFlags::ONRAMP, "ONRAMP"),
        (SpaceFlags::OFFRAMP, "OFFRAMP"),
        (SpaceFlags::MIDDLE, "MIDDLE"),
        (SpaceFlags::START, "START"),
        (SpaceFlags::FINISH, "FINISH"),
    ];

    /// Raw bit pattern
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True if every bit of `other` is set
    pub const fn contains(self, other: SpaceFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set
    pub const fn intersects(self, other: SpaceFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// The owning player, if exactly one player bit is set
    pub fn player(self) -> Option<Player> {
        match (
            self.contains(SpaceFlags::PLAYER1),
            self.contains(SpaceFlags::PLAYER2),
        ) {
            (true, false) => Some(Player::One),
            (false, true) => Some(Player::Two),
            _ => None,
        }
    }

    pub fn is_rosette(self) -> bool {
        self.contains(SpaceFlags::ROSETTE)
    }

    /// Start and finish spaces hold any number of pieces
    pub fn is_bucket(self) -> bool {
        self.intersects(SpaceFlags::START | SpaceFlags::FINISH)
    }

    /// Check the flag combination, returning the violated rule on failure.
    pub fn validate(self) -> Result<(), &'static str> {
        let kinds = Self::KINDS.iter().filter(|k| self.contains(**k)).count();
        if kinds != 1 {
            return Err("exactly one of ONRAMP, OFFRAMP, MIDDLE, START, FINISH must be set");
        }

        if self.is_bucket() && self.is_rosette() {
            return Err("start and finish buckets cannot be rosettes");
        }

        let players = [SpaceFlags::PLAYER1, SpaceFlags::PLAYER2]
            .iter()
            .filter(|p| self.contains(**p))
            .count();
        if self.contains(SpaceFlags::MIDDLE) {
            if players != 0 {
                return Err("middle spaces cannot belong to a player");
            }
        } else if players != 1 {
            return Err("player-owned spaces need exactly one player bit");
        }

        Ok(())
    }
}

impl BitOr for SpaceFlags {
    type Output = SpaceFlags;

    fn bitor(self, rhs: SpaceFlags) -> SpaceFlags {
        SpaceFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for SpaceFlags {
    fn bitor_assign(&mut self, rhs: SpaceFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SpaceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Which column of the board a space sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    Player1,
    Player2,
    Middle,
}

impl Column {
    /// The private column of a player
    pub fn of(player: Player) -> Self {
        match player {
            Player::One => Column::Player1,
            Player::Two => Column::Player2,
        }
    }

    /// Owning player, `None` for the middle lane
    pub fn player(self) -> Option<Player> {
        match self {
            Column::Player1 => Some(Player::One),
            Column::Player2 => Some(Player::Two),
            Column::Middle => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Column::Player1 => "p1",
            Column::Player2 => "p2",
            Column::Middle => "mid",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "p1" => Some(Column::Player1),
            "p2" => Some(Column::Player2),
            "mid" => Some(Column::Middle),
            _ => None,
        }
    }
}

/// Identity of a space: its column and its distance from the start bucket.
///
/// Textual form is `space-<p1|p2|mid>-<distance>`, e.g. `space-mid-8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpaceId {
    pub column: Column,
    pub distance: u8,
}

impl SpaceId {
    pub fn new(column: Column, distance: u8) -> Self {
        Self { column, distance }
    }

    /// The space a player's track passes through at `distance`
    pub fn on_track(player: Player, distance: u8) -> Self {
        if MIDDLE_LANE.contains(&distance) {
            Self::new(Column::Middle, distance)
        } else {
            Self::new(Column::of(player), distance)
        }
    }

    fn is_well_formed(&self) -> bool {
        if usize::from(self.distance) >= TRACK_LENGTH {
            return false;
        }
        match self.column {
            Column::Middle => MIDDLE_LANE.contains(&self.distance),
            Column::Player1 | Column::Player2 => !MIDDLE_LANE.contains(&self.distance),
        }
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "space-{}-{}", self.column.tag(), self.distance)
    }
}

impl FromStr for SpaceId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GameError::InvalidId(s.to_string());
        let rest = s.strip_prefix("space-").ok_or_else(invalid)?;
        let (tag, distance) = rest.split_once('-').ok_or_else(invalid)?;
        let column = Column::from_tag(tag).ok_or_else(invalid)?;
        let distance: u8 = distance.parse().map_err(|_| invalid())?;

        let id = SpaceId::new(column, distance);
        if !id.is_well_formed() {
            return Err(invalid());
        }
        Ok(id)
    }
}

/// Who is standing on a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupancy {
    /// Ordinary square: at most one piece
    Single(Option<PieceId>),
    /// Start or finish bucket: any number of pieces
    Bucket(BTreeSet<PieceId>),
}

/// A single location on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    id: SpaceId,
    flags: SpaceFlags,
    occupancy: Occupancy,
}

impl Space {
    /// Create a space, rejecting flag combinations that cannot exist.
    pub fn new(id: SpaceId, flags: SpaceFlags) -> Result<Self, GameError> {
        let invalid = |reason: &str| GameError::InvalidSpace {
            id: id.to_string(),
            flags: flags.to_string(),
            reason: reason.to_string(),
        };

        flags.validate().map_err(invalid)?;
        if flags.player() != id.column.player() {
            return Err(invalid("player bit does not match the column"));
        }
        if flags.contains(SpaceFlags::START) && id.distance != 0 {
            return Err(invalid("start bucket must sit at distance 0"));
        }
        if flags.contains(SpaceFlags::FINISH) && id.distance != FINISH_INDEX {
            return Err(invalid("finish bucket must sit at distance 15"));
        }

        let occupancy = if flags.is_bucket() {
            Occupancy::Bucket(BTreeSet::new())
        } else {
            Occupancy::Single(None)
        };

        Ok(Self {
            id,
            flags,
            occupancy,
        })
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    pub fn flags(&self) -> SpaceFlags {
        self.flags
    }

    /// Distance from the start bucket; for middle spaces this is the same in both tracks
    pub fn distance(&self) -> u8 {
        self.id.distance
    }

    pub fn is_rosette(&self) -> bool {
        self.flags.is_rosette()
    }

    pub fn is_bucket(&self) -> bool {
        self.flags.is_bucket()
    }

    pub fn is_start(&self) -> bool {
        self.flags.contains(SpaceFlags::START)
    }

    pub fn is_finish(&self) -> bool {
        self.flags.contains(SpaceFlags::FINISH)
    }

    /// The single occupant. Fails on a bucket.
    pub fn occupant(&self) -> Result<Option<PieceId>, GameError> {
        match &self.occupancy {
            Occupancy::Single(piece) => Ok(*piece),
            Occupancy::Bucket(_) => Err(GameError::BucketMisuse(self.id.to_string())),
        }
    }

    /// Replace the single occupant, returning whoever was there. Fails on a bucket.
    pub fn set_occupant(&mut self, piece: PieceId) -> Result<Option<PieceId>, GameError> {
        match &mut self.occupancy {
            Occupancy::Single(slot) => Ok(slot.replace(piece)),
            Occupancy::Bucket(_) => Err(GameError::BucketMisuse(self.id.to_string())),
        }
    }

    /// Empty the space, returning whoever was there. Fails on a bucket.
    pub fn take_occupant(&mut self) -> Result<Option<PieceId>, GameError> {
        match &mut self.occupancy {
            Occupancy::Single(slot) => Ok(slot.take()),
            Occupancy::Bucket(_) => Err(GameError::BucketMisuse(self.id.to_string())),
        }
    }

    /// All pieces in a bucket. Fails on an ordinary space.
    pub fn occupants(&self) -> Result<&BTreeSet<PieceId>, GameError> {
        match &self.occupancy {
            Occupancy::Bucket(pieces) => Ok(pieces),
            Occupancy::Single(_) => Err(GameError::NotABucket(self.id.to_string())),
        }
    }

    /// Add a piece to a bucket. Fails on an ordinary space.
    pub fn insert_occupant(&mut self, piece: PieceId) -> Result<bool, GameError> {
        match &mut self.occupancy {
            Occupancy::Bucket(pieces) => Ok(pieces.insert(piece)),
            Occupancy::Single(_) => Err(GameError::NotABucket(self.id.to_string())),
        }
    }

    /// Take a piece out of a bucket. Fails on an ordinary space.
    pub fn remove_occupant(&mut self, piece: PieceId) -> Result<bool, GameError> {
        match &mut self.occupancy {
            Occupancy::Bucket(pieces) => Ok(pieces.remove(&piece)),
            Occupancy::Single(_) => Err(GameError::NotABucket(self.id.to_string())),
        }
    }

    /// Put a piece here whatever the space kind. Returns the displaced piece, if any.
    pub fn place(&mut self, piece: PieceId) -> Result<Option<PieceId>, GameError> {
        if self.is_bucket() {
            self.insert_occupant(piece)?;
            Ok(None)
        } else {
            self.set_occupant(piece)
        }
    }

    /// Remove a piece whatever the space kind. Returns whether it was here.
    pub fn vacate(&mut self, piece: PieceId) -> bool {
        match &mut self.occupancy {
            Occupancy::Bucket(pieces) => pieces.remove(&piece),
            Occupancy::Single(slot) if *slot == Some(piece) => {
                *slot = None;
                true
            }
            Occupancy::Single(_) => false,
        }
    }

    pub fn holds(&self, piece: PieceId) -> bool {
        match &self.occupancy {
            Occupancy::Bucket(pieces) => pieces.contains(&piece),
            Occupancy::Single(slot) => *slot == Some(piece),
        }
    }

    /// Every piece on this space, in id order
    pub fn pieces(&self) -> Vec<PieceId> {
        match &self.occupancy {
            Occupancy::Bucket(pieces) => pieces.iter().copied().collect(),
            Occupancy::Single(slot) => slot.iter().copied().collect(),
        }
    }

    fn clear(&mut self) {
        match &mut self.occupancy {
            Occupancy::Bucket(pieces) => pieces.clear(),
            Occupancy::Single(slot) => *slot = None,
        }
    }
}

/// The flags a standard board gives the space at `distance` in `column`
fn standard_flags(column: Column, distance: u8) -> SpaceFlags {
    let mut flags = match column {
        Column::Player1 => SpaceFlags::PLAYER1,
        Column::Player2 => SpaceFlags::PLAYER2,
        Column::Middle => SpaceFlags::NONE,
    };

    flags |= match distance {
        0 => SpaceFlags::START,
        1..=4 => SpaceFlags::ONRAMP,
        5..=12 => SpaceFlags::MIDDLE,
        13 | 14 => SpaceFlags::OFFRAMP,
        _ => SpaceFlags::FINISH,
    };

    if ROSETTE_INDICES.contains(&distance) {
        flags |= SpaceFlags::ROSETTE;
    }

    flags
}

/// The game board: an arena of spaces plus one track per player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    spaces: Vec<Space>,
    tracks: [Track; 2],
}

impl Board {
    /// The standard 20-square board with start and finish buckets per player.
    pub fn standard() -> Result<Self, GameError> {
        let mut spaces = Vec::with_capacity(24);

        for player in Player::ALL {
            let column = Column::of(player);
            for distance in 0..TRACK_LENGTH as u8 {
                if !MIDDLE_LANE.contains(&distance) {
                    spaces.push(Space::new(
                        SpaceId::new(column, distance),
                        standard_flags(column, distance),
                    )?);
                }
            }
        }

        for distance in MIDDLE_LANE {
            spaces.push(Space::new(
                SpaceId::new(Column::Middle, distance),
                standard_flags(Column::Middle, distance),
            )?);
        }

        Self::from_spaces(spaces)
    }

    /// Assemble a board from spaces, wiring up both tracks.
    ///
    /// Every space a track passes through must be present.
    pub fn from_spaces(spaces: Vec<Space>) -> Result<Self, GameError> {
        let mut board = Self {
            spaces,
            tracks: [[0; TRACK_LENGTH]; 2],
        };

        for player in Player::ALL {
            let mut track = [0; TRACK_LENGTH];
            for (distance, slot) in (0u8..).zip(track.iter_mut()) {
                *slot = board.find(SpaceId::on_track(player, distance))?;
            }
            board.tracks[player.index()] = track;
        }

        Ok(board)
    }

    /// Arena index of a space id
    pub fn find(&self, id: SpaceId) -> Result<SpaceIndex, GameError> {
        self.spaces
            .iter()
            .position(|space| space.id == id)
            .ok_or_else(|| GameError::UnknownSpace(id.to_string()))
    }

    /// Space by arena index. Indices come from this board's own tracks.
    pub fn space(&self, index: SpaceIndex) -> &Space {
        &self.spaces[index]
    }

    pub fn space_mut(&mut self, index: SpaceIndex) -> &mut Space {
        &mut self.spaces[index]
    }

    pub fn spaces(&self) -> impl Iterator<Item = &Space> {
        self.spaces.iter()
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    pub fn track(&self, player: Player) -> &Track {
        &self.tracks[player.index()]
    }

    pub fn start_bucket(&self, player: Player) -> SpaceIndex {
        self.track(player)[0]
    }

    pub fn finish_bucket(&self, player: Player) -> SpaceIndex {
        self.track(player)[usize::from(FINISH_INDEX)]
    }

    /// Remove every piece from every space
    pub fn clear_occupants(&mut self) {
        for space in &mut self.spaces {
            space.clear();
        }
    }

    /// Convert to a renderer-friendly form with string ids
    pub fn to_json_friendly(&self) -> BoardJson {
        let spaces = self
            .spaces
            .iter()
            .map(|space| SpaceJson {
                id: space.id.to_string(),
                flags: space.flags.bits(),
                rosette: space.is_rosette(),
                occupants: space.pieces().iter().map(ToString::to_string).collect(),
            })
            .collect();

        let track_ids = |player: Player| -> Vec<String> {
            self.track(player)
                .iter()
                .map(|&index| self.spaces[index].id.to_string())
                .collect()
        };

        BoardJson {
            spaces,
            tracks: [track_ids(Player::One), track_ids(Player::Two)],
        }
    }
}

/// Board snapshot with string ids, for renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardJson {
    pub spaces: Vec<SpaceJson>,
    pub tracks: [Vec<String>; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceJson {
    pub id: String,
    pub flags: u16,
    pub rosette: bool,
    pub occupants: Vec<String>,
}
