use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Index step inside an ordered stack: towards the front for up/left.
    pub fn step(self, i: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        match self {
            Direction::Left | Direction::Up => (i + len - 1) % len,
            Direction::Right | Direction::Down => (i + 1) % len,
        }
    }
}

/// How the windows sharing one cell are arranged.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StackMode {
    #[default]
    Vertical,
    Horizontal,
    Tabs,
}

impl StackMode {
    /// Axis along which windows are laid out, `None` for tabs.
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            StackMode::Vertical => Some(Orientation::Vertical),
            StackMode::Horizontal => Some(Orientation::Horizontal),
            StackMode::Tabs => None,
        }
    }
}
