use serde::{Deserialize, Serialize};

/// A board cell as it crosses the protocol: a piece letter, `"G"` for garbage, or `null`.
pub type Cell = Option<String>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Message {
    Rules,
    Start {
        /// Rows from the top of the field down.
        board: Vec<Vec<Cell>>,
        queue: Vec<String>,
        #[serde(default)]
        hold: Option<String>,
        #[serde(default)]
        combo: i32,
        #[serde(default)]
        back_to_back: bool,
        #[serde(default)]
        weights_name: Option<String>,
    },
    Stop,
    Suggest,
    Play {
        #[serde(rename = "move")]
        mv: Move,
    },
    NewPiece {
        piece: Piece,
    },
    Quit,

    Ready {
        name: String,
        version: String,
        author: String,
    },
    Suggestion {
        moves: Vec<Suggestion>,
        move_info: MoveInfo,
    },
    Error {
        code: String,
        reason: String,
    },

    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Piece {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Move {
    pub location: PieceLocation,
    pub spin: Spin,
}

/// A placement in protocol coordinates: x grows to the right, y grows upwards from the bottom
/// row, and (x, y) is the piece's rotation center.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PieceLocation {
    #[serde(rename = "type")]
    pub kind: Piece,
    pub orientation: Orientation,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub range: Range,
    #[serde(default, rename = "blockPositions")]
    pub block_positions: Vec<[i32; 2]>,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Range {
    pub x: Span,
    pub y: Span,
}

/// Inclusive bounds.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub from: i32,
    pub to: i32,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    North,
    South,
    East,
    West,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Spin {
    None,
    Mini,
    Full,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Suggestion {
    #[serde(rename = "move")]
    pub mv: Move,
    pub board: Vec<Vec<Cell>>,
    pub value: f64,
    pub action: String,
    pub next: Vec<Piece>,
    pub hold: Option<Piece>,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct MoveInfo {
    pub rollouts: u64,
}

impl Message {
    pub fn error(code: &str, reason: impl ToString) -> Message {
        Message::Error {
            code: code.to_owned(),
            reason: reason.to_string(),
        }
    }
}
