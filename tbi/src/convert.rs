use std::fmt;

use libtetris::{
    Board, CellColor, FallingPiece, GameState, LockResult, PieceState, PlacementKind,
    RotationState, Row, HEIGHT, WIDTH,
};
use spinbot::evaluation::Standard;
use spinbot::Candidate;

use crate::message::{self, Cell, Move, Orientation, PieceLocation, Range, Span, Spin, Suggestion};

pub const MIN_QUEUE: usize = 3;

/// Why a `start` snapshot was rejected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationError {
    BoardHeight(usize),
    BoardWidth { row: usize, width: usize },
    InvalidCell { row: usize, col: usize, token: String },
    QueueTooShort(usize),
    InvalidQueuePiece { index: usize, token: String },
    InvalidHold(String),
    UnknownProfile(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::BoardHeight(_) => "board-height",
            ValidationError::BoardWidth { .. } => "board-width",
            ValidationError::InvalidCell { .. } => "invalid-cell",
            ValidationError::QueueTooShort(_) => "queue-too-short",
            ValidationError::InvalidQueuePiece { .. } => "invalid-queue-piece",
            ValidationError::InvalidHold(_) => "invalid-hold",
            ValidationError::UnknownProfile(_) => "unknown-profile",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::BoardHeight(rows) => write!(f, "board has {} rows", rows),
            ValidationError::BoardWidth { row, width } => {
                write!(f, "board row {} is {} cells wide, expected {}", row, width, WIDTH)
            }
            ValidationError::InvalidCell { row, col, token } => write!(
                f,
                "board cell [{},{}] is \"{}\" (valid: null, I, O, T, L, J, S, Z, G)",
                row, col, token
            ),
            ValidationError::QueueTooShort(len) => {
                write!(f, "queue has {} pieces, at least {} are needed", len, MIN_QUEUE)
            }
            ValidationError::InvalidQueuePiece { index, token } => {
                write!(f, "queue entry {} is \"{}\" (valid: I, O, T, L, J, S, Z)", index, token)
            }
            ValidationError::InvalidHold(token) => {
                write!(f, "hold is \"{}\" (valid: null, I, O, T, L, J, S, Z)", token)
            }
            ValidationError::UnknownProfile(name) => write!(f, "unknown weight profile '{}'", name),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Brings a board to exactly `HEIGHT` rows.
///
/// Extra rows are cut from the bottom. Missing rows are added on top; a column that is garbage
/// all the way down continues as garbage, every other column gets empty cells.
pub fn adjust_height(board: &[Vec<Cell>]) -> Vec<Vec<Cell>> {
    if board.len() >= HEIGHT {
        return board[..HEIGHT].to_vec();
    }
    let width = board.first().map_or(0, Vec::len);
    let garbage_column: Vec<bool> = (0..width)
        .map(|col| board.iter().all(|row| row.get(col).map_or(false, is_garbage)))
        .collect();
    let filler: Vec<Cell> = garbage_column
        .iter()
        .map(|&g| if g { Some("G".to_owned()) } else { None })
        .collect();

    let mut adjusted = vec![filler; HEIGHT - board.len()];
    adjusted.extend_from_slice(board);
    adjusted
}

fn is_garbage(cell: &Cell) -> bool {
    cell.as_deref() == Some("G")
}

fn parse_piece(token: &str) -> Option<libtetris::Piece> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => libtetris::Piece::from_char(c),
        _ => None,
    }
}

fn parse_cell(token: &str) -> Option<CellColor> {
    if token == "G" {
        Some(CellColor::Garbage)
    } else {
        parse_piece(token).map(libtetris::Piece::color)
    }
}

/// Checks and converts a `start` snapshot. Nothing is loaded unless every part is valid.
pub fn parse_state(
    board: &[Vec<Cell>],
    queue: &[String],
    hold: Option<&str>,
    combo: i32,
    back_to_back: bool,
) -> Result<GameState, ValidationError> {
    if board.is_empty() {
        return Err(ValidationError::BoardHeight(0));
    }
    for (row, cells) in board.iter().enumerate() {
        if cells.len() != WIDTH {
            return Err(ValidationError::BoardWidth { row, width: cells.len() });
        }
    }
    // Rows cut off by the height adjustment still have to be well formed.
    for (row, cells) in board.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if let Some(token) = cell {
                if parse_cell(token).is_none() {
                    return Err(ValidationError::InvalidCell {
                        row,
                        col,
                        token: token.clone(),
                    });
                }
            }
        }
    }
    let board = adjust_height(board);

    let mut rows = [Row::default(); HEIGHT];
    for (y, cells) in board.iter().enumerate() {
        for (x, cell) in cells.iter().enumerate() {
            if let Some(color) = cell.as_deref().and_then(parse_cell) {
                rows[y].set(x, color);
            }
        }
    }

    if queue.len() < MIN_QUEUE {
        return Err(ValidationError::QueueTooShort(queue.len()));
    }
    let mut pieces = Vec::with_capacity(queue.len());
    for (index, token) in queue.iter().enumerate() {
        let piece = parse_piece(token).ok_or_else(|| ValidationError::InvalidQueuePiece {
            index,
            token: token.clone(),
        })?;
        pieces.push(piece);
    }

    let hold = match hold {
        Some(token) => {
            let piece = parse_piece(token);
            Some(piece.ok_or_else(|| ValidationError::InvalidHold(token.to_owned()))?)
        }
        None => None,
    };

    let mut state = GameState::new(Board::from_rows(rows, Row::default()), pieces, hold);
    state.combo = combo;
    state.b2b = back_to_back;
    Ok(state)
}

pub fn profile(name: &str) -> Result<Standard, ValidationError> {
    Standard::profile(name).map_err(|_| ValidationError::UnknownProfile(name.to_owned()))
}

pub fn board_cells(board: &Board) -> Vec<Vec<Cell>> {
    board
        .rows()
        .iter()
        .map(|row| {
            row.cells()
                .iter()
                .map(|&color| match color {
                    CellColor::Empty => None,
                    CellColor::Garbage => Some("G".to_owned()),
                    CellColor::I => Some("I".to_owned()),
                    CellColor::O => Some("O".to_owned()),
                    CellColor::T => Some("T".to_owned()),
                    CellColor::L => Some("L".to_owned()),
                    CellColor::J => Some("J".to_owned()),
                    CellColor::S => Some("S".to_owned()),
                    CellColor::Z => Some("Z".to_owned()),
                })
                .collect()
        })
        .collect()
}

/// Converts a grid placement to protocol coordinates.
pub fn to_location(piece: &FallingPiece) -> PieceLocation {
    let (cx, cy) = piece.kind.center();
    let mut blocks: Vec<[i32; 2]> = piece
        .cells()
        .iter()
        .map(|&(x, y)| [x, HEIGHT as i32 - 1 - y])
        .collect();
    blocks.sort();

    let span = |axis: usize| Span {
        from: blocks.iter().map(|b| b[axis]).min().unwrap_or(0),
        to: blocks.iter().map(|b| b[axis]).max().unwrap_or(0),
    };
    PieceLocation {
        kind: piece.kind.0.into(),
        orientation: piece.kind.1.into(),
        x: piece.x + cx,
        y: HEIGHT as i32 - 1 - (piece.y + cy),
        range: Range { x: span(0), y: span(1) },
        block_positions: blocks,
    }
}

/// Converts a protocol move back to a grid placement. Any reported spin counts as the piece
/// having arrived by rotation.
pub fn from_move(mv: &Move) -> FallingPiece {
    let kind = PieceState(mv.location.kind.into(), mv.location.orientation.into());
    let (cx, cy) = kind.center();
    FallingPiece {
        kind,
        x: mv.location.x - cx,
        y: HEIGHT as i32 - 1 - mv.location.y - cy,
        rotated: mv.spin != Spin::None,
    }
}

pub fn spin_of(lock: &LockResult) -> Spin {
    match lock.placement_kind {
        PlacementKind::Tspin1 | PlacementKind::Tspin2 | PlacementKind::Tspin3 => Spin::Full,
        PlacementKind::MiniTspin1 => Spin::Mini,
        _ => Spin::None,
    }
}

pub fn suggestion(candidate: &Candidate) -> Suggestion {
    Suggestion {
        mv: Move {
            location: to_location(&candidate.mv.location),
            spin: spin_of(&candidate.lock),
        },
        board: board_cells(&candidate.state.board),
        value: candidate.value,
        action: candidate.lock.action().to_owned(),
        next: candidate.state.queue.iter().map(|&p| p.into()).collect(),
        hold: candidate.state.hold.map(Into::into),
    }
}

impl From<message::Piece> for libtetris::Piece {
    fn from(v: message::Piece) -> libtetris::Piece {
        match v {
            message::Piece::I => libtetris::Piece::I,
            message::Piece::O => libtetris::Piece::O,
            message::Piece::T => libtetris::Piece::T,
            message::Piece::L => libtetris::Piece::L,
            message::Piece::J => libtetris::Piece::J,
            message::Piece::S => libtetris::Piece::S,
            message::Piece::Z => libtetris::Piece::Z,
        }
    }
}

impl From<libtetris::Piece> for message::Piece {
    fn from(v: libtetris::Piece) -> message::Piece {
        match v {
            libtetris::Piece::I => message::Piece::I,
            libtetris::Piece::O => message::Piece::O,
            libtetris::Piece::T => message::Piece::T,
            libtetris::Piece::L => message::Piece::L,
            libtetris::Piece::J => message::Piece::J,
            libtetris::Piece::S => message::Piece::S,
            libtetris::Piece::Z => message::Piece::Z,
        }
    }
}

impl From<Orientation> for RotationState {
    fn from(v: Orientation) -> RotationState {
        match v {
            Orientation::North => RotationState::North,
            Orientation::South => RotationState::South,
            Orientation::East => RotationState::East,
            Orientation::West => RotationState::West,
        }
    }
}

impl From<RotationState> for Orientation {
    fn from(v: RotationState) -> Orientation {
        match v {
            RotationState::North => Orientation::North,
            RotationState::South => Orientation::South,
            RotationState::East => Orientation::East,
            RotationState::West => Orientation::West,
        }
    }
}
