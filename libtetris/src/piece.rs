use enumset::EnumSetType;
use serde::{Deserialize, Serialize};

use crate::Board;

/// A piece on the playfield, positioned by the top-left corner of its 4x4 bounding grid.
///
/// `rotated` records whether the last successful action was a rotation. Only T placements with
/// this flag set are considered for spin classification.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FallingPiece {
    pub kind: PieceState,
    pub x: i32,
    pub y: i32,
    pub rotated: bool,
}

impl FallingPiece {
    /// Places `piece` at its spawn position, or one row higher if that is obstructed.
    ///
    /// Returns `None` if neither position is free.
    pub fn spawn(piece: Piece, board: &Board) -> Option<FallingPiece> {
        let (x, y) = piece.spawn_offset();
        let mut spawned = FallingPiece {
            kind: PieceState(piece, RotationState::North),
            x,
            y,
            rotated: false,
        };
        if !board.obstructed(&spawned) {
            return Some(spawned);
        }
        spawned.y -= 1;
        if !board.obstructed(&spawned) {
            return Some(spawned);
        }
        None
    }

    #[inline]
    pub fn cells(&self) -> [(i32, i32); 4] {
        let mut cells = self.kind.cells();
        for (dx, dy) in cells.iter_mut() {
            *dx += self.x;
            *dy += self.y;
        }
        cells
    }

    pub fn shift(&mut self, board: &Board, dx: i32, dy: i32) -> bool {
        self.x += dx;
        self.y += dy;
        if board.obstructed(self) {
            self.x -= dx;
            self.y -= dy;
            false
        } else {
            self.rotated = false;
            true
        }
    }

    /// Drops the piece as far as it will go.
    pub fn sonic_drop(&mut self, board: &Board) -> bool {
        let mut fell = false;
        loop {
            self.y += 1;
            if board.obstructed(self) {
                self.y -= 1;
                break;
            }
            fell = true;
        }
        if fell {
            self.rotated = false;
        }
        fell
    }

    /// Returns true if the piece could still move down.
    pub fn can_fall(&self, board: &Board) -> bool {
        let below = FallingPiece {
            y: self.y + 1,
            ..*self
        };
        !board.obstructed(&below)
    }

    fn rotate(&mut self, delta: i32, board: &Board) -> bool {
        let initial = *self;
        let mut target = self.kind;
        target.1 = target.1.turned(delta);
        self.kind = target;

        for &(dx, dy) in initial.kind.kicks(delta) {
            self.x = initial.x + dx;
            self.y = initial.y - dy;
            if !board.obstructed(self) {
                self.rotated = true;
                return true;
            }
        }

        *self = initial;
        false
    }

    pub fn cw(&mut self, board: &Board) -> bool {
        self.rotate(1, board)
    }

    pub fn ccw(&mut self, board: &Board) -> bool {
        self.rotate(-1, board)
    }

    /// Positions that occupy the same cells with a different nominal rotation collapse to one
    /// key. Only the O piece is fully symmetric.
    pub fn canonical(&self) -> FallingPiece {
        match self.kind.0 {
            Piece::O => FallingPiece {
                kind: PieceState(Piece::O, RotationState::North),
                ..*self
            },
            _ => *self,
        }
    }

    pub fn same_location(&self, other: &Self) -> bool {
        let a = self.canonical();
        let b = other.canonical();
        a.kind == b.kind && a.x == b.x && a.y == b.y
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CellColor {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
    Garbage,
    Empty,
}

impl CellColor {
    pub fn is_filled(self) -> bool {
        self != CellColor::Empty
    }
}

#[derive(Debug, Hash, EnumSetType, Serialize, Deserialize)]
pub enum Piece {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum RotationState {
    North,
    East,
    South,
    West,
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct PieceState(pub Piece, pub RotationState);

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum TspinStatus {
    None,
    Mini,
    Full,
}

impl RotationState {
    pub const ALL: [RotationState; 4] = [
        RotationState::North,
        RotationState::East,
        RotationState::South,
        RotationState::West,
    ];

    pub fn from_index(index: usize) -> RotationState {
        Self::ALL[index & 3]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The rotation reached by turning `delta` quarter turns clockwise.
    pub fn turned(self, delta: i32) -> RotationState {
        Self::from_index((self as i32 + delta).rem_euclid(4) as usize)
    }
}

type Shape = [(i32, i32); 4];

const SHAPES: [[Shape; 4]; 7] = [
    // I
    [
        [(0, 1), (1, 1), (2, 1), (3, 1)],
        [(2, 0), (2, 1), (2, 2), (2, 3)],
        [(0, 2), (1, 2), (2, 2), (3, 2)],
        [(1, 0), (1, 1), (1, 2), (1, 3)],
    ],
    // O
    [
        [(1, 1), (2, 1), (1, 2), (2, 2)],
        [(1, 1), (2, 1), (1, 2), (2, 2)],
        [(1, 1), (2, 1), (1, 2), (2, 2)],
        [(1, 1), (2, 1), (1, 2), (2, 2)],
    ],
    // T
    [
        [(1, 1), (0, 2), (1, 2), (2, 2)],
        [(1, 1), (1, 2), (2, 2), (1, 3)],
        [(0, 2), (1, 2), (2, 2), (1, 3)],
        [(1, 1), (0, 2), (1, 2), (1, 3)],
    ],
    // L
    [
        [(2, 1), (0, 2), (1, 2), (2, 2)],
        [(1, 1), (1, 2), (1, 3), (2, 3)],
        [(0, 2), (1, 2), (2, 2), (0, 3)],
        [(0, 1), (1, 1), (1, 2), (1, 3)],
    ],
    // J
    [
        [(0, 1), (0, 2), (1, 2), (2, 2)],
        [(1, 1), (2, 1), (1, 2), (1, 3)],
        [(0, 2), (1, 2), (2, 2), (2, 3)],
        [(1, 1), (1, 2), (0, 3), (1, 3)],
    ],
    // S
    [
        [(1, 1), (2, 1), (0, 2), (1, 2)],
        [(1, 1), (1, 2), (2, 2), (2, 3)],
        [(1, 2), (2, 2), (0, 3), (1, 3)],
        [(0, 1), (0, 2), (1, 2), (1, 3)],
    ],
    // Z
    [
        [(0, 1), (1, 1), (1, 2), (2, 2)],
        [(2, 1), (1, 2), (2, 2), (1, 3)],
        [(0, 2), (1, 2), (1, 3), (2, 3)],
        [(1, 1), (0, 2), (1, 2), (0, 3)],
    ],
];

type Kicks = &'static [(i32, i32)];

// Indexed by [from rotation][ccw, cw]. Offsets are (dx, dy) with dy pointing up.
const JLSTZ_KICKS: [[Kicks; 2]; 4] = [
    [
        &[(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
        &[(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    ],
    [
        &[(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
        &[(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    ],
    [
        &[(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
        &[(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    ],
    [
        &[(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
        &[(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
    ],
];

const I_KICKS: [[Kicks; 2]; 4] = [
    [
        &[(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
        &[(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    ],
    [
        &[(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
        &[(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
    ],
    [
        &[(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
        &[(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    ],
    [
        &[(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
        &[(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
    ],
];

const NO_KICKS: Kicks = &[(0, 0)];

impl PieceState {
    /// Returns the cells this piece and orientation occupy relative to the top-left corner of
    /// its bounding grid. Rows grow downward.
    #[inline(always)]
    pub fn cells(&self) -> [(i32, i32); 4] {
        SHAPES[self.0 as usize][self.1 as usize]
    }

    /// Returns the kick offsets tried, in order, when turning by `delta` quarter turns from this
    /// orientation.
    pub fn kicks(&self, delta: i32) -> Kicks {
        let column = match delta.rem_euclid(4) {
            3 => 0,
            1 => 1,
            _ => return NO_KICKS,
        };
        match self.0 {
            Piece::O => NO_KICKS,
            Piece::I => I_KICKS[self.1 as usize][column],
            _ => JLSTZ_KICKS[self.1 as usize][column],
        }
    }

    /// Offset of the rotation center inside the bounding grid, in grid coordinates.
    pub fn center(&self) -> (i32, i32) {
        let r = self.1 as usize;
        match self.0 {
            Piece::I => ([1, 2, 2, 1][r], [1, 1, 2, 2][r]),
            Piece::O => ([1, 1, 2, 2][r], [2, 1, 1, 2][r]),
            _ => (1, 2),
        }
    }
}

impl Piece {
    pub const ALL: [Piece; 7] = [
        Piece::I,
        Piece::O,
        Piece::T,
        Piece::L,
        Piece::J,
        Piece::S,
        Piece::Z,
    ];

    pub fn from_char(c: char) -> Option<Piece> {
        match c {
            'I' => Some(Piece::I),
            'O' => Some(Piece::O),
            'T' => Some(Piece::T),
            'L' => Some(Piece::L),
            'J' => Some(Piece::J),
            'S' => Some(Piece::S),
            'Z' => Some(Piece::Z),
            _ => None,
        }
    }

    pub fn color(self) -> CellColor {
        match self {
            Piece::I => CellColor::I,
            Piece::O => CellColor::O,
            Piece::T => CellColor::T,
            Piece::L => CellColor::L,
            Piece::J => CellColor::J,
            Piece::S => CellColor::S,
            Piece::Z => CellColor::Z,
        }
    }

    /// Spawn position of the bounding grid's top-left corner.
    pub fn spawn_offset(self) -> (i32, i32) {
        match self {
            Piece::I => (3, -1),
            _ => (3, -2),
        }
    }
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum PieceMovement {
    Left,
    Right,
    Cw,
    Ccw,
    SonicDrop,
}

impl PieceMovement {
    pub const ALL: [PieceMovement; 5] = [
        PieceMovement::Left,
        PieceMovement::Right,
        PieceMovement::SonicDrop,
        PieceMovement::Cw,
        PieceMovement::Ccw,
    ];

    pub fn apply(self, piece: &mut FallingPiece, board: &Board) -> bool {
        match self {
            PieceMovement::Left => piece.shift(board, -1, 0),
            PieceMovement::Right => piece.shift(board, 1, 0),
            PieceMovement::Ccw => piece.ccw(board),
            PieceMovement::Cw => piece.cw(board),
            PieceMovement::SonicDrop => piece.sonic_drop(board),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_orientation_has_four_distinct_cells_inside_the_grid() {
        for &piece in &Piece::ALL {
            for &rot in &RotationState::ALL {
                let cells = PieceState(piece, rot).cells();
                for (i, &(x, y)) in cells.iter().enumerate() {
                    assert!((0..4).contains(&x) && (0..4).contains(&y));
                    assert!(!cells[..i].contains(&(x, y)));
                }
            }
        }
    }

    #[test]
    fn turning_wraps_around() {
        assert_eq!(RotationState::North.turned(-1), RotationState::West);
        assert_eq!(RotationState::West.turned(1), RotationState::North);
        assert_eq!(RotationState::East.turned(2), RotationState::West);
    }

    #[test]
    fn every_kick_table_starts_with_no_offset() {
        for &piece in &Piece::ALL {
            for &rot in &RotationState::ALL {
                for &delta in &[-1, 1] {
                    assert_eq!(PieceState(piece, rot).kicks(delta)[0], (0, 0));
                }
            }
        }
    }

    #[test]
    fn spawned_pieces_sit_at_the_top() {
        let board = Board::new();
        let t = FallingPiece::spawn(Piece::T, &board).unwrap();
        assert_eq!((t.x, t.y), (3, -2));
        assert!(!board.obstructed(&t));
        let i = FallingPiece::spawn(Piece::I, &board).unwrap();
        assert_eq!(i.cells()[0], (3, 0));
    }

    #[test]
    fn rotation_against_the_wall_kicks() {
        let board = Board::new();
        let mut piece = FallingPiece::spawn(Piece::T, &board).unwrap();
        piece.sonic_drop(&board);
        assert!(piece.cw(&board));
        while piece.shift(&board, 1, 0) {}
        assert!(piece.cells().iter().any(|&(x, _)| x == 9));
        assert!(piece.ccw(&board));
        assert!(piece.rotated);
        assert!(piece.cells().iter().all(|&(x, _)| x <= 9));
    }

    #[test]
    fn o_piece_rotations_collapse() {
        let board = Board::new();
        let piece = FallingPiece::spawn(Piece::O, &board).unwrap();
        let mut turned = piece;
        assert!(turned.cw(&board));
        assert_eq!(turned.cells(), piece.cells());
        assert_eq!(turned.canonical().kind, piece.canonical().kind);
        assert!(turned.same_location(&piece));
    }

    #[test]
    fn other_pieces_keep_their_rotation() {
        for &piece in &[Piece::I, Piece::S, Piece::Z, Piece::T] {
            let north = FallingPiece {
                kind: PieceState(piece, RotationState::North),
                x: 3,
                y: 10,
                rotated: false,
            };
            let south = FallingPiece {
                kind: PieceState(piece, RotationState::South),
                ..north
            };
            assert_eq!(north.canonical(), north);
            assert_eq!(south.canonical(), south);
            assert!(!north.same_location(&south));
        }
    }
}
