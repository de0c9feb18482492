use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::*;

pub const WIDTH: usize = 10;
pub const HEIGHT: usize = 20;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Row([CellColor; WIDTH]);

/// The 20x10 matrix plus the deadline row waiting above it.
///
/// Row 0 is the top of the matrix. The deadline row sits at row -1; anything above it is open
/// space.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Board {
    rows: [Row; HEIGHT],
    deadline: Row,
}

impl Default for Row {
    fn default() -> Self {
        Row([CellColor::Empty; WIDTH])
    }
}

impl Row {
    pub fn new(cells: [CellColor; WIDTH]) -> Self {
        Row(cells)
    }

    /// A garbage row with a single hole at `gap`.
    pub fn garbage(gap: usize) -> Self {
        let mut row = Row([CellColor::Garbage; WIDTH]);
        row.0[gap] = CellColor::Empty;
        row
    }

    pub fn set(&mut self, x: usize, color: CellColor) {
        self.0[x] = color;
    }

    pub fn get(&self, x: usize) -> bool {
        self.0[x].is_filled()
    }

    pub fn cell_color(&self, x: usize) -> CellColor {
        self.0[x]
    }

    pub fn cells(&self) -> &[CellColor; WIDTH] {
        &self.0
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(|c| c.is_filled())
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|c| !c.is_filled())
    }

    pub fn filled(&self) -> usize {
        self.0.iter().filter(|c| c.is_filled()).count()
    }
}

impl Board {
    /// Creates a blank board with an empty deadline row.
    pub fn new() -> Self {
        Board {
            rows: [Row::default(); HEIGHT],
            deadline: Row::default(),
        }
    }

    pub fn from_rows(rows: [Row; HEIGHT], deadline: Row) -> Self {
        Board { rows, deadline }
    }

    pub fn rows(&self) -> &[Row; HEIGHT] {
        &self.rows
    }

    pub fn deadline(&self) -> &Row {
        &self.deadline
    }

    pub fn cell_color(&self, x: usize, y: usize) -> CellColor {
        self.rows[y].cell_color(x)
    }

    pub fn set(&mut self, x: usize, y: usize, color: CellColor) {
        self.rows[y].set(x, color);
    }

    /// Collision semantics: the walls and the floor are solid, the space above the matrix is
    /// open.
    pub fn occupied(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return true;
        }
        y >= 0 && self.rows[y as usize].get(x as usize)
    }

    /// Corner semantics used for spin detection, where row -1 reads the deadline row.
    pub fn corner_occupied(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            true
        } else if y == -1 {
            self.deadline.get(x as usize)
        } else if y < -1 {
            false
        } else {
            self.rows[y as usize].get(x as usize)
        }
    }

    pub fn obstructed(&self, piece: &FallingPiece) -> bool {
        piece.cells().iter().any(|&(x, y)| self.occupied(x, y))
    }

    /// Whether any cell of `piece` in row -1 overlaps the deadline row.
    pub fn touches_deadline(&self, piece: &FallingPiece) -> bool {
        piece
            .cells()
            .iter()
            .any(|&(x, y)| y == -1 && x >= 0 && x < WIDTH as i32 && self.deadline.get(x as usize))
    }

    /// Height of each column, measured from the floor to its topmost filled cell.
    pub fn column_heights(&self) -> [i32; WIDTH] {
        let mut heights = [0; WIDTH];
        for x in 0..WIDTH {
            for y in 0..HEIGHT {
                if self.rows[y].get(x) {
                    heights[x] = (HEIGHT - y) as i32;
                    break;
                }
            }
        }
        heights
    }

    /// Writes the piece into the matrix. Cells above row 0 are lost.
    pub fn place(&mut self, piece: &FallingPiece) {
        let color = piece.kind.0.color();
        for &(x, y) in &piece.cells() {
            if y >= 0 && y < HEIGHT as i32 && x >= 0 && x < WIDTH as i32 {
                self.rows[y as usize].set(x as usize, color);
            }
        }
    }

    /// Removes full rows, scanning from the top.
    ///
    /// A full deadline row is emptied first. Each removed row shifts everything above it down by
    /// one; the deadline row drops into row 0 and is replaced by an empty row. Returns the
    /// indices of the removed rows.
    pub fn remove_cleared_lines(&mut self) -> ArrayVec<[usize; HEIGHT]> {
        if self.deadline.is_full() {
            self.deadline = Row::default();
        }
        let mut cleared = ArrayVec::new();
        for y in 0..HEIGHT {
            if self.rows[y].is_full() {
                for above in (1..=y).rev() {
                    self.rows[above] = self.rows[above - 1];
                }
                self.rows[0] = self.deadline;
                self.deadline = Row::default();
                cleared.push(y);
            }
        }
        cleared
    }

    /// Pushes one garbage row in from the bottom. The row shifted off the top becomes the new
    /// deadline row.
    pub fn push_garbage(&mut self, gap: usize) {
        self.deadline = self.rows[0];
        self.rows.rotate_left(1);
        self.rows[HEIGHT - 1] = Row::garbage(gap);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Row::is_empty)
    }

    pub fn filled_cells(&self) -> usize {
        self.rows.iter().map(Row::filled).sum()
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_row() -> Row {
        Row::new([CellColor::Garbage; WIDTH])
    }

    #[test]
    fn walls_and_floor_are_solid() {
        let board = Board::new();
        assert!(board.occupied(-1, 5));
        assert!(board.occupied(10, 5));
        assert!(board.occupied(4, 20));
        assert!(!board.occupied(4, -3));
        assert!(!board.occupied(4, 19));
    }

    #[test]
    fn column_heights_measure_from_the_floor() {
        let mut board = Board::new();
        board.set(0, 19, CellColor::Garbage);
        board.set(3, 15, CellColor::T);
        assert_eq!(board.column_heights(), [1, 0, 0, 5, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn clearing_a_row_shifts_the_rows_above_down() {
        let mut rows = [Row::default(); HEIGHT];
        rows[19] = filled_row();
        rows[18] = Row::garbage(4);
        rows[17].set(0, CellColor::L);
        let mut deadline = Row::default();
        deadline.set(9, CellColor::Garbage);
        let mut board = Board::from_rows(rows, deadline);

        let cleared = board.remove_cleared_lines();
        assert_eq!(&cleared[..], &[19]);
        assert_eq!(board.rows()[19], Row::garbage(4));
        assert!(board.rows()[18].get(0));
        assert!(board.rows()[0].get(9));
        assert!(board.deadline().is_empty());
    }

    #[test]
    fn full_deadline_row_is_discarded() {
        let mut board = Board::from_rows([Row::default(); HEIGHT], filled_row());
        assert!(board.remove_cleared_lines().is_empty());
        assert!(board.deadline().is_empty());
    }

    #[test]
    fn garbage_pushes_the_top_row_into_the_deadline() {
        let mut board = Board::new();
        board.set(2, 0, CellColor::S);
        board.push_garbage(7);
        assert!(board.deadline().get(2));
        assert_eq!(board.rows()[19], Row::garbage(7));
        assert_eq!(board.filled_cells(), 9);
    }

    #[test]
    fn deadline_counts_as_a_corner() {
        let mut deadline = Row::default();
        deadline.set(3, CellColor::Garbage);
        let board = Board::from_rows([Row::default(); HEIGHT], deadline);
        assert!(board.corner_occupied(3, -1));
        assert!(!board.corner_occupied(3, -2));
        assert!(!board.occupied(3, -1));
    }
}
