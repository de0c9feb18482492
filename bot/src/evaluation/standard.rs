use libtetris::*;
use serde::{Deserialize, Serialize};

use super::*;

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Standard {
    pub back_to_back: i32,
    pub bumpiness: i32,
    pub bumpiness_sq: i32,
    pub row_transitions: i32,
    pub height: i32,
    pub top_half: i32,
    pub top_quarter: i32,
    pub cavity_cells: i32,
    pub cavity_cells_sq: i32,
    pub overhang_cells: i32,
    pub overhang_cells_sq: i32,
    pub covered_cells: i32,
    pub covered_cells_sq: i32,
    pub tslot: [i32; 4],
    pub well_depth: i32,
    pub max_well_depth: i32,
    pub well_column: [i32; 10],

    pub wasted_t: i32,
    pub b2b_clear: i32,
    pub clear1: i32,
    pub clear2: i32,
    pub clear3: i32,
    pub clear4: i32,
    pub tspin1: i32,
    pub tspin2: i32,
    pub tspin3: i32,
    pub mini_tspin1: i32,
    /// Mini doubles score as T-spin doubles; kept so flat profiles keep their layout.
    pub mini_tspin2: i32,
    pub perfect_clear: i32,
    pub combo_garbage: i32,
    pub tank: [i32; 2],
    pub spike: i32,

    pub sub_name: Option<String>,
}

/// Peak spike has to pass this before it is rewarded.
const SPIKE_THRESHOLD: f64 = 7.0;

/// At most this many upcoming T pieces are used to look for T-slots.
const MAX_TSLOT_LOOKAHEAD: usize = 3;

impl Evaluator for Standard {
    fn name(&self) -> String {
        match &self.sub_name {
            Some(extra) => format!("Standard ({})", extra),
            None => "Standard".to_owned(),
        }
    }

    fn evaluate(&self, state: &GameState) -> f64 {
        let mut eval: i64 = 0;
        let w = |weight: i32, amount: i64| weight as i64 * amount;

        let t_pieces = state
            .queue
            .iter()
            .take(7)
            .filter(|&&p| p == Piece::T)
            .count()
            .min(MAX_TSLOT_LOOKAHEAD);
        let mut board = state.board.clone();
        for _ in 0..t_pieces {
            match best_tslot(&board) {
                Some((tier, result)) => {
                    eval += w(self.tslot[tier], 1);
                    board = result;
                }
                None => break,
            }
        }

        let heights = board.column_heights();
        let highest_point = *heights.iter().max().unwrap_or(&0) as i64;
        eval += w(self.top_quarter, (highest_point - 15).max(0));
        eval += w(self.top_half, (highest_point - 10).max(0));
        eval += w(self.height, highest_point);

        eval += w(self.row_transitions, row_transitions(&board));

        let covered = covered_cells(&board, &heights);
        eval += w(self.covered_cells, covered);
        eval += w(self.covered_cells_sq, covered * covered);

        let (cavity_cells, overhang_cells) = cavities_and_overhangs(&board, &heights);
        eval += w(self.overhang_cells, overhang_cells);
        eval += w(self.overhang_cells_sq, overhang_cells * overhang_cells);
        eval += w(self.cavity_cells, cavity_cells);
        eval += w(self.cavity_cells_sq, cavity_cells * cavity_cells);

        let mut well = 0;
        for x in 1..WIDTH {
            if heights[x] <= heights[well] {
                well = x;
            }
        }

        eval += w(self.tank[0], state.stats.clean_received as i64);
        eval += w(self.tank[1], state.stats.messy_received as i64);

        let depth = well_depth(&board, &heights, well);
        eval += w(self.well_depth, depth.min(self.max_well_depth as i64));
        if depth > 0 {
            eval += w(self.well_column[well], 1);
        }

        if state.b2b {
            eval += w(self.back_to_back, 1);
        }

        let bump = bumpiness(&heights, well);
        eval += w(self.bumpiness, bump);
        eval += w(self.bumpiness_sq, bump * bump);

        let stats = &state.stats;
        eval += w(self.clear1, stats.singles as i64);
        eval += w(self.clear2, stats.doubles as i64);
        eval += w(self.clear3, stats.triples as i64);
        eval += w(self.clear4, stats.tetrises as i64);
        eval += w(self.mini_tspin1, stats.mini_tspin_singles as i64);
        eval += w(self.tspin1, stats.tspin_singles as i64);
        eval += w(self.tspin2, stats.tspin_doubles as i64);
        eval += w(self.tspin3, stats.tspin_triples as i64);
        eval += w(self.perfect_clear, stats.perfect_clears as i64);
        eval += w(self.wasted_t, stats.wasted_t as i64);
        eval += w(self.b2b_clear, stats.back_to_backs as i64);
        eval += w(self.combo_garbage, stats.combo_attack as i64);

        let mut eval = eval as f64;
        if stats.spike > SPIKE_THRESHOLD {
            eval += self.spike as f64 * stats.spike;
        }
        eval
    }
}

/// Counts filled/empty changes along every row, with both walls counting as filled.
fn row_transitions(board: &Board) -> i64 {
    let mut transitions = 0;
    for row in board.rows() {
        let mut prev = true;
        for x in 0..WIDTH {
            if row.get(x) != prev {
                transitions += 1;
                prev = !prev;
            }
        }
        if !prev {
            transitions += 1;
        }
    }
    transitions
}

/// Evaluates how covered holes in the playfield are.
///
/// Every empty cell below a column's surface counts the filled cells above it, capped at 6.
fn covered_cells(board: &Board, heights: &[i32; WIDTH]) -> i64 {
    let mut covered = 0;
    for x in 0..WIDTH {
        for y in (0..heights[x] - 1).rev() {
            if !board.rows()[HEIGHT - 1 - y as usize].get(x) {
                covered += 6.min(heights[x] - y - 1) as i64;
            }
        }
    }
    covered
}

/// Evaluates the holes in the playfield.
///
/// The first returned value is the number of holes that are fully enclosed (cavities). The
/// second is the number of holes a piece could slide into from a lower neighbouring column
/// (overhangs).
fn cavities_and_overhangs(board: &Board, heights: &[i32; WIDTH]) -> (i64, i64) {
    let highest = *heights.iter().max().unwrap_or(&0);
    let mut cavity_cells = 0;
    let mut overhang_cells = 0;

    for y in 0..highest {
        let row = &board.rows()[HEIGHT - 1 - y as usize];
        for x in 0..WIDTH {
            if row.get(x) || y >= heights[x] {
                continue;
            }
            let open_left = x > 1 && heights[x - 1] <= y - 1 && heights[x - 2] <= y;
            let open_right = x < 8 && heights[x + 1] <= y - 1 && heights[x + 2] <= y;
            if open_left || open_right {
                overhang_cells += 1;
            } else {
                cavity_cells += 1;
            }
        }
    }

    (cavity_cells, overhang_cells)
}

/// Counts the rows above the well column's surface where every other column is filled.
fn well_depth(board: &Board, heights: &[i32; WIDTH], well: usize) -> i64 {
    let mut depth = 0;
    for y in heights[well]..HEIGHT as i32 {
        let row = &board.rows()[HEIGHT - 1 - y as usize];
        if (0..WIDTH).any(|x| x != well && !row.get(x)) {
            break;
        }
        depth += 1;
    }
    depth
}

/// Total height change between neighbouring columns, skipping over the well, less one. A
/// perfectly flat stack scores -1. Both the linear and the squared weight apply to this value.
fn bumpiness(heights: &[i32; WIDTH], well: usize) -> i64 {
    let mut bumpiness = -1;

    let mut prev = if well == 0 { 1 } else { 0 };
    for i in 1..WIDTH {
        if i == well {
            continue;
        }
        bumpiness += (heights[prev] - heights[i]).abs() as i64;
        prev = i;
    }

    bumpiness
}

/// Cell requirement in a T-slot template.
const FILLED: u8 = 1;
const EMPTY: u8 = 0;
const ANY: u8 = 2;

type Template = [[u8; 3]; 3];

fn cell(board: &Board, x: i32, y: i32) -> Option<bool> {
    if x < 0 || x >= WIDTH as i32 || y < 0 || y >= HEIGHT as i32 {
        None
    } else {
        Some(board.rows()[y as usize].get(x as usize))
    }
}

/// Checks a 3x3 template with its top-left corner at (x, top).
fn matches(board: &Board, template: &Template, x: i32, top: i32) -> bool {
    for (dy, row) in template.iter().enumerate() {
        for (dx, &want) in row.iter().enumerate() {
            if want == ANY {
                continue;
            }
            match cell(board, x + dx as i32, top + dy as i32) {
                Some(filled) if filled == (want == FILLED) => {}
                _ => return false,
            }
        }
    }
    true
}

fn t_piece(x: i32, y: i32, rotation: RotationState) -> FallingPiece {
    FallingPiece {
        kind: PieceState(Piece::T, rotation),
        x,
        y,
        rotated: true,
    }
}

/// T-slot shapes, each tried with its leftmost column at x. Returns the T placement that would
/// fill the slot.
///
/// ```text
/// []....    ....[]    ....[]    []....
/// ......    ......    ..  []    []  ..
/// []..[]    []..[]    ..  []    []  ..
/// ```
fn find_tslot(board: &Board, h: &[i32; WIDTH], shape: usize, x: usize) -> Option<FallingPiece> {
    let height = HEIGHT as i32;
    let e = x as i32;
    let (left, mid, right) = (h[x], h[x + 1], h[x + 2]);
    match shape {
        0 => {
            if left < right + 2 || right < mid + 1 {
                return None;
            }
            let top = height - right - 2;
            let template = [[FILLED, ANY, ANY], [EMPTY, ANY, ANY], [FILLED, ANY, ANY]];
            if !matches(board, &template, e, top) {
                return None;
            }
            Some(t_piece(e, top - 1, RotationState::South))
        }
        1 => {
            if right < left + 2 || left < mid + 1 {
                return None;
            }
            let top = height - left - 2;
            let template = [[ANY, ANY, FILLED], [ANY, ANY, EMPTY], [ANY, ANY, FILLED]];
            if !matches(board, &template, e, top) {
                return None;
            }
            Some(t_piece(e, top - 1, RotationState::South))
        }
        2 => {
            if left != mid || right < mid + 2 || right < 5 {
                return None;
            }
            let top = height - right;
            if cell(board, e - 1, top) != cell(board, e - 1, top + 1) {
                return None;
            }
            let template = [[ANY, ANY, FILLED], [ANY, ANY, EMPTY], [ANY, ANY, EMPTY]];
            if !matches(board, &template, e, top) {
                return None;
            }
            Some(t_piece(e + 1, top + 1, RotationState::West))
        }
        _ => {
            if left < 5 || right != mid || left < mid + 2 {
                return None;
            }
            let top = height - left;
            if cell(board, e + 3, top) != cell(board, e + 3, top + 1) {
                return None;
            }
            let template = [[FILLED, ANY, ANY], [EMPTY, ANY, ANY], [EMPTY, ANY, ANY]];
            if !matches(board, &template, e, top) {
                return None;
            }
            Some(t_piece(e - 1, top + 1, RotationState::East))
        }
    }
}

/// Finds the T-slot whose fill gives the best spin clear, returning its tier (0 for no spin
/// clear, 1 to 3 for T-spin single, double, triple) and the board after the clear.
fn best_tslot(board: &Board) -> Option<(usize, Board)> {
    let heights = board.column_heights();
    let mut best: Option<(usize, Board)> = None;
    for shape in 0..4 {
        for x in 0..WIDTH - 3 {
            let piece = match find_tslot(board, &heights, shape, x) {
                Some(p) => p,
                None => continue,
            };
            if board.obstructed(&piece) {
                continue;
            }
            let mut result = board.clone();
            result.place(&piece);
            let spin = tspin_status(&result, &piece);
            let cleared = result.remove_cleared_lines().len();
            let tier = if cleared > 0 && result.is_empty() {
                0
            } else {
                match PlacementKind::get(cleared, spin) {
                    PlacementKind::Tspin1 => 1,
                    PlacementKind::Tspin2 => 2,
                    PlacementKind::Tspin3 => 3,
                    _ => 0,
                }
            };
            if best.as_ref().map_or(true, |&(t, _)| tier > t) {
                best = Some((tier, result));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from(rows: &[&str]) -> Board {
        let mut board = Board::new();
        let top = HEIGHT - rows.len();
        for (i, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    board.set(x, top + i, CellColor::Garbage);
                }
            }
        }
        board
    }

    fn state_with(board: Board) -> GameState {
        GameState::new(board, vec![Piece::I, Piece::O, Piece::S, Piece::Z], None)
    }

    #[test]
    fn enclosed_hole_scores_lower() {
        let holed = board_from(&["##########", "####.#####"]);
        let mut plugged = holed.clone();
        plugged.set(4, HEIGHT - 1, CellColor::Garbage);

        let eval = Standard::default();
        let with_hole = eval.evaluate(&state_with(holed.clone()));
        let without = eval.evaluate(&state_with(plugged));
        assert!(with_hole < without, "{} >= {}", with_hole, without);

        let (cavities, overhangs) = cavities_and_overhangs(&holed, &holed.column_heights());
        assert_eq!((cavities, overhangs), (1, 0));
    }

    #[test]
    fn side_reachable_hole_is_an_overhang() {
        let board = board_from(&["###.......", "##........", "###......."]);
        let heights = board.column_heights();
        assert_eq!(cavities_and_overhangs(&board, &heights), (0, 1));
    }

    #[test]
    fn empty_rows_have_two_transitions() {
        assert_eq!(row_transitions(&Board::new()), 2 * HEIGHT as i64);
        let board = board_from(&["#.#.......", "##########"]);
        assert_eq!(row_transitions(&board), 2 * (HEIGHT as i64 - 2) + 4);
    }

    #[test]
    fn bumpiness_is_squared_as_a_whole() {
        let mut heights = [0; WIDTH];
        assert_eq!(bumpiness(&heights, 9), -1);
        heights[0] = 1;
        heights[2] = 1;
        assert_eq!(bumpiness(&heights, 9), 2);

        let mut w = [0; COEFFICIENTS];
        w[1] = 3;
        w[2] = -7;
        let weights = Standard::from_array(&w);
        let flat = GameState::new(Board::new(), vec![Piece::O], None);
        assert_eq!(weights.evaluate(&flat), -3.0 - 7.0);
        let bumpy = GameState::new(board_from(&["#.#......."]), vec![Piece::O], None);
        assert_eq!(weights.evaluate(&bumpy), 3.0 * 2.0 - 7.0 * 4.0);
    }

    #[test]
    fn covered_cells_cap_at_six() {
        let mut board = Board::new();
        for y in (HEIGHT - 9)..(HEIGHT - 1) {
            board.set(0, y, CellColor::Garbage);
        }
        // One hole at the bottom of column 0 under eight filled cells.
        let heights = board.column_heights();
        assert_eq!(heights[0], 9);
        assert_eq!(covered_cells(&board, &heights), 6);
    }

    #[test]
    fn well_depth_counts_full_rows_beside_the_well() {
        let board = board_from(&["........#.", "#########.", "#########.", "#########."]);
        let heights = board.column_heights();
        assert_eq!(well_depth(&board, &heights, 9), 3);
    }

    #[test]
    fn finds_and_fills_tsd_slot() {
        let board = board_from(&["###.......", "##...#####", "###.######"]);
        let (tier, result) = best_tslot(&board).expect("slot should be found");
        assert_eq!(tier, 2);
        assert_eq!(result.filled_cells(), 3);
    }

    #[test]
    fn t_in_queue_rewards_open_slots() {
        let board = board_from(&["###.......", "##...#####", "###.######"]);
        let eval = Standard::default();
        let without_t = eval.evaluate(&state_with(board.clone()));
        let with_t = eval.evaluate(&GameState::new(board, vec![Piece::T, Piece::I], None));
        assert!(with_t > without_t);
    }

    #[test]
    fn spike_only_counts_past_threshold() {
        let eval = Standard::default();
        let mut state = state_with(Board::new());
        let base = eval.evaluate(&state);
        state.stats.spike = 7.0;
        assert_eq!(eval.evaluate(&state), base);
        state.stats.spike = 8.0;
        assert_eq!(eval.evaluate(&state), base + 8.0 * eval.spike as f64);
    }
}
