use std::collections::hash_map::Entry;
use std::collections::HashMap;

use libtetris::{Board, FallingPiece, GameState, Piece, PieceMovement, PieceSource, RotationState};
use serde::{Deserialize, Serialize};

/// Number of closure rounds run after the initial slides. Placements that need a longer chain of
/// actions than this are not found.
pub const MAX_ROUNDS: usize = 5;

/// A final resting position together with the slot the piece was taken from.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub location: FallingPiece,
    pub source: PieceSource,
}

impl Placement {
    pub fn same_move(&self, other: &Placement) -> bool {
        self.source == other.source && self.location.same_location(&other.location)
    }
}

type Key = (i32, i32, RotationState);

struct Locks {
    index: HashMap<Key, usize>,
    found: Vec<FallingPiece>,
}

impl Locks {
    /// Records a resting placement. A rotation-reached placement replaces a plain one at the
    /// same key. Returns true if anything was stored.
    fn record(&mut self, place: FallingPiece) -> bool {
        let place = place.canonical();
        let key = (place.x, place.y, place.kind.1);
        match self.index.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(self.found.len());
                self.found.push(place);
                true
            }
            Entry::Occupied(entry) => {
                let stored = &mut self.found[*entry.get()];
                if !stored.rotated && place.rotated {
                    *stored = place;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn drop_and_record(&mut self, mut place: FallingPiece, board: &Board) -> Option<FallingPiece> {
        place.sonic_drop(board);
        if self.record(place) {
            Some(place)
        } else {
            None
        }
    }
}

/// Finds every distinct resting placement of `piece` reachable from its spawn position.
///
/// Each of the three spawn orientations (none, cw, ccw) is slid across the board, dropping at
/// every column. The results are then closed under left, right, drop, cw and ccw for up to
/// `MAX_ROUNDS` rounds. Placements are returned in discovery order.
pub fn find_moves(board: &Board, piece: Piece) -> Vec<FallingPiece> {
    let spawned = match FallingPiece::spawn(piece, board) {
        Some(p) => p,
        None => return vec![],
    };

    let mut locks = Locks {
        index: HashMap::with_capacity(128),
        found: Vec::with_capacity(128),
    };
    let mut frontier = vec![];

    let mut seeds = vec![spawned];
    let mut cw = spawned;
    if cw.cw(board) {
        seeds.push(cw);
    }
    let mut ccw = spawned;
    if ccw.ccw(board) {
        seeds.push(ccw);
    }

    for seed in seeds {
        frontier.extend(locks.drop_and_record(seed, board));
        for &dx in &[1, -1] {
            let mut slide = seed;
            while slide.shift(board, dx, 0) {
                frontier.extend(locks.drop_and_record(slide, board));
            }
        }
    }

    for _ in 0..MAX_ROUNDS {
        if frontier.is_empty() {
            break;
        }
        let mut discovered = vec![];
        for &place in &frontier {
            for &movement in &PieceMovement::ALL {
                let mut moved = place;
                if !movement.apply(&mut moved, board) {
                    continue;
                }
                if moved.can_fall(board) {
                    moved.sonic_drop(board);
                }
                if locks.record(moved) {
                    discovered.push(moved);
                }
            }
        }
        frontier = discovered;
    }

    locks.found
}

/// Generates the placements a search node expands into.
///
/// Always includes the current piece. With hold enabled this adds the held piece, or the piece
/// after the current one when the hold slot is empty. Holding a piece of the same type as the
/// current one leads to the same states, so that case is skipped.
pub fn find_placements(state: &GameState, use_hold: bool) -> Vec<Placement> {
    let current = match state.current() {
        Some(p) => p,
        None => return vec![],
    };

    let mut sources = vec![(PieceSource::Current, current)];
    if use_hold {
        match state.hold {
            Some(hold) if hold != current => sources.push((PieceSource::Hold, hold)),
            Some(_) => {}
            None => {
                if let Some(next) = state.piece_for(PieceSource::Next) {
                    sources.push((PieceSource::Next, next));
                }
            }
        }
    }

    let mut placements = vec![];
    for (source, piece) in sources {
        placements.extend(
            find_moves(&state.board, piece)
                .into_iter()
                .map(|location| Placement { location, source }),
        );
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use libtetris::{CellColor, PieceState, HEIGHT};
    use std::collections::HashSet;

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

    fn assert_valid(board: &Board, moves: &[FallingPiece]) {
        let mut keys = HashSet::new();
        for m in moves {
            let c = m.canonical();
            assert!(keys.insert((c.x, c.y, c.kind.1)), "duplicate key {:?}", m);
            assert!(!board.obstructed(m), "obstructed {:?}", m);
            assert!(!m.can_fall(board), "floating {:?}", m);
        }
    }

    #[test]
    fn empty_board_placements_are_unique_and_resting() {
        let board = Board::new();
        for &piece in &Piece::ALL {
            let moves = find_moves(&board, piece);
            assert!(!moves.is_empty());
            assert_valid(&board, &moves);
        }
    }

    #[test]
    fn o_piece_has_nine_columns() {
        let moves = find_moves(&Board::new(), Piece::O);
        assert_eq!(moves.len(), 9);
    }

    #[test]
    fn t_has_all_orientations_on_empty_board() {
        let moves = find_moves(&Board::new(), Piece::T);
        // Eight columns for the flat orientations, nine for the upright ones.
        assert_eq!(moves.len(), 8 + 9 + 8 + 9);
    }

    #[test]
    fn rough_board_placements_are_unique_and_resting() {
        let board = board_from(&[
            "....#.....",
            "##..##...#",
            "###.####.#",
            "#.########",
            "####.#####",
        ]);
        for &piece in &Piece::ALL {
            assert_valid(&board, &find_moves(&board, piece));
        }
    }

    #[test]
    fn finds_tspin_double_slot() {
        let board = board_from(&[
            "###.......",
            "##...#####",
            "###.######",
        ]);
        let moves = find_moves(&board, Piece::T);
        let slot = moves.iter().find(|m| {
            m.kind == PieceState(Piece::T, RotationState::South) && m.x == 2 && m.y == 16
        });
        let slot = slot.expect("tsd slot not found");
        assert!(slot.rotated);
    }

    #[test]
    fn hold_alternatives() {
        let board = Board::new();
        let state = GameState::new(board.clone(), vec![Piece::T, Piece::I], None);
        let placements = find_placements(&state, true);
        assert!(placements.iter().any(|p| p.source == PieceSource::Next));
        assert!(placements.iter().all(|p| p.source != PieceSource::Hold));

        let without = find_placements(&state, false);
        assert!(without.iter().all(|p| p.source == PieceSource::Current));

        let same = GameState::new(board.clone(), vec![Piece::T, Piece::I], Some(Piece::T));
        assert!(find_placements(&same, true)
            .iter()
            .all(|p| p.source == PieceSource::Current));

        let held = GameState::new(board, vec![Piece::T, Piece::I], Some(Piece::O));
        let placements = find_placements(&held, true);
        assert!(placements
            .iter()
            .any(|p| p.source == PieceSource::Hold && p.location.kind.0 == Piece::O));
        assert!(placements.iter().all(|p| p.source != PieceSource::Next));
    }
}
