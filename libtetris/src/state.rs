use std::collections::VecDeque;

use rand::prelude::*;
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::*;

/// Where the placed piece came from.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum PieceSource {
    /// The head of the queue.
    Current,
    /// The held piece, swapped for the head of the queue.
    Hold,
    /// The piece after the head, with the head going into an empty hold slot.
    Next,
}

/// A snapshot of everything the rules need to advance a game.
///
/// States are never changed in place by the rules: `apply` clones and returns a new state, so
/// search branches can share a parent without interfering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub queue: VecDeque<Piece>,
    pub hold: Option<Piece>,
    /// Consecutive clearing placements, or -1 when no combo is running.
    pub combo: i32,
    pub b2b: bool,
    pub stats: Statistics,
    /// Pending garbage, in rows per attack, oldest first.
    pub incoming: VecDeque<u32>,
    /// Spike accumulator. Negative values mean the last placement sent nothing.
    pub spike: f64,
    pub garbage_seed: u64,
}

impl GameState {
    pub fn new(board: Board, queue: impl IntoIterator<Item = Piece>, hold: Option<Piece>) -> Self {
        GameState {
            board,
            queue: queue.into_iter().collect(),
            hold,
            combo: -1,
            b2b: false,
            stats: Statistics::default(),
            incoming: VecDeque::new(),
            spike: 0.0,
            garbage_seed: 0,
        }
    }

    pub fn current(&self) -> Option<Piece> {
        self.queue.front().copied()
    }

    /// The piece a placement from `source` would use, if that source is available.
    pub fn piece_for(&self, source: PieceSource) -> Option<Piece> {
        match source {
            PieceSource::Current => self.current(),
            PieceSource::Hold => self.hold,
            PieceSource::Next => match self.hold {
                None => self.queue.get(1).copied(),
                Some(_) => None,
            },
        }
    }

    /// Works out where a piece of the given type would be taken from, preferring the current
    /// piece, then hold, then the piece after the current one.
    pub fn source_of(&self, piece: Piece) -> Option<PieceSource> {
        [PieceSource::Current, PieceSource::Hold, PieceSource::Next]
            .iter()
            .copied()
            .find(|&source| self.piece_for(source) == Some(piece))
    }

    pub fn add_next_piece(&mut self, piece: Piece) {
        self.queue.push_back(piece);
    }

    pub fn add_incoming(&mut self, rows: u32) {
        if rows > 0 {
            self.incoming.push_back(rows);
        }
    }

    pub fn incoming_total(&self) -> u32 {
        self.incoming.iter().sum()
    }

    /// Locks `piece`, taken from `source`, and returns the resulting state.
    ///
    /// Does all the rules bookkeeping: spin detection, line clears, attack, combo and
    /// back-to-back, garbage cancelling and receiving, spike, waste, queue and hold, and top-out
    /// detection for the next spawn.
    pub fn apply(&self, piece: &FallingPiece, source: PieceSource) -> (GameState, LockResult) {
        debug_assert_eq!(self.piece_for(source), Some(piece.kind.0));
        let mut next = self.clone();

        next.board.place(piece);
        let spin = if piece.kind.0 == Piece::T && piece.rotated {
            tspin_status(&next.board, piece)
        } else {
            TspinStatus::None
        };

        let cleared_lines = next.board.remove_cleared_lines();
        let placement_kind = PlacementKind::get(cleared_lines.len(), spin);
        let perfect_clear = !cleared_lines.is_empty() && next.board.is_empty();

        let mut garbage_sent = 0;
        let mut did_b2b = false;
        let mut combo = None;
        let mut garbage_received = 0;

        if placement_kind.is_clear() {
            garbage_sent = placement_kind.garbage();
            if placement_kind.is_hard() {
                if next.b2b {
                    did_b2b = true;
                    if placement_kind.earns_b2b_bonus() {
                        garbage_sent += B2B_BONUS;
                    }
                }
                next.b2b = true;
            } else {
                next.b2b = false;
            }

            if perfect_clear {
                garbage_sent = PERFECT_CLEAR_GARBAGE;
            }

            next.combo += 1;
            let c = next.combo.max(0) as u32;
            combo = Some(c);
            garbage_sent += combo_garbage(c);

            next.cancel_incoming(garbage_sent);
        } else {
            next.combo = -1;
            garbage_received = next.receive_garbage();
        }

        next.update_spike(garbage_sent);

        match source {
            PieceSource::Current => {
                next.queue.pop_front();
            }
            PieceSource::Hold => {
                next.hold = next.queue.pop_front();
            }
            PieceSource::Next => {
                next.hold = next.queue.pop_front();
                next.queue.pop_front();
            }
        }

        let topped_out = match next.current() {
            Some(head) => match FallingPiece::spawn(head, &next.board) {
                Some(spawned) => next.board.touches_deadline(&spawned),
                None => true,
            },
            None => false,
        };

        let lock = LockResult {
            piece: piece.kind.0,
            placement_kind,
            spin,
            b2b: did_b2b,
            combo,
            garbage_sent,
            perfect_clear,
            cleared_lines,
            garbage_received,
            topped_out,
        };
        next.stats.update(&lock);

        (next, lock)
    }

    /// Uses outgoing attack to cancel pending garbage, oldest first.
    fn cancel_incoming(&mut self, mut attack: u32) {
        while attack > 0 {
            match self.incoming.front_mut() {
                Some(front) if *front > attack => {
                    *front -= attack;
                    attack = 0;
                }
                Some(front) => {
                    attack -= *front;
                    self.incoming.pop_front();
                }
                None => break,
            }
        }
    }

    /// Injects all pending garbage. Each pending attack gets its own gap column.
    fn receive_garbage(&mut self) -> u32 {
        if self.incoming.is_empty() {
            return 0;
        }
        let messy = self.incoming.len() > 1;
        let mut rng = Pcg64Mcg::seed_from_u64(self.garbage_seed);
        let mut total = 0;
        while let Some(rows) = self.incoming.pop_front() {
            let gap = rng.gen_range(0, WIDTH);
            for _ in 0..rows {
                self.board.push_garbage(gap);
            }
            total += rows;
        }
        self.garbage_seed = rng.gen();

        if messy {
            self.stats.messy_received += total as u64;
        } else {
            self.stats.clean_received += total as u64;
        }
        total
    }

    fn update_spike(&mut self, attack: u32) {
        let attack = attack as f64;
        if self.spike >= 0.0 {
            if attack > 0.0 {
                self.spike += attack;
            } else {
                self.spike = -self.spike;
            }
        } else if attack > 0.0 {
            self.spike = 0.7 * -self.spike + attack;
        } else {
            self.spike = 0.0;
        }
        if self.spike > self.stats.spike {
            self.stats.spike = self.spike;
        }
    }
}

/// Counts filled corners around a T at `piece`'s position as (pointing side, flat side).
pub fn tspin_corners(board: &Board, piece: &FallingPiece) -> (usize, usize) {
    let (x, y) = (piece.x, piece.y);
    let filled = |cx, cy| board.corner_occupied(cx, cy) as usize;
    let top_left = filled(x, y + 1);
    let top_right = filled(x + 2, y + 1);
    let bottom_left = filled(x, y + 3);
    let bottom_right = filled(x + 2, y + 3);
    match piece.kind.1 {
        RotationState::North => (top_left + top_right, bottom_left + bottom_right),
        RotationState::East => (top_right + bottom_right, top_left + bottom_left),
        RotationState::South => (bottom_left + bottom_right, top_left + top_right),
        RotationState::West => (top_left + bottom_left, top_right + bottom_right),
    }
}

/// The three-corner rule: both pointing corners and a flat corner make a full spin, one
/// pointing corner and both flat corners make a mini.
pub fn classify_corners(pointing: usize, flat: usize) -> TspinStatus {
    if pointing == 2 && flat >= 1 {
        TspinStatus::Full
    } else if pointing == 1 && flat == 2 {
        TspinStatus::Mini
    } else {
        TspinStatus::None
    }
}

pub fn tspin_status(board: &Board, piece: &FallingPiece) -> TspinStatus {
    if piece.y < -2 {
        return TspinStatus::None;
    }
    let (pointing, flat) = tspin_corners(board, piece);
    classify_corners(pointing, flat)
}
