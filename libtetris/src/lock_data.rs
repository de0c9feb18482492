use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::board::HEIGHT;
use crate::piece::{Piece, TspinStatus};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LockResult {
    pub piece: Piece,
    pub placement_kind: PlacementKind,
    pub spin: TspinStatus,
    pub b2b: bool,
    pub combo: Option<u32>,
    pub garbage_sent: u32,
    pub perfect_clear: bool,
    pub cleared_lines: ArrayVec<[usize; HEIGHT]>,
    pub garbage_received: u32,
    pub topped_out: bool,
}

impl LockResult {
    /// A T placement that realized no spin-clear. Mini singles count as wasted.
    pub fn wasted_t(&self) -> bool {
        self.piece == Piece::T
            && (self.cleared_lines.is_empty() || self.placement_kind == PlacementKind::MiniTspin1)
    }

    /// Short code naming the clear, as reported to protocol clients.
    pub fn action(&self) -> &'static str {
        if self.perfect_clear {
            "PC"
        } else {
            self.placement_kind.code()
        }
    }
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum PlacementKind {
    None,
    Clear1,
    Clear2,
    Clear3,
    Clear4,
    MiniTspin,
    MiniTspin1,
    Tspin,
    Tspin1,
    Tspin2,
    Tspin3,
}

impl PlacementKind {
    /// The amount of garbage this clear kind normally sends.
    pub fn garbage(self) -> u32 {
        use PlacementKind::*;
        match self {
            None | MiniTspin | Tspin | Clear1 | MiniTspin1 => 0,
            Clear2 => 1,
            Clear3 | Tspin1 => 2,
            Clear4 | Tspin2 => 4,
            Tspin3 => 6,
        }
    }

    /// Whether or not this placement does back-to-backs.
    pub fn is_hard(self) -> bool {
        use PlacementKind::*;
        match self {
            Clear4 | MiniTspin1 | Tspin1 | Tspin2 | Tspin3 => true,
            _ => false,
        }
    }

    /// Whether or not a back-to-back chain adds its bonus to this placement.
    pub fn earns_b2b_bonus(self) -> bool {
        self.is_hard() && self != PlacementKind::MiniTspin1
    }

    /// Whether or not this placement did a line clear.
    pub fn is_clear(self) -> bool {
        match self {
            PlacementKind::None | PlacementKind::MiniTspin | PlacementKind::Tspin => false,
            _ => true,
        }
    }

    /// Mini spins only distinguish themselves on a single; with more lines they score as full
    /// spins. Four or more lines are always a quad.
    pub fn get(cleared: usize, tspin: TspinStatus) -> Self {
        match (cleared, tspin) {
            (0, TspinStatus::None) => PlacementKind::None,
            (0, TspinStatus::Mini) => PlacementKind::MiniTspin,
            (0, _) => PlacementKind::Tspin,
            (1, TspinStatus::None) => PlacementKind::Clear1,
            (1, TspinStatus::Mini) => PlacementKind::MiniTspin1,
            (1, _) => PlacementKind::Tspin1,
            (2, TspinStatus::None) => PlacementKind::Clear2,
            (2, _) => PlacementKind::Tspin2,
            (3, TspinStatus::None) => PlacementKind::Clear3,
            (3, _) => PlacementKind::Tspin3,
            _ => PlacementKind::Clear4,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            PlacementKind::None | PlacementKind::MiniTspin | PlacementKind::Tspin => "",
            PlacementKind::Clear1 => "CLEAR1",
            PlacementKind::Clear2 => "CLEAR2",
            PlacementKind::Clear3 => "CLEAR3",
            PlacementKind::Clear4 => "CLEAR4",
            PlacementKind::MiniTspin1 => "TSMS",
            PlacementKind::Tspin1 => "TSS",
            PlacementKind::Tspin2 => "TSD",
            PlacementKind::Tspin3 => "TST",
        }
    }
}

impl Default for PlacementKind {
    fn default() -> Self {
        PlacementKind::None
    }
}

pub const B2B_BONUS: u32 = 1;
pub const PERFECT_CLEAR_GARBAGE: u32 = 10;

pub const COMBO_GARBAGE: [u32; 13] = [0, 0, 1, 1, 1, 2, 2, 3, 3, 4, 4, 4, 5];

pub fn combo_garbage(combo: u32) -> u32 {
    COMBO_GARBAGE[(combo as usize).min(COMBO_GARBAGE.len() - 1)]
}

#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub pieces: u64,
    pub lines: u64,
    pub attack: u64,

    pub singles: u64,
    pub doubles: u64,
    pub triples: u64,
    pub tetrises: u64,
    pub tspin_zeros: u64,
    pub tspin_singles: u64,
    pub tspin_doubles: u64,
    pub tspin_triples: u64,
    pub mini_tspin_zeros: u64,
    pub mini_tspin_singles: u64,
    pub perfect_clears: u64,
    pub max_combo: u64,

    pub wasted_t: u64,
    pub back_to_backs: u64,
    pub combo_attack: u64,
    pub clean_received: u64,
    pub messy_received: u64,
    /// Highest value the spike accumulator has reached.
    pub spike: f64,
}

impl Statistics {
    /// Folds a lock into the running totals. Garbage receipt and spike are tracked by the game
    /// state, which knows where the rows came from.
    pub fn update(&mut self, l: &LockResult) {
        self.attack += l.garbage_sent as u64;
        self.lines += l.cleared_lines.len() as u64;
        self.pieces += 1;

        if l.perfect_clear {
            self.perfect_clears += 1;
        }
        if l.b2b {
            self.back_to_backs += 1;
        }
        if let Some(combo) = l.combo {
            self.combo_attack += combo_garbage(combo) as u64;
            if combo as u64 > self.max_combo {
                self.max_combo = combo as u64;
            }
        }
        if l.wasted_t() {
            self.wasted_t += 1;
        }

        match l.placement_kind {
            PlacementKind::None => {}
            PlacementKind::Clear1 => self.singles += 1,
            PlacementKind::Clear2 => self.doubles += 1,
            PlacementKind::Clear3 => self.triples += 1,
            PlacementKind::Clear4 => self.tetrises += 1,
            PlacementKind::Tspin => self.tspin_zeros += 1,
            PlacementKind::Tspin1 => self.tspin_singles += 1,
            PlacementKind::Tspin2 => self.tspin_doubles += 1,
            PlacementKind::Tspin3 => self.tspin_triples += 1,
            PlacementKind::MiniTspin => self.mini_tspin_zeros += 1,
            PlacementKind::MiniTspin1 => self.mini_tspin_singles += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mini_spins_promote_past_one_line() {
        assert_eq!(PlacementKind::get(1, TspinStatus::Mini), PlacementKind::MiniTspin1);
        assert_eq!(PlacementKind::get(2, TspinStatus::Mini), PlacementKind::Tspin2);
        assert_eq!(PlacementKind::get(3, TspinStatus::Mini), PlacementKind::Tspin3);
        assert_eq!(PlacementKind::get(4, TspinStatus::Full), PlacementKind::Clear4);
    }

    #[test]
    fn combo_table_caps() {
        assert_eq!(combo_garbage(0), 0);
        assert_eq!(combo_garbage(2), 1);
        assert_eq!(combo_garbage(12), 5);
        assert_eq!(combo_garbage(40), 5);
    }

    #[test]
    fn mini_single_is_hard_without_bonus() {
        assert!(PlacementKind::MiniTspin1.is_hard());
        assert!(!PlacementKind::MiniTspin1.earns_b2b_bonus());
        assert!(PlacementKind::Clear4.earns_b2b_bonus());
        assert!(!PlacementKind::Clear3.is_hard());
    }
}
