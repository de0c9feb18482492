use std::fmt;

use serde::{Deserialize, Serialize};

use super::Standard;

/// Number of coefficients in a flat weight profile.
pub const COEFFICIENTS: usize = 45;

pub const PROFILE_NAMES: [&str; 5] = [
    "default",
    "right_well_flat",
    "stable_stack",
    "cc_standard_like",
    "cc_fast_like",
];

/// A named weight set in its flat, serialized form.
///
/// Coefficient order: back_to_back, bumpiness, bumpiness_sq, row_transitions, height, top_half,
/// top_quarter, cavity_cells, cavity_cells_sq, overhang_cells, overhang_cells_sq, covered_cells,
/// covered_cells_sq, tslot[0..4], well_depth, max_well_depth, well_column[0..10], wasted_t,
/// b2b_clear, clear1, clear2, clear3, clear4, tspin1, tspin2, tspin3, mini_tspin1, mini_tspin2,
/// perfect_clear, combo_garbage, tank[clean, messy], spike.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub name: String,
    pub version: u32,
    pub coefficients: Vec<i32>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProfileError {
    UnknownProfile(String),
    WrongLength(usize),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProfileError::UnknownProfile(name) => write!(
                f,
                "unknown weight profile '{}' (known: {})",
                name,
                PROFILE_NAMES.join(", ")
            ),
            ProfileError::WrongLength(len) => write!(
                f,
                "weight profile has {} coefficients, expected {}",
                len, COEFFICIENTS
            ),
        }
    }
}

impl std::error::Error for ProfileError {}

impl WeightProfile {
    pub fn new(name: &str, weights: &Standard) -> Self {
        WeightProfile {
            name: name.to_owned(),
            version: 1,
            coefficients: weights.to_array().to_vec(),
        }
    }

    pub fn to_weights(&self) -> Result<Standard, ProfileError> {
        if self.coefficients.len() != COEFFICIENTS {
            return Err(ProfileError::WrongLength(self.coefficients.len()));
        }
        let mut flat = [0; COEFFICIENTS];
        flat.copy_from_slice(&self.coefficients);
        let mut weights = Standard::from_array(&flat);
        weights.sub_name = Some(self.name.clone());
        Ok(weights)
    }
}

const DEFAULT: [i32; COEFFICIENTS] = [
    52, -24, -7, -5, -39, -150, -511, -173, -3, -34, -1, -17, -1,
    8, 148, 192, 407,
    57, 17,
    -30, -50, 20, 50, 60, 60, 50, 20, -50, -30,
    -152, 104, -143, -100, -58, 390, 121, 410, 602, -158, -93, 999, 200, 17, 4, 115,
];

const RIGHT_WELL_FLAT: [i32; COEFFICIENTS] = [
    52, -24, -7, -5, -39, -150, -511, -500, -500, -500, -500, -500, -500,
    -9999, -9999, -9999, -9999,
    57, 17,
    -9999, -9999, -9999, -9999, -9999, -9999, -9999, -9999, -9999, 0,
    0, 104, -500, -500, -500, 500, -9999, -9999, -9999, -9999, -9999, 0, 200, 17, 4, 115,
];

const CC_FAST_LIKE: [i32; COEFFICIENTS] = [
    10, -7, -28, -5, -46, -126, -493, -176, -6, -47, -9, -25, 1,
    0, 150, 296, 207,
    158, -2,
    31, 16, -41, 37, 49, 30, 56, 48, -27, 22,
    -147, 74, -122, -174, 11, 424, 131, 392, 628, -188, -682, 991, 272, 0, 0, 0,
];

impl Default for Standard {
    fn default() -> Self {
        Standard::from_array(&DEFAULT)
    }
}

impl Standard {
    /// Looks up one of the built-in profiles by name.
    pub fn profile(name: &str) -> Result<Standard, ProfileError> {
        let mut weights = match name {
            "default" => Standard::from_array(&DEFAULT),
            "right_well_flat" => Standard::from_array(&RIGHT_WELL_FLAT),
            "stable_stack" => Standard {
                cavity_cells: -500,
                cavity_cells_sq: -500,
                tspin1: 50,
                tspin2: 510,
                perfect_clear: -9000,
                ..Standard::from_array(&DEFAULT)
            },
            "cc_standard_like" => Standard {
                well_column: [20, 23, 20, 50, 59, 21, 59, 10, -10, 24],
                combo_garbage: 150,
                ..Standard::from_array(&DEFAULT)
            },
            "cc_fast_like" => Standard::from_array(&CC_FAST_LIKE),
            _ => return Err(ProfileError::UnknownProfile(name.to_owned())),
        };
        if name != "default" {
            weights.sub_name = Some(name.to_owned());
        }
        Ok(weights)
    }

    pub fn from_array(w: &[i32; COEFFICIENTS]) -> Standard {
        let mut well_column = [0; 10];
        well_column.copy_from_slice(&w[19..29]);
        Standard {
            back_to_back: w[0],
            bumpiness: w[1],
            bumpiness_sq: w[2],
            row_transitions: w[3],
            height: w[4],
            top_half: w[5],
            top_quarter: w[6],
            cavity_cells: w[7],
            cavity_cells_sq: w[8],
            overhang_cells: w[9],
            overhang_cells_sq: w[10],
            covered_cells: w[11],
            covered_cells_sq: w[12],
            tslot: [w[13], w[14], w[15], w[16]],
            well_depth: w[17],
            max_well_depth: w[18],
            well_column,
            wasted_t: w[29],
            b2b_clear: w[30],
            clear1: w[31],
            clear2: w[32],
            clear3: w[33],
            clear4: w[34],
            tspin1: w[35],
            tspin2: w[36],
            tspin3: w[37],
            mini_tspin1: w[38],
            mini_tspin2: w[39],
            perfect_clear: w[40],
            combo_garbage: w[41],
            tank: [w[42], w[43]],
            spike: w[44],
            sub_name: None,
        }
    }

    pub fn to_array(&self) -> [i32; COEFFICIENTS] {
        let mut w = [0; COEFFICIENTS];
        w[..13].copy_from_slice(&[
            self.back_to_back,
            self.bumpiness,
            self.bumpiness_sq,
            self.row_transitions,
            self.height,
            self.top_half,
            self.top_quarter,
            self.cavity_cells,
            self.cavity_cells_sq,
            self.overhang_cells,
            self.overhang_cells_sq,
            self.covered_cells,
            self.covered_cells_sq,
        ]);
        w[13..17].copy_from_slice(&self.tslot);
        w[17] = self.well_depth;
        w[18] = self.max_well_depth;
        w[19..29].copy_from_slice(&self.well_column);
        w[29..].copy_from_slice(&[
            self.wasted_t,
            self.b2b_clear,
            self.clear1,
            self.clear2,
            self.clear3,
            self.clear4,
            self.tspin1,
            self.tspin2,
            self.tspin3,
            self.mini_tspin1,
            self.mini_tspin2,
            self.perfect_clear,
            self.combo_garbage,
            self.tank[0],
            self.tank[1],
            self.spike,
        ]);
        w
    }
}
