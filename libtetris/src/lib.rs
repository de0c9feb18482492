mod board;
mod piece;
mod lock_data;
mod state;

pub use board::*;
pub use piece::*;
pub use lock_data::*;
pub use state::*;
