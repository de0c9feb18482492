use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::prelude::*;
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

pub mod evaluation;
pub mod moves;
pub mod tree;

use libtetris::*;
use crate::evaluation::Evaluator;
pub use crate::moves::Placement;
use crate::tree::Tree;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub use_hold: bool,
    pub max_iterations: u32,
    /// The think loop hands control back to the caller every this many iterations, and checks
    /// for cancellation at the same point.
    pub yield_every: u32,
    pub seed: u64,
    pub profile: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            use_hold: true,
            max_iterations: 10_000,
            yield_every: 50,
            seed: 0x5EED,
            profile: "default".to_owned(),
        }
    }
}

/// Shared stop flag for a running think. Clones refer to the same flag, so another thread can
/// hold one and cancel the engine's search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EngineError {
    /// No state has been loaded yet.
    NotLoaded,
    MoveOutOfRange { index: usize, len: usize },
    /// The placement overlaps the board.
    IllegalMove,
    /// The placed piece is neither the current piece nor reachable through hold.
    PieceUnavailable,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::NotLoaded => write!(f, "no game state has been loaded"),
            EngineError::MoveOutOfRange { index, len } => {
                write!(f, "move index {} out of range ({} moves)", index, len)
            }
            EngineError::IllegalMove => write!(f, "placement collides with the board"),
            EngineError::PieceUnavailable => {
                write!(f, "piece is not the current piece and can't be reached through hold")
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ThinkOutcome {
    pub iterations: u32,
    pub cancelled: bool,
}

/// How a commit was carried into the tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommitMode {
    /// The move was already in the tree; its subtree became the new tree.
    Reused,
    /// The move was never searched, so the tree was started over from the resulting state.
    Rebuilt,
}

/// A move the engine can suggest, with the state it leads to.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub mv: Placement,
    pub lock: LockResult,
    pub state: GameState,
    pub value: f64,
    pub dead: bool,
}

/// A search session: the tree, the weights it scores with, and its stop flag.
pub struct Engine<E: Evaluator> {
    eval: E,
    options: Options,
    tree: Option<Tree>,
    rng: Pcg64Mcg,
    cancel: CancelToken,
    iterations: u64,
}

impl<E: Evaluator> Engine<E> {
    pub fn new(eval: E, options: Options) -> Self {
        Engine {
            rng: Pcg64Mcg::seed_from_u64(options.seed),
            eval,
            options,
            tree: None,
            cancel: CancelToken::default(),
            iterations: 0,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn evaluator(&self) -> &E {
        &self.eval
    }

    /// Swaps the weights. Values already in the tree keep the old scoring until reloaded.
    pub fn set_evaluator(&mut self, eval: E) {
        self.eval = eval;
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Starts a fresh tree at `state` and expands its root.
    pub fn load(&mut self, state: GameState) {
        let mut tree = Tree::new(state, self.options.use_hold);
        tree.expand(tree::ROOT, &self.eval);
        tree.backprop(tree::ROOT);
        self.tree = Some(tree);
        self.iterations = 0;
    }

    /// Drops the loaded state.
    pub fn reset(&mut self) {
        self.tree = None;
        self.iterations = 0;
    }

    pub fn state(&self) -> Option<&GameState> {
        self.tree.as_ref().map(|t| &t.root().state)
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Iterations run since the last load or commit.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Runs one select, expand and backpropagate round. Returns false if the selected leaf had
    /// nothing left to expand.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        let tree = self.tree.as_mut().ok_or(EngineError::NotLoaded)?;
        let leaf = tree.select(&mut self.rng);
        let expanded = tree.expand(leaf, &self.eval);
        if expanded {
            tree.backprop(leaf);
        }
        self.iterations += 1;
        Ok(expanded)
    }

    /// Grows the tree until `max_iterations` rounds have run since the last load or commit.
    ///
    /// Every `yield_every` rounds, starting before the first, `yield_now` is called and the
    /// cancel token is checked. A cancelled think stops there and keeps everything it found;
    /// calling `think` again picks up the remaining rounds. The token is not cleared here, so a
    /// token cancelled before the call stops the think at once.
    pub fn think(&mut self, mut yield_now: impl FnMut()) -> Result<ThinkOutcome, EngineError> {
        if self.tree.is_none() {
            return Err(EngineError::NotLoaded);
        }
        let yield_every = self.options.yield_every.max(1);
        let mut iterations = 0;
        while self.iterations < self.options.max_iterations as u64 {
            if iterations % yield_every == 0 {
                yield_now();
                if self.cancel.is_cancelled() {
                    return Ok(ThinkOutcome { iterations, cancelled: true });
                }
            }
            self.step()?;
            iterations += 1;
        }
        Ok(ThinkOutcome { iterations, cancelled: false })
    }

    /// Root moves, best first, followed by moves that top out.
    pub fn best_moves(&self) -> Result<Vec<Candidate>, EngineError> {
        let tree = self.tree.as_ref().ok_or(EngineError::NotLoaded)?;
        Ok(tree.candidates().filter_map(to_candidate).collect())
    }

    /// The best line found so far.
    pub fn plan(&self) -> Result<Vec<Candidate>, EngineError> {
        let tree = self.tree.as_ref().ok_or(EngineError::NotLoaded)?;
        Ok(tree.plan().into_iter().filter_map(to_candidate).collect())
    }

    /// Plays `mv` from the current state.
    ///
    /// If the move was searched, its subtree becomes the tree. Otherwise the move is checked,
    /// applied, and the search starts over from the result. A rejected move leaves the engine
    /// as it was.
    pub fn commit(&mut self, mv: &Placement) -> Result<CommitMode, EngineError> {
        let tree = self.tree.as_mut().ok_or(EngineError::NotLoaded)?;
        if tree.advance(mv) {
            self.iterations = 0;
            return Ok(CommitMode::Reused);
        }

        let state = &tree.root().state;
        if state.piece_for(mv.source) != Some(mv.location.kind.0) {
            return Err(EngineError::PieceUnavailable);
        }
        if state.board.obstructed(&mv.location) {
            return Err(EngineError::IllegalMove);
        }
        let (next, _) = state.apply(&mv.location, mv.source);
        tree.rebuild(next);
        tree.expand(tree::ROOT, &self.eval);
        tree.backprop(tree::ROOT);
        self.iterations = 0;
        Ok(CommitMode::Rebuilt)
    }

    /// Plays the `index`th move of `best_moves`.
    pub fn commit_index(&mut self, index: usize) -> Result<CommitMode, EngineError> {
        let moves = self.best_moves()?;
        let mv = match moves.get(index) {
            Some(c) => c.mv,
            None => return Err(EngineError::MoveOutOfRange { index, len: moves.len() }),
        };
        self.commit(&mv)
    }

    /// Adds a newly revealed piece to the end of the queue.
    pub fn add_next_piece(&mut self, piece: Piece) -> Result<(), EngineError> {
        let tree = self.tree.as_mut().ok_or(EngineError::NotLoaded)?;
        tree.add_next_piece(piece);
        Ok(())
    }
}

fn to_candidate(node: &tree::Node) -> Option<Candidate> {
    let (mv, lock) = node.arrival.clone()?;
    Some(Candidate {
        mv,
        lock,
        state: node.state.clone(),
        value: node.value,
        dead: node.dead,
    })
}
