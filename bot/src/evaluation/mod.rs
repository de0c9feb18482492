use libtetris::GameState;

mod profile;
mod standard;
pub use self::profile::{ProfileError, WeightProfile, COEFFICIENTS, PROFILE_NAMES};
pub use self::standard::Standard;

pub trait Evaluator: Send + Sync {
    fn name(&self) -> String;

    /// Scores a state reached by the search. Higher is better.
    fn evaluate(&self, state: &GameState) -> f64;
}

impl<T: Evaluator> Evaluator for std::sync::Arc<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn evaluate(&self, state: &GameState) -> f64 {
        (**self).evaluate(state)
    }
}
