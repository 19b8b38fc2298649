pub mod evaluator;
pub mod requirement;

pub use evaluator::*;
pub use requirement::*;
