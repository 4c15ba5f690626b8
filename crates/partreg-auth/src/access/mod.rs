//! Authorization evaluation.

pub mod evaluator;

pub use evaluator::AccessEvaluator;
