pub mod bucket;
pub mod evaluator;

pub use bucket::bucket;
pub use evaluator::Evaluator;

use thiserror::Error;

/// Infrastructure failure during an evaluation. Not-found and disabled
/// flags are ordinary results, never errors.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("flag store lookup failed: {0:#}")]
    FlagStore(anyhow::Error),

    #[error("rule store lookup failed: {0:#}")]
    RuleStore(anyhow::Error),
}
