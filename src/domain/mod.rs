pub mod flag;
pub mod result;
pub mod rule;

pub use flag::{parse_rollout, Flag, InvalidRollout, FULL_ROLLOUT};
pub use result::{EvalResult, Reason};
pub use rule::TargetingRule;
