pub mod admin;
pub mod api;
pub mod config;
pub mod domain;
pub mod evaluation;
pub mod observability;
pub mod rules;
pub mod storage;

pub use admin::{AdminError, FlagAdmin, FlagUpdate};
pub use config::Config;
pub use domain::{EvalResult, Flag, Reason, TargetingRule};
pub use evaluation::{EvaluationError, Evaluator};
pub use storage::{FlagStore, RuleStore, Store};
