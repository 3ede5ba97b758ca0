//! Command implementations.

pub mod poll;
pub mod reconcile;
pub mod rules;
pub mod run;

pub use self::poll::execute_poll;
pub use self::reconcile::execute_reconcile;
pub use self::rules::execute_rules;
pub use self::run::execute_run;
