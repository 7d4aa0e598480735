mod check;
mod plan;

pub use check::run_check;
pub use plan::{run_plan, PlanMode};
