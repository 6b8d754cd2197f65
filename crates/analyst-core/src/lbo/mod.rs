pub mod debt_schedule;
pub mod model;
pub mod returns;
pub mod transaction;

pub use model::{build_lbo_model, LboEngine, LboInput, LboModelOutput};
pub use returns::{calculate_returns, ReturnsInput, ReturnsOutput};
