pub mod dcf;
pub mod model;
pub mod recommendation;
pub mod scenarios;
pub mod sensitivity;

pub use dcf::{calculate_dcf, calculate_terminal_value, DcfAssumptions, ValuationInput};
pub use model::{build_valuation_model, ValuationEngine, ValuationModelOutput};
pub use recommendation::Rating;
