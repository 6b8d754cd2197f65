pub mod cache;
pub mod config;
pub mod error;
pub mod numeric;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "lbo")]
pub mod lbo;

#[cfg(all(feature = "valuation", feature = "lbo"))]
pub mod quick;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "statistics")]
pub mod statistics;

pub use error::AnalystError;
pub use types::*;

/// Standard result type for all analyst computations
pub type AnalystResult<T> = Result<T, AnalystError>;
