pub mod lbo;
pub mod monte_carlo;
pub mod quick;
pub mod statistics;
pub mod valuation;
