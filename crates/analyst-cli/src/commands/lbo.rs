use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use analyst_core::config::EngineConfig;
use analyst_core::lbo::{calculate_returns, LboEngine, LboInput, ReturnsInput};

use crate::input;

/// Arguments for the leveraged buyout model
#[derive(Args)]
pub struct LboArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a standalone IRR/MOIC calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ReturnsArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated cash flows, first is the (negative) investment
    #[arg(long, value_delimiter = ',')]
    pub cash_flows: Option<Vec<Decimal>>,
}

pub fn run_lbo(args: LboArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let lbo_input: LboInput = input::require_model_input(args.input.as_deref(), "lbo")?;

    let engine = LboEngine::new(config);
    let result = engine.build(&lbo_input)?;
    Ok(serde_json::to_value(&*result)?)
}

pub fn run_returns(args: ReturnsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let returns_input: ReturnsInput = if let Some(parsed) = input::read_model_input(args.input.as_deref())? {
        parsed
    } else {
        ReturnsInput {
            cash_flows: args
                .cash_flows
                .ok_or("--cash-flows is required (or provide --input)")?,
            dated_cash_flows: None,
        }
    };
    let result = calculate_returns(&returns_input)?;
    Ok(serde_json::to_value(result)?)
}
