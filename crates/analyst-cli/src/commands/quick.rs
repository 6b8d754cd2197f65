use clap::Args;
use serde_json::Value;

use analyst_core::quick::{evaluate_quick_model, QuickModel};

use crate::input;

/// Arguments for a back-of-the-envelope valuation
#[derive(Args)]
pub struct QuickArgs {
    /// Path to JSON input file, tagged by "model" (dcf, comps, epv, lbo)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_quick(args: QuickArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model: QuickModel = input::require_model_input(args.input.as_deref(), "quick")?;
    let result = evaluate_quick_model(&model)?;
    Ok(serde_json::to_value(result)?)
}
