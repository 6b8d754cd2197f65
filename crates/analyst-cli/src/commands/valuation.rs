use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use analyst_core::config::EngineConfig;
use analyst_core::valuation::dcf::ReinvestmentModel;
use analyst_core::valuation::{DcfAssumptions, ValuationEngine, ValuationInput};

use crate::input;

/// Arguments for the DCF valuation model
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcfArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Ticker or label for the company
    #[arg(long, default_value = "N/A")]
    pub symbol: String,

    /// Latest annual revenue
    #[arg(long)]
    pub revenue: Option<Decimal>,

    /// Diluted shares outstanding
    #[arg(long)]
    pub shares: Option<Decimal>,

    /// Current share price, enables the recommendation
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Total debt
    #[arg(long)]
    pub debt: Option<Decimal>,

    /// Cash and equivalents
    #[arg(long)]
    pub cash: Option<Decimal>,

    /// Revenue growth rate (e.g. 0.08 for 8%)
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// EBIT margin
    #[arg(long)]
    pub ebit_margin: Option<Decimal>,

    /// EBITDA margin, used when no EBIT margin is given
    #[arg(long)]
    pub ebitda_margin: Option<Decimal>,

    /// Discount rate (WACC)
    #[arg(long, alias = "discount-rate")]
    pub wacc: Option<Decimal>,

    /// Terminal growth rate
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Marginal tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Projection years
    #[arg(long, default_value = "5")]
    pub years: u32,
}

pub fn run_dcf(args: DcfArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let dcf_input: ValuationInput = if let Some(parsed) = input::read_model_input(args.input.as_deref())? {
        parsed
    } else {
        ValuationInput {
            symbol: args.symbol,
            current_revenue: args
                .revenue
                .ok_or("--revenue is required (or provide --input)")?,
            current_price: args.price,
            shares_outstanding: args
                .shares
                .ok_or("--shares is required (or provide --input)")?,
            total_debt: args.debt.unwrap_or_default(),
            cash: args.cash.unwrap_or_default(),
            minority_interest: None,
            currency: Default::default(),
            assumptions: DcfAssumptions {
                revenue_growth_rate: args
                    .growth_rate
                    .ok_or("--growth-rate is required (or provide --input)")?,
                ebit_margin: args.ebit_margin,
                ebitda_margin: args.ebitda_margin,
                terminal_margin: None,
                wacc: args.wacc.ok_or("--wacc is required (or provide --input)")?,
                terminal_growth_rate: args
                    .terminal_growth
                    .ok_or("--terminal-growth is required (or provide --input)")?,
                tax_rate: args
                    .tax_rate
                    .ok_or("--tax-rate is required (or provide --input)")?,
                projection_years: args.years,
                reinvestment: ReinvestmentModel::default(),
                mid_year_convention: None,
            },
            scenario_shifts: None,
            sensitivity: None,
        }
    };

    let engine = ValuationEngine::new(config);
    let result = engine.build(&dcf_input)?;
    Ok(serde_json::to_value(&*result)?)
}
