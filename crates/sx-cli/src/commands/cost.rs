//! `sx cost`: dollar estimate for one session.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use sx_core::{CostBreakdown, PricingTable, TokenStats, estimate, parse_file};

use crate::Config;

/// Everything the cost renderers need.
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub model: String,
    pub pricing: PricingTable,
    pub tokens: TokenStats,
    pub cost: CostBreakdown,
}

impl CostReport {
    pub fn new(model: impl Into<String>, pricing: PricingTable, tokens: TokenStats) -> Self {
        Self {
            model: model.into(),
            pricing,
            tokens,
            cost: estimate(&tokens, &pricing),
        }
    }
}

fn usd(amount: f64) -> String {
    format!("${amount:.4}")
}

/// Formats a cost report as a markdown table.
pub fn format_cost(report: &CostReport) -> String {
    let mut output = String::new();
    let (p, t, c) = (&report.pricing, &report.tokens, &report.cost);

    writeln!(output, "COST ESTIMATE ({})", report.model).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| Category | Tokens | $/MTok | Cost |").unwrap();
    writeln!(output, "|----------|--------|--------|------|").unwrap();
    for (label, tokens, price, cost) in [
        ("Input", t.input, p.input, c.input_cost),
        ("Output", t.output, p.output, c.output_cost),
        ("Cache read", t.cache_read, p.cache_read, c.cache_read_cost),
        ("Cache create", t.cache_create, p.cache_create, c.cache_create_cost),
    ] {
        writeln!(output, "| {label} | {tokens} | {price:.2} | {} |", usd(cost)).unwrap();
    }
    writeln!(output, "| Total | {} | | {} |", t.total(), usd(c.total)).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Cache savings: {}", usd(c.cache_savings)).unwrap();
    output
}

/// Formats a cost report as JSON.
pub fn format_cost_json(report: &CostReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Runs the cost command.
pub fn run(config: &Config, path: &Path, model: Option<&str>, json: bool) -> Result<()> {
    let model = model.unwrap_or(config.model.as_str());
    let pricing = config.pricing_for(model).with_context(|| {
        let known: Vec<&str> = config.pricing.keys().map(String::as_str).collect();
        format!("unknown model: {model} (configured: {})", known.join(", "))
    })?;

    let session =
        parse_file(path).with_context(|| format!("failed to read session {}", path.display()))?;
    let report = CostReport::new(model, pricing, session.stats.tokens);

    if json {
        println!("{}", format_cost_json(&report)?);
    } else {
        print!("{}", format_cost(&report));
    }
    Ok(())
}
