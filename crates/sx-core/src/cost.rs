//! Token usage to dollar estimates.

use serde::{Deserialize, Serialize};

use crate::record::TokenStats;

const PER_MILLION: f64 = 1_000_000.0;

/// Prices in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    pub input: f64,
    pub output: f64,
    pub cache_read: f64,
    pub cache_create: f64,
}

impl PricingTable {
    pub const SONNET: Self = Self {
        input: 3.0,
        output: 15.0,
        cache_read: 0.30,
        cache_create: 3.75,
    };

    pub const OPUS: Self = Self {
        input: 15.0,
        output: 75.0,
        cache_read: 1.50,
        cache_create: 18.75,
    };

    pub const HAIKU: Self = Self {
        input: 0.80,
        output: 4.0,
        cache_read: 0.08,
        cache_create: 1.00,
    };

    /// Built-in table for a model family name, if there is one.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sonnet" => Some(Self::SONNET),
            "opus" => Some(Self::OPUS),
            "haiku" => Some(Self::HAIKU),
            _ => None,
        }
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::SONNET
    }
}

/// Dollar amounts for one [`TokenStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub cache_read_cost: f64,
    pub cache_create_cost: f64,
    pub total: f64,
    /// What the cache reads would have cost as fresh input, minus what they cost.
    /// Negative when the table prices cache reads above input.
    pub cache_savings: f64,
}

#[allow(clippy::cast_precision_loss)]
fn priced(count: u64, price: f64) -> f64 {
    count as f64 / PER_MILLION * price
}

pub fn estimate(tokens: &TokenStats, pricing: &PricingTable) -> CostBreakdown {
    let input_cost = priced(tokens.input, pricing.input);
    let output_cost = priced(tokens.output, pricing.output);
    let cache_read_cost = priced(tokens.cache_read, pricing.cache_read);
    let cache_create_cost = priced(tokens.cache_create, pricing.cache_create);

    CostBreakdown {
        input_cost,
        output_cost,
        cache_read_cost,
        cache_create_cost,
        total: input_cost + output_cost + cache_read_cost + cache_create_cost,
        cache_savings: priced(tokens.cache_read, pricing.input - pricing.cache_read),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_sonnet_example() {
        let cost = estimate(&TokenStats::new(1000, 500, 200, 0), &PricingTable::SONNET);

        assert!(close(cost.input_cost, 0.003));
        assert!(close(cost.output_cost, 0.0075));
        assert!(close(cost.cache_read_cost, 0.00006));
        assert!(close(cost.cache_create_cost, 0.0));
        assert!(close(cost.total, 0.01056));
        assert!(close(cost.cache_savings, 200.0 * 2.7 / 1e6));
    }

    #[test]
    fn test_zero_tokens_cost_nothing() {
        let cost = estimate(&TokenStats::default(), &PricingTable::OPUS);
        assert_eq!(cost, CostBreakdown::default());
    }

    #[test]
    fn test_linear_without_cache() {
        let pricing = PricingTable::SONNET;
        let one = estimate(&TokenStats::new(1234, 567, 0, 0), &pricing);
        let three = estimate(&TokenStats::new(3 * 1234, 3 * 567, 0, 0), &pricing);
        assert!(close(three.total, 3.0 * one.total));
    }

    #[test]
    fn test_moving_input_to_cache_never_increases_total() {
        for pricing in [PricingTable::SONNET, PricingTable::OPUS, PricingTable::HAIKU] {
            let mut previous = f64::INFINITY;
            for moved in (0..=10_000).step_by(1000) {
                let cost = estimate(&TokenStats::new(10_000 - moved, 100, moved, 0), &pricing);
                assert!(cost.total <= previous + 1e-15);
                assert!(cost.cache_savings >= 0.0);
                previous = cost.total;
            }
        }
    }

    #[test]
    fn test_inverted_table_reports_negative_savings() {
        let pricing = PricingTable {
            cache_read: 5.0,
            ..PricingTable::SONNET
        };
        let cost = estimate(&TokenStats::new(0, 0, 1_000_000, 0), &pricing);
        assert!(close(cost.cache_savings, -2.0));
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(PricingTable::preset("Opus"), Some(PricingTable::OPUS));
        assert_eq!(PricingTable::preset("haiku"), Some(PricingTable::HAIKU));
        assert_eq!(PricingTable::preset("gpt"), None);
        assert_eq!(PricingTable::default(), PricingTable::SONNET);
    }
}
