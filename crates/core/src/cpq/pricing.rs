use serde::{Deserialize, Serialize};

use crate::domain::license::{LicenseMix, LicenseType};

pub const IMPLEMENTATION_FEE_LABEL: &str = "Implementation Fee";

/// Total annual cost in whole USD: `enterprise × 1000 + cascade × 2000`.
pub fn price(enterprise: u32, cascade: u32) -> u64 {
    line_amount(LicenseType::Enterprise, enterprise) + line_amount(LicenseType::Cascade, cascade)
}

pub fn line_amount(license: LicenseType, quantity: u32) -> u64 {
    u64::from(quantity) * license.unit_price()
}

/// Whole dollars with thousands separators, e.g. `$13,000`.
pub fn format_usd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub label: String,
    pub license: Option<LicenseType>,
    pub quantity: u32,
    pub unit_price: u64,
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub lines: Vec<PricedLine>,
    pub total: u64,
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, licenses: LicenseMix) -> PricingResult;
}

#[derive(Clone, Debug, Default)]
pub struct LinearPricingEngine;

impl PricingEngine for LinearPricingEngine {
    fn price(&self, licenses: LicenseMix) -> PricingResult {
        price_with_lines(licenses)
    }
}

/// License lines with a non-zero quantity, followed by the zero-amount implementation fee.
pub fn price_with_lines(licenses: LicenseMix) -> PricingResult {
    let mut lines: Vec<PricedLine> = LicenseType::ALL
        .into_iter()
        .filter(|license| licenses.quantity(*license) > 0)
        .map(|license| {
            let quantity = licenses.quantity(license);
            PricedLine {
                label: license.label().to_string(),
                license: Some(license),
                quantity,
                unit_price: license.unit_price(),
                amount: line_amount(license, quantity),
            }
        })
        .collect();

    lines.push(PricedLine {
        label: IMPLEMENTATION_FEE_LABEL.to_string(),
        license: None,
        quantity: 1,
        unit_price: 0,
        amount: 0,
    });

    PricingResult { lines, total: price(licenses.enterprise, licenses.cascade) }
}

#[cfg(test)]
mod tests {
    use crate::domain::license::{LicenseMix, LicenseType};

    use super::{format_usd, price, price_with_lines, LinearPricingEngine, PricingEngine};

    #[test]
    fn price_is_linear_across_the_supported_range() {
        for enterprise in (0..=10_000).step_by(97) {
            for cascade in (0..=10_000).step_by(89) {
                assert_eq!(
                    price(enterprise, cascade),
                    1_000 * u64::from(enterprise) + 2_000 * u64::from(cascade)
                );
            }
        }
        assert_eq!(price(10_000, 10_000), 30_000_000);
    }

    #[test]
    fn manual_scenario_totals_thirteen_thousand() {
        assert_eq!(price(7, 3), 13_000);
    }

    #[test]
    fn lines_skip_zero_quantities_and_end_with_implementation_fee() {
        let result = LinearPricingEngine.price(LicenseMix::new(0, 4));

        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[0].license, Some(LicenseType::Cascade));
        assert_eq!(result.lines[0].amount, 8_000);
        assert_eq!(result.lines[1].label, "Implementation Fee");
        assert_eq!(result.lines[1].amount, 0);
        assert_eq!(result.total, 8_000);
    }

    #[test]
    fn line_amounts_sum_to_total() {
        let result = price_with_lines(LicenseMix::new(12, 5));
        let sum: u64 = result.lines.iter().map(|line| line.amount).sum();
        assert_eq!(sum, result.total);
    }

    #[test]
    fn max_counts_do_not_overflow() {
        let total = price(u32::MAX, u32::MAX);
        assert_eq!(total, 3_000 * u64::from(u32::MAX));
    }

    #[test]
    fn usd_formatting_groups_thousands() {
        assert_eq!(format_usd(0), "$0");
        assert_eq!(format_usd(999), "$999");
        assert_eq!(format_usd(13_000), "$13,000");
        assert_eq!(format_usd(30_000_000), "$30,000,000");
    }
}
