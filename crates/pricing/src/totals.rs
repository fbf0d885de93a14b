use serde::{Deserialize, Serialize};

use eventrent_core::ValueObject;

use crate::item::QuoteItem;
use crate::rate::{DEFAULT_DEPOSIT_RATE, DEFAULT_TAX_RATE, Rate};

/// Tax and deposit rates a quote is priced with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tax_rate: Rate,
    pub deposit_rate: Rate,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            deposit_rate: DEFAULT_DEPOSIT_RATE,
        }
    }
}

/// Derived amounts of a quote, in cents.
///
/// Invariant: `total == subtotal + tax_amount` unless the sum would exceed
/// `u64::MAX`, in which case `total` is clamped to `u64::MAX`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: u64,
    pub tax_amount: u64,
    pub total: u64,
    pub deposit_amount: u64,
}

impl ValueObject for QuoteTotals {}

/// Price an item list.
///
/// Line totals are summed in `u128` and saturate at `u64::MAX`; an empty list
/// prices to all zeros.
pub fn compute_totals(items: &[QuoteItem], policy: &PricingPolicy) -> QuoteTotals {
    let subtotal: u128 = items.iter().map(QuoteItem::line_total).sum();
    let subtotal = u64::try_from(subtotal).unwrap_or(u64::MAX);
    let tax_amount = policy.tax_rate.apply(subtotal);
    let total = subtotal.saturating_add(tax_amount);
    let deposit_amount = policy.deposit_rate.apply(total);

    QuoteTotals {
        subtotal,
        tax_amount,
        total,
        deposit_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn two_units_at_one_hundred() {
        let items = vec![QuoteItem::custom("Photobooth", 2, 100_00)];
        let totals = compute_totals(&items, &PricingPolicy::default());

        assert_eq!(totals.subtotal, 200_00);
        assert_eq!(totals.tax_amount, 40_00);
        assert_eq!(totals.total, 240_00);
        assert_eq!(totals.deposit_amount, 72_00);
    }

    #[test]
    fn empty_list_is_all_zero() {
        let totals = compute_totals(&[], &PricingPolicy::default());
        assert_eq!(totals, QuoteTotals::default());
    }

    #[test]
    fn sums_fractional_unit_prices() {
        // 120 km of travel at 0.50 plus a guest book at 75.00.
        let items = vec![
            QuoteItem::custom("Frais de déplacement", 120, 50),
            QuoteItem::custom("Livre d'or personnalisé", 1, 75_00),
        ];
        let totals = compute_totals(&items, &PricingPolicy::default());

        assert_eq!(totals.subtotal, 135_00);
        assert_eq!(totals.tax_amount, 27_00);
        assert_eq!(totals.total, 162_00);
        assert_eq!(totals.deposit_amount, 48_60);
    }

    #[test]
    fn zero_quantity_lines_contribute_nothing() {
        let items = vec![
            QuoteItem::custom("Accessoires Premium", 0, 50_00),
            QuoteItem::custom("Photobooth", 1, 450_00),
        ];
        let totals = compute_totals(&items, &PricingPolicy::default());
        assert_eq!(totals.subtotal, 450_00);
    }

    #[test]
    fn custom_policy_is_honoured() {
        let policy = PricingPolicy {
            tax_rate: Rate::from_basis_points(550),
            deposit_rate: Rate::from_basis_points(5_000),
        };
        let totals = compute_totals(&[QuoteItem::custom("Stand", 1, 1_000_00)], &policy);

        assert_eq!(totals.tax_amount, 55_00);
        assert_eq!(totals.total, 1_055_00);
        assert_eq!(totals.deposit_amount, 527_50);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let items = vec![
            QuoteItem::custom("huge", u32::MAX, u64::MAX),
            QuoteItem::custom("huge", u32::MAX, u64::MAX),
        ];
        let totals = compute_totals(&items, &PricingPolicy::default());
        assert_eq!(totals.subtotal, u64::MAX);
        assert_eq!(totals.total, u64::MAX);
        // The unclamped sum does not fit, so `total` is the clamp, not the sum.
        assert!(totals.subtotal.checked_add(totals.tax_amount).is_none());
    }

    fn arb_items(unit_step: u64) -> impl Strategy<Value = Vec<QuoteItem>> {
        prop::collection::vec(
            (0u32..50, 0u64..20_000).prop_map(move |(quantity, steps)| {
                QuoteItem::custom("line", quantity, steps * unit_step)
            }),
            0..12,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: total is always subtotal plus the rounded tax.
        #[test]
        fn total_is_subtotal_plus_tax(items in arb_items(1)) {
            let policy = PricingPolicy::default();
            let totals = compute_totals(&items, &policy);

            let expected_subtotal: u64 = items
                .iter()
                .map(|i| i.quantity as u64 * i.unit_price)
                .sum();

            prop_assert_eq!(totals.subtotal, expected_subtotal);
            prop_assert_eq!(totals.tax_amount, policy.tax_rate.apply(totals.subtotal));
            prop_assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
            prop_assert_eq!(totals.deposit_amount, policy.deposit_rate.apply(totals.total));
        }

        /// Property: with prices in whole 0.50 steps no rounding happens, so
        /// total = subtotal × 1.2 and deposit = total × 0.3 exactly.
        #[test]
        fn exact_rates_when_amounts_divide(items in arb_items(50)) {
            let totals = compute_totals(&items, &PricingPolicy::default());

            prop_assert_eq!(totals.total * 10, totals.subtotal * 12);
            prop_assert_eq!(totals.deposit_amount * 10, totals.total * 3);
        }

        /// Property: the calculator is a pure function of its inputs.
        #[test]
        fn compute_is_deterministic(items in arb_items(1)) {
            let policy = PricingPolicy::default();
            prop_assert_eq!(compute_totals(&items, &policy), compute_totals(&items, &policy));
        }
    }
}
