use serde::{Deserialize, Serialize};

use eventrent_core::ValueObject;

const BASIS_POINTS_PER_UNIT: u128 = 10_000;

/// VAT applied to every quote (20%).
pub const DEFAULT_TAX_RATE: Rate = Rate::from_basis_points(2_000);

/// Share of the total collected up front when a quote is signed (30%).
pub const DEFAULT_DEPOSIT_RATE: Rate = Rate::from_basis_points(3_000);

/// A percentage expressed in basis points (1 bp = 0.01%).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(u32);

impl Rate {
    pub const fn from_basis_points(bp: u32) -> Self {
        Self(bp)
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    /// `amount × rate`, rounded half-up to the nearest cent.
    pub fn apply(self, amount: u64) -> u64 {
        let scaled = amount as u128 * self.0 as u128;
        let rounded = (scaled + BASIS_POINTS_PER_UNIT / 2) / BASIS_POINTS_PER_UNIT;
        u64::try_from(rounded).unwrap_or(u64::MAX)
    }
}

impl ValueObject for Rate {}

impl core::fmt::Display for Rate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_rate_to_whole_amounts() {
        assert_eq!(DEFAULT_TAX_RATE.apply(20_000), 4_000);
        assert_eq!(DEFAULT_DEPOSIT_RATE.apply(24_000), 7_200);
    }

    #[test]
    fn rounds_half_up() {
        // 0.25 × 30% = 0.075 → 0.08
        assert_eq!(DEFAULT_DEPOSIT_RATE.apply(25), 8);
        // 0.02 × 20% = 0.004 → 0.00
        assert_eq!(DEFAULT_TAX_RATE.apply(2), 0);
    }

    #[test]
    fn zero_rate_yields_zero() {
        assert_eq!(Rate::from_basis_points(0).apply(123_456), 0);
    }

    #[test]
    fn display_as_percentage() {
        assert_eq!(DEFAULT_TAX_RATE.to_string(), "20.00%");
        assert_eq!(Rate::from_basis_points(550).to_string(), "5.50%");
    }
}
