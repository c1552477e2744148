//! The free-market pricing products offered in a proposal.
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use chrono::{Datelike, Months, NaiveDate};
use itertools::Itertools;
use serde::Serialize;
use strum::Display;

/// A free-market pricing product.
///
/// Matching on this type is exhaustive everywhere, so a new product must be handled explicitly
/// wherever products are priced or presented.
#[derive(Debug, Clone, PartialEq, Display, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Product {
    /// A fixed discount on the captive invoice for the whole contract
    #[strum(serialize = "Desconto Garantido")]
    FixedDiscount {
        /// The discount, as a fraction of the captive invoice
        discount: Dimensionless,
    },
    /// A price for energy in each contract year
    #[strum(serialize = "Curva de Preço")]
    PriceCurve {
        /// One price per contract year
        prices: Vec<MoneyPerEnergy>,
    },
    /// A single energy price locked for every contract year
    #[strum(serialize = "PMT")]
    TakeOrPay {
        /// One price per contract year (all equal)
        prices: Vec<MoneyPerEnergy>,
    },
}

impl Product {
    /// A take-or-pay product with the given price locked for `num_years` contract years
    pub fn take_or_pay(price: MoneyPerEnergy, num_years: usize) -> Self {
        Self::TakeOrPay {
            prices: vec![price; num_years],
        }
    }
}

/// The proposed free-market price terms
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceProfile {
    years: Vec<i32>,
    duration_months: u32,
    product: Product,
}

impl PriceProfile {
    /// Create a new price profile.
    ///
    /// # Arguments
    ///
    /// * `years` - The calendar years covered by the contract, in order
    /// * `duration_months` - Length of the contract in months
    /// * `product` - The pricing product
    pub fn new(years: Vec<i32>, duration_months: u32, product: Product) -> Result<Self> {
        ensure!(
            duration_months >= 1,
            "Contract duration must be at least one month"
        );
        ensure!(!years.is_empty(), "Contract must cover at least one year");
        ensure!(
            years.iter().tuple_windows().all(|(a, b)| a < b),
            "Contract years must be in order and unique"
        );

        match &product {
            Product::FixedDiscount { discount } => {
                ensure!(
                    *discount >= Dimensionless(0.0) && *discount <= Dimensionless(1.0),
                    "Discount must be between 0% and 100% (got {}%)",
                    discount.to_percent()
                );
            }
            Product::PriceCurve { prices } | Product::TakeOrPay { prices } => {
                ensure!(
                    prices.len() == years.len(),
                    "Expected one price for each of the {} contract years, but got {}",
                    years.len(),
                    prices.len()
                );
                for (year, price) in years.iter().zip(prices) {
                    ensure!(
                        price.is_finite() && *price >= MoneyPerEnergy(0.0),
                        "Price for {year} must be a non-negative number (got {price})"
                    );
                }
                if matches!(product, Product::TakeOrPay { .. }) {
                    ensure!(
                        prices.iter().all_equal(),
                        "Take-or-pay prices must be the same for every contract year"
                    );
                }
            }
        }

        Ok(Self {
            years,
            duration_months,
            product,
        })
    }

    /// The calendar years covered by the contract
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// The contract length in months
    pub fn duration_months(&self) -> u32 {
        self.duration_months
    }

    /// The pricing product
    pub fn product(&self) -> &Product {
        &self.product
    }
}

/// The calendar years touched by a contract starting on `start` and lasting `duration_months`.
///
/// The end year is the year of the date `duration_months` after the start, so a contract which
/// ends exactly on 1 January still includes that year.
pub fn contract_years(start: NaiveDate, duration_months: u32) -> Result<Vec<i32>> {
    ensure!(
        duration_months >= 1,
        "Contract duration must be at least one month"
    );
    let end = start
        .checked_add_months(Months::new(duration_months))
        .with_context(|| {
            format!("Contract end date is out of range ({duration_months} months after {start})")
        })?;

    Ok((start.year()..=end.year()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    #[rstest]
    #[case(
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        60,
        vec![2026, 2027, 2028, 2029, 2030, 2031]
    )]
    #[case(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), 11, vec![2026])]
    #[case(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(), 12, vec![2026, 2027])]
    fn test_contract_years(
        #[case] start: NaiveDate,
        #[case] duration_months: u32,
        #[case] expected: Vec<i32>,
    ) {
        assert_eq!(contract_years(start, duration_months).unwrap(), expected);
    }

    #[test]
    fn test_contract_years_zero_duration() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_error!(
            contract_years(start, 0),
            "Contract duration must be at least one month"
        );
    }

    #[test]
    fn test_price_curve_length_mismatch() {
        let product = Product::PriceCurve {
            prices: vec![MoneyPerEnergy(263.38)],
        };
        assert_error!(
            PriceProfile::new(vec![2026, 2027], 24, product),
            "Expected one price for each of the 2 contract years, but got 1"
        );
    }

    #[test]
    fn test_take_or_pay_prices_must_match() {
        let product = Product::TakeOrPay {
            prices: vec![MoneyPerEnergy(263.38), MoneyPerEnergy(250.0)],
        };
        assert_error!(
            PriceProfile::new(vec![2026, 2027], 24, product),
            "Take-or-pay prices must be the same for every contract year"
        );

        let product = Product::take_or_pay(MoneyPerEnergy(263.38), 2);
        assert!(PriceProfile::new(vec![2026, 2027], 24, product).is_ok());
    }

    #[rstest]
    #[case(Dimensionless(-0.1))]
    #[case(Dimensionless(1.1))]
    fn test_fixed_discount_out_of_range(#[case] discount: Dimensionless) {
        let product = Product::FixedDiscount { discount };
        assert!(PriceProfile::new(vec![2026], 12, product).is_err());
    }

    #[test]
    fn test_years_must_be_ordered() {
        let product = Product::FixedDiscount {
            discount: Dimensionless(0.1),
        };
        assert_error!(
            PriceProfile::new(vec![2027, 2026], 24, product),
            "Contract years must be in order and unique"
        );
    }

    #[test]
    fn test_product_display() {
        let product = Product::FixedDiscount {
            discount: Dimensionless(0.1),
        };
        assert_eq!(product.to_string(), "Desconto Garantido");
        assert_eq!(
            Product::take_or_pay(MoneyPerEnergy(1.0), 1).to_string(),
            "PMT"
        );
    }
}
