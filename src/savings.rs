//! Savings derived from the captive, usage-only and free-market invoices.
use crate::billing::{InvoiceResult, Quantity, TaxProfile, captive_invoice};
use crate::flag::{FlagLookup, TariffFlag};
use crate::price::{PriceProfile, Product};
use crate::tariff::TariffSchedule;
use crate::units::{Dimensionless, Money};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::warn;
use serde::Serialize;
use strum::IntoEnumIterator;

/// Number of months in a full contract year
const MONTHS_PER_YEAR: u32 = 12;

/// The discount figures quoted in a proposal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiscountFigures {
    /// The discount written into the contract (fixed-discount products only)
    pub contractual: Option<Dimensionless>,
    /// The first-year saving as a fraction of the captive invoice.
    ///
    /// For a fixed discount with self-generation this differs from the contractual discount,
    /// because the discount is applied to the invoice before compensation.
    pub effective: Dimensionless,
}

/// The savings of moving to the free market
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SavingsResult {
    /// Saving in a month of the first contract year
    pub monthly: Money,
    /// Saving over the first contract year
    pub annual: Money,
    /// Saving over the whole contract
    pub contract_total: Money,
    /// The discount figures
    pub discount: DiscountFigures,
}

/// Compute the savings of the free-market offer against the captive invoice.
///
/// # Arguments
///
/// * `captive` - The captive invoice
/// * `usage_total` - Total of the usage-only invoice
/// * `free_market` - Free-market invoice totals, one per contract year
/// * `price` - The proposed price terms
pub fn compute_savings(
    captive: &InvoiceResult,
    usage_total: Money,
    free_market: &[Money],
    price: &PriceProfile,
) -> Result<SavingsResult> {
    let first_year = *free_market
        .first()
        .context("No free-market invoice values were computed")?;
    let captive_total = captive.total();
    let monthly = captive_total - usage_total - first_year;

    let contractual = match price.product() {
        Product::FixedDiscount { discount } => Some(*discount),
        Product::PriceCurve { .. } | Product::TakeOrPay { .. } => None,
    };

    Ok(SavingsResult {
        monthly,
        annual: monthly * Dimensionless(f64::from(MONTHS_PER_YEAR)),
        contract_total: monthly * Dimensionless(f64::from(price.duration_months())),
        discount: DiscountFigures {
            contractual,
            effective: share_of(monthly, captive_total),
        },
    })
}

/// `part` as a fraction of `whole`, or zero if `whole` is zero
fn share_of(part: Money, whole: Money) -> Dimensionless {
    if whole == Money(0.0) {
        warn!("Captive invoice total is zero; savings are reported as 0%");
        return Dimensionless(0.0);
    }

    part / whole
}

/// The number of contract months falling in each contract year
pub fn months_in_year(duration_months: u32, num_years: usize) -> Vec<u32> {
    (0..)
        .take(num_years)
        .map(|i| {
            duration_months
                .saturating_sub(MONTHS_PER_YEAR.saturating_mul(i))
                .min(MONTHS_PER_YEAR)
        })
        .collect()
}

/// The saving in one contract year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlySaving {
    /// The calendar year
    pub year: i32,
    /// The number of contract months in the year
    pub months: u32,
    /// The monthly free-market invoice in the year
    pub free_market: Money,
    /// The saving over the contract months in the year
    pub savings: Money,
    /// The monthly saving as a percentage of the captive invoice
    pub percent: f64,
}

impl YearlySaving {
    /// The percentage saving rounded to a whole percent, as shown on the chart
    pub fn rounded(&self) -> f64 {
        self.percent.round()
    }
}

/// The saving in each contract year, weighted by the contract months falling in that year
pub fn yearly_savings(
    captive_total: Money,
    usage_total: Money,
    free_market: &[Money],
    price: &PriceProfile,
) -> Result<Vec<YearlySaving>> {
    let years = price.years();
    ensure!(
        free_market.len() == years.len(),
        "Expected one free-market value for each of the {} contract years, but got {}",
        years.len(),
        free_market.len()
    );

    let months = months_in_year(price.duration_months(), years.len());
    let savings = years
        .iter()
        .zip_eq(free_market)
        .zip_eq(months)
        .map(|((year, free_market), months)| {
            let monthly = captive_total - usage_total - *free_market;
            YearlySaving {
                year: *year,
                months,
                free_market: *free_market,
                savings: monthly * Dimensionless(f64::from(months)),
                percent: share_of(monthly, captive_total).to_percent(),
            }
        })
        .collect();

    Ok(savings)
}

/// The mean discount over the contract if a given tariff flag were in force
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlagDiscount {
    /// The tariff flag
    pub flag: TariffFlag,
    /// The captive invoice total under the flag
    pub captive_total: Money,
    /// The time-weighted mean discount, as a percentage
    pub mean_discount_percent: f64,
}

impl FlagDiscount {
    /// The mean discount rounded to a whole percent, as shown on the chart
    pub fn rounded(&self) -> f64 {
        self.mean_discount_percent.round()
    }
}

/// Recompute the captive invoice under each tariff flag and derive the mean discount over the
/// contract.
///
/// Only the flag surcharge changes between flags. The free-market values are held fixed.
pub fn flag_sensitivity(
    quantity: &Quantity,
    tariff: &TariffSchedule,
    taxes: &TaxProfile,
    flags: &dyn FlagLookup,
    usage_total: Money,
    free_market: &[Money],
    duration_months: u32,
) -> Result<Vec<FlagDiscount>> {
    let months = months_in_year(duration_months, free_market.len());
    let duration = Dimensionless(f64::from(duration_months));

    TariffFlag::iter()
        .map(|flag| {
            let surcharge = flags.resolve_flag_surcharge(flag);
            let captive_total = captive_invoice(quantity, tariff, taxes, surcharge)?.total();
            let weighted: Money = free_market
                .iter()
                .zip(&months)
                .map(|(free_market, months)| {
                    (captive_total - usage_total - *free_market)
                        * Dimensionless(f64::from(*months))
                })
                .sum();

            Ok(FlagDiscount {
                flag,
                captive_total,
                mean_discount_percent: share_of(weighted, captive_total * duration).to_percent(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{free_market_invoice, generate_invoices};
    use crate::fixture::{flag_surcharges, price_curve, quantity, tariff_schedule, tax_profile};
    use crate::flag::FlagSurcharges;
    use crate::units::{Energy, MoneyPerEnergy, MoneyPerPower, Power};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn fixed_discount(discount: f64, duration_months: u32) -> PriceProfile {
        let product = Product::FixedDiscount {
            discount: Dimensionless(discount),
        };
        PriceProfile::new(vec![2026, 2027, 2028, 2029, 2030, 2031], duration_months, product)
            .unwrap()
    }

    #[rstest]
    #[case(60, 6, vec![12, 12, 12, 12, 12, 0])]
    #[case(30, 3, vec![12, 12, 6])]
    #[case(6, 2, vec![6, 0])]
    fn test_months_in_year(
        #[case] duration_months: u32,
        #[case] num_years: usize,
        #[case] expected: Vec<u32>,
    ) {
        assert_eq!(months_in_year(duration_months, num_years), expected);
    }

    #[rstest]
    fn test_compute_savings_fixed_discount(
        quantity: Quantity,
        tariff_schedule: TariffSchedule,
        tax_profile: TaxProfile,
        flag_surcharges: FlagSurcharges,
    ) {
        let price = fixed_discount(0.1, 60);
        let (captive, usage) =
            generate_invoices(&quantity, &tariff_schedule, &tax_profile, &flag_surcharges)
                .unwrap();
        let free_market = free_market_invoice(
            &quantity,
            &price,
            &tax_profile,
            usage.total(),
            captive.total(),
        )
        .unwrap();
        let savings = compute_savings(&captive, usage.total(), &free_market, &price).unwrap();

        assert_eq!(
            savings.monthly,
            captive.total() - usage.total() - free_market[0]
        );
        assert_eq!(savings.contract_total, savings.monthly * Dimensionless(60.0));
        assert_eq!(savings.annual, savings.monthly * Dimensionless(12.0));
        assert_eq!(savings.discount.contractual, Some(Dimensionless(0.1)));
        assert_approx_eq!(
            Dimensionless,
            savings.discount.effective,
            Dimensionless(0.1),
            epsilon = 1e-12
        );
    }

    #[rstest]
    fn test_compute_savings_price_curve(
        quantity: Quantity,
        tariff_schedule: TariffSchedule,
        tax_profile: TaxProfile,
        flag_surcharges: FlagSurcharges,
        price_curve: PriceProfile,
    ) {
        let (captive, usage) =
            generate_invoices(&quantity, &tariff_schedule, &tax_profile, &flag_surcharges)
                .unwrap();
        let free_market = free_market_invoice(
            &quantity,
            &price_curve,
            &tax_profile,
            usage.total(),
            captive.total(),
        )
        .unwrap();
        let savings = compute_savings(&captive, usage.total(), &free_market, &price_curve).unwrap();

        assert_eq!(savings.discount.contractual, None);
        assert_eq!(
            savings.discount.effective,
            savings.monthly / captive.total()
        );
    }

    #[rstest]
    fn test_compute_savings_zero_captive(price_curve: PriceProfile, quantity: Quantity) {
        let taxes = TaxProfile {
            icms: Dimensionless(0.0),
            icms_reserved: Dimensionless(0.0),
            pasep_cofins: Dimensionless(0.0),
            flag: TariffFlag::Green,
            irrigation_discount: Dimensionless(0.0),
        };
        let captive =
            captive_invoice(&quantity, &TariffSchedule::ZERO, &taxes, MoneyPerEnergy(0.0))
                .unwrap();
        let savings =
            compute_savings(&captive, Money(0.0), &[Money(0.0); 3], &price_curve).unwrap();
        assert_eq!(savings.monthly, Money(0.0));
        assert_eq!(savings.discount.effective, Dimensionless(0.0));
    }

    #[rstest]
    fn test_compute_savings_no_free_market(
        price_curve: PriceProfile,
        quantity: Quantity,
        tax_profile: TaxProfile,
    ) {
        let captive =
            captive_invoice(&quantity, &TariffSchedule::ZERO, &tax_profile, MoneyPerEnergy(0.0))
                .unwrap();
        assert!(compute_savings(&captive, Money(0.0), &[], &price_curve).is_err());
    }

    #[test]
    fn test_yearly_savings() {
        let product = Product::FixedDiscount {
            discount: Dimensionless(0.1),
        };
        let price = PriceProfile::new(vec![2026, 2027, 2028], 30, product).unwrap();
        let free_market = [Money(700.0); 3];
        let savings = yearly_savings(Money(1000.0), Money(200.0), &free_market, &price).unwrap();

        assert_eq!(savings.len(), 3);
        assert_eq!(savings[0].months, 12);
        assert_eq!(savings[2].months, 6);
        assert_approx_eq!(Money, savings[0].savings, Money(1200.0), epsilon = 1e-9);
        assert_approx_eq!(Money, savings[2].savings, Money(600.0), epsilon = 1e-9);
        assert_approx_eq!(f64, savings[1].percent, 10.0, epsilon = 1e-9);
        assert_eq!(savings[1].rounded(), 10.0);
    }

    #[test]
    fn test_yearly_savings_length_mismatch() {
        let price = fixed_discount(0.1, 60);
        assert!(yearly_savings(Money(1000.0), Money(200.0), &[Money(700.0)], &price).is_err());
    }

    #[rstest]
    fn test_flag_sensitivity(
        quantity: Quantity,
        tariff_schedule: TariffSchedule,
        tax_profile: TaxProfile,
        flag_surcharges: FlagSurcharges,
        price_curve: PriceProfile,
    ) {
        let (captive, usage) =
            generate_invoices(&quantity, &tariff_schedule, &tax_profile, &flag_surcharges)
                .unwrap();
        let free_market = free_market_invoice(
            &quantity,
            &price_curve,
            &tax_profile,
            usage.total(),
            captive.total(),
        )
        .unwrap();
        let sweep = flag_sensitivity(
            &quantity,
            &tariff_schedule,
            &tax_profile,
            &flag_surcharges,
            usage.total(),
            &free_market,
            price_curve.duration_months(),
        )
        .unwrap();

        assert_eq!(
            sweep.iter().map(|discount| discount.flag).collect_vec(),
            TariffFlag::iter().collect_vec()
        );
        // Green has no surcharge, so its captive total is the one billed under the green flag
        assert_eq!(sweep[0].captive_total, captive.total());

        // A higher surcharge raises the captive invoice but not the free-market one
        for (lower, higher) in sweep.iter().tuple_windows() {
            assert!(higher.captive_total >= lower.captive_total);
            assert!(higher.mean_discount_percent >= lower.mean_discount_percent);
        }
    }

    #[test]
    fn test_flag_sensitivity_single_year_matches_savings() {
        let quantity = Quantity {
            demand_off_peak: Power(100.0),
            energy_off_peak: Energy(1000.0),
            ..Quantity::default()
        };
        let tariff = TariffSchedule {
            demand_off_peak: MoneyPerPower(25.0),
            energy_off_peak_te: MoneyPerEnergy(0.25),
            energy_off_peak_tusd: MoneyPerEnergy(0.1),
            ..TariffSchedule::ZERO
        };
        let taxes = TaxProfile {
            icms: Dimensionless(0.0),
            icms_reserved: Dimensionless(0.0),
            pasep_cofins: Dimensionless(0.0),
            flag: TariffFlag::Green,
            irrigation_discount: Dimensionless(0.0),
        };
        let flags = FlagSurcharges::new(
            MoneyPerEnergy(0.0),
            MoneyPerEnergy(0.0),
            MoneyPerEnergy(0.0),
            MoneyPerEnergy(0.0),
        );

        // Captive total is 2500 + 350 = 2850; saving of 285 is 10%
        let sweep = flag_sensitivity(
            &quantity,
            &tariff,
            &taxes,
            &flags,
            Money(0.0),
            &[Money(2565.0)],
            12,
        )
        .unwrap();
        for discount in sweep {
            assert_approx_eq!(f64, discount.mean_discount_percent, 10.0, epsilon = 1e-9);
            assert_eq!(discount.rounded(), 10.0);
        }
    }
}
