//! The free-market invoice for each contract year.
use super::{Quantity, TaxFactors, TaxProfile};
use crate::price::{PriceProfile, Product};
use crate::units::{Dimensionless, Money};
use anyhow::Result;

/// Divisor applied to free-market price × energy products.
///
/// Prices are quoted per MWh while the tariff rates are used per kWh.
pub const ENERGY_PRICE_SCALE: Dimensionless = Dimensionless::new(1000.0);

/// Compute what the consumer pays on the free market in each contract year.
///
/// For a fixed discount, the consumer pays the discounted captive invoice less what it still pays
/// the distributor for grid usage, the same in every year. For price-based products, each year's
/// price is applied to the tax-grossed energy consumption. The returned values are aligned with
/// [`PriceProfile::years`].
///
/// # Arguments
///
/// * `quantity` - Consumption and demand for the billing cycle
/// * `price` - The proposed price terms
/// * `taxes` - Tax rates
/// * `usage_total` - Total of the usage-only invoice
/// * `captive_total` - Total of the captive invoice the discount applies to
pub fn free_market_invoice(
    quantity: &Quantity,
    price: &PriceProfile,
    taxes: &TaxProfile,
    usage_total: Money,
    captive_total: Money,
) -> Result<Vec<Money>> {
    let factors = TaxFactors::new(taxes)?;
    let num_years = price.years().len();

    let values = match price.product() {
        Product::FixedDiscount { discount } => {
            vec![captive_total * (Dimensionless(1.0) - *discount) - usage_total; num_years]
        }
        Product::PriceCurve { prices } | Product::TakeOrPay { prices } => {
            let taxed_energy = quantity.energy_peak * factors.icms
                + quantity.energy_off_peak * factors.icms
                + quantity.energy_reserved * factors.icms_reserved;
            prices
                .iter()
                .map(|price| *price * taxed_energy / ENERGY_PRICE_SCALE)
                .collect()
        }
    };

    Ok(values)
}
