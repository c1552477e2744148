//! The usage-only invoice: what the consumer still pays the distributor for access to the grid
//! after moving its energy purchases to the free market.
use super::{InvoiceLine, InvoiceResult, Quantity, TaxFactors, TaxProfile};
use crate::tariff::TariffSchedule;
use crate::units::Dimensionless;
use anyhow::Result;
use indexmap::IndexMap;

/// Fraction of the demand charges (and of the peak/off-peak TUSD differential) discounted for
/// free-market consumers
const USAGE_DISCOUNT: Dimensionless = Dimensionless::new(0.5);

/// Compute the part of the invoice attributable to grid usage only.
///
/// Energy is priced at the TUSD component alone and no flag surcharge applies, since flags price
/// generation. The three regulatory discount lines are not grossed up for tax.
pub fn usage_invoice(
    quantity: &Quantity,
    tariff: &TariffSchedule,
    taxes: &TaxProfile,
) -> Result<InvoiceResult> {
    let factors = TaxFactors::new(taxes)?;
    let icms = factors.icms;
    let icms_reserved = factors.icms_reserved;
    let pasep_cofins = factors.pasep_cofins;

    let demand_off_peak = quantity.demand_off_peak * tariff.demand_off_peak * icms * pasep_cofins;
    let demand_off_peak_without_icms =
        quantity.demand_off_peak_without_icms * tariff.demand_off_peak * pasep_cofins;
    let demand_peak = quantity.demand_peak * tariff.demand_peak * icms * pasep_cofins;
    let demand_peak_without_icms =
        quantity.demand_peak_without_icms * tariff.demand_peak * pasep_cofins;

    let energy_off_peak =
        quantity.energy_off_peak * tariff.energy_off_peak_tusd * icms * pasep_cofins;
    let energy_peak = quantity.energy_peak * tariff.energy_peak_tusd * icms * pasep_cofins;
    let energy_reserved =
        quantity.energy_reserved * tariff.energy_off_peak_tusd * icms_reserved * pasep_cofins;

    let irrigation_discount =
        quantity.energy_reserved * tariff.energy_off_peak_tusd * taxes.irrigation_discount;

    let demand_off_peak_discount =
        quantity.demand_off_peak * tariff.demand_off_peak * USAGE_DISCOUNT;
    let demand_peak_discount = quantity.demand_peak * tariff.demand_peak * USAGE_DISCOUNT;
    let tusd_peak_discount = quantity.energy_peak
        * (tariff.energy_peak_tusd - tariff.energy_off_peak_tusd)
        * USAGE_DISCOUNT;

    let total = demand_off_peak
        + demand_off_peak_without_icms
        + demand_peak
        + demand_peak_without_icms
        + energy_off_peak
        + energy_peak
        + energy_reserved
        - irrigation_discount
        - demand_off_peak_discount
        - demand_peak_discount
        - tusd_peak_discount;

    let lines = IndexMap::from([
        (InvoiceLine::DemandPeak, demand_peak),
        (InvoiceLine::DemandPeakWithoutIcms, demand_peak_without_icms),
        (InvoiceLine::DemandOffPeak, demand_off_peak),
        (
            InvoiceLine::DemandOffPeakWithoutIcms,
            demand_off_peak_without_icms,
        ),
        (InvoiceLine::EnergyPeak, energy_peak),
        (InvoiceLine::EnergyOffPeak, energy_off_peak),
        (InvoiceLine::EnergyReserved, energy_reserved),
        (InvoiceLine::NightIrrigationDiscount, irrigation_discount),
        (InvoiceLine::DemandPeakDiscount, demand_peak_discount),
        (InvoiceLine::DemandOffPeakDiscount, demand_off_peak_discount),
        (InvoiceLine::TusdPeakDiscount, tusd_peak_discount),
    ]);

    Ok(InvoiceResult::new(lines, total, total))
}
