//! The captive-market invoice, as billed by the distributor.
use super::{InvoiceLine, InvoiceResult, Quantity, TaxFactors, TaxProfile};
use crate::tariff::TariffSchedule;
use crate::units::MoneyPerEnergy;
use anyhow::Result;
use indexmap::IndexMap;

/// Compute the invoice the consumer would pay on the captive market.
///
/// Energy is priced at the combined TE + TUSD rate plus the surcharge for the tariff flag in
/// force. Demand lines contractually exempt from ICMS are grossed up for PASEP/COFINS only. The
/// flag-surcharge line is informational: its cost is already part of the energy lines, so it
/// doesn't contribute to the total.
///
/// # Arguments
///
/// * `quantity` - Consumption and demand for the billing cycle
/// * `tariff` - The pre-tax rates
/// * `taxes` - Tax rates, flag level and irrigation discount
/// * `flag_surcharge` - The energy surcharge for the flag level in force
pub fn captive_invoice(
    quantity: &Quantity,
    tariff: &TariffSchedule,
    taxes: &TaxProfile,
    flag_surcharge: MoneyPerEnergy,
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

    let energy_off_peak = quantity.energy_off_peak
        * (tariff.energy_off_peak() + flag_surcharge)
        * icms
        * pasep_cofins;
    let energy_peak =
        quantity.energy_peak * (tariff.energy_peak() + flag_surcharge) * icms * pasep_cofins;
    let energy_reserved =
        quantity.energy_reserved * tariff.energy_off_peak() * icms_reserved * pasep_cofins;

    let compensated_peak = quantity.compensated_peak * tariff.energy_peak() * icms * pasep_cofins;
    let compensated_off_peak =
        quantity.compensated_off_peak * tariff.energy_off_peak() * icms * pasep_cofins;

    let irrigation_discount = quantity.energy_reserved
        * (tariff.energy_off_peak() + flag_surcharge)
        * taxes.irrigation_discount;

    let flag_cost = (quantity.energy_peak + quantity.energy_off_peak)
        * flag_surcharge
        * icms
        * pasep_cofins
        + quantity.energy_reserved
            * flag_surcharge
            * (icms_reserved * pasep_cofins - taxes.irrigation_discount);

    let total_without_compensation = demand_off_peak
        + demand_off_peak_without_icms
        + demand_peak
        + demand_peak_without_icms
        + energy_off_peak
        + energy_peak
        + energy_reserved
        - irrigation_discount;
    let total = demand_off_peak
        + demand_off_peak_without_icms
        + demand_peak
        + demand_peak_without_icms
        + energy_off_peak
        + energy_peak
        + energy_reserved
        - compensated_peak
        - compensated_off_peak
        - irrigation_discount;

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
        (InvoiceLine::CompensatedEnergyPeak, compensated_peak),
        (InvoiceLine::CompensatedEnergyOffPeak, compensated_off_peak),
        (InvoiceLine::NightIrrigationDiscount, irrigation_discount),
        (InvoiceLine::FlagSurcharge, flag_cost),
    ]);

    Ok(InvoiceResult::new(lines, total, total_without_compensation))
}
