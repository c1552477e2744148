//! The billing engine.
//!
//! Computes, for one billing cycle, the invoice a consumer would pay on the captive market, the
//! part of that invoice which pays for use of the distribution grid only, and the per-year
//! invoice for energy bought on the free market. Every calculation is a pure function of its
//! inputs.
use crate::flag::FlagLookup;
use crate::tariff::TariffSchedule;
use crate::units::{Energy, Money, Power};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use strum::Display;

pub mod captive;
pub mod free_market;
pub mod tax;
pub mod usage;
pub use captive::captive_invoice;
pub use free_market::free_market_invoice;
pub use tax::{TaxFactors, TaxProfile};
pub use usage::usage_invoice;

/// Metered or estimated consumption and demand for one billing cycle.
///
/// Reserved-hour and compensated quantities are only meaningful for irrigation and
/// self-generation consumers respectively and default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Quantity {
    /// Demand at peak hours
    #[serde(default)]
    pub demand_peak: Power,
    /// Demand at off-peak hours
    #[serde(default)]
    pub demand_off_peak: Power,
    /// Contractually ICMS-exempt demand at peak hours
    #[serde(default)]
    pub demand_peak_without_icms: Power,
    /// Contractually ICMS-exempt demand at off-peak hours
    #[serde(default)]
    pub demand_off_peak_without_icms: Power,
    /// Demand at reserved hours.
    ///
    /// Collected for completeness but not billed.
    #[serde(default)]
    pub demand_reserved: Power,
    /// Energy at peak hours
    #[serde(default)]
    pub energy_peak: Energy,
    /// Energy at off-peak hours
    #[serde(default)]
    pub energy_off_peak: Energy,
    /// Energy at reserved (night irrigation) hours
    #[serde(default)]
    pub energy_reserved: Energy,
    /// Self-generated energy compensated at peak hours
    #[serde(default)]
    pub compensated_peak: Energy,
    /// Self-generated energy compensated at off-peak hours
    #[serde(default)]
    pub compensated_off_peak: Energy,
}

impl Quantity {
    /// Check that every quantity is a non-negative number
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("demand_peak", self.demand_peak.value()),
            ("demand_off_peak", self.demand_off_peak.value()),
            ("demand_peak_without_icms", self.demand_peak_without_icms.value()),
            (
                "demand_off_peak_without_icms",
                self.demand_off_peak_without_icms.value(),
            ),
            ("demand_reserved", self.demand_reserved.value()),
            ("energy_peak", self.energy_peak.value()),
            ("energy_off_peak", self.energy_off_peak.value()),
            ("energy_reserved", self.energy_reserved.value()),
            ("compensated_peak", self.compensated_peak.value()),
            ("compensated_off_peak", self.compensated_off_peak.value()),
        ];
        for (name, value) in fields {
            ensure!(
                value.is_finite() && value >= 0.0,
                "Quantity {name} must be a non-negative number (got {value})"
            );
        }

        Ok(())
    }

    /// Zero the quantities which don't apply to the consumer's billing modes.
    ///
    /// Reserved-hour quantities only apply to irrigation consumers and compensated energy only
    /// applies to consumers with self-generation.
    pub fn for_modes(self, irrigation: bool, self_generation: bool) -> Self {
        let mut quantity = self;
        if !irrigation {
            quantity.demand_reserved = Power(0.0);
            quantity.energy_reserved = Energy(0.0);
        }
        if !self_generation {
            quantity.compensated_peak = Energy(0.0);
            quantity.compensated_off_peak = Energy(0.0);
        }

        quantity
    }
}

/// A named line item on an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InvoiceLine {
    /// Demand charge at peak hours
    #[strum(serialize = "Demand Peak")]
    DemandPeak,
    /// ICMS-exempt demand charge at peak hours
    #[strum(serialize = "Demand Peak without ICMS")]
    DemandPeakWithoutIcms,
    /// Demand charge at off-peak hours
    #[strum(serialize = "Demand Off-Peak")]
    DemandOffPeak,
    /// ICMS-exempt demand charge at off-peak hours
    #[strum(serialize = "Demand Off-Peak without ICMS")]
    DemandOffPeakWithoutIcms,
    /// Energy charge at peak hours
    #[strum(serialize = "Energy Peak")]
    EnergyPeak,
    /// Energy charge at off-peak hours
    #[strum(serialize = "Energy Off-Peak")]
    EnergyOffPeak,
    /// Energy charge at reserved hours
    #[strum(serialize = "Energy Reserved")]
    EnergyReserved,
    /// Credit for self-generated energy at peak hours
    #[strum(serialize = "Compensated Energy Credit Peak")]
    CompensatedEnergyPeak,
    /// Credit for self-generated energy at off-peak hours
    #[strum(serialize = "Compensated Energy Credit Off-Peak")]
    CompensatedEnergyOffPeak,
    /// Discount on energy consumed at reserved hours by irrigation consumers
    #[strum(serialize = "Night Irrigation Discount")]
    NightIrrigationDiscount,
    /// The tariff-flag cost embedded in the energy lines (informational)
    #[strum(serialize = "Flag Surcharge")]
    FlagSurcharge,
    /// Regulatory discount on the peak demand charge
    #[strum(serialize = "Demand Peak Discount")]
    DemandPeakDiscount,
    /// Regulatory discount on the off-peak demand charge
    #[strum(serialize = "Demand Off-Peak Discount")]
    DemandOffPeakDiscount,
    /// Regulatory discount on the peak/off-peak TUSD differential
    #[strum(serialize = "TUSD Peak Discount")]
    TusdPeakDiscount,
}

impl Serialize for InvoiceLine {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// The result of an invoice calculation.
///
/// Values are derived entirely from the inputs of the calculation and cannot be changed after
/// creation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceResult {
    lines: IndexMap<InvoiceLine, Money>,
    total: Money,
    total_without_compensation: Money,
}

impl InvoiceResult {
    /// Create a new invoice result
    fn new(
        lines: IndexMap<InvoiceLine, Money>,
        total: Money,
        total_without_compensation: Money,
    ) -> Self {
        Self {
            lines,
            total,
            total_without_compensation,
        }
    }

    /// The invoice total
    pub fn total(&self) -> Money {
        self.total
    }

    /// The invoice total before self-generated energy is netted off.
    ///
    /// The same as [`InvoiceResult::total`] for invoices without compensated energy.
    pub fn total_without_compensation(&self) -> Money {
        self.total_without_compensation
    }

    /// The value of the given line item, if it appears on this invoice
    pub fn line(&self, line: InvoiceLine) -> Option<Money> {
        self.lines.get(&line).copied()
    }

    /// Iterate over the line items in the order they appear on the invoice
    pub fn iter_lines(&self) -> impl Iterator<Item = (InvoiceLine, Money)> + '_ {
        self.lines.iter().map(|(line, value)| (*line, *value))
    }
}

/// Compute the captive and usage-only invoices for a billing cycle.
///
/// The flag surcharge is resolved from the flag level in the tax profile.
pub fn generate_invoices(
    quantity: &Quantity,
    tariff: &TariffSchedule,
    taxes: &TaxProfile,
    flags: &dyn FlagLookup,
) -> Result<(InvoiceResult, InvoiceResult)> {
    let flag_surcharge = flags.resolve_flag_surcharge(taxes.flag);
    let captive = captive_invoice(quantity, tariff, taxes, flag_surcharge)?;
    let usage = usage_invoice(quantity, tariff, taxes)?;

    Ok((captive, usage))
}
