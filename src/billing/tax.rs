//! Tax rates and the gross-up factors derived from them.
//!
//! Brazilian consumption taxes are charged "por dentro": the tax is part of the price it is
//! levied on. A pre-tax amount `x` taxed at rate `t` is therefore billed as `x / (1 - t)`.
use crate::flag::TariffFlag;
use crate::units::Dimensionless;
use anyhow::{Result, ensure};
use serde::Serialize;

/// The tax and flag context for a billing cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxProfile {
    /// ICMS rate
    pub icms: Dimensionless,
    /// ICMS rate applied to energy at reserved hours
    pub icms_reserved: Dimensionless,
    /// Combined PASEP and COFINS rate
    pub pasep_cofins: Dimensionless,
    /// The tariff flag in force
    pub flag: TariffFlag,
    /// Fraction of the reserved-hour energy charge discounted for irrigation consumers
    pub irrigation_discount: Dimensionless,
}

impl TaxProfile {
    /// Check that rates and the irrigation discount are fractions in the range [0, 1)
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("ICMS", self.icms),
            ("Reserved-hour ICMS", self.icms_reserved),
            ("PASEP/COFINS", self.pasep_cofins),
        ] {
            ensure!(
                rate.is_finite() && rate >= Dimensionless(0.0),
                "{name} rate must be a non-negative number (got {rate})"
            );
            ensure!(
                rate < Dimensionless(1.0),
                "{name} rate must be less than 100% (got {}%)",
                rate.to_percent()
            );
        }
        ensure!(
            self.irrigation_discount >= Dimensionless(0.0)
                && self.irrigation_discount <= Dimensionless(1.0),
            "Irrigation discount must be between 0 and 1 (got {})",
            self.irrigation_discount
        );

        Ok(())
    }
}

/// Multiplicative gross-up factors which convert a pre-tax amount to the amount billed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxFactors {
    /// Gross-up for PASEP and COFINS
    pub pasep_cofins: Dimensionless,
    /// Gross-up for ICMS
    pub icms: Dimensionless,
    /// Gross-up for ICMS on reserved-hour energy
    pub icms_reserved: Dimensionless,
}

impl TaxFactors {
    /// Derive the gross-up factors for the given tax profile.
    ///
    /// Fails if any rate would make a factor non-finite, i.e. if a rate is 100% or more.
    pub fn new(taxes: &TaxProfile) -> Result<Self> {
        taxes.validate()?;
        Ok(Self {
            pasep_cofins: gross_up(taxes.pasep_cofins),
            icms: gross_up(taxes.icms),
            icms_reserved: gross_up(taxes.icms_reserved),
        })
    }
}

/// The gross-up factor for a validated rate
fn gross_up(rate: Dimensionless) -> Dimensionless {
    Dimensionless(1.0) / (Dimensionless(1.0) - rate)
}
