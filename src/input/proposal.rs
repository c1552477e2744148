//! Code for reading a proposal request from a TOML file.
use super::*;
use crate::billing::{Quantity, TaxProfile};
use crate::contact::AgentName;
use crate::flag::TariffFlag;
use crate::price::{PriceProfile, Product, contract_years};
use crate::proposal::{ClientInfo, ProposalRequest};
use crate::tariff::{Modality, Subgroup, TariffKey};
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

/// Default PASEP rate (%)
const DEFAULT_PASEP: f64 = 0.83;

/// Default COFINS rate (%)
const DEFAULT_COFINS: f64 = 3.82;

/// Default ICMS rate (%)
const DEFAULT_ICMS: f64 = 18.0;

/// Default contract length
const DEFAULT_DURATION_MONTHS: u32 = 60;

/// Energy price offered when none is given
const DEFAULT_PRICE: MoneyPerEnergy = MoneyPerEnergy::new(263.38);

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).expect("Default start date is invalid")
}

fn default_duration_months() -> u32 {
    DEFAULT_DURATION_MONTHS
}

fn default_icms() -> Dimensionless {
    Dimensionless::from_percent(DEFAULT_ICMS)
}

fn default_pasep() -> Dimensionless {
    Dimensionless::from_percent(DEFAULT_PASEP)
}

fn default_cofins() -> Dimensionless {
    Dimensionless::from_percent(DEFAULT_COFINS)
}

fn default_price() -> MoneyPerEnergy {
    DEFAULT_PRICE
}

/// A proposal request, as written in the file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProposalRequestRaw {
    client: String,
    installation: String,
    #[serde(default)]
    reference_invoice: String,
    agent: Option<String>,
    #[serde(default)]
    irrigation: bool,
    #[serde(default)]
    self_generation: bool,
    #[serde(default = "default_start_date")]
    start_date: NaiveDate,
    #[serde(default = "default_duration_months")]
    duration_months: u32,
    tariff: TariffKeyRaw,
    #[serde(default)]
    taxes: TaxesRaw,
    #[serde(default)]
    quantity: Quantity,
    product: ProductRaw,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TariffKeyRaw {
    distributor: String,
    subgroup: Subgroup,
    modality: Modality,
    resolution: String,
}

/// Tax rates, given as percentages
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaxesRaw {
    #[serde(default = "default_icms", deserialize_with = "deserialise_tax_rate")]
    icms: Dimensionless,
    #[serde(default, deserialize_with = "deserialise_tax_rate")]
    icms_reserved: Dimensionless,
    #[serde(default = "default_pasep", deserialize_with = "deserialise_tax_rate")]
    pasep: Dimensionless,
    #[serde(default = "default_cofins", deserialize_with = "deserialise_tax_rate")]
    cofins: Dimensionless,
    #[serde(default)]
    flag: TariffFlag,
    #[serde(default, deserialize_with = "deserialise_percent")]
    irrigation_discount: Dimensionless,
}

impl Default for TaxesRaw {
    fn default() -> Self {
        Self {
            icms: default_icms(),
            icms_reserved: Dimensionless(0.0),
            pasep: default_pasep(),
            cofins: default_cofins(),
            flag: TariffFlag::Green,
            irrigation_discount: Dimensionless(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum ProductRaw {
    FixedDiscount {
        #[serde(deserialize_with = "deserialise_percent")]
        discount: Dimensionless,
    },
    PriceCurve {
        prices: Option<Vec<MoneyPerEnergy>>,
    },
    TakeOrPay {
        #[serde(default = "default_price")]
        price: MoneyPerEnergy,
    },
}

/// Read a proposal request from a TOML file.
///
/// Percentages are converted to fractions. Quantities and rates which only apply to irrigation or
/// self-generation consumers are zeroed when the request doesn't have that mode enabled.
///
/// # Arguments
///
/// * `file_path` - Path to the proposal request file
pub fn read_proposal_request(file_path: &Path) -> Result<ProposalRequest> {
    let raw: ProposalRequestRaw = read_toml(file_path)?;
    build_proposal_request(raw).with_context(|| input_err_msg(file_path))
}

fn build_proposal_request(raw: ProposalRequestRaw) -> Result<ProposalRequest> {
    ensure!(!raw.client.trim().is_empty(), "Client name cannot be empty");
    ensure!(
        !raw.tariff.distributor.is_empty() && !raw.tariff.resolution.is_empty(),
        "Distributor and resolution must be given"
    );

    let years = contract_years(raw.start_date, raw.duration_months)?;
    let product = match raw.product {
        ProductRaw::FixedDiscount { discount } => Product::FixedDiscount { discount },
        ProductRaw::PriceCurve { prices } => Product::PriceCurve {
            prices: prices.unwrap_or_else(|| vec![DEFAULT_PRICE; years.len()]),
        },
        ProductRaw::TakeOrPay { price } => Product::take_or_pay(price, years.len()),
    };
    let price = PriceProfile::new(years, raw.duration_months, product)?;

    let quantity = raw.quantity.for_modes(raw.irrigation, raw.self_generation);
    quantity.validate()?;

    let mut taxes = TaxProfile {
        icms: raw.taxes.icms,
        icms_reserved: raw.taxes.icms_reserved,
        pasep_cofins: raw.taxes.pasep + raw.taxes.cofins,
        flag: raw.taxes.flag,
        irrigation_discount: raw.taxes.irrigation_discount,
    };
    if !raw.irrigation {
        taxes.icms_reserved = Dimensionless(0.0);
        taxes.irrigation_discount = Dimensionless(0.0);
    }
    taxes.validate()?;

    Ok(ProposalRequest {
        client: ClientInfo {
            name: raw.client.trim().to_string(),
            installation: raw.installation.trim().to_string(),
            reference_invoice: raw.reference_invoice,
        },
        agent: raw.agent.map(AgentName::from),
        tariff_key: TariffKey {
            distributor: raw.tariff.distributor.into(),
            subgroup: raw.tariff.subgroup,
            modality: raw.tariff.modality,
            resolution: raw.tariff.resolution.into(),
        },
        taxes,
        quantity,
        price,
        start_date: raw.start_date,
        irrigation: raw.irrigation,
        self_generation: raw.self_generation,
    })
}
