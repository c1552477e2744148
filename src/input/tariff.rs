//! Code for reading the regulator's tariff table.
use super::*;
use crate::tariff::{Modality, Subgroup, TariffKey, TariffSchedule, TariffTable};
use crate::units::{MoneyPerEnergy, MoneyPerPower};
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

const TARIFFS_FILE_NAME: &str = "tariffs.csv";

/// Value used in the table for fields which don't apply to a row
const NOT_APPLICABLE: &str = "Não se aplica";

/// The tariff base for tariffs applied to consumers (as opposed to economic reference tariffs)
const APPLICATION_TARIFF: &str = "Tarifa de Aplicação";

/// Divisor applied to published energy rates
const ENERGY_RATE_SCALE: f64 = 1000.0;

/// Distributor codes in the table and the names they are offered under
const DISTRIBUTOR_NAMES: [(&str, &str); 16] = [
    ("ETO", "Energisa Tocantins"),
    ("CERON", "Energisa Rondônia"),
    ("EPB", "Energisa Paraíba"),
    ("ESE", "Energisa Sergipe"),
    ("EMT", "Energisa Mato Grosso"),
    ("EMS", "Energia Mato Grosso do Sul"),
    ("ESS", "Energisa Sul Sudeste - ESS"),
    ("EMR", "Energisa Minas Rio"),
    ("ELETROPAULO", "ENEL SP"),
    ("ENF", "Energisa Nova Friburgo"),
    ("AME", "AME - Amazonas Energia"),
    ("CEA", "Equatorial Amapá - CEA"),
    ("CPFL-PIRATINING", "CPFL-PIRATININGA"),
    ("ERO", "Energisa Rondônia - ERO"),
    ("EAC", "Energisa Acre - EAC"),
    ("Neoenergia PE", "Neoenergia Pernambuco"),
];

/// A row of the tariff table, as published
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct TariffRowRaw {
    #[serde(rename = "SigAgente")]
    distributor: String,
    #[serde(rename = "DscREH")]
    resolution: String,
    #[serde(rename = "DscSubGrupo")]
    subgroup: String,
    #[serde(rename = "DscModalidadeTarifaria")]
    modality: String,
    #[serde(rename = "NomPostoTarifario")]
    post: String,
    #[serde(rename = "DscUnidadeTerciaria")]
    unit: String,
    #[serde(rename = "VlrTUSD")]
    tusd: String,
    #[serde(rename = "VlrTE")]
    te: String,
    #[serde(rename = "DscBaseTarifaria")]
    base: String,
    #[serde(rename = "DscDetalhe")]
    detail: String,
    #[serde(rename = "SigAgenteAcessante")]
    accessing_agent: String,
    #[serde(rename = "DatInicioVigencia")]
    start_date: NaiveDate,
}

impl TariffRowRaw {
    /// Whether the row is a plain application tariff for consumers
    fn is_application_tariff(&self) -> bool {
        self.detail == NOT_APPLICABLE
            && self.base == APPLICATION_TARIFF
            && self.accessing_agent == NOT_APPLICABLE
    }
}

/// The time-of-use post a rate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Post {
    Peak,
    OffPeak,
}

impl Post {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Ponta" => Some(Self::Peak),
            // Tariffs without separate posts apply at off-peak rates
            "Fora ponta" | NOT_APPLICABLE => Some(Self::OffPeak),
            _ => None,
        }
    }
}

/// Whether a rate is for demand or energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Charge {
    Demand,
    Energy,
}

impl Charge {
    fn from_unit(unit: &str) -> Option<Self> {
        match unit {
            "kW" => Some(Self::Demand),
            "MWh" => Some(Self::Energy),
            _ => None,
        }
    }
}

/// The rates published for one key, post and charge
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rates {
    start_date: NaiveDate,
    tusd: f64,
    te: f64,
}

/// Get the name a distributor is offered under
fn distributor_name(code: &str) -> &str {
    DISTRIBUTOR_NAMES
        .iter()
        .find(|(from, _)| *from == code)
        .map_or(code, |&(_, to)| to)
}

/// Read the tariff table from the reference directory.
///
/// # Arguments
///
/// * `reference_dir` - Folder containing reference data files
///
/// # Returns
///
/// The tariff schedule for each key in the table.
pub fn read_tariffs(reference_dir: &Path) -> Result<TariffTable> {
    let file_path = reference_dir.join(TARIFFS_FILE_NAME);
    let rows = read_csv_semicolon::<TariffRowRaw>(&file_path)?;
    read_tariffs_from_iter(rows).with_context(|| input_err_msg(&file_path))
}

fn read_tariffs_from_iter<I>(iter: I) -> Result<TariffTable>
where
    I: Iterator<Item = TariffRowRaw>,
{
    let mut latest: HashMap<(TariffKey, Post, Charge), Rates> = HashMap::new();
    let mut num_skipped = 0;
    for row in iter {
        if !row.is_application_tariff() {
            continue;
        }

        let (Some(subgroup), Some(modality), Some(post), Some(charge)) = (
            Subgroup::from_label(&row.subgroup),
            Modality::from_label(&row.modality),
            Post::from_label(&row.post),
            Charge::from_unit(&row.unit),
        ) else {
            num_skipped += 1;
            continue;
        };

        let key = TariffKey {
            distributor: distributor_name(&row.distributor).into(),
            subgroup,
            modality,
            resolution: row.resolution.as_str().into(),
        };
        let tusd = parse_decimal_comma(&row.tusd)
            .with_context(|| format!("Invalid VlrTUSD for tariff {key}"))?;
        let te = parse_decimal_comma(&row.te)
            .with_context(|| format!("Invalid VlrTE for tariff {key}"))?;
        ensure!(
            tusd.is_finite() && te.is_finite(),
            "Rates for tariff {key} must be finite"
        );

        let rates = Rates {
            start_date: row.start_date,
            tusd,
            te,
        };
        match latest.entry((key, post, charge)) {
            Entry::Vacant(entry) => {
                entry.insert(rates);
            }
            // The most recently effective rates win
            Entry::Occupied(mut entry) => {
                if rates.start_date > entry.get().start_date {
                    entry.insert(rates);
                }
            }
        }
    }

    if num_skipped > 0 {
        debug!("Skipped {num_skipped} tariff rows with an unsupported subgroup, modality or unit");
    }

    let mut schedules: HashMap<TariffKey, TariffSchedule> = HashMap::new();
    for ((key, post, charge), rates) in latest {
        let schedule = schedules.entry(key).or_insert(TariffSchedule::ZERO);
        match (charge, post) {
            (Charge::Demand, Post::Peak) => {
                schedule.demand_peak = MoneyPerPower(rates.tusd);
            }
            (Charge::Demand, Post::OffPeak) => {
                schedule.demand_off_peak = MoneyPerPower(rates.tusd);
            }
            (Charge::Energy, Post::Peak) => {
                schedule.energy_peak_te = MoneyPerEnergy(rates.te / ENERGY_RATE_SCALE);
                schedule.energy_peak_tusd = MoneyPerEnergy(rates.tusd / ENERGY_RATE_SCALE);
            }
            (Charge::Energy, Post::OffPeak) => {
                schedule.energy_off_peak_te = MoneyPerEnergy(rates.te / ENERGY_RATE_SCALE);
                schedule.energy_off_peak_tusd = MoneyPerEnergy(rates.tusd / ENERGY_RATE_SCALE);
            }
        }
    }

    Ok(TariffTable::new(schedules))
}
