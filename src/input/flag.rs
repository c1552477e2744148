//! Code for reading the tariff flag surcharges CSV file.
use super::*;
use crate::flag::{FlagSurcharges, TariffFlag};
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

const TARIFF_FLAGS_FILE_NAME: &str = "tariff_flags.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct FlagSurchargeRaw {
    flag: TariffFlag,
    surcharge: MoneyPerEnergy,
}

/// Read the surcharge for each tariff flag level.
///
/// # Arguments
///
/// * `reference_dir` - Folder containing reference data files
///
/// # Returns
///
/// The surcharges, or an error if any flag level is missing or repeated.
pub fn read_flag_surcharges(reference_dir: &Path) -> Result<FlagSurcharges> {
    let file_path = reference_dir.join(TARIFF_FLAGS_FILE_NAME);
    let rows = read_csv::<FlagSurchargeRaw>(&file_path)?;
    FlagSurcharges::from_entries(rows.map(|row| (row.flag, row.surcharge)))
        .with_context(|| input_err_msg(&file_path))
}
