//! Common routines for handling input data.
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod agent;
pub use agent::read_agent_directory;
pub mod flag;
pub use flag::read_flag_surcharges;
pub mod proposal;
pub use proposal::read_proposal_request;
pub mod reference;
pub use reference::read_reference_data;
pub mod tariff;
pub use tariff::read_tariffs;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path, b',')?;
    ensure!(!vec.is_empty(), "CSV file {} cannot be empty", file_path.display());

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// Returns an empty iterator if the file doesn't exist or has no rows.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    let vec = read_csv_internal(file_path, b',')?;
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a semicolon-delimited CSV file.
///
/// This is the layout of the regulator's open-data exports. The file cannot be empty.
pub fn read_csv_semicolon<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path, b';')?;
    ensure!(!vec.is_empty(), "CSV file {} cannot be empty", file_path.display());

    Ok(vec.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path, delimiter: u8) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a percentage, checking that it is between 0 and 100, and convert it to a fraction
pub fn deserialise_percent<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=100.0).contains(&value) {
        Err(serde::de::Error::custom("Percentage must be between 0 and 100"))?;
    }

    Ok(Dimensionless::from_percent(value))
}

/// Read a tax rate given as a percentage and convert it to a fraction.
///
/// Taxes are grossed up by dividing by `1 - rate`, so the rate must be less than 100%.
pub fn deserialise_tax_rate<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..100.0).contains(&value) {
        Err(serde::de::Error::custom(
            "Tax rate must be at least 0% and less than 100%",
        ))?;
    }

    Ok(Dimensionless::from_percent(value))
}

/// Parse a number written with a decimal comma (e.g. "25,47" or ",00")
pub fn parse_decimal_comma(s: &str) -> Result<f64> {
    let s = s.trim();
    let normalised = if s.starts_with(',') {
        format!("0{s}")
    } else {
        s.to_string()
    };

    normalised
        .replace(',', ".")
        .parse()
        .with_context(|| format!("Invalid number: {s}"))
}
