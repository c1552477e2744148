//! Code for reading every reference data file from a folder.
use super::*;
use crate::store::ReferenceData;
use anyhow::Result;
use log::info;
use std::path::Path;

/// Read the tariffs, tariff flag surcharges and agent directory from a folder.
///
/// # Arguments
///
/// * `reference_dir` - Folder containing reference data files
pub fn read_reference_data(reference_dir: &Path) -> Result<ReferenceData> {
    let tariffs = read_tariffs(reference_dir)?;
    let flags = read_flag_surcharges(reference_dir)?;
    let agents = read_agent_directory(reference_dir)?;
    info!(
        "Loaded {} tariff schedules and {} agents from {}",
        tariffs.len(),
        agents.len(),
        reference_dir.display()
    );

    Ok(ReferenceData {
        tariffs,
        flags,
        agents,
    })
}
