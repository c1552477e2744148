//! CLI commands for looking up tariffs in the reference data.
use crate::id::IDCollection;
use crate::input::read_tariffs;
use crate::settings::Settings;
use crate::tariff::{
    DistributorID, Modality, Subgroup, TariffKey, TariffLookup, TariffLookupResult, TariffTable,
};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::fmt::Write;
use std::path::PathBuf;

/// Options shared by the tariff subcommands
#[derive(Args)]
pub struct TariffOpts {
    /// Directory containing the reference data files
    #[arg(long)]
    pub reference_dir: Option<PathBuf>,
}

/// The available subcommands for looking up tariffs.
#[derive(Subcommand)]
pub enum TariffSubcommands {
    /// List the distributors with published tariffs.
    ListDistributors {
        /// Other options
        #[command(flatten)]
        opts: TariffOpts,
    },
    /// List the resolutions for a distributor, most recent first.
    ListResolutions {
        /// The distributor's name.
        distributor: String,
        /// Other options
        #[command(flatten)]
        opts: TariffOpts,
    },
    /// Show the rates for a tariff.
    Show {
        /// The distributor's name.
        #[arg(long)]
        distributor: String,
        /// The consumer subgroup (e.g. A4).
        #[arg(long)]
        subgroup: String,
        /// The tariff modality (Verde or Azul).
        #[arg(long)]
        modality: String,
        /// The regulatory resolution.
        #[arg(long)]
        resolution: String,
        /// Other options
        #[command(flatten)]
        opts: TariffOpts,
    },
}

impl TariffSubcommands {
    /// Execute the supplied tariff subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::ListDistributors { opts } => {
                let tariffs = load_tariffs(&opts)?;
                for distributor in tariffs.distributors() {
                    println!("{distributor}");
                }
            }
            Self::ListResolutions { distributor, opts } => {
                let tariffs = load_tariffs(&opts)?;
                let distributor: DistributorID =
                    tariffs.distributors().get_id_by_str(&distributor)?;
                for resolution in tariffs.resolutions(&distributor) {
                    println!("{resolution}");
                }
            }
            Self::Show {
                distributor,
                subgroup,
                modality,
                resolution,
                opts,
            } => {
                let key = parse_tariff_key(&distributor, &subgroup, &modality, &resolution)?;
                let tariffs = load_tariffs(&opts)?;
                print!("{}", format_tariff(&key, &tariffs.resolve_tariff(&key)));
            }
        }

        Ok(())
    }
}

/// Read the tariff table from the folder in the options, the settings file or the working folder
fn load_tariffs(opts: &TariffOpts) -> Result<TariffTable> {
    let reference_dir = match &opts.reference_dir {
        Some(dir) => dir.clone(),
        None => Settings::load()
            .context("Failed to load settings.")?
            .reference_dir
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    read_tariffs(&reference_dir).context("Failed to load tariffs.")
}

/// Build a tariff key from labels given on the command line
fn parse_tariff_key(
    distributor: &str,
    subgroup: &str,
    modality: &str,
    resolution: &str,
) -> Result<TariffKey> {
    Ok(TariffKey {
        distributor: distributor.into(),
        subgroup: Subgroup::from_label(subgroup)
            .with_context(|| format!("Unknown subgroup: {subgroup}"))?,
        modality: Modality::from_label(modality)
            .with_context(|| format!("Unknown modality: {modality}"))?,
        resolution: resolution.into(),
    })
}

/// Describe the outcome of a tariff lookup
fn format_tariff(key: &TariffKey, result: &TariffLookupResult) -> String {
    let mut out = String::new();
    let TariffLookupResult::Resolved(schedule) = result else {
        writeln!(&mut out, "No tariff found for {key}").unwrap();
        return out;
    };

    writeln!(&mut out, "{key}").unwrap();
    let rows = [
        ("Demand peak", schedule.demand_peak.value()),
        ("Demand off-peak", schedule.demand_off_peak.value()),
        ("Energy peak TE", schedule.energy_peak_te.value()),
        ("Energy peak TUSD", schedule.energy_peak_tusd.value()),
        ("Energy off-peak TE", schedule.energy_off_peak_te.value()),
        ("Energy off-peak TUSD", schedule.energy_off_peak_tusd.value()),
    ];
    for (name, value) in rows {
        writeln!(&mut out, "  {name:<22}{value:>12.5}").unwrap();
    }

    out
}
