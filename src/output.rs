//! The module responsible for writing proposal figures to disk.
//!
//! The files are the data series behind the proposal document's charts, plus a summary of the
//! headline figures, for an external document generator to lay out.
use crate::billing::InvoiceResult;
use crate::flag::TariffFlag;
use crate::price::Product;
use crate::proposal::{Proposal, ProposalLayout, ProposalRenderer};
use crate::units::{Dimensionless, Money, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which proposal-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "tariff_compare_results";

/// The prefix of the output folder name for a proposal
const OUTPUT_NAME_PREFIX: &str = "Proposta";

/// The output file name for invoice line items
const INVOICE_LINES_FILE_NAME: &str = "invoice_lines.csv";

/// The output file name for savings in each contract year
const YEARLY_SAVINGS_FILE_NAME: &str = "yearly_savings.csv";

/// The output file name for the tariff flag sensitivity
const FLAG_SENSITIVITY_FILE_NAME: &str = "flag_sensitivity.csv";

/// The output file name for the summary of headline figures
const SUMMARY_FILE_NAME: &str = "summary.toml";

/// Characters which can't appear in a folder name on common platforms
const INVALID_PATH_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Get the default output folder for a client's proposal.
///
/// The folder is named after the client and installation, with characters which aren't allowed
/// in paths replaced by underscores.
pub fn get_output_dir(client: &str, installation: &str) -> Result<PathBuf> {
    ensure!(
        !client.trim().is_empty() && !installation.trim().is_empty(),
        "Client and installation are needed to name the output folder"
    );
    let name = format!("{OUTPUT_NAME_PREFIX}_{client}_{installation}")
        .replace(INVALID_PATH_CHARS, "_");

    Ok([OUTPUT_DIRECTORY_ROOT, &name].iter().collect())
}

/// Create a new output directory, optionally replacing an existing one.
///
/// # Returns
///
/// Whether an existing, non-empty folder was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let mut overwrite = false;
    if let Ok(mut contents) = fs::read_dir(output_dir) {
        if contents.next().is_none() {
            // Already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        overwrite = true;
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the invoice lines CSV file
#[derive(Serialize, Debug, PartialEq)]
struct InvoiceLineRow {
    invoice: &'static str,
    line: String,
    value: Money,
}

/// Represents a row in the flag sensitivity CSV file
#[derive(Serialize, Debug, PartialEq)]
struct FlagSensitivityRow {
    flag: TariffFlag,
    captive_total: Money,
    mean_discount_percent: f64,
    rounded_percent: f64,
}

/// Represents a row in the yearly savings CSV file
#[derive(Serialize, Debug, PartialEq)]
struct YearlySavingRow {
    year: i32,
    months: u32,
    free_market: Money,
    savings: Money,
    percent: f64,
    rounded_percent: f64,
}

/// Contact details as written in the summary
#[derive(Serialize)]
struct AgentSummary<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
}

/// The headline figures of a proposal.
///
/// Scalar fields come before tables so the TOML output is valid.
#[derive(Serialize)]
struct Summary<'a> {
    client: &'a str,
    installation: &'a str,
    reference_invoice: &'a str,
    layout: ProposalLayout,
    product_name: String,
    tariff: String,
    tariff_resolved: bool,
    flag: TariffFlag,
    flag_surcharge: MoneyPerEnergy,
    start_date: NaiveDate,
    duration_months: u32,
    captive_total: Money,
    captive_total_without_compensation: Money,
    usage_total: Money,
    free_market: &'a [Money],
    monthly_savings: Money,
    annual_savings: Money,
    contract_savings: Money,
    effective_discount_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    contractual_discount_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<AgentSummary<'a>>,
    product: &'a Product,
}

impl<'a> Summary<'a> {
    fn new(proposal: &'a Proposal) -> Self {
        let request = &proposal.request;
        let discount = proposal.savings.discount;
        let agent = request
            .agent
            .as_ref()
            .zip(proposal.agent_contact.as_ref())
            .map(|(name, contact)| AgentSummary {
                name: &name.0,
                email: &contact.email,
                phone: &contact.phone,
            });

        Self {
            client: &request.client.name,
            installation: &request.client.installation,
            reference_invoice: &request.client.reference_invoice,
            layout: proposal.layout,
            product_name: request.price.product().to_string(),
            tariff: request.tariff_key.to_string(),
            tariff_resolved: proposal.tariff.is_resolved(),
            flag: request.taxes.flag,
            flag_surcharge: proposal.flag_surcharge,
            start_date: request.start_date,
            duration_months: request.price.duration_months(),
            captive_total: proposal.captive.total(),
            captive_total_without_compensation: proposal.captive.total_without_compensation(),
            usage_total: proposal.usage.total(),
            free_market: &proposal.free_market,
            monthly_savings: proposal.savings.monthly,
            annual_savings: proposal.savings.annual,
            contract_savings: proposal.savings.contract_total,
            effective_discount_percent: discount.effective.to_percent(),
            contractual_discount_percent: discount.contractual.map(Dimensionless::to_percent),
            agent,
            product: request.price.product(),
        }
    }
}

/// Writes the figures of a proposal to files in a folder
pub struct OutputWriter {
    output_path: PathBuf,
}

impl OutputWriter {
    /// Create a writer for the given folder, which must already exist
    pub fn new(output_path: &Path) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
        }
    }

    fn new_csv_writer(&self, file_name: &str) -> Result<csv::Writer<fs::File>> {
        let file_path = self.output_path.join(file_name);
        csv::Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))
    }

    /// Write the line items of the captive and usage-only invoices
    fn write_invoice_lines(&self, captive: &InvoiceResult, usage: &InvoiceResult) -> Result<()> {
        let mut writer = self.new_csv_writer(INVOICE_LINES_FILE_NAME)?;
        for (invoice, result) in [("captive", captive), ("usage", usage)] {
            for (line, value) in result.iter_lines() {
                writer.serialize(InvoiceLineRow {
                    invoice,
                    line: line.to_string(),
                    value,
                })?;
            }
            writer.serialize(InvoiceLineRow {
                invoice,
                line: "Total".into(),
                value: result.total(),
            })?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write the saving in each contract year
    fn write_yearly_savings(&self, proposal: &Proposal) -> Result<()> {
        let mut writer = self.new_csv_writer(YEARLY_SAVINGS_FILE_NAME)?;
        for saving in &proposal.yearly_savings {
            writer.serialize(YearlySavingRow {
                year: saving.year,
                months: saving.months,
                free_market: saving.free_market,
                savings: saving.savings,
                percent: saving.percent,
                rounded_percent: saving.rounded(),
            })?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write the mean discount under each tariff flag
    fn write_flag_sensitivity(&self, proposal: &Proposal) -> Result<()> {
        let mut writer = self.new_csv_writer(FLAG_SENSITIVITY_FILE_NAME)?;
        for discount in &proposal.flag_sensitivity {
            writer.serialize(FlagSensitivityRow {
                flag: discount.flag,
                captive_total: discount.captive_total,
                mean_discount_percent: discount.mean_discount_percent,
                rounded_percent: discount.rounded(),
            })?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write the headline figures in TOML format
    fn write_summary(&self, proposal: &Proposal) -> Result<()> {
        let file_path = self.output_path.join(SUMMARY_FILE_NAME);
        let summary = toml::to_string(&Summary::new(proposal))?;
        fs::write(&file_path, summary)
            .with_context(|| format!("Could not write {}", file_path.display()))?;

        Ok(())
    }
}

impl ProposalRenderer for OutputWriter {
    fn render(&mut self, proposal: &Proposal) -> Result<()> {
        self.write_invoice_lines(&proposal.captive, &proposal.usage)?;
        self.write_yearly_savings(proposal)?;
        self.write_flag_sensitivity(proposal)?;
        self.write_summary(proposal)?;

        Ok(())
    }
}
