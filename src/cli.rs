//! The command line interface for the program.
use crate::input::read_proposal_request;
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{OutputWriter, create_output_directory, get_output_dir};
use crate::proposal::{ProposalRenderer, generate_proposal};
use crate::settings::Settings;
use crate::store::{DirectorySource, ReferenceStore};
use ::log::{info, warn};
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;
pub mod tariff;
use tariff::TariffSubcommands;

/// Compare captive-market and free-market electricity invoices.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Directory containing the reference data files
    #[arg(long)]
    pub reference_dir: Option<PathBuf>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Generate the figures for a proposal.
    Run {
        /// Path to the proposal request file.
        proposal_path: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example proposals.
    Example {
        /// The available subcommands for managing example proposals.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a proposal request against the reference data.
    Validate {
        /// Path to the proposal request file.
        proposal_path: PathBuf,
        /// Directory containing the reference data files
        #[arg(long)]
        reference_dir: Option<PathBuf>,
    },
    /// Look up tariffs in the reference data.
    Tariff {
        /// The available subcommands for looking up tariffs.
        #[command(subcommand)]
        subcommand: TariffSubcommands,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run {
                proposal_path,
                opts,
            } => handle_run_command(&proposal_path, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate {
                proposal_path,
                reference_dir,
            } => handle_validate_command(&proposal_path, reference_dir.as_deref(), None),
            Self::Tariff { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ tariff-compare --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help in markdown format
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Get the folder to read reference data from.
///
/// A folder given on the command line takes precedence, then the one in the settings file. If
/// neither is given, the reference data is expected next to the proposal file.
pub fn resolve_reference_dir(
    from_cli: Option<&Path>,
    settings: &Settings,
    proposal_path: &Path,
) -> PathBuf {
    from_cli
        .or(settings.reference_dir.as_deref())
        .or_else(|| proposal_path.parent())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Handle the `run` command.
pub fn handle_run_command(
    proposal_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // The output folder is named after the client, so the request is needed first
    let request = read_proposal_request(proposal_path).context("Failed to load proposal.")?;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(&request.client.name, &request.client.installation)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(&settings.log_level), Some(output_path))
        .context("Failed to initialise logging.")?;
    info!("Loaded proposal request from {}", proposal_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let reference_dir =
        resolve_reference_dir(opts.reference_dir.as_deref(), &settings, proposal_path);
    let store = ReferenceStore::load(
        &DirectorySource::new(&reference_dir),
        Local::now().date_naive(),
    )
    .context("Failed to load reference data.")?;
    let reference = store.snapshot();

    let proposal = generate_proposal(
        &request,
        &reference.tariffs,
        &reference.flags,
        &reference.agents,
    )?;
    OutputWriter::new(output_path)
        .render(&proposal)
        .context("Failed to write proposal figures.")?;
    write_metadata(output_path, proposal_path, &reference_dir)?;
    info!("Proposal figures written to {}", output_path.display());

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    proposal_path: &Path,
    reference_dir: Option<&Path>,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let request = read_proposal_request(proposal_path).context("Failed to validate proposal.")?;
    let reference_dir = resolve_reference_dir(reference_dir, &settings, proposal_path);
    let store = ReferenceStore::load(
        &DirectorySource::new(&reference_dir),
        Local::now().date_naive(),
    )
    .context("Failed to load reference data.")?;
    let reference = store.snapshot();

    let proposal = generate_proposal(
        &request,
        &reference.tariffs,
        &reference.flags,
        &reference.agents,
    )
    .context("Failed to validate proposal.")?;
    if !proposal.tariff.is_resolved() {
        warn!("The proposal would be billed with zero tariff rates");
    }
    info!("Proposal validation successful!");

    Ok(())
}
