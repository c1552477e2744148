//! Integration tests for the `run` command.
use std::path::PathBuf;
use tariff_compare::cli::{RunOpts, handle_run_command};
use tariff_compare::settings::Settings;
use tempfile::tempdir;

/// Get the path to the example proposal.
fn get_proposal_path() -> PathBuf {
    PathBuf::from("demos/price_curve/proposal.toml")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("TARIFF_COMPARE_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        ..RunOpts::default()
    };
    handle_run_command(&get_proposal_path(), &opts, Some(Settings::default())).unwrap();
    for file_name in [
        "invoice_lines.csv",
        "yearly_savings.csv",
        "flag_sensitivity.csv",
        "summary.toml",
        "metadata.toml",
        "tariff_compare_info.log",
        "tariff_compare_error.log",
    ] {
        assert!(output_dir.join(file_name).is_file(), "Missing {file_name}");
    }

    // Second time will fail because the output folder isn't empty
    assert_eq!(
        handle_run_command(&get_proposal_path(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        format!("Failed to create output directory: {}", output_dir.display())
    );

    // ...and when overwriting, because the logging is already initialised
    let opts = RunOpts {
        overwrite: true,
        ..opts
    };
    assert_eq!(
        handle_run_command(&get_proposal_path(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
