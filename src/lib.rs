//! Common functionality for comparing captive-market and free-market electricity invoices.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod billing;
pub mod cli;
pub mod contact;
pub mod flag;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod price;
pub mod proposal;
pub mod savings;
pub mod settings;
pub mod store;
pub mod tariff;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program.
pub fn get_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform; fall back to the current directory
        return PathBuf::default();
    };
    config_dir.push("tariff-compare");
    config_dir
}
