//! Code for reading the agent contact directory.
use super::*;
use crate::contact::{AgentContact, AgentDirectory, AgentName};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const AGENTS_FILE_NAME: &str = "agents.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct AgentContactRaw {
    agent: String,
    email: String,
    phone: String,
}

/// Read the agent contact directory.
///
/// The file is optional; if it is absent the directory is empty.
///
/// # Arguments
///
/// * `reference_dir` - Folder containing reference data files
pub fn read_agent_directory(reference_dir: &Path) -> Result<AgentDirectory> {
    let file_path = reference_dir.join(AGENTS_FILE_NAME);
    let rows = read_csv_optional::<AgentContactRaw>(&file_path)?;
    read_agent_directory_from_iter(rows).with_context(|| input_err_msg(&file_path))
}

fn read_agent_directory_from_iter<I>(iter: I) -> Result<AgentDirectory>
where
    I: Iterator<Item = AgentContactRaw>,
{
    let mut contacts: IndexMap<AgentName, AgentContact> = IndexMap::new();
    for row in iter {
        ensure!(!row.agent.is_empty(), "Agent name cannot be empty");
        let contact = AgentContact {
            email: row.email,
            phone: row.phone,
        };
        ensure!(
            contacts.insert(row.agent.as_str().into(), contact).is_none(),
            "Duplicate entry for agent {}",
            row.agent
        );
    }

    Ok(AgentDirectory::new(contacts))
}
