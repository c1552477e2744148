//! Contact details for the sales agents named on proposals.
use crate::id::define_id_type;
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

define_id_type! {AgentName}

/// How to reach an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContact {
    /// Email address
    pub email: String,
    /// Phone number
    pub phone: String,
}

/// A directory of agent contact details, keyed by agent name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentDirectory(IndexMap<AgentName, AgentContact>);

impl AgentDirectory {
    /// Create a directory from contacts keyed by agent name
    pub fn new(contacts: IndexMap<AgentName, AgentContact>) -> Self {
        Self(contacts)
    }

    /// Look up an agent's contact details by exact name.
    ///
    /// A missing agent isn't an error: a warning is logged and the proposal is produced without
    /// contact details.
    pub fn lookup(&self, agent: &AgentName) -> Option<&AgentContact> {
        let contact = self.0.get(agent);
        if contact.is_none() {
            warn!("No contact details found for agent {agent}");
        }

        contact
    }

    /// The number of agents in the directory
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
