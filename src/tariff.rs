//! Tariff schedules published by distributors and the lookup of the schedule for a consumer.
//!
//! A [`TariffSchedule`] is the pre-tax rate card for one combination of distributor, subgroup,
//! modality and regulatory resolution. Rates for a combination which isn't in the reference data
//! resolve to [`TariffLookupResult::DefaultEmpty`], which bills as an all-zero schedule so that a
//! proposal can still be produced (with obviously-zero line items) rather than aborting.
use crate::id::define_id_type;
use crate::units::{MoneyPerEnergy, MoneyPerPower};
use indexmap::IndexSet;
use itertools::Itertools;
use serde::Serialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::HashMap;

define_id_type! {DistributorID}
define_id_type! {ResolutionID}

/// The tariff subgroup of a consumer unit, determined by its supply voltage
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
#[allow(missing_docs)]
pub enum Subgroup {
    #[string = "A1"]
    A1,
    #[string = "A2"]
    A2,
    #[string = "A3"]
    A3,
    #[string = "A3a"]
    A3a,
    #[string = "A4"]
    A4,
    #[string = "AS"]
    AS,
    #[string = "B"]
    B,
}

impl Subgroup {
    /// All subgroups, in the order they are offered on the proposal form
    pub const ALL: [Self; 7] = [
        Self::A4,
        Self::A3,
        Self::AS,
        Self::A2,
        Self::A1,
        Self::A3a,
        Self::B,
    ];

    /// The label used for the subgroup in the reference data
    pub fn label(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::A3 => "A3",
            Self::A3a => "A3a",
            Self::A4 => "A4",
            Self::AS => "AS",
            Self::B => "B",
        }
    }

    /// Get the subgroup with the given label, if there is one
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|subgroup| subgroup.label() == label)
    }
}

/// The time-of-use tariff modality
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum Modality {
    /// A single demand rate, with peak energy priced higher
    #[string = "Verde"]
    Verde,
    /// Separate peak and off-peak demand rates
    #[string = "Azul"]
    Azul,
}

impl Modality {
    /// The label used for the modality in the reference data
    pub fn label(self) -> &'static str {
        match self {
            Self::Verde => "Verde",
            Self::Azul => "Azul",
        }
    }

    /// Get the modality with the given label, if there is one
    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Verde, Self::Azul]
            .into_iter()
            .find(|modality| modality.label() == label)
    }
}

/// Identifies a tariff schedule in the reference data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TariffKey {
    /// The distributor's code (e.g. "CEMIG-D")
    pub distributor: DistributorID,
    /// The consumer's subgroup
    pub subgroup: Subgroup,
    /// The tariff modality
    pub modality: Modality,
    /// The regulatory resolution which set the tariff
    pub resolution: ResolutionID,
}

impl std::fmt::Display for TariffKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.distributor,
            self.subgroup.label(),
            self.modality.label(),
            self.resolution
        )
    }
}

/// The pre-tax rates for one tariff.
///
/// Energy rates are split into the generation component (TE) and the distribution-usage
/// component (TUSD).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TariffSchedule {
    /// Demand rate at peak hours
    pub demand_peak: MoneyPerPower,
    /// Demand rate at off-peak hours
    pub demand_off_peak: MoneyPerPower,
    /// Generation component of the peak energy rate
    pub energy_peak_te: MoneyPerEnergy,
    /// Usage component of the peak energy rate
    pub energy_peak_tusd: MoneyPerEnergy,
    /// Generation component of the off-peak energy rate
    pub energy_off_peak_te: MoneyPerEnergy,
    /// Usage component of the off-peak energy rate
    pub energy_off_peak_tusd: MoneyPerEnergy,
}

impl TariffSchedule {
    /// A schedule with every rate set to zero
    pub const ZERO: Self = Self {
        demand_peak: MoneyPerPower::new(0.0),
        demand_off_peak: MoneyPerPower::new(0.0),
        energy_peak_te: MoneyPerEnergy::new(0.0),
        energy_peak_tusd: MoneyPerEnergy::new(0.0),
        energy_off_peak_te: MoneyPerEnergy::new(0.0),
        energy_off_peak_tusd: MoneyPerEnergy::new(0.0),
    };

    /// The combined (TE + TUSD) energy rate at peak hours
    pub fn energy_peak(&self) -> MoneyPerEnergy {
        self.energy_peak_te + self.energy_peak_tusd
    }

    /// The combined (TE + TUSD) energy rate at off-peak hours
    pub fn energy_off_peak(&self) -> MoneyPerEnergy {
        self.energy_off_peak_te + self.energy_off_peak_tusd
    }
}

/// The outcome of looking up a tariff
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TariffLookupResult {
    /// The key matched a tariff in the reference data
    Resolved(TariffSchedule),
    /// Nothing matched the key, so an all-zero schedule applies
    DefaultEmpty,
}

impl TariffLookupResult {
    /// The schedule to bill with
    pub fn schedule(&self) -> TariffSchedule {
        match self {
            Self::Resolved(schedule) => *schedule,
            Self::DefaultEmpty => TariffSchedule::ZERO,
        }
    }

    /// Whether the key matched a tariff in the reference data
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Resolves tariff schedules
pub trait TariffLookup {
    /// Look up the schedule for the given key.
    ///
    /// Lookups must be deterministic for a given key.
    fn resolve_tariff(&self, key: &TariffKey) -> TariffLookupResult;
}

/// An in-memory table of tariff schedules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TariffTable(HashMap<TariffKey, TariffSchedule>);

impl TariffTable {
    /// Create a table from schedules keyed by [`TariffKey`]
    pub fn new(schedules: HashMap<TariffKey, TariffSchedule>) -> Self {
        Self(schedules)
    }

    /// The number of schedules in the table
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no schedules
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All distributors with at least one schedule, in alphabetical order
    pub fn distributors(&self) -> IndexSet<DistributorID> {
        self.0
            .keys()
            .map(|key| key.distributor.clone())
            .sorted()
            .collect()
    }

    /// The resolutions for a distributor, most recent first.
    ///
    /// Resolution descriptions embed their number, so reverse lexical order lists the newest
    /// resolutions first.
    pub fn resolutions(&self, distributor: &DistributorID) -> Vec<ResolutionID> {
        self.0
            .keys()
            .filter(|key| &key.distributor == distributor)
            .map(|key| key.resolution.clone())
            .unique()
            .sorted_by(|a, b| b.cmp(a))
            .collect()
    }

    /// Iterate over the keys and schedules in the table
    pub fn iter(&self) -> impl Iterator<Item = (&TariffKey, &TariffSchedule)> {
        self.0.iter()
    }
}

impl TariffLookup for TariffTable {
    fn resolve_tariff(&self, key: &TariffKey) -> TariffLookupResult {
        self.0
            .get(key)
            .map_or(TariffLookupResult::DefaultEmpty, |schedule| {
                TariffLookupResult::Resolved(*schedule)
            })
    }
}
