//! Tariff flags ("bandeiras tarifárias") and the energy surcharge applied at each flag level.
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result, ensure};
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display, EnumIter, IntoEnumIterator};
use unicase::UniCase;

/// The level of the tariff flag in force for a billing cycle.
///
/// The flag prices the generation component of energy, so only energy bought on the captive
/// market is affected by it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter,
)]
pub enum TariffFlag {
    /// No surcharge conditions
    #[default]
    #[strum(serialize = "green")]
    Green,
    /// Less favourable generation conditions
    #[strum(serialize = "yellow")]
    Yellow,
    /// Costly generation conditions, level 1
    #[strum(serialize = "red-1")]
    Red1,
    /// Costly generation conditions, level 2
    #[strum(serialize = "red-2")]
    Red2,
}

impl TariffFlag {
    /// The label used for the flag in the regulator's publications
    pub fn portuguese_label(self) -> &'static str {
        match self {
            Self::Green => "Verde",
            Self::Yellow => "Amarela",
            Self::Red1 => "Vermelha 1",
            Self::Red2 => "Vermelha 2",
        }
    }
}

impl FromStr for TariffFlag {
    type Err = anyhow::Error;

    /// Parse a flag level, accepting either the English or the Portuguese label (ignoring case)
    fn from_str(s: &str) -> Result<Self> {
        let label = UniCase::new(s.trim());
        TariffFlag::iter()
            .find(|flag| {
                label == UniCase::new(flag.portuguese_label())
                    || label == UniCase::new(flag.to_string())
            })
            .with_context(|| format!("Unknown tariff flag: {}", s.trim()))
    }
}

impl<'de> Deserialize<'de> for TariffFlag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Serialize for TariffFlag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Resolves the energy surcharge for a tariff flag level
pub trait FlagLookup {
    /// Get the surcharge (per unit of energy) for the given flag level
    fn resolve_flag_surcharge(&self, flag: TariffFlag) -> MoneyPerEnergy;
}

/// The energy surcharge for every tariff flag level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlagSurcharges {
    green: MoneyPerEnergy,
    yellow: MoneyPerEnergy,
    red_1: MoneyPerEnergy,
    red_2: MoneyPerEnergy,
}

impl FlagSurcharges {
    /// Create a table from the surcharge for each level, ordered green to red-2
    pub fn new(
        green: MoneyPerEnergy,
        yellow: MoneyPerEnergy,
        red_1: MoneyPerEnergy,
        red_2: MoneyPerEnergy,
    ) -> Self {
        Self {
            green,
            yellow,
            red_1,
            red_2,
        }
    }

    /// Build the table from (flag, surcharge) pairs.
    ///
    /// Every flag level must appear exactly once and surcharges cannot be negative.
    pub fn from_entries<I>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TariffFlag, MoneyPerEnergy)>,
    {
        let mut map = HashMap::new();
        for (flag, surcharge) in iter {
            ensure!(
                surcharge.is_finite() && surcharge >= MoneyPerEnergy(0.0),
                "Surcharge for tariff flag {flag} must be a non-negative number"
            );
            ensure!(
                map.insert(flag, surcharge).is_none(),
                "Duplicate surcharge for tariff flag {flag}"
            );
        }

        let mut get = |flag: TariffFlag| {
            map.remove(&flag)
                .with_context(|| format!("Missing surcharge for tariff flag {flag}"))
        };
        Ok(Self {
            green: get(TariffFlag::Green)?,
            yellow: get(TariffFlag::Yellow)?,
            red_1: get(TariffFlag::Red1)?,
            red_2: get(TariffFlag::Red2)?,
        })
    }

    /// Iterate over every flag level with its surcharge
    pub fn iter(&self) -> impl Iterator<Item = (TariffFlag, MoneyPerEnergy)> + '_ {
        TariffFlag::iter().map(|flag| (flag, self.resolve_flag_surcharge(flag)))
    }
}

impl FlagLookup for FlagSurcharges {
    fn resolve_flag_surcharge(&self, flag: TariffFlag) -> MoneyPerEnergy {
        match flag {
            TariffFlag::Green => self.green,
            TariffFlag::Yellow => self.yellow,
            TariffFlag::Red1 => self.red_1,
            TariffFlag::Red2 => self.red_2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, flag_surcharges};
    use rstest::rstest;

    #[rstest]
    #[case("green", TariffFlag::Green)]
    #[case("Verde", TariffFlag::Green)]
    #[case("AMARELA", TariffFlag::Yellow)]
    #[case(" red-1 ", TariffFlag::Red1)]
    #[case("Vermelha 2", TariffFlag::Red2)]
    fn test_flag_from_str(#[case] input: &str, #[case] expected: TariffFlag) {
        assert_eq!(input.parse::<TariffFlag>().unwrap(), expected);
    }

    #[test]
    fn test_flag_from_str_invalid() {
        assert_error!("purple".parse::<TariffFlag>(), "Unknown tariff flag: purple");
    }

    #[test]
    fn test_flag_display_round_trip() {
        for flag in TariffFlag::iter() {
            assert_eq!(flag.to_string().parse::<TariffFlag>().unwrap(), flag);
        }
    }

    #[rstest]
    fn test_resolve_flag_surcharge(flag_surcharges: FlagSurcharges) {
        assert_eq!(
            flag_surcharges.resolve_flag_surcharge(TariffFlag::Green),
            MoneyPerEnergy(0.0)
        );
        assert_eq!(
            flag_surcharges.resolve_flag_surcharge(TariffFlag::Red2),
            MoneyPerEnergy(0.07877)
        );
    }

    #[test]
    fn test_from_entries_missing_flag() {
        let entries = [
            (TariffFlag::Green, MoneyPerEnergy(0.0)),
            (TariffFlag::Yellow, MoneyPerEnergy(0.01885)),
            (TariffFlag::Red1, MoneyPerEnergy(0.04463)),
        ];
        assert_error!(
            FlagSurcharges::from_entries(entries),
            "Missing surcharge for tariff flag red-2"
        );
    }

    #[test]
    fn test_from_entries_duplicate_flag() {
        let entries = [
            (TariffFlag::Green, MoneyPerEnergy(0.0)),
            (TariffFlag::Green, MoneyPerEnergy(0.01)),
        ];
        assert_error!(
            FlagSurcharges::from_entries(entries),
            "Duplicate surcharge for tariff flag green"
        );
    }

    #[test]
    fn test_from_entries_negative() {
        let entries = [(TariffFlag::Yellow, MoneyPerEnergy(-1.0))];
        assert_error!(
            FlagSurcharges::from_entries(entries),
            "Surcharge for tariff flag yellow must be a non-negative number"
        );
    }
}
