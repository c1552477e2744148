//! Fixtures for tests
use crate::billing::{Quantity, TaxProfile};
use crate::contact::AgentDirectory;
use crate::flag::{FlagSurcharges, TariffFlag};
use crate::price::{PriceProfile, Product};
use crate::store::ReferenceData;
use crate::tariff::{Modality, Subgroup, TariffKey, TariffSchedule, TariffTable};
use crate::units::{Dimensionless, Energy, MoneyPerEnergy, MoneyPerPower, Power};
use rstest::fixture;
use std::iter;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn quantity() -> Quantity {
    Quantity {
        demand_peak: Power(317.0),
        demand_off_peak: Power(140.0),
        energy_peak: Energy(1200.0),
        energy_off_peak: Energy(14278.0),
        ..Quantity::default()
    }
}

#[fixture]
pub fn tariff_key() -> TariffKey {
    TariffKey {
        distributor: "CEMIG-D".into(),
        subgroup: Subgroup::A4,
        modality: Modality::Verde,
        resolution: "REH 3.225/2024".into(),
    }
}

#[fixture]
pub fn tariff_schedule() -> TariffSchedule {
    TariffSchedule {
        demand_peak: MoneyPerPower(60.0),
        demand_off_peak: MoneyPerPower(25.0),
        energy_peak_te: MoneyPerEnergy(0.45),
        energy_peak_tusd: MoneyPerEnergy(1.6),
        energy_off_peak_te: MoneyPerEnergy(0.28),
        energy_off_peak_tusd: MoneyPerEnergy(0.07),
    }
}

#[fixture]
pub fn tariff_table(tariff_key: TariffKey, tariff_schedule: TariffSchedule) -> TariffTable {
    TariffTable::new(iter::once((tariff_key, tariff_schedule)).collect())
}

#[fixture]
pub fn tax_profile() -> TaxProfile {
    TaxProfile {
        icms: Dimensionless(0.18),
        icms_reserved: Dimensionless(0.18),
        pasep_cofins: Dimensionless(0.0465),
        flag: TariffFlag::Green,
        irrigation_discount: Dimensionless(0.0),
    }
}

#[fixture]
pub fn flag_surcharges() -> FlagSurcharges {
    FlagSurcharges::new(
        MoneyPerEnergy(0.0),
        MoneyPerEnergy(0.01885),
        MoneyPerEnergy(0.04463),
        MoneyPerEnergy(0.07877),
    )
}

#[fixture]
pub fn price_curve() -> PriceProfile {
    let product = Product::PriceCurve {
        prices: vec![
            MoneyPerEnergy(263.38),
            MoneyPerEnergy(250.0),
            MoneyPerEnergy(240.0),
        ],
    };
    PriceProfile::new(vec![2026, 2027, 2028], 36, product).unwrap()
}

#[fixture]
pub fn reference_data(tariff_table: TariffTable, flag_surcharges: FlagSurcharges) -> ReferenceData {
    ReferenceData {
        tariffs: tariff_table,
        flags: flag_surcharges,
        agents: AgentDirectory::default(),
    }
}
