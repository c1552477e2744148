//! Worked billing scenarios, checked against hand-calculated figures.
use float_cmp::assert_approx_eq;
use rstest::{fixture, rstest};
use tariff_compare::billing::{Quantity, TaxProfile, free_market_invoice, generate_invoices};
use tariff_compare::flag::{FlagSurcharges, TariffFlag};
use tariff_compare::price::{PriceProfile, Product};
use tariff_compare::savings::compute_savings;
use tariff_compare::tariff::{
    Modality, Subgroup, TariffKey, TariffLookup, TariffLookupResult, TariffSchedule, TariffTable,
};
use tariff_compare::units::{Dimensionless, Energy, Money, MoneyPerEnergy, MoneyPerPower, Power};

#[fixture]
fn quantity() -> Quantity {
    Quantity {
        demand_peak: Power(317.0),
        demand_off_peak: Power(140.0),
        energy_off_peak: Energy(14278.0),
        ..Quantity::default()
    }
}

#[fixture]
fn taxes() -> TaxProfile {
    TaxProfile {
        icms: Dimensionless(0.18),
        icms_reserved: Dimensionless(0.0),
        pasep_cofins: Dimensionless(0.0465),
        flag: TariffFlag::Green,
        irrigation_discount: Dimensionless(0.0),
    }
}

#[fixture]
fn schedule() -> TariffSchedule {
    TariffSchedule {
        demand_off_peak: MoneyPerPower(25.0),
        energy_off_peak_te: MoneyPerEnergy(0.28),
        energy_off_peak_tusd: MoneyPerEnergy(0.07),
        ..TariffSchedule::ZERO
    }
}

#[fixture]
fn flags() -> FlagSurcharges {
    FlagSurcharges::new(
        MoneyPerEnergy(0.0),
        MoneyPerEnergy(0.01885),
        MoneyPerEnergy(0.04463),
        MoneyPerEnergy(0.07877),
    )
}

fn fixed_discount(discount: f64, duration_months: u32) -> PriceProfile {
    let years = (2026..=2026 + i32::try_from(duration_months / 12).unwrap()).collect();
    PriceProfile::new(
        years,
        duration_months,
        Product::FixedDiscount {
            discount: Dimensionless(discount),
        },
    )
    .unwrap()
}

/// Scenario A: a green-flag captive invoice with off-peak charges only
#[rstest]
fn test_captive_total(
    quantity: Quantity,
    taxes: TaxProfile,
    schedule: TariffSchedule,
    flags: FlagSurcharges,
) {
    let (captive, _) = generate_invoices(&quantity, &schedule, &taxes, &flags).unwrap();

    let gross_up = (1.0 / 0.82) * (1.0 / 0.9535);
    let expected = 140.0 * 25.0 * gross_up + 14278.0 * 0.35 * gross_up;
    assert_approx_eq!(Money, captive.total(), Money(expected), epsilon = 1e-9);
}

/// Scenario B: a 10% fixed discount over five years
#[rstest]
fn test_fixed_discount_contract_value(
    quantity: Quantity,
    taxes: TaxProfile,
    schedule: TariffSchedule,
    flags: FlagSurcharges,
) {
    let price = fixed_discount(0.1, 60);
    let (captive, usage) = generate_invoices(&quantity, &schedule, &taxes, &flags).unwrap();
    let free_market =
        free_market_invoice(&quantity, &price, &taxes, usage.total(), captive.total()).unwrap();
    let savings = compute_savings(&captive, usage.total(), &free_market, &price).unwrap();

    assert_eq!(
        savings.monthly,
        captive.total() - usage.total() - free_market[0]
    );
    assert_eq!(savings.contract_total, savings.monthly * Dimensionless(60.0));
    assert_eq!(savings.discount.contractual, Some(Dimensionless(0.1)));
    assert_approx_eq!(
        Dimensionless,
        savings.discount.effective,
        Dimensionless(0.1),
        epsilon = 1e-12
    );
}

/// Scenario C: a tariff lookup miss bills at zero
#[rstest]
fn test_lookup_miss(quantity: Quantity, schedule: TariffSchedule, flags: FlagSurcharges) {
    let key = TariffKey {
        distributor: "CEMIG-D".into(),
        subgroup: Subgroup::A4,
        modality: Modality::Verde,
        resolution: "REH 3.225/2024".into(),
    };
    let table = TariffTable::new([(key.clone(), schedule)].into_iter().collect());

    let missing = TariffKey {
        resolution: "REH 9.999/2099".into(),
        ..key
    };
    let result = table.resolve_tariff(&missing);
    assert_eq!(result, TariffLookupResult::DefaultEmpty);

    let taxes = TaxProfile {
        icms: Dimensionless(0.0),
        icms_reserved: Dimensionless(0.0),
        pasep_cofins: Dimensionless(0.0),
        flag: TariffFlag::Green,
        irrigation_discount: Dimensionless(0.0),
    };
    let (captive, usage) =
        generate_invoices(&quantity, &result.schedule(), &taxes, &flags).unwrap();
    assert_eq!(captive.total(), Money(0.0));
    assert_eq!(usage.total(), Money(0.0));
}

#[rstest]
#[case(0.0)]
#[case(1.0)]
fn test_fixed_discount_bounds(
    quantity: Quantity,
    taxes: TaxProfile,
    schedule: TariffSchedule,
    flags: FlagSurcharges,
    #[case] discount: f64,
) {
    let price = fixed_discount(discount, 24);
    let (captive, usage) = generate_invoices(&quantity, &schedule, &taxes, &flags).unwrap();
    let free_market =
        free_market_invoice(&quantity, &price, &taxes, usage.total(), captive.total()).unwrap();

    let expected = captive.total() * Dimensionless(1.0 - discount) - usage.total();
    assert_eq!(free_market.len(), 3);
    for value in free_market {
        assert_approx_eq!(Money, value, expected, epsilon = 1e-9);
    }
}

#[rstest]
fn test_idempotent(
    quantity: Quantity,
    taxes: TaxProfile,
    schedule: TariffSchedule,
    flags: FlagSurcharges,
) {
    assert_eq!(
        generate_invoices(&quantity, &schedule, &taxes, &flags).unwrap(),
        generate_invoices(&quantity, &schedule, &taxes, &flags).unwrap()
    );
}

/// Raising any single quantity never lowers the captive total.
///
/// This only holds while the irrigation discount leaves the reserved-hour line positive: the
/// discount is taken off the flagged off-peak rate, so with a discount near 1 and a flag
/// surcharge in force more reserved-hour energy lowers the total.
#[rstest]
fn test_captive_monotonic(taxes: TaxProfile, schedule: TariffSchedule, flags: FlagSurcharges) {
    let schedule = TariffSchedule {
        demand_peak: MoneyPerPower(60.0),
        energy_peak_te: MoneyPerEnergy(0.45),
        energy_peak_tusd: MoneyPerEnergy(1.6),
        ..schedule
    };
    let base = Quantity {
        demand_peak: Power(100.0),
        demand_off_peak: Power(100.0),
        demand_peak_without_icms: Power(10.0),
        demand_off_peak_without_icms: Power(10.0),
        energy_peak: Energy(1000.0),
        energy_off_peak: Energy(1000.0),
        energy_reserved: Energy(1000.0),
        ..Quantity::default()
    };
    let total = |quantity: &Quantity| {
        generate_invoices(quantity, &schedule, &taxes, &flags)
            .unwrap()
            .0
            .total()
    };

    let increased = [
        Quantity {
            demand_peak: Power(200.0),
            ..base
        },
        Quantity {
            demand_off_peak: Power(200.0),
            ..base
        },
        Quantity {
            demand_peak_without_icms: Power(20.0),
            ..base
        },
        Quantity {
            demand_off_peak_without_icms: Power(20.0),
            ..base
        },
        Quantity {
            energy_peak: Energy(2000.0),
            ..base
        },
        Quantity {
            energy_off_peak: Energy(2000.0),
            ..base
        },
        Quantity {
            energy_reserved: Energy(2000.0),
            ..base
        },
    ];
    for quantity in &increased {
        assert!(total(quantity) >= total(&base));
    }
}
