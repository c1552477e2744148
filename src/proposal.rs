//! Generation of a commercial proposal from a request.
//!
//! A proposal bundles everything a document generator needs: the client details, the invoices
//! under each market, the free-market offer and the savings figures. Rendering the proposal is
//! delegated to a [`ProposalRenderer`].
use crate::billing::{
    InvoiceResult, Quantity, TaxProfile, free_market_invoice, generate_invoices,
};
use crate::contact::{AgentContact, AgentDirectory, AgentName};
use crate::flag::FlagLookup;
use crate::price::{PriceProfile, Product};
use crate::savings::{
    FlagDiscount, SavingsResult, YearlySaving, compute_savings, flag_sensitivity, yearly_savings,
};
use crate::tariff::{TariffKey, TariffLookup, TariffLookupResult};
use crate::units::{Money, MoneyPerEnergy};
use anyhow::Result;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// Identifies the client and the invoice the proposal is based on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// The client's corporate name
    pub name: String,
    /// The consumer unit's installation number
    pub installation: String,
    /// The billing period of the invoice the quantities were taken from
    pub reference_invoice: String,
}

/// Everything needed to generate a proposal
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalRequest {
    /// The client
    pub client: ClientInfo,
    /// The sales agent responsible for the proposal
    pub agent: Option<AgentName>,
    /// The consumer's tariff
    pub tariff_key: TariffKey,
    /// Tax rates and tariff flag
    pub taxes: TaxProfile,
    /// Consumption and demand for a typical billing cycle
    pub quantity: Quantity,
    /// The free-market offer
    pub price: PriceProfile,
    /// When supply on the free market starts
    pub start_date: NaiveDate,
    /// Whether the consumer has a night-irrigation discount
    pub irrigation: bool,
    /// Whether the consumer has self-generation
    pub self_generation: bool,
}

/// The layout of the savings section of the proposal document
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum ProposalLayout {
    /// Fixed discount for a consumer with self-generation, quoting the effective discount too
    #[string = "fixed_discount_self_generation"]
    FixedDiscountSelfGeneration,
    /// Fixed discount
    #[string = "fixed_discount"]
    FixedDiscount,
    /// Price-based product for an irrigation consumer, quoting annual savings
    #[string = "irrigation"]
    Irrigation,
    /// Price-based product
    #[string = "price_curve"]
    PriceCurve,
}

impl ProposalLayout {
    /// Choose the layout for a product and the consumer's billing modes
    pub fn select(product: &Product, self_generation: bool, irrigation: bool) -> Self {
        match product {
            Product::FixedDiscount { .. } if self_generation => Self::FixedDiscountSelfGeneration,
            Product::FixedDiscount { .. } => Self::FixedDiscount,
            Product::PriceCurve { .. } | Product::TakeOrPay { .. } if irrigation => {
                Self::Irrigation
            }
            Product::PriceCurve { .. } | Product::TakeOrPay { .. } => Self::PriceCurve,
        }
    }
}

/// A generated proposal
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// The request the proposal was generated from
    pub request: ProposalRequest,
    /// The agent's contact details, if known
    pub agent_contact: Option<AgentContact>,
    /// The layout of the savings section
    pub layout: ProposalLayout,
    /// The outcome of the tariff lookup
    pub tariff: TariffLookupResult,
    /// The surcharge for the tariff flag in force
    pub flag_surcharge: MoneyPerEnergy,
    /// The captive-market invoice
    pub captive: InvoiceResult,
    /// The usage-only invoice
    pub usage: InvoiceResult,
    /// The free-market invoice in each contract year
    pub free_market: Vec<Money>,
    /// The headline savings
    pub savings: SavingsResult,
    /// The savings in each contract year
    pub yearly_savings: Vec<YearlySaving>,
    /// The mean discount under each tariff flag
    pub flag_sensitivity: Vec<FlagDiscount>,
}

/// Renders a proposal into a document or files
pub trait ProposalRenderer {
    /// Render the proposal
    fn render(&mut self, proposal: &Proposal) -> Result<()>;
}

/// Generate a proposal for a request.
///
/// A tariff key with no match in the reference data isn't an error: the proposal is generated
/// with an all-zero tariff, so that the zero line items flag the bad match to a reviewer.
///
/// # Arguments
///
/// * `request` - The proposal request
/// * `tariffs` - Tariff schedules
/// * `flags` - Tariff flag surcharges
/// * `agents` - Agent contact details
pub fn generate_proposal(
    request: &ProposalRequest,
    tariffs: &dyn TariffLookup,
    flags: &dyn FlagLookup,
    agents: &AgentDirectory,
) -> Result<Proposal> {
    info!(
        "Generating proposal for {} (installation {})",
        request.client.name, request.client.installation
    );

    let tariff = tariffs.resolve_tariff(&request.tariff_key);
    if !tariff.is_resolved() {
        warn!(
            "No tariff found for {}; billing with zero rates",
            request.tariff_key
        );
    }
    let schedule = tariff.schedule();
    let flag_surcharge = flags.resolve_flag_surcharge(request.taxes.flag);

    let (captive, usage) = generate_invoices(&request.quantity, &schedule, &request.taxes, flags)?;
    debug!("Captive invoice total: {}", captive.total());
    debug!("Usage invoice total: {}", usage.total());

    // A fixed discount applies to the invoice before self-generation is compensated
    let free_market = free_market_invoice(
        &request.quantity,
        &request.price,
        &request.taxes,
        usage.total(),
        captive.total_without_compensation(),
    )?;
    debug!("Free-market invoice totals: {free_market:?}");

    let savings = compute_savings(&captive, usage.total(), &free_market, &request.price)?;
    info!(
        "Monthly saving: {:.2}; contract saving: {:.2}",
        savings.monthly.value(),
        savings.contract_total.value()
    );

    let yearly_savings = yearly_savings(
        captive.total(),
        usage.total(),
        &free_market,
        &request.price,
    )?;
    let flag_sensitivity = flag_sensitivity(
        &request.quantity,
        &schedule,
        &request.taxes,
        flags,
        usage.total(),
        &free_market,
        request.price.duration_months(),
    )?;

    let agent_contact = request
        .agent
        .as_ref()
        .and_then(|agent| agents.lookup(agent))
        .cloned();
    let layout = ProposalLayout::select(
        request.price.product(),
        request.self_generation,
        request.irrigation,
    );

    Ok(Proposal {
        request: request.clone(),
        agent_contact,
        layout,
        tariff,
        flag_surcharge,
        captive,
        usage,
        free_market,
        savings,
        yearly_savings,
        flag_sensitivity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        flag_surcharges, price_curve, quantity, tariff_key, tariff_table, tax_profile,
    };
    use crate::flag::FlagSurcharges;
    use crate::tariff::{Modality, TariffTable};
    use crate::units::{Dimensionless, Energy};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn request(
        tariff_key: TariffKey,
        tax_profile: TaxProfile,
        quantity: Quantity,
        price_curve: PriceProfile,
    ) -> ProposalRequest {
        ProposalRequest {
            client: ClientInfo {
                name: "Laticínios Serra Azul".into(),
                installation: "3001234567".into(),
                reference_invoice: "09/2025".into(),
            },
            agent: Some("Ana Souza".into()),
            tariff_key,
            taxes: tax_profile,
            quantity,
            price: price_curve,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            irrigation: false,
            self_generation: false,
        }
    }

    #[rstest]
    #[case(true, true, ProposalLayout::FixedDiscountSelfGeneration)]
    #[case(true, false, ProposalLayout::FixedDiscount)]
    #[case(false, false, ProposalLayout::PriceCurve)]
    #[case(false, true, ProposalLayout::Irrigation)]
    fn test_layout_select(
        #[case] fixed_discount: bool,
        #[case] mode: bool,
        #[case] expected: ProposalLayout,
    ) {
        let product = if fixed_discount {
            Product::FixedDiscount {
                discount: Dimensionless(0.1),
            }
        } else {
            Product::take_or_pay(MoneyPerEnergy(263.38), 1)
        };

        // Self-generation decides between the fixed-discount layouts, irrigation between the
        // price-based ones
        let (self_generation, irrigation) = if fixed_discount {
            (mode, false)
        } else {
            (false, mode)
        };
        assert_eq!(
            ProposalLayout::select(&product, self_generation, irrigation),
            expected
        );
    }

    #[test]
    fn test_fixed_discount_ignores_irrigation() {
        let product = Product::FixedDiscount {
            discount: Dimensionless(0.1),
        };
        assert_eq!(
            ProposalLayout::select(&product, false, true),
            ProposalLayout::FixedDiscount
        );
    }

    #[rstest]
    fn test_generate_proposal(
        request: ProposalRequest,
        tariff_table: TariffTable,
        flag_surcharges: FlagSurcharges,
    ) {
        let proposal =
            generate_proposal(&request, &tariff_table, &flag_surcharges, &AgentDirectory::default())
                .unwrap();

        assert!(proposal.tariff.is_resolved());
        assert_eq!(proposal.layout, ProposalLayout::PriceCurve);
        assert_eq!(proposal.agent_contact, None);
        assert_eq!(proposal.free_market.len(), 3);
        assert_eq!(proposal.yearly_savings.len(), 3);
        assert_eq!(proposal.flag_sensitivity.len(), 4);
        assert_eq!(
            proposal.savings.monthly,
            proposal.captive.total() - proposal.usage.total() - proposal.free_market[0]
        );
    }

    #[rstest]
    fn test_generate_proposal_unknown_tariff(
        request: ProposalRequest,
        tariff_table: TariffTable,
        flag_surcharges: FlagSurcharges,
    ) {
        let request = ProposalRequest {
            tariff_key: TariffKey {
                modality: Modality::Azul,
                ..request.tariff_key.clone()
            },
            ..request
        };
        let proposal =
            generate_proposal(&request, &tariff_table, &flag_surcharges, &AgentDirectory::default())
                .unwrap();

        assert_eq!(proposal.tariff, TariffLookupResult::DefaultEmpty);
        assert_eq!(proposal.captive.total(), Money(0.0));
        assert_eq!(proposal.usage.total(), Money(0.0));
    }

    #[rstest]
    fn test_generate_proposal_fixed_discount_self_generation(
        request: ProposalRequest,
        tariff_table: TariffTable,
        flag_surcharges: FlagSurcharges,
    ) {
        let price = PriceProfile::new(
            vec![2026, 2027, 2028],
            36,
            Product::FixedDiscount {
                discount: Dimensionless(0.1),
            },
        )
        .unwrap();
        let request = ProposalRequest {
            quantity: Quantity {
                compensated_off_peak: Energy(2000.0),
                ..request.quantity
            },
            price,
            self_generation: true,
            ..request
        };
        let proposal =
            generate_proposal(&request, &tariff_table, &flag_surcharges, &AgentDirectory::default())
                .unwrap();

        assert_eq!(proposal.layout, ProposalLayout::FixedDiscountSelfGeneration);

        // The discount applies to the gross captive invoice
        let gross = proposal.captive.total_without_compensation();
        assert_approx_eq!(
            Money,
            proposal.free_market[0],
            gross * Dimensionless(0.9) - proposal.usage.total(),
            epsilon = 1e-9
        );

        // ...so the effective discount on the netted invoice is lower
        let discount = proposal.savings.discount;
        assert_eq!(discount.contractual, Some(Dimensionless(0.1)));
        assert!(discount.effective < Dimensionless(0.1));
    }
}
