use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::valuation::inputs::ValuationInputs;

/// Price and earnings figures known for a sourced listing. Any of them may
/// be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFinancials {
    /// Agreed deal value, once negotiated
    pub deal_value: Option<Money>,
    /// Our latest offer
    pub offer_price: Option<Money>,
    /// EBITDA confirmed in diligence
    pub actual_ebitda: Option<Money>,
    /// EBITDA as advertised on the listing
    pub listing_ebitda: Option<Money>,
    pub asking_price: Option<Money>,
    pub revenue: Option<Money>,
}

/// Which listing figure the purchase price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasisSource {
    DealValue,
    OfferPrice,
    ActualEbitda,
    ListingEbitda,
    AskingPrice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealBasis {
    pub purchase_price: Money,
    pub source: BasisSource,
}

/// Resolve a purchase price, most authoritative figure first: deal value,
/// offer price, actual EBITDA × multiple, listing EBITDA × multiple, asking
/// price.
pub fn resolve_deal_basis(
    listing: &ListingFinancials,
    target_multiple: Multiple,
) -> Option<DealBasis> {
    let tiers = [
        (listing.deal_value, BasisSource::DealValue),
        (listing.offer_price, BasisSource::OfferPrice),
        (
            listing.actual_ebitda.map(|e| e.saturating_mul(target_multiple)),
            BasisSource::ActualEbitda,
        ),
        (
            listing.listing_ebitda.map(|e| e.saturating_mul(target_multiple)),
            BasisSource::ListingEbitda,
        ),
        (listing.asking_price, BasisSource::AskingPrice),
    ];

    tiers
        .into_iter()
        .find_map(|(price, source)| price.map(|purchase_price| DealBasis { purchase_price, source }))
}

/// Fill the target financials of `base` from a listing.
///
/// EBITDA is the diligence figure, else the advertised one, else backed out
/// of the resolved price at `base.entry_multiple`. When both a price and a
/// positive EBITDA are known, the entry multiple is reset so the engine's
/// enterprise value equals the resolved price.
pub fn listing_to_inputs(
    listing: &ListingFinancials,
    target_multiple: Multiple,
    base: &ValuationInputs,
) -> ValuationInputs {
    let mut inputs = base.clone();
    let basis = resolve_deal_basis(listing, target_multiple);

    if let Some(revenue) = listing.revenue {
        inputs.target_revenue = revenue;
    }

    let reported_ebitda = listing.actual_ebitda.or(listing.listing_ebitda);
    let implied_ebitda = basis.as_ref().and_then(|b| {
        if base.entry_multiple > Decimal::ZERO {
            Some(saturating_div(b.purchase_price, base.entry_multiple))
        } else {
            None
        }
    });
    if let Some(ebitda) = reported_ebitda.or(implied_ebitda) {
        inputs.target_ebitda = ebitda;
    }

    if let Some(b) = &basis {
        if inputs.target_ebitda > Decimal::ZERO {
            inputs.entry_multiple = saturating_div(b.purchase_price, inputs.target_ebitda);
        }
    }

    tracing::debug!(source = ?basis.as_ref().map(|b| b.source), "listing mapped to inputs");
    inputs
}

/// Resolved basis together with the inputs it produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisReport {
    pub basis: Option<DealBasis>,
    pub inputs: ValuationInputs,
}

/// [`listing_to_inputs`] wrapped in the standard output envelope.
pub fn run_listing_basis(
    listing: &ListingFinancials,
    target_multiple: Multiple,
    base: &ValuationInputs,
) -> ComputationOutput<BasisReport> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let basis = resolve_deal_basis(listing, target_multiple);
    if basis.is_none() {
        warnings.push("Listing has no price or EBITDA; base inputs used unchanged".into());
    }
    if listing.actual_ebitda.is_none() && listing.listing_ebitda.is_none() && basis.is_some() {
        warnings.push("No EBITDA on the listing; implied from price at the base entry multiple".into());
    }
    if target_multiple <= Decimal::ZERO {
        warnings.push(format!("Target multiple {target_multiple} is not positive"));
    }
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    let inputs = listing_to_inputs(listing, target_multiple, base);
    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Listing deal basis: deal value, offer, actual EBITDA, listing EBITDA, asking price",
        &serde_json::json!({
            "target_multiple": target_multiple.to_string(),
            "base_entry_multiple": base.entry_multiple.to_string(),
        }),
        warnings,
        elapsed,
        BasisReport { basis, inputs },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn listing() -> ListingFinancials {
        ListingFinancials {
            deal_value: None,
            offer_price: None,
            actual_ebitda: None,
            listing_ebitda: Some(dec!(400000)),
            asking_price: Some(dec!(2500000)),
            revenue: Some(dec!(1800000)),
        }
    }

    #[test]
    fn test_tier_order() {
        let mut l = listing();
        let basis = resolve_deal_basis(&l, dec!(4)).unwrap();
        assert_eq!(basis.source, BasisSource::ListingEbitda);
        assert_eq!(basis.purchase_price, dec!(1600000));

        l.actual_ebitda = Some(dec!(450000));
        assert_eq!(resolve_deal_basis(&l, dec!(4)).unwrap().source, BasisSource::ActualEbitda);

        l.offer_price = Some(dec!(1900000));
        assert_eq!(resolve_deal_basis(&l, dec!(4)).unwrap().source, BasisSource::OfferPrice);

        l.deal_value = Some(dec!(2000000));
        let basis = resolve_deal_basis(&l, dec!(4)).unwrap();
        assert_eq!(basis.source, BasisSource::DealValue);
        assert_eq!(basis.purchase_price, dec!(2000000));
    }

    #[test]
    fn test_asking_price_is_last_resort() {
        let l = ListingFinancials {
            asking_price: Some(dec!(900000)),
            ..Default::default()
        };
        let basis = resolve_deal_basis(&l, dec!(4)).unwrap();
        assert_eq!(basis.source, BasisSource::AskingPrice);
        assert!(resolve_deal_basis(&ListingFinancials::default(), dec!(4)).is_none());
    }

    #[test]
    fn test_listing_to_inputs_prices_at_resolved_value() {
        let mut l = listing();
        l.offer_price = Some(dec!(1800000));
        let inputs = listing_to_inputs(&l, dec!(4), &ValuationInputs::default());

        assert_eq!(inputs.target_revenue, dec!(1800000));
        assert_eq!(inputs.target_ebitda, dec!(400000));
        assert_eq!(inputs.entry_multiple, dec!(4.5));
        assert_eq!(inputs.entry_multiple * inputs.target_ebitda, dec!(1800000));
    }

    #[test]
    fn test_ebitda_implied_from_price() {
        let l = ListingFinancials {
            asking_price: Some(dec!(1000000)),
            ..Default::default()
        };
        let inputs = listing_to_inputs(&l, dec!(4), &ValuationInputs::default());
        assert_eq!(inputs.target_ebitda, dec!(250000));
        assert_eq!(inputs.entry_multiple, dec!(4));
    }

    #[test]
    fn test_run_listing_basis_warns_without_figures() {
        let base = ValuationInputs::default();
        let out = run_listing_basis(&ListingFinancials::default(), dec!(4), &base);
        assert_eq!(out.result.basis, None);
        assert_eq!(out.result.inputs, base);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_extreme_multiples_saturate() {
        let l = ListingFinancials {
            listing_ebitda: Some(dec!(1000000)),
            ..Default::default()
        };
        let basis = resolve_deal_basis(&l, Decimal::MAX).unwrap();
        assert_eq!(basis.purchase_price, Decimal::MAX);

        let priced = ListingFinancials {
            asking_price: Some(Decimal::MAX),
            ..Default::default()
        };
        let base = ValuationInputs {
            entry_multiple: dec!(0.0000001),
            ..Default::default()
        };
        let inputs = listing_to_inputs(&priced, dec!(4), &base);
        assert_eq!(inputs.target_ebitda, Decimal::MAX);
        assert_eq!(inputs.entry_multiple, Decimal::ONE);
    }
}
