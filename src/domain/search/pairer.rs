//! Pairing outbound and return offers into round-trip candidates.
//!
//! The provider prices a round trip as one combined figure on the return
//! leg. For display the price is split evenly across the two legs, but the
//! pair's total always equals the provider's combined figure exactly - the
//! odd minor unit, when the combined price is odd, lands on the outbound
//! leg.

use tracing::debug;

use super::offer::{Offer, RoundTripPair};

/// Combines search-phase results into round-trip candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfferPairer;

impl OfferPairer {
    /// Stage one: wrap outbound offers as unpaired candidates awaiting
    /// user selection. One-way offers pass through with their own price
    /// unmodified.
    pub fn pair_outbound_only(offers: Vec<Offer>) -> Vec<RoundTripPair> {
        offers.into_iter().map(RoundTripPair::outbound_only).collect()
    }

    /// Stage two: pair one selected outbound offer with the return offers
    /// found through its continuation token.
    ///
    /// Each return offer's price is the provider's combined round-trip
    /// total; both legs are re-priced to an even split that reconciles
    /// exactly to that total.
    pub fn pair_with_returns(outbound: &Offer, returns: Vec<Offer>) -> Vec<RoundTripPair> {
        returns
            .into_iter()
            .map(|return_offer| Self::pair_one(outbound, return_offer))
            .collect()
    }

    fn pair_one(outbound: &Offer, return_offer: Offer) -> RoundTripPair {
        let combined = return_offer.price_minor;
        let return_share = combined / 2;
        let outbound_share = combined - return_share;
        debug!(combined, outbound_share, return_share, "split round-trip price");

        let mut outbound = outbound.clone();
        outbound.price_minor = outbound_share;

        let mut return_offer = return_offer;
        return_offer.price_minor = return_share;

        RoundTripPair {
            outbound,
            return_offer: Some(return_offer),
            total_price_minor: combined,
        }
    }
}
