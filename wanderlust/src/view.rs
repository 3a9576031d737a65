//! Derived views computed from [`AppState`] on demand.
//!
//! Nothing here is stored; every call recomputes from the current state.

use crate::coupon::final_price;
use crate::types::{AppState, Listing, SortMode};

/// Cities offered by the search dropdown
pub const SUGGESTED_CITIES: [&str; 8] = [
    "Mumbai",
    "Goa",
    "Delhi",
    "Bangalore",
    "Pune",
    "Jaipur",
    "Kerala",
    "Udaipur",
];

/// Listings matching the search query, in the selected order
///
/// A listing matches when its title or location contains the query,
/// ignoring case; an empty query matches everything. Sorting is stable so
/// ties keep insertion order.
#[must_use]
pub fn visible_listings(state: &AppState) -> Vec<&Listing> {
    let query = state.search_query.to_lowercase();

    let mut visible: Vec<&Listing> = state
        .listings
        .iter()
        .filter(|listing| {
            query.is_empty()
                || listing.title.to_lowercase().contains(&query)
                || listing.location.to_lowercase().contains(&query)
        })
        .collect();

    match state.selected_sort {
        SortMode::None => {},
        SortMode::Asc => visible.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortMode::Desc => visible.sort_by(|a, b| b.price.total_cmp(&a.price)),
        SortMode::RatingAsc => visible.sort_by(|a, b| a.rating.total_cmp(&b.rating)),
        SortMode::RatingDesc => visible.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
    }

    visible
}

/// Base price, discount and what is left to pay
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceBreakdown {
    /// Price before discount
    pub base: f64,
    /// Discount granted
    pub discount: f64,
    /// `max(0, base - discount)`
    pub final_price: f64,
}

/// Splits `base` into discount and final price
#[must_use]
pub fn price_breakdown(base: f64, discount: f64) -> PriceBreakdown {
    PriceBreakdown {
        base,
        discount,
        final_price: final_price(base, discount),
    }
}

/// What the checkout page shows
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutSummary<'a> {
    /// Listing being booked
    pub listing: &'a Listing,
    /// Price after the applied coupon
    pub breakdown: PriceBreakdown,
    /// Code of the applied coupon
    pub coupon_code: Option<&'a str>,
}

/// Summary of the active checkout
///
/// `None` when no checkout is in progress or its listing was deleted.
#[must_use]
pub fn checkout_summary(state: &AppState) -> Option<CheckoutSummary<'_>> {
    let listing = state.checkout_listing()?;
    Some(CheckoutSummary {
        listing,
        breakdown: price_breakdown(listing.price, state.discount_amount),
        coupon_code: state.applied_coupon.as_ref().map(|c| c.code.as_str()),
    })
}

/// Suggested cities containing `input`, ignoring case
#[must_use]
pub fn search_suggestions(input: &str) -> Vec<&'static str> {
    let input = input.to_lowercase();
    SUGGESTED_CITIES
        .into_iter()
        .filter(|city| city.to_lowercase().contains(&input))
        .collect()
}

/// Heading and hint shown instead of an empty listing grid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyNotice {
    /// Heading
    pub title: &'static str,
    /// Hint below the heading
    pub hint: &'static str,
}

/// Notice for an empty visible list; `None` when something is visible
#[must_use]
pub fn empty_notice(state: &AppState) -> Option<EmptyNotice> {
    if !visible_listings(state).is_empty() {
        return None;
    }
    Some(if state.search_query.is_empty() {
        EmptyNotice {
            title: "No listings yet",
            hint: "Be the first to add a beautiful stay!",
        }
    } else {
        EmptyNotice {
            title: "No matches found",
            hint: "Try a different search term",
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckoutSession, ListingId};

    fn listing(id: u64, title: &str, location: &str, price: f64, rating: f64) -> Listing {
        Listing::new(ListingId::new(id), title, location, price, rating)
    }

    fn sample() -> AppState {
        AppState {
            listings: vec![
                listing(1, "Sea View", "Goa", 100.0, 4.0),
                listing(2, "Hill Cabin", "Pune", 50.0, 4.5),
            ],
            ..AppState::default()
        }
    }

    fn titles(listings: &[&Listing]) -> Vec<String> {
        listings.iter().map(|l| l.title.clone()).collect()
    }

    #[test]
    fn query_filters_on_location() {
        let mut state = sample();
        state.search_query = "goa".to_string();
        assert_eq!(titles(&visible_listings(&state)), vec!["Sea View"]);
    }

    #[test]
    fn query_filters_on_title() {
        let mut state = sample();
        state.search_query = "CABIN".to_string();
        assert_eq!(titles(&visible_listings(&state)), vec!["Hill Cabin"]);
    }

    #[test]
    fn asc_sorts_by_price() {
        let mut state = sample();
        state.selected_sort = SortMode::Asc;
        assert_eq!(
            titles(&visible_listings(&state)),
            vec!["Hill Cabin", "Sea View"]
        );
    }

    #[test]
    fn rating_desc_keeps_ties_in_order() {
        let mut state = sample();
        state.listings.push(listing(3, "Fort Stay", "Jaipur", 70.0, 4.5));
        state.selected_sort = SortMode::RatingDesc;
        assert_eq!(
            titles(&visible_listings(&state)),
            vec!["Hill Cabin", "Fort Stay", "Sea View"]
        );
    }

    #[test]
    fn checkout_summary_applies_discount() {
        let mut state = sample();
        state.checkout = CheckoutSession::for_listing(ListingId::new(2));
        state.discount_amount = 80.0;

        let summary = checkout_summary(&state).unwrap();
        assert_eq!(summary.listing.title, "Hill Cabin");
        assert_eq!(summary.breakdown, price_breakdown(50.0, 80.0));
        assert!(summary.breakdown.final_price.abs() < f64::EPSILON);
        assert_eq!(summary.coupon_code, None);

        state.checkout = CheckoutSession::for_listing(ListingId::new(42));
        assert!(checkout_summary(&state).is_none());
    }

    #[test]
    fn suggestions_match_substrings() {
        assert_eq!(search_suggestions("pu"), vec!["Pune", "Jaipur", "Udaipur"]);
        assert_eq!(search_suggestions("").len(), SUGGESTED_CITIES.len());
        assert!(search_suggestions("zz").is_empty());
    }

    #[test]
    fn empty_notice_depends_on_query() {
        let mut state = AppState::default();
        assert_eq!(empty_notice(&state).unwrap().title, "No listings yet");

        state = sample();
        assert_eq!(empty_notice(&state), None);

        state.search_query = "paris".to_string();
        let notice = empty_notice(&state).unwrap();
        assert_eq!(notice.title, "No matches found");
        assert_eq!(notice.hint, "Try a different search term");
    }
}
