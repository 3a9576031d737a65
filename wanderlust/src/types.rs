//! Domain types for the Wanderlust marketplace.
//!
//! One [`AppState`] exists per running session. It is changed only by
//! reducing [`AppAction`]s, either through [`transition`](crate::transition)
//! for the plain state actions or through [`AppReducer`](crate::AppReducer)
//! for everything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

use crate::forms::ListingDraft;

/// Unique identifier for a listing
///
/// Serialized as a bare JSON number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(u64);

impl ListingId {
    /// Creates a `ListingId` from a raw number
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw number
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bookable property
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Unique identifier, stable across edits
    pub id: ListingId,
    /// Display title
    pub title: String,
    /// City or region
    pub location: String,
    /// Price per night, never negative
    pub price: f64,
    /// Rating in `[0, 5]`
    #[serde(default)]
    pub rating: f64,
}

impl Listing {
    /// Creates a new listing
    #[must_use]
    pub fn new(
        id: ListingId,
        title: impl Into<String>,
        location: impl Into<String>,
        price: f64,
        rating: f64,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            location: location.into(),
            price,
            rating,
        }
    }

    /// Rating snapped to the nearest half star
    #[must_use]
    pub fn display_rating(&self) -> f64 {
        (self.rating * 2.0).round() / 2.0
    }
}

/// A registered account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login email, unique among users
    pub email: String,
    /// Stored as entered
    pub password: String,
}

impl User {
    /// Creates a new user
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Ordering applied to the visible listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Keep insertion order
    #[default]
    None,
    /// Price, cheapest first
    Asc,
    /// Price, most expensive first
    Desc,
    /// Rating, lowest first
    RatingAsc,
    /// Rating, highest first
    RatingDesc,
}

impl SortMode {
    /// Every mode, in menu order
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Asc,
        Self::Desc,
        Self::RatingAsc,
        Self::RatingDesc,
    ];

    /// The wire name of this mode
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Asc => "asc",
            Self::Desc => "desc",
            Self::RatingAsc => "rating_asc",
            Self::RatingDesc => "rating_desc",
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown sort mode name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sort mode `{0}`")]
pub struct ParseSortModeError(pub String);

impl FromStr for SortMode {
    type Err = ParseSortModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ParseSortModeError(s.to_string()))
    }
}

/// How a coupon's value is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    /// `value` percent of the base price
    Percent,
    /// `value` currency units off
    Fixed,
}

/// A named discount rule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    /// Upper-case code users type in
    pub code: String,
    /// Percent or fixed
    #[serde(rename = "type")]
    pub kind: CouponKind,
    /// Percentage points or currency units, depending on `kind`
    pub value: f64,
    /// Instant after which the coupon is rejected
    pub expiry: DateTime<Utc>,
}

/// Progress of the coupon check shown in the coupon modal
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CouponStatus {
    /// A check is pending
    pub loading: bool,
    /// Message of the last failed check
    pub error: Option<String>,
    /// Message of the last successful check
    pub success: Option<String>,
}

impl CouponStatus {
    /// Status while a check is pending
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            loading: true,
            error: None,
            success: None,
        }
    }
}

/// UI-local state of the checkout page
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Listing being booked; `None` when no checkout is in progress
    pub listing_id: Option<ListingId>,
    /// Whether the coupon modal is shown
    pub coupon_modal_open: bool,
    /// Code typed into the modal, upper-cased
    pub coupon_input: String,
    /// Result of the last coupon check
    pub coupon_status: CouponStatus,
}

impl CheckoutSession {
    /// A fresh session for `listing_id`
    #[must_use]
    pub fn for_listing(listing_id: ListingId) -> Self {
        Self {
            listing_id: Some(listing_id),
            ..Self::default()
        }
    }
}

/// A confirmed booking
#[derive(Clone, Debug, PartialEq)]
pub struct BookingConfirmation {
    /// Booked listing
    pub listing_id: ListingId,
    /// Title at booking time
    pub title: String,
    /// Price paid after discount
    pub total: f64,
}

impl BookingConfirmation {
    /// Message shown to the user
    #[must_use]
    pub fn message(&self) -> String {
        format!("Booked {} for ${:.2}!", self.title, self.total)
    }
}

/// The application state
///
/// Exactly one instance per session. `listings`, `is_logged_in` and `users`
/// are persisted; everything else lives for the session only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Free-text filter over title and location
    pub search_query: String,
    /// Ordering of the visible listings
    pub selected_sort: SortMode,
    /// Whether the city suggestion dropdown is shown
    pub is_search_dropdown_open: bool,
    /// All listings in insertion order
    pub listings: Vec<Listing>,
    /// Registered users
    pub users: Vec<User>,
    /// Whether someone is signed in
    pub is_logged_in: bool,
    /// Coupon applied to the current checkout
    pub applied_coupon: Option<Coupon>,
    /// Discount granted by `applied_coupon`, in `[0, 100]`
    pub discount_amount: f64,
    /// Name of the most recent recognized action
    pub last_action: Option<&'static str>,
    /// Last validation message
    pub last_error: Option<String>,
    /// Checkout page state
    pub checkout: CheckoutSession,
    /// Most recent confirmed booking
    pub last_booking: Option<BookingConfirmation>,
}

impl AppState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a listing by id
    #[must_use]
    pub fn listing(&self, id: ListingId) -> Option<&Listing> {
        self.listings.iter().find(|listing| listing.id == id)
    }

    /// Listing of the active checkout, if it still exists
    #[must_use]
    pub fn checkout_listing(&self) -> Option<&Listing> {
        self.checkout.listing_id.and_then(|id| self.listing(id))
    }

    /// Checks whether `email` is already registered
    #[must_use]
    pub fn has_user(&self, email: &str) -> bool {
        self.users.iter().any(|user| user.email == email)
    }
}

/// Every input to the marketplace reducer
///
/// JSON form is `{"type": "NAME", "payload": ...}`. A `type` that is not
/// listed here decodes to [`AppAction::Unknown`], which changes nothing,
/// whatever payload it carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    remote = "Self",
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum AppAction {
    // ========== State actions ==========
    /// Set whether someone is signed in
    Login(bool),

    /// Replace the user list
    UserDetails(Vec<User>),

    /// Flip the suggestion dropdown
    ToggleSearchDropdown,

    /// Hide the suggestion dropdown
    CloseSearchDropdown,

    /// Replace the search text
    SetSearchQuery(String),

    /// Replace the sort mode
    SetSort(SortMode),

    /// Replace the listings wholesale
    SetListings(Vec<Listing>),

    /// Record an applied coupon and its discount
    ApplyCoupon {
        /// The coupon
        coupon: Coupon,
        /// Capped discount
        discount: f64,
    },

    /// Drop the applied coupon
    RemoveCoupon,

    // ========== Commands ==========
    /// Validate a draft and append it as a new listing
    AddListing {
        /// Form contents
        draft: ListingDraft,
    },

    /// Validate a draft and replace the listing with `id`
    EditListing {
        /// Listing to replace
        id: ListingId,
        /// Form contents
        draft: ListingDraft,
    },

    /// Remove the listing with `id`
    DeleteListing {
        /// Listing to remove
        id: ListingId,
    },

    /// Register a user and sign them in
    SignUp {
        /// Login email
        email: String,
        /// Password
        password: String,
    },

    /// Sign out
    LogOut,

    /// Search for a suggested city and hide the dropdown
    SelectSuggestion {
        /// City name
        city: String,
    },

    /// A command was rejected
    ValidationFailed {
        /// User-facing message
        error: String,
    },

    // ========== Checkout ==========
    /// Start booking a listing
    BeginCheckout {
        /// Listing to book
        #[serde(rename = "listingId")]
        listing_id: ListingId,
    },

    /// Show the coupon modal
    OpenCouponModal,

    /// Hide the coupon modal and abandon any pending check
    CloseCouponModal,

    /// Update the typed coupon code
    SetCouponCode {
        /// Code as typed
        code: String,
    },

    /// Check a coupon picked from the offered list
    SelectCoupon {
        /// Coupon code
        code: String,
    },

    /// Check the typed coupon code
    CheckCouponCode,

    /// A scheduled coupon check is due
    CouponCheckCompleted {
        /// Coupon code being checked
        code: String,
    },

    /// Book the active listing at the discounted price
    ConfirmBooking,

    /// Any action type this build does not know
    #[serde(other)]
    Unknown,
}

impl AppAction {
    /// The wire name of this action
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login(_) => "LOGIN",
            Self::UserDetails(_) => "USER_DETAILS",
            Self::ToggleSearchDropdown => "TOGGLE_SEARCH_DROPDOWN",
            Self::CloseSearchDropdown => "CLOSE_SEARCH_DROPDOWN",
            Self::SetSearchQuery(_) => "SET_SEARCH_QUERY",
            Self::SetSort(_) => "SET_SORT",
            Self::SetListings(_) => "SET_LISTINGS",
            Self::ApplyCoupon { .. } => "APPLY_COUPON",
            Self::RemoveCoupon => "REMOVE_COUPON",
            Self::AddListing { .. } => "ADD_LISTING",
            Self::EditListing { .. } => "EDIT_LISTING",
            Self::DeleteListing { .. } => "DELETE_LISTING",
            Self::SignUp { .. } => "SIGN_UP",
            Self::LogOut => "LOG_OUT",
            Self::SelectSuggestion { .. } => "SELECT_SUGGESTION",
            Self::ValidationFailed { .. } => "VALIDATION_FAILED",
            Self::BeginCheckout { .. } => "BEGIN_CHECKOUT",
            Self::OpenCouponModal => "OPEN_COUPON_MODAL",
            Self::CloseCouponModal => "CLOSE_COUPON_MODAL",
            Self::SetCouponCode { .. } => "SET_COUPON_CODE",
            Self::SelectCoupon { .. } => "SELECT_COUPON",
            Self::CheckCouponCode => "CHECK_COUPON_CODE",
            Self::CouponCheckCompleted { .. } => "COUPON_CHECK_COMPLETED",
            Self::ConfirmBooking => "CONFIRM_BOOKING",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl Serialize for AppAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Self::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for AppAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let mut value = serde_json::Value::deserialize(deserializer)?;
        match Self::deserialize(&value) {
            Ok(action) => Ok(action),
            Err(error) => {
                // An unlisted type only decodes as a unit; retry without its payload
                if let Some(fields) = value.as_object_mut() {
                    fields.remove("payload");
                }
                match Self::deserialize(&value) {
                    Ok(Self::Unknown) => Ok(Self::Unknown),
                    _ => Err(D::Error::custom(error)),
                }
            },
        }
    }
}
