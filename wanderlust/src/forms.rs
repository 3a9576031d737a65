//! Form input and its validation.
//!
//! Forms carry raw user input. Validation turns them into domain values or a
//! user-facing error; the reducer stores that error in `last_error`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Listing, ListingId, User};

/// Errors raised while validating listing forms and checkout commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Title, location or price left empty
    #[error("All fields are required!")]
    MissingFields,

    /// Price is not a non-negative number
    #[error("Price must be a non-negative number")]
    InvalidPrice(String),

    /// Rating outside `[0, 5]`
    #[error("Rating must be between 0 and 5")]
    InvalidRating(f64),

    /// No listing has the given id
    #[error("Listing not found")]
    ListingNotFound(ListingId),

    /// A checkout command arrived with no checkout in progress
    #[error("No listing selected for checkout")]
    NoActiveCheckout,
}

/// Errors raised by the sign-up form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignupError {
    /// Email or password left empty
    #[error("All fields are required!")]
    MissingFields,

    /// The email is already registered
    #[error("User already exists!")]
    UserExists,
}

/// Contents of the add/edit listing form
///
/// `price` is kept as typed so that empty and malformed input can be told
/// apart from a real zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    /// Title field
    pub title: String,
    /// Location field
    pub location: String,
    /// Price field, as typed
    pub price: String,
    /// Star picker value
    #[serde(default)]
    pub rating: f64,
}

impl ListingDraft {
    /// Creates a draft from field values
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        location: impl Into<String>,
        price: impl Into<String>,
        rating: f64,
    ) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            price: price.into(),
            rating,
        }
    }

    /// Prefills a draft from an existing listing, as the edit form does
    #[must_use]
    pub fn from_listing(listing: &Listing) -> Self {
        Self::new(
            listing.title.clone(),
            listing.location.clone(),
            listing.price.to_string(),
            listing.rating,
        )
    }

    /// Validates the draft and builds a listing with `id`
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] if a text field is blank,
    /// [`ValidationError::InvalidPrice`] if the price does not parse to a
    /// finite non-negative number and [`ValidationError::InvalidRating`] if
    /// the rating is outside `[0, 5]`.
    pub fn to_listing(&self, id: ListingId) -> Result<Listing, ValidationError> {
        let title = self.title.trim();
        let location = self.location.trim();
        let price = self.price.trim();

        if title.is_empty() || location.is_empty() || price.is_empty() {
            return Err(ValidationError::MissingFields);
        }

        let price = price
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| ValidationError::InvalidPrice(self.price.clone()))?;

        if !(0.0..=5.0).contains(&self.rating) {
            return Err(ValidationError::InvalidRating(self.rating));
        }

        Ok(Listing::new(id, title, location, price, self.rating))
    }
}

/// Validates a sign-up against the registered `users`
///
/// # Errors
///
/// Returns [`SignupError::MissingFields`] if either field is empty and
/// [`SignupError::UserExists`] if the email is taken.
pub fn validate_signup(users: &[User], email: &str, password: &str) -> Result<User, SignupError> {
    if email.is_empty() || password.is_empty() {
        return Err(SignupError::MissingFields);
    }
    if users.iter().any(|user| user.email == email) {
        return Err(SignupError::UserExists);
    }
    Ok(User::new(email, password))
}
