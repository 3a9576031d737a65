//! Wanderlust: state core of a listings marketplace.
//!
//! Users browse, search, sort, add, edit and delete property listings, sign
//! up, and book a listing with an optional coupon. This crate holds:
//!
//! - Domain types ([`AppState`], [`AppAction`], [`Listing`], [`Coupon`])
//! - The pure [`transition`] function and the [`AppReducer`] built on it
//! - Derived views ([`visible_listings`], [`checkout_summary`], ...)
//! - The coupon engine ([`evaluate_coupon`], [`lookup`](coupon::lookup))
//! - Persistence of listings and the session ([`PersistedState`], [`FileStorage`])
//! - Configuration ([`Config`])
//!
//! # Quick Start
//!
//! ```no_run
//! use wanderlust::{AppAction, AppReducer, Config, ListingDraft, PersistedState, visible_listings};
//! use wanderlust_runtime::Store;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let env = config.environment();
//! let state = PersistedState::load(env.storage.as_ref()).into_state();
//! let store = Store::new(state, AppReducer::new(), env);
//!
//! store
//!     .send(AppAction::AddListing {
//!         draft: ListingDraft::new("Sea View", "Goa", "100", 4.5),
//!     })
//!     .await?;
//! store.send(AppAction::SetSearchQuery("goa".to_string())).await?;
//!
//! let titles: Vec<String> = store
//!     .state(|s| visible_listings(s).iter().map(|l| l.title.clone()).collect())
//!     .await;
//! println!("{titles:?}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coupon;
pub mod forms;
pub mod persistence;
pub mod reducer;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use coupon::{evaluate_coupon, CouponError, DISCOUNT_CAP};
pub use forms::{ListingDraft, SignupError, ValidationError};
pub use persistence::{FileStorage, ListingStore, PersistedState, SessionStore};
pub use reducer::{transition, AppEnvironment, AppReducer, COUPON_AUTO_CLOSE, COUPON_CHECK};
pub use types::{
    AppAction, AppState, BookingConfirmation, CheckoutSession, Coupon, CouponKind, CouponStatus,
    Listing, ListingId, SortMode, User,
};
pub use view::{
    checkout_summary, empty_notice, price_breakdown, search_suggestions, visible_listings,
};

/// The store type used by hosts
pub type AppStore = wanderlust_runtime::Store<AppState, AppAction, AppEnvironment, AppReducer>;
