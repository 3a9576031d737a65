//! State transitions and the marketplace reducer.
//!
//! [`transition`] is the pure state machine over the nine plain state
//! actions. [`AppReducer`] wraps it for the [`Store`](wanderlust_runtime::Store):
//! it validates commands, drives the checkout flow, and returns effects for
//! persistence and coupon timers.

use std::sync::Arc;
use std::time::Duration;
use wanderlust_core::{
    effect::{Effect, EffectId},
    environment::{Clock, IdGenerator, Storage},
    reducer::Reducer,
    smallvec, SmallVec,
};

use crate::coupon::{evaluate_coupon, final_price, lookup};
use crate::forms::{validate_signup, ListingDraft, ValidationError};
use crate::persistence::{PersistedState, WriteSequence};
use crate::types::{
    AppAction, AppState, BookingConfirmation, CheckoutSession, CouponStatus, ListingId,
};

/// Pending coupon check
pub const COUPON_CHECK: EffectId = EffectId::new("coupon_check");

/// Auto-close of the coupon modal after a successful check
pub const COUPON_AUTO_CLOSE: EffectId = EffectId::new("coupon_auto_close");

/// Default delay of a coupon check
pub const DEFAULT_COUPON_CHECK_DELAY: Duration = Duration::from_millis(800);

/// Default delay before the modal closes after a successful check
pub const DEFAULT_COUPON_AUTO_CLOSE: Duration = Duration::from_millis(1500);

type Effects = SmallVec<[Effect<AppAction>; 4]>;

/// Applies one plain state action
///
/// Pure and total. Every action other than the nine state actions
/// (including [`AppAction::Unknown`]) returns `state` unchanged.
#[must_use]
pub fn transition(state: AppState, action: AppAction) -> AppState {
    let name = action.name();
    let mut next = state;

    match action {
        AppAction::Login(is_logged_in) => next.is_logged_in = is_logged_in,
        AppAction::UserDetails(users) => next.users = users,
        AppAction::ToggleSearchDropdown => {
            next.is_search_dropdown_open = !next.is_search_dropdown_open;
        },
        AppAction::CloseSearchDropdown => next.is_search_dropdown_open = false,
        AppAction::SetSearchQuery(query) => next.search_query = query,
        AppAction::SetSort(sort) => next.selected_sort = sort,
        AppAction::SetListings(listings) => next.listings = listings,
        AppAction::ApplyCoupon { coupon, discount } => {
            next.applied_coupon = Some(coupon);
            next.discount_amount = discount;
        },
        AppAction::RemoveCoupon => {
            next.applied_coupon = None;
            next.discount_amount = 0.0;
        },
        _ => return next,
    }

    next.last_action = Some(name);
    next
}

/// Environment dependencies for the marketplace reducer
#[derive(Clone)]
pub struct AppEnvironment {
    /// Time source for coupon expiry
    pub clock: Arc<dyn Clock>,
    /// Durable storage for the persisted slices
    pub storage: Arc<dyn Storage>,
    /// Source of new listing ids
    pub ids: Arc<dyn IdGenerator>,
    /// Orders persistence writes
    pub writes: Arc<WriteSequence>,
    /// How long a coupon check takes
    pub coupon_check_delay: Duration,
    /// How long a success message stays before the modal closes
    pub coupon_auto_close_delay: Duration,
}

impl AppEnvironment {
    /// Creates an environment with the default coupon delays
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        storage: Arc<dyn Storage>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            clock,
            storage,
            ids,
            writes: Arc::new(WriteSequence::new()),
            coupon_check_delay: DEFAULT_COUPON_CHECK_DELAY,
            coupon_auto_close_delay: DEFAULT_COUPON_AUTO_CLOSE,
        }
    }

    /// Builder: override the coupon delays
    #[must_use]
    pub const fn with_coupon_delays(mut self, check: Duration, auto_close: Duration) -> Self {
        self.coupon_check_delay = check;
        self.coupon_auto_close_delay = auto_close;
        self
    }
}

impl std::fmt::Debug for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppEnvironment")
            .field("coupon_check_delay", &self.coupon_check_delay)
            .field("coupon_auto_close_delay", &self.coupon_auto_close_delay)
            .finish_non_exhaustive()
    }
}

/// Reducer for the marketplace
#[derive(Clone, Debug, Default)]
pub struct AppReducer;

impl AppReducer {
    /// Creates a new `AppReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn apply(state: &mut AppState, action: AppAction) {
        *state = transition(std::mem::take(state), action);
    }

    /// Applies state actions that change persisted slices and returns the
    /// single effect writing them out
    fn apply_persisted(
        state: &mut AppState,
        actions: impl IntoIterator<Item = AppAction>,
        env: &AppEnvironment,
    ) -> Effects {
        for action in actions {
            Self::apply(state, action);
        }
        state.last_error = None;
        smallvec![Self::persist(state, env)]
    }

    /// Effect writing the persisted slices as they are now
    fn persist(state: &AppState, env: &AppEnvironment) -> Effect<AppAction> {
        let snapshot = PersistedState::from_state(state);
        let generation = env.writes.next();
        let writes = Arc::clone(&env.writes);
        let storage = Arc::clone(&env.storage);

        Effect::Future(Box::pin(async move {
            let task = tokio::task::spawn_blocking(move || {
                writes.commit(generation, || {
                    if !snapshot.save(storage.as_ref()) {
                        tracing::warn!(generation, "Snapshot only partially saved");
                    }
                })
            });
            if let Err(error) = task.await {
                tracing::error!(%error, "Persistence task failed");
            }
            None
        }))
    }

    fn reject(state: &mut AppState, error: impl std::fmt::Display) -> Effects {
        let error = error.to_string();
        tracing::debug!(%error, "Command rejected");
        state.last_error = Some(error);
        SmallVec::new()
    }

    fn cancel_coupon_timers() -> Effects {
        smallvec![Effect::Cancel(COUPON_CHECK), Effect::Cancel(COUPON_AUTO_CLOSE)]
    }

    fn start_coupon_check(state: &mut AppState, code: String, env: &AppEnvironment) -> Effects {
        if state.checkout.listing_id.is_none() {
            return Self::reject(state, ValidationError::NoActiveCheckout);
        }
        state.checkout.coupon_status = CouponStatus::loading();
        smallvec![
            Effect::Cancel(COUPON_AUTO_CLOSE),
            Effect::delay(env.coupon_check_delay, AppAction::CouponCheckCompleted { code })
                .cancellable(COUPON_CHECK),
        ]
    }

    fn complete_coupon_check(state: &mut AppState, code: &str, env: &AppEnvironment) -> Effects {
        if !state.checkout.coupon_status.loading {
            tracing::debug!(code, "Ignoring stale coupon check");
            return SmallVec::new();
        }

        let Some(base_price) = state.checkout_listing().map(|listing| listing.price) else {
            state.checkout.coupon_status = CouponStatus::default();
            return Self::reject(state, ValidationError::NoActiveCheckout);
        };

        let outcome = lookup(code).and_then(|coupon| {
            evaluate_coupon(coupon, base_price, env.clock.now()).map(|discount| (coupon, discount))
        });

        match outcome {
            Ok((coupon, discount)) => {
                tracing::debug!(code = %coupon.code, discount, "Coupon applied");
                state.checkout.coupon_status = CouponStatus {
                    loading: false,
                    error: None,
                    success: Some(format!("Applied {}!", coupon.code)),
                };
                Self::apply(
                    state,
                    AppAction::ApplyCoupon {
                        coupon: coupon.clone(),
                        discount,
                    },
                );
                smallvec![
                    Effect::delay(env.coupon_auto_close_delay, AppAction::CloseCouponModal)
                        .cancellable(COUPON_AUTO_CLOSE)
                ]
            },
            Err(error) => {
                tracing::debug!(code, %error, "Coupon rejected");
                state.checkout.coupon_status = CouponStatus {
                    loading: false,
                    error: Some(error.to_string()),
                    success: None,
                };
                SmallVec::new()
            },
        }
    }

    fn edit_listing(
        state: &mut AppState,
        id: ListingId,
        draft: &ListingDraft,
        env: &AppEnvironment,
    ) -> Effects {
        let Some(position) = state.listings.iter().position(|l| l.id == id) else {
            return Self::reject(state, ValidationError::ListingNotFound(id));
        };
        match draft.to_listing(id) {
            Ok(listing) => {
                let mut listings = state.listings.clone();
                listings[position] = listing;
                Self::apply_persisted(state, [AppAction::SetListings(listings)], env)
            },
            Err(error) => Self::reject(state, error),
        }
    }

    fn confirm_booking(state: &mut AppState) -> Effects {
        let Some(listing) = state.checkout_listing() else {
            return Self::reject(state, ValidationError::NoActiveCheckout);
        };

        let booking = BookingConfirmation {
            listing_id: listing.id,
            title: listing.title.clone(),
            total: final_price(listing.price, state.discount_amount),
        };
        tracing::info!(
            listing_id = %booking.listing_id,
            total = booking.total,
            "{}",
            booking.message()
        );

        state.last_booking = Some(booking);
        state.checkout = CheckoutSession::default();
        state.last_error = None;
        Self::apply(state, AppAction::RemoveCoupon);
        Self::cancel_coupon_timers()
    }
}

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = AppEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let name = action.name();

        let effects = match action {
            // ========== State actions ==========
            AppAction::Unknown => return SmallVec::new(),

            action @ (AppAction::Login(_)
            | AppAction::UserDetails(_)
            | AppAction::SetListings(_)) => {
                Self::apply(state, action);
                smallvec![Self::persist(state, env)]
            },

            action @ (AppAction::ToggleSearchDropdown
            | AppAction::CloseSearchDropdown
            | AppAction::SetSearchQuery(_)
            | AppAction::SetSort(_)
            | AppAction::ApplyCoupon { .. }
            | AppAction::RemoveCoupon) => {
                Self::apply(state, action);
                SmallVec::new()
            },

            // ========== Commands ==========
            AppAction::AddListing { draft } => {
                match draft.to_listing(ListingId::new(env.ids.next_id())) {
                    Ok(listing) => {
                        tracing::debug!(id = %listing.id, "Adding listing");
                        let mut listings = state.listings.clone();
                        listings.push(listing);
                        Self::apply_persisted(state, [AppAction::SetListings(listings)], env)
                    },
                    Err(error) => Self::reject(state, error),
                }
            },

            AppAction::EditListing { id, draft } => Self::edit_listing(state, id, &draft, env),

            AppAction::DeleteListing { id } => {
                if state.listing(id).is_some() {
                    let listings = state
                        .listings
                        .iter()
                        .filter(|listing| listing.id != id)
                        .cloned()
                        .collect();
                    Self::apply_persisted(state, [AppAction::SetListings(listings)], env)
                } else {
                    SmallVec::new()
                }
            },

            AppAction::SignUp { email, password } => {
                match validate_signup(&state.users, &email, &password) {
                    Ok(user) => {
                        let mut users = state.users.clone();
                        users.push(user);
                        Self::apply_persisted(
                            state,
                            [AppAction::UserDetails(users), AppAction::Login(true)],
                            env,
                        )
                    },
                    Err(error) => Self::reject(state, error),
                }
            },

            AppAction::LogOut => Self::apply_persisted(state, [AppAction::Login(false)], env),

            AppAction::SelectSuggestion { city } => {
                Self::apply(state, AppAction::SetSearchQuery(city));
                Self::apply(state, AppAction::CloseSearchDropdown);
                SmallVec::new()
            },

            AppAction::ValidationFailed { error } => Self::reject(state, error),

            // ========== Checkout ==========
            AppAction::BeginCheckout { listing_id } => {
                if state.listing(listing_id).is_none() {
                    Self::reject(state, ValidationError::ListingNotFound(listing_id))
                } else {
                    state.checkout = CheckoutSession::for_listing(listing_id);
                    state.last_error = None;
                    Self::apply(state, AppAction::RemoveCoupon);
                    Self::cancel_coupon_timers()
                }
            },

            AppAction::OpenCouponModal => {
                if state.checkout.listing_id.is_some() {
                    state.checkout.coupon_modal_open = true;
                }
                SmallVec::new()
            },

            AppAction::CloseCouponModal => {
                state.checkout.coupon_modal_open = false;
                state.checkout.coupon_input.clear();
                state.checkout.coupon_status = CouponStatus::default();
                Self::cancel_coupon_timers()
            },

            AppAction::SetCouponCode { code } => {
                state.checkout.coupon_input = code.to_uppercase();
                SmallVec::new()
            },

            AppAction::SelectCoupon { code } => Self::start_coupon_check(state, code, env),

            AppAction::CheckCouponCode => {
                if state.checkout.coupon_input.is_empty() || state.checkout.coupon_status.loading {
                    SmallVec::new()
                } else {
                    let code = state.checkout.coupon_input.clone();
                    Self::start_coupon_check(state, code, env)
                }
            },

            AppAction::CouponCheckCompleted { code } => {
                Self::complete_coupon_check(state, &code, env)
            },

            AppAction::ConfirmBooking => Self::confirm_booking(state),
        };

        state.last_action = Some(name);
        effects
    }
}
