//! Scripted demo session against on-disk storage.
//!
//! Loads the persisted listings and session from the configured data
//! directory, walks through sign-up, listing management, search and a
//! coupon checkout, then writes everything back.

use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wanderlust::{
    checkout_summary, coupon, search_suggestions, visible_listings, AppAction, AppReducer,
    AppStore, Config, ListingDraft, PersistedState, SortMode,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    wanderlust_runtime::metrics::describe();

    tracing::info!(data_dir = %config.data_dir.display(), "Starting Wanderlust demo");

    let env = config.environment();
    let state = PersistedState::load(env.storage.as_ref()).into_state();
    let store: AppStore = AppStore::new(state, AppReducer::new(), env);

    println!("=== Wanderlust ===\n");

    store
        .send(AppAction::SignUp {
            email: "guest@wanderlust.local".to_string(),
            password: "guest".to_string(),
        })
        .await?;
    if let Some(error) = store.state(|s| s.last_error.clone()).await {
        println!("Sign-up: {error}");
        store.send(AppAction::Login(true)).await?;
    }

    if store.state(|s| s.listings.is_empty()).await {
        println!("Seeding listings...");
        for (title, location, price, rating) in [
            ("Sea View Villa", "Goa", "180", 4.5),
            ("Hill Cabin", "Pune", "50", 4.0),
            ("Lake Palace Suite", "Udaipur", "320", 5.0),
            ("Backwater Houseboat", "Kerala", "140", 4.5),
        ] {
            store
                .send(AppAction::AddListing {
                    draft: ListingDraft::new(title, location, price, rating),
                })
                .await?;
        }
    }

    println!("\nSuggestions for \"pu\": {:?}", search_suggestions("pu"));

    store.send(AppAction::SetSort(SortMode::Asc)).await?;
    let listings = store
        .state(|s| {
            visible_listings(s)
                .into_iter()
                .map(|l| {
                    format!(
                        "{} ({}) ${:.2} {}★",
                        l.title,
                        l.location,
                        l.price,
                        l.display_rating()
                    )
                })
                .collect::<Vec<_>>()
        })
        .await;
    println!("\nListings by price:");
    for line in &listings {
        println!("  {line}");
    }

    let Some(target) = store.state(|s| visible_listings(s).last().map(|l| l.id)).await else {
        println!("\nNothing to book.");
        store.shutdown(Duration::from_secs(5)).await?;
        return Ok(());
    };

    println!("\nCoupons on offer:");
    for c in coupon::catalog() {
        println!("  {} ({:?} {}) until {}", c.code, c.kind, c.value, c.expiry.date_naive());
    }

    store.send(AppAction::BeginCheckout { listing_id: target }).await?;
    store.send(AppAction::OpenCouponModal).await?;
    store
        .send(AppAction::SetCouponCode {
            code: "travel10".to_string(),
        })
        .await?;
    let mut check = store.send(AppAction::CheckCouponCode).await?;
    check.wait().await;

    let status = store.state(|s| s.checkout.coupon_status.clone()).await;
    if let Some(message) = status.success.or(status.error) {
        println!("\nCoupon: {message}");
    }

    if let Some(summary) = store
        .state(|s| {
            checkout_summary(s).map(|summary| {
                (
                    summary.listing.title.clone(),
                    summary.breakdown,
                    summary.coupon_code.map(str::to_string),
                )
            })
        })
        .await
    {
        let (title, breakdown, code) = summary;
        println!(
            "Checkout: {title} ${:.2} - ${:.2} ({}) = ${:.2}",
            breakdown.base,
            breakdown.discount,
            code.as_deref().unwrap_or("no coupon"),
            breakdown.final_price
        );
    }

    store.send(AppAction::ConfirmBooking).await?;
    if let Some(booking) = store.state(|s| s.last_booking.clone()).await {
        println!("\n{}", booking.message());
    }

    store.shutdown(Duration::from_secs(5)).await?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
