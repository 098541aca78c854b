//! Demo: one order from cart to doorstep.
//!
//! The same device session signs in as each role in turn. Run with `RUST_LOG=info` to see
//! the transitions and change notifications.

use order_sync::auth::SessionAuth;
use order_sync::config::Config;
use order_sync::model::{Actor, Customization, RestaurantId, Size, SpiceLevel};
use order_sync::sync::{EventKind, SyncEvent};
use order_sync::system::{setup_tracing, OrderSystem};
use order_sync::views::Dashboard;
use std::sync::Arc;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = Config::from_env();
    info!(?config, "Starting order system");

    let auth = Arc::new(SessionAuth::signed_in(Actor::customer("cust-ann")));
    let system = OrderSystem::start(&config, auth.clone())
        .await
        .map_err(|e| e.to_string())?;

    let status_feed = system.subscribe(EventKind::OrderStatusChanged, |event| {
        if let SyncEvent::OrderStatusChanged { order, previous } = event {
            info!(order_id = %order.id(), from = %previous, to = %order.status(), "Status changed");
        }
    });

    // Customer picks from Pizza Palace's menu and checks out
    let restaurant = RestaurantId::new("1");
    let menu = system.menu(&restaurant).map_err(|e| e.to_string())?;
    info!(restaurant = %restaurant, items = menu.len(), "Menu loaded");

    let span = tracing::info_span!("checkout");
    let order = async {
        let (pizza, rest) = menu
            .split_first()
            .ok_or_else(|| "Menu is empty".to_string())?;
        let large = Customization::new(pizza, Size::Large, SpiceLevel::Hot, ["olives"], "")
            .map_err(|e| e.to_string())?;
        let mut cart = system
            .add_to_cart(pizza, 2, Some(large))
            .await
            .map_err(|e| e.to_string())?;
        for item in rest {
            cart = system
                .add_to_cart(item, 1, None)
                .await
                .map_err(|e| e.to_string())?;
        }
        info!(total = cart.totals.total, "Cart ready");

        system
            .place_order("12 Main St")
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    info!(order_id = %order.id(), total = order.total(), "Order placed");

    // Restaurant moves it to ready
    auth.sign_in(Actor::restaurant("staff-1", "1"));
    let span = tracing::info_span!("kitchen");
    async {
        for _ in 0..3 {
            system.advance(order.id()).await.map_err(|e| e.to_string())?;
        }
        Ok::<(), String>(())
    }
    .instrument(span)
    .await?;

    // Delivery agent picks it up and drops it off
    auth.sign_in(Actor::delivery("rider-7"));
    let span = tracing::info_span!("delivery");
    let delivered = async {
        if let Ok(dash) = system.dashboard().await {
            if let Dashboard::Delivery(view) = dash.view {
                info!(available = view.available.len(), source = ?dash.source, "Delivery board");
            }
        }
        system.claim(order.id()).await?;
        system.complete(order.id()).await
    }
    .instrument(span)
    .await;

    match delivered {
        Ok(order) => info!(order_id = %order.id(), status = %order.status(), "Order delivered"),
        Err(e) => error!(error = %e, hint = %e.user_message(), "Delivery failed"),
    }

    status_feed.unsubscribe();
    auth.sign_out();
    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
