use order_sync::auth::SessionAuth;
use order_sync::config::Config;
use order_sync::model::{Actor, MenuItem, OrderStatus, RestaurantId, Role};
use order_sync::sync::{DataSource, EventKind, SyncEvent};
use order_sync::system::OrderSystem;
use order_sync::views::Dashboard;
use order_sync::OrderError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn pizza() -> MenuItem {
    MenuItem::new("1", "Margherita Pizza", 299, RestaurantId::new("1"))
}

async fn session(system: &OrderSystem, actor: Actor) -> OrderSystem {
    OrderSystem::with_sync(system.sync().clone(), Arc::new(SessionAuth::signed_in(actor)))
        .await
        .unwrap()
}

/// Full end-to-end run with a real store actor: checkout, kitchen, delivery.
#[tokio::test]
async fn test_order_flows_from_cart_to_doorstep() {
    let customer = OrderSystem::start(
        &Config::default(),
        Arc::new(SessionAuth::signed_in(Actor::customer("ann"))),
    )
    .await
    .unwrap();
    let kitchen = session(&customer, Actor::restaurant("staff-1", "1")).await;
    let rider = session(&customer, Actor::delivery("rider-1")).await;

    // Checkout freezes the cart total and empties the cart
    let cart = customer.add_to_cart(&pizza(), 2, None).await.unwrap();
    assert_eq!(
        (cart.totals.subtotal, cart.totals.delivery_fee, cart.totals.tax, cart.totals.total),
        (598, 99, 30, 727)
    );
    let order = customer.place_order("12 Main St").await.unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.total(), 727);
    assert!(order.delivery_agent_ref().is_none());
    assert!(customer.cart().await.lines.is_empty());

    // Three restaurant steps, then no more
    let mut statuses = Vec::new();
    for _ in 0..3 {
        statuses.push(kitchen.advance(order.id()).await.unwrap().status());
    }
    assert_eq!(
        statuses,
        vec![OrderStatus::Confirmed, OrderStatus::Preparing, OrderStatus::Ready]
    );
    let fourth = kitchen.advance(order.id()).await;
    assert!(matches!(fourth, Err(OrderError::InvalidTransition { .. })));

    // Delivery
    let claimed = rider.claim(order.id()).await.unwrap();
    assert_eq!(claimed.status(), OrderStatus::OutForDelivery);
    let delivered = rider.complete(order.id()).await.unwrap();
    assert_eq!(delivered.status(), OrderStatus::Delivered);
    assert_eq!(delivered.total(), 727);

    let dashboard = customer.dashboard().await.unwrap();
    assert_eq!(dashboard.source, DataSource::Remote);
    match dashboard.view {
        Dashboard::Customer(view) => assert_eq!(view.orders, vec![delivered]),
        other => panic!("unexpected dashboard: {other:?}"),
    }

    rider.shutdown().await.unwrap();
    kitchen.shutdown().await.unwrap();
    customer.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_ready_order_round_trips_through_restaurant_view() {
    let customer = OrderSystem::start(
        &Config::default(),
        Arc::new(SessionAuth::signed_in(Actor::customer("ann"))),
    )
    .await
    .unwrap();
    let kitchen = session(&customer, Actor::restaurant("staff-1", "1")).await;

    customer.add_to_cart(&pizza(), 1, None).await.unwrap();
    let order = customer.place_order("12 Main St").await.unwrap();
    let mut written = order.clone();
    for _ in 0..3 {
        written = kitchen.advance(order.id()).await.unwrap();
    }

    let dashboard = kitchen.dashboard().await.unwrap();
    match dashboard.view {
        Dashboard::Restaurant(view) => {
            assert_eq!(view.ready, vec![written]);
            assert!(view.active.is_empty());
        }
        other => panic!("unexpected dashboard: {other:?}"),
    }

    kitchen.shutdown().await.unwrap();
    customer.shutdown().await.unwrap();
}

/// Two riders race for the same order: exactly one wins.
#[tokio::test]
async fn test_concurrent_claims_assign_exactly_one_agent() {
    let customer = OrderSystem::start(
        &Config::default(),
        Arc::new(SessionAuth::signed_in(Actor::customer("ann"))),
    )
    .await
    .unwrap();
    let kitchen = session(&customer, Actor::restaurant("staff-1", "1")).await;
    let rider_one = session(&customer, Actor::delivery("rider-1")).await;
    let rider_two = session(&customer, Actor::delivery("rider-2")).await;

    customer.add_to_cart(&pizza(), 1, None).await.unwrap();
    let order = customer.place_order("12 Main St").await.unwrap();
    for _ in 0..3 {
        kitchen.advance(order.id()).await.unwrap();
    }

    let (first, second) = tokio::join!(rider_one.claim(order.id()), rider_two.claim(order.id()));

    let (winner, loser) = match (first, second) {
        (Ok(won), Err(lost)) => (won, lost),
        (Err(lost), Ok(won)) => (won, lost),
        other => panic!("expected exactly one successful claim, got {other:?}"),
    };
    assert!(matches!(loser, OrderError::AlreadyClaimed { .. }));

    let stored = customer.engine().get(order.id()).await.unwrap();
    assert_eq!(stored.delivery_agent_ref(), winner.delivery_agent_ref());
    assert_eq!(stored.status(), OrderStatus::OutForDelivery);

    // The loser cannot finish someone else's delivery
    let loser_session = if winner.delivery_agent_ref().map(|a| a.0.as_str()) == Some("rider-1") {
        &rider_two
    } else {
        &rider_one
    };
    let err = loser_session.complete(order.id()).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
    let unchanged = customer.engine().get(order.id()).await.unwrap();
    assert_eq!(unchanged.status(), OrderStatus::OutForDelivery);

    rider_two.shutdown().await.unwrap();
    rider_one.shutdown().await.unwrap();
    kitchen.shutdown().await.unwrap();
    customer.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_role_gates() {
    let auth = Arc::new(SessionAuth::new());
    let system = OrderSystem::start(&Config::default(), auth.clone())
        .await
        .unwrap();

    // Nobody signed in
    let err = system.add_to_cart(&pizza(), 1, None).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    auth.sign_in(Actor::delivery("rider-1"));
    let err = system.place_order("12 Main St").await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    auth.sign_in(Actor::customer("ann"));
    system.add_to_cart(&pizza(), 1, None).await.unwrap();
    let order = system.place_order("12 Main St").await.unwrap();

    // Customers cannot move an order along
    let err = system.advance(order.id()).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));

    // Staff of another restaurant cannot either
    auth.sign_in(Actor::restaurant("staff-9", "rest-9"));
    let err = system.advance(order.id()).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    // Nor can a restaurant account that is not tied to any restaurant
    auth.sign_in(Actor {
        restaurant_id: None,
        ..Actor::restaurant("staff-0", "1")
    });
    let err = system.advance(order.id()).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
    let err = system.update_menu(Vec::new()).unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
    assert_eq!(
        system.engine().get(order.id()).await.unwrap().status(),
        OrderStatus::Pending
    );
    assert_eq!(system.current_actor().unwrap().role, Role::Restaurant);

    auth.sign_out();
    system.shutdown().await.unwrap();
}

/// Menu edits by the kitchen reach customers, and stale prices stop at the cart.
#[tokio::test]
async fn test_menu_changes_reach_other_sessions() {
    let customer = OrderSystem::start(
        &Config::default(),
        Arc::new(SessionAuth::signed_in(Actor::customer("ann"))),
    )
    .await
    .unwrap();
    let kitchen = session(&customer, Actor::restaurant("staff-1", "1")).await;

    let palace = RestaurantId::new("1");
    assert_eq!(customer.restaurants().unwrap().len(), 2);
    assert!(customer.menu(&palace).unwrap().contains(&pizza()));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sub = customer.subscribe(EventKind::CatalogChanged, move |event| {
        if let SyncEvent::CatalogChanged(catalog) = event {
            let _ = tx.send(catalog.clone());
        }
    });

    let repriced = MenuItem::new("1", "Margherita Pizza", 319, palace.clone());
    kitchen.update_menu(vec![repriced.clone()]).unwrap();

    let catalog = rx.recv().await.unwrap();
    let updated = catalog.iter().find(|r| r.id == palace).unwrap();
    assert_eq!(updated.menu, vec![repriced.clone()]);

    // The old price is gone; the new one is accepted
    let err = customer.add_to_cart(&pizza(), 1, None).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
    let cart = customer.add_to_cart(&repriced, 1, None).await.unwrap();
    assert_eq!(cart.totals.subtotal, 319);

    // Customers cannot edit menus
    let err = customer.update_menu(Vec::new()).unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    let unknown = MenuItem::new("1", "Margherita Pizza", 299, RestaurantId::new("404"));
    let err = customer.add_to_cart(&unknown, 1, None).await.unwrap_err();
    assert!(matches!(err, OrderError::UnknownRestaurant(_)));

    sub.unsubscribe();
    kitchen.shutdown().await.unwrap();
    customer.shutdown().await.unwrap();
}

/// A write from another session reaches this one through the store's change feed.
#[tokio::test]
async fn test_remote_changes_trigger_full_resync() {
    let customer = OrderSystem::start(
        &Config::default(),
        Arc::new(SessionAuth::signed_in(Actor::customer("ann"))),
    )
    .await
    .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sub = customer.subscribe(EventKind::OrdersSynced, move |event| {
        if let SyncEvent::OrdersSynced(orders) = event {
            let _ = tx.send(orders.len());
        }
    });

    customer.add_to_cart(&pizza(), 1, None).await.unwrap();
    customer.place_order("12 Main St").await.unwrap();

    let synced = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no resync within 2s");
    assert_eq!(synced, Some(1));

    sub.unsubscribe();
    customer.shutdown().await.unwrap();
}

/// Without a remote store the file cache is the source of truth and survives a restart.
#[tokio::test]
async fn test_local_only_mode_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        cache_dir: Some(dir.path().to_path_buf()),
        local_only: true,
        ..Config::default()
    };
    let auth = Arc::new(SessionAuth::signed_in(Actor::customer("ann")));

    let system = OrderSystem::start(&config, auth.clone()).await.unwrap();
    assert!(system.sync().is_local_only());

    let created = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = created.clone();
    let _sub = system.subscribe(EventKind::OrderCreated, move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });

    system.add_to_cart(&pizza(), 2, None).await.unwrap();
    let order = system.place_order("12 Main St").await.unwrap();
    assert!(order.id().is_assigned());
    assert_eq!(order.version(), 1);
    assert_eq!(created.load(std::sync::atomic::Ordering::SeqCst), 1);
    system.add_to_cart(&pizza(), 1, None).await.unwrap();
    system.shutdown().await.unwrap();

    let restarted = OrderSystem::start(&config, auth).await.unwrap();
    assert_eq!(restarted.cart().await.lines.len(), 1);

    let dashboard = restarted.dashboard().await.unwrap();
    assert_eq!(dashboard.source, DataSource::LocalCache);
    match dashboard.view {
        Dashboard::Customer(view) => assert_eq!(view.orders, vec![order]),
        other => panic!("unexpected dashboard: {other:?}"),
    }
    restarted.shutdown().await.unwrap();
}
