//! # Dual-Channel Synchronization Layer
//!
//! The only writer of persisted order and cart state. Keeps the [`LocalCache`] and an
//! optional [`RemoteStore`] consistent and fans every successful write out on the
//! [`EventBus`].
//!
//! ## Write path
//!
//! With a remote store, every write goes to the store first. Only when the store accepts it
//! is the cache updated to match. A failed remote write leaves the cache untouched; there is
//! no optimistic local commit and no offline queue.
//!
//! Without a remote store (local-only mode) the cache is the store: ids are assigned locally
//! and the version check runs against the cached copy.
//!
//! ## Read path
//!
//! [`SyncLayer::orders`] reads from the remote store when it answers. On a transient failure
//! it returns the cached collection instead, tagged [`DataSource::LocalCache`]. The two are
//! never merged.
//!
//! ## Remote changes
//!
//! [`SyncLayer::watch_remote`] listens to the store's change feed. Each notice triggers a
//! full re-fetch; the cached `orders` value is replaced wholesale and
//! [`SyncEvent::OrdersSynced`] is emitted.
//!
//! ## Catalog
//!
//! Restaurants and their menus live in the local cache only. A fresh device is seeded once;
//! after that, menu edits replace the cached catalog and emit [`SyncEvent::CatalogChanged`].

pub mod cache;
pub mod events;
pub mod remote;

pub use cache::{CacheBackend, CacheError, FileBackend, LocalCache, MemoryBackend};
pub use events::{EventBus, EventKind, Listener, Subscription, SyncEvent};
pub use remote::{ChangeFeed, RemoteStore};

use crate::error::OrderError;
use crate::model::{
    CartLine, MenuItem, Order, OrderFilter, OrderId, OrderStatus, Restaurant, RestaurantId,
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use store_actor::StoredRecord;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, info, instrument, warn};

/// Where an [`OrdersSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    LocalCache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrdersSnapshot {
    pub orders: Vec<Order>,
    pub source: DataSource,
}

pub struct SyncLayer {
    remote: Option<Arc<dyn RemoteStore>>,
    cache: LocalCache,
    bus: EventBus,
    timeout: Duration,
    // Serializes load-modify-save cycles on cached collections
    cache_writes: Mutex<()>,
}

impl SyncLayer {
    pub fn new(
        remote: Option<Arc<dyn RemoteStore>>,
        cache: LocalCache,
        timeout: Duration,
    ) -> Self {
        Self {
            remote,
            cache,
            bus: EventBus::new(),
            timeout,
            cache_writes: Mutex::new(()),
        }
    }

    /// A layer with no remote store: the cache is authoritative.
    pub fn local_only(cache: LocalCache) -> Self {
        Self::new(None, cache, Duration::ZERO)
    }

    pub fn is_local_only(&self) -> bool {
        self.remote.is_none()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&SyncEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe(kind, callback)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Reads one order from the authoritative side.
    #[instrument(skip_all, fields(order_id = %id))]
    pub async fn fetch_order(&self, id: &OrderId) -> Result<Order, OrderError> {
        let found = match &self.remote {
            Some(remote) => self.bounded(remote.get(id)).await?,
            None => self
                .cache
                .load_orders()?
                .into_iter()
                .find(|o| o.id() == id),
        };
        found.ok_or_else(|| OrderError::NotFound(id.clone()))
    }

    /// Orders matching `filter`, from the remote store if it answers, else from the cache.
    #[instrument(skip(self))]
    pub async fn orders(&self, filter: OrderFilter) -> Result<OrdersSnapshot, OrderError> {
        let Some(remote) = &self.remote else {
            return self.cached(&filter);
        };

        match self.bounded(remote.read(filter.clone())).await {
            Ok(orders) => {
                self.remember(&orders);
                Ok(OrdersSnapshot {
                    orders,
                    source: DataSource::Remote,
                })
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Remote read failed, serving cached orders");
                self.cached(&filter)
            }
            Err(e) => Err(e),
        }
    }

    /// Persists a new order and emits [`SyncEvent::OrderCreated`].
    #[instrument(skip_all, fields(restaurant = %order.restaurant_id()))]
    pub async fn insert_order(&self, order: Order) -> Result<Order, OrderError> {
        let stored = match &self.remote {
            Some(remote) => {
                let stored = self.bounded(remote.insert(order)).await?;
                self.remember(std::slice::from_ref(&stored));
                stored
            }
            None => self.insert_local(order)?,
        };

        info!(order_id = %stored.id(), total = stored.total(), "Order stored");
        self.bus.emit(&SyncEvent::OrderCreated(stored.clone()));
        Ok(stored)
    }

    /// Conditionally replaces an order and emits [`SyncEvent::OrderStatusChanged`].
    ///
    /// Fails with `Conflict` unless the stored version still equals `expected_version`.
    #[instrument(skip_all, fields(order_id = %order.id(), status = %order.status(), expected_version = expected_version))]
    pub async fn write_order(
        &self,
        order: Order,
        expected_version: u64,
        previous: OrderStatus,
    ) -> Result<Order, OrderError> {
        let stored = match &self.remote {
            Some(remote) => {
                let stored = self.bounded(remote.write(order, expected_version)).await?;
                self.remember(std::slice::from_ref(&stored));
                stored
            }
            None => self.write_local(order, expected_version)?,
        };

        info!(version = stored.version(), "Order updated");
        self.bus.emit(&SyncEvent::OrderStatusChanged {
            order: stored.clone(),
            previous,
        });
        Ok(stored)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub fn load_cart(&self) -> Result<Vec<CartLine>, OrderError> {
        Ok(self.cache.load_cart()?)
    }

    /// Persists the cart snapshot and emits [`SyncEvent::CartChanged`].
    pub fn save_cart(&self, lines: &[CartLine]) -> Result<(), OrderError> {
        self.cache.save_cart(lines)?;
        self.bus.emit(&SyncEvent::CartChanged(lines.to_vec()));
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Writes `restaurants` as the catalog unless one is already cached.
    ///
    /// Returns whether anything was written.
    pub fn seed_catalog(&self, restaurants: Vec<Restaurant>) -> Result<bool, OrderError> {
        {
            let _guard = self.lock_cache();
            if !self.cache.load_restaurants()?.is_empty() {
                return Ok(false);
            }
            self.cache.save_restaurants(&restaurants)?;
        }
        info!(restaurants = restaurants.len(), "Catalog seeded");
        self.bus.emit(&SyncEvent::CatalogChanged(restaurants));
        Ok(true)
    }

    pub fn restaurants(&self) -> Result<Vec<Restaurant>, OrderError> {
        Ok(self.cache.load_restaurants()?)
    }

    pub fn restaurant(&self, id: &RestaurantId) -> Result<Restaurant, OrderError> {
        self.restaurants()?
            .into_iter()
            .find(|r| r.id == *id)
            .ok_or_else(|| OrderError::UnknownRestaurant(id.clone()))
    }

    pub fn menu(&self, id: &RestaurantId) -> Result<Vec<MenuItem>, OrderError> {
        Ok(self.restaurant(id)?.menu)
    }

    /// Replaces one restaurant's menu and emits [`SyncEvent::CatalogChanged`].
    #[instrument(skip_all, fields(restaurant = %id, items = menu.len()))]
    pub fn update_menu(
        &self,
        id: &RestaurantId,
        menu: Vec<MenuItem>,
    ) -> Result<Restaurant, OrderError> {
        let (updated, catalog) = {
            let _guard = self.lock_cache();
            let mut catalog = self.cache.load_restaurants()?;
            let restaurant = catalog
                .iter_mut()
                .find(|r| r.id == *id)
                .ok_or_else(|| OrderError::UnknownRestaurant(id.clone()))?;
            restaurant.replace_menu(menu)?;
            let updated = restaurant.clone();
            self.cache.save_restaurants(&catalog)?;
            (updated, catalog)
        };

        info!("Menu updated");
        self.bus.emit(&SyncEvent::CatalogChanged(catalog));
        Ok(updated)
    }

    // =========================================================================
    // Remote change feed
    // =========================================================================

    /// Starts re-fetching the order collection whenever the remote store reports a change.
    ///
    /// In local-only mode there is no feed; the returned subscription is inert.
    pub async fn watch_remote(self: &Arc<Self>) -> Result<Subscription, OrderError> {
        let Some(remote) = &self.remote else {
            debug!("Local-only mode, no remote feed to watch");
            return Ok(Subscription::new(|| {}));
        };

        let mut feed = self.bounded(remote.subscribe()).await?;
        // The watch must not keep the layer, and with it the store client, alive
        let layer = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(notice) => debug!(order_id = %notice.id, kind = ?notice.kind, "Remote change"),
                    Err(RecvError::Lagged(missed)) => warn!(missed, "Change feed lagged"),
                    Err(RecvError::Closed) => break,
                }
                // Coalesce a burst of notices into one re-fetch
                loop {
                    match feed.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Closed) => return,
                    }
                }
                let Some(layer) = layer.upgrade() else {
                    break;
                };
                layer.resync().await;
            }
            debug!("Change feed closed");
        });

        info!("Watching remote change feed");
        Ok(Subscription::new(move || handle.abort()))
    }

    async fn resync(&self) {
        let Some(remote) = &self.remote else {
            return;
        };
        let orders = match self.bounded(remote.read(OrderFilter::all())).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(error = %e, "Re-fetch after remote change failed");
                return;
            }
        };

        {
            let _guard = self.lock_cache();
            if let Err(e) = self.cache.save_orders(&orders) {
                warn!(error = %e, "Could not cache re-fetched orders");
            }
        }
        debug!(count = orders.len(), "Orders re-synced");
        self.bus.emit(&SyncEvent::OrdersSynced(orders));
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn bounded<R>(
        &self,
        call: impl Future<Output = Result<R, OrderError>>,
    ) -> Result<R, OrderError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Remote call timed out");
                Err(OrderError::Timeout(self.timeout))
            }
        }
    }

    fn cached(&self, filter: &OrderFilter) -> Result<OrdersSnapshot, OrderError> {
        let orders = self
            .cache
            .load_orders()?
            .into_iter()
            .filter(|o| filter.matches(o))
            .collect();
        Ok(OrdersSnapshot {
            orders,
            source: DataSource::LocalCache,
        })
    }

    /// Mirrors records the remote store already accepted into the cache.
    ///
    /// The remote write has happened, so a cache failure is logged rather than returned.
    fn remember(&self, fresh: &[Order]) {
        if fresh.is_empty() {
            return;
        }
        let _guard = self.lock_cache();
        let result = self.cache.load_orders().and_then(|mut cached| {
            for order in fresh {
                upsert(&mut cached, order.clone());
            }
            self.cache.save_orders(&cached)
        });
        if let Err(e) = result {
            warn!(error = %e, "Local cache is behind the remote store");
        }
    }

    fn insert_local(&self, mut order: Order) -> Result<Order, OrderError> {
        let _guard = self.lock_cache();
        let mut cached = self.cache.load_orders()?;
        order.assign_id(OrderId::local());
        order.set_version(1);
        cached.push(order.clone());
        self.cache.save_orders(&cached)?;
        Ok(order)
    }

    fn write_local(&self, mut order: Order, expected_version: u64) -> Result<Order, OrderError> {
        let _guard = self.lock_cache();
        let mut cached = self.cache.load_orders()?;
        let slot = cached
            .iter_mut()
            .find(|o| o.id() == order.id())
            .ok_or_else(|| OrderError::NotFound(order.id().clone()))?;

        if slot.version() != expected_version {
            return Err(OrderError::Conflict(order.id().clone()));
        }
        order.set_version(expected_version + 1);
        *slot = order.clone();
        self.cache.save_orders(&cached)?;
        Ok(order)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ()> {
        self.cache_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn upsert(orders: &mut Vec<Order>, order: Order) {
    match orders.iter_mut().find(|o| o.id() == order.id()) {
        Some(slot) => *slot = order,
        None => orders.push(order),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorId, OrderCreate, OrderItem, RestaurantId};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn new_order() -> Order {
        Order::new(
            OrderCreate {
                restaurant_id: RestaurantId::new("r1"),
                customer_ref: ActorId::new("cust"),
                items: vec![OrderItem {
                    id: "1".into(),
                    name: "Paneer Tikka".into(),
                    unit_price: 249,
                    quantity: 1,
                }],
                total: 360,
                customer_address: "4 Lake Rd".into(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_local_insert_assigns_id_and_version() {
        let sync = SyncLayer::local_only(LocalCache::in_memory());
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let _sub = sync.subscribe(EventKind::OrderCreated, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let stored = sync.insert_order(new_order()).await.unwrap();
        assert!(stored.id().is_assigned());
        assert_eq!(stored.version(), 1);
        assert_eq!(created.load(Ordering::SeqCst), 1);

        let fetched = sync.fetch_order(stored.id()).await.unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn test_local_write_checks_version() {
        let sync = SyncLayer::local_only(LocalCache::in_memory());
        let stored = sync.insert_order(new_order()).await.unwrap();

        let confirmed = stored.with_status(OrderStatus::Confirmed, Utc::now());
        let written = sync
            .write_order(confirmed.clone(), 1, OrderStatus::Pending)
            .await
            .unwrap();
        assert_eq!(written.version(), 2);

        let stale = sync.write_order(confirmed, 1, OrderStatus::Pending).await;
        assert!(matches!(stale, Err(OrderError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_local_reads_are_tagged_as_cache() {
        let sync = SyncLayer::local_only(LocalCache::in_memory());
        sync.insert_order(new_order()).await.unwrap();

        let snapshot = sync.orders(OrderFilter::all()).await.unwrap();
        assert_eq!(snapshot.source, DataSource::LocalCache);
        assert_eq!(snapshot.orders.len(), 1);

        let other = OrderFilter::for_customer(&ActorId::new("someone-else"));
        assert!(sync.orders(other).await.unwrap().orders.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let sync = SyncLayer::local_only(LocalCache::in_memory());
        let result = sync.fetch_order(&OrderId::new("missing")).await;
        assert!(matches!(result, Err(OrderError::NotFound(_))));
    }

    #[test]
    fn test_catalog_is_seeded_once() {
        let sync = SyncLayer::local_only(LocalCache::in_memory());
        assert!(sync.seed_catalog(Restaurant::demo_catalog()).unwrap());
        assert!(!sync.seed_catalog(Vec::new()).unwrap());

        let catalog = sync.restaurants().unwrap();
        assert_eq!(catalog, Restaurant::demo_catalog());
        let menu = sync.menu(&RestaurantId::new("2")).unwrap();
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].name, "Classic Burger");
    }

    #[test]
    fn test_update_menu_persists_and_notifies() {
        let sync = SyncLayer::local_only(LocalCache::in_memory());
        sync.seed_catalog(Restaurant::demo_catalog()).unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _sub = sync.subscribe(EventKind::CatalogChanged, move |event| {
            if let SyncEvent::CatalogChanged(catalog) = event {
                counter.store(catalog.len(), Ordering::SeqCst);
            }
        });

        let palace = RestaurantId::new("1");
        let menu = vec![MenuItem::new("9", "Calzone", 279, palace.clone())];
        let updated = sync.update_menu(&palace, menu.clone()).unwrap();
        assert_eq!(updated.menu, menu);
        assert_eq!(sync.menu(&palace).unwrap(), menu);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_update_menu_rejects_unknown_restaurant_and_stray_items() {
        let sync = SyncLayer::local_only(LocalCache::in_memory());
        sync.seed_catalog(Restaurant::demo_catalog()).unwrap();

        let nowhere = RestaurantId::new("404");
        let result = sync.update_menu(&nowhere, Vec::new());
        assert!(matches!(result, Err(OrderError::UnknownRestaurant(_))));

        let burger = MenuItem::new("3", "Classic Burger", 259, RestaurantId::new("2"));
        let result = sync.update_menu(&RestaurantId::new("1"), vec![burger]);
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(sync.restaurants().unwrap(), Restaurant::demo_catalog());
    }

    #[tokio::test]
    async fn test_save_cart_emits_cart_changed() {
        let sync = SyncLayer::local_only(LocalCache::in_memory());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _sub = sync.subscribe(EventKind::CartChanged, move |event| {
            if let SyncEvent::CartChanged(lines) = event {
                counter.store(lines.len() + 1, Ordering::SeqCst);
            }
        });

        sync.save_cart(&[]).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(sync.load_cart().unwrap().is_empty());
    }
}
