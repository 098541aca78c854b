use crate::auth::AuthProvider;
use crate::cart::{Cart, CartSnapshot};
use crate::config::Config;
use crate::engine::LifecycleEngine;
use crate::error::OrderError;
use crate::model::{
    Actor, Customization, MenuItem, Order, OrderId, Restaurant, RestaurantId, Role,
};
use crate::sync::{
    EventKind, FileBackend, LocalCache, RemoteStore, Subscription, SyncEvent, SyncLayer,
};
use crate::views::{self, Dashboard, Sourced};
use std::sync::Arc;
use store_actor::StoreActor;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// The runtime orchestrator: one per signed-in device session.
///
/// Every operation resolves the current actor through the [`AuthProvider`] and is rejected
/// with `Forbidden` when nobody is signed in or the role does not fit.
///
/// # Example
///
/// ```ignore
/// let auth = Arc::new(SessionAuth::signed_in(Actor::customer("ann")));
/// let system = OrderSystem::start(&Config::from_env(), auth).await?;
///
/// system.add_to_cart(&item, 2, None).await?;
/// let order = system.place_order("12 Main St").await?;
///
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    auth: Arc<dyn AuthProvider>,
    sync: Arc<SyncLayer>,
    engine: LifecycleEngine,
    cart: Mutex<Cart>,
    subscriptions: Vec<Subscription>,
    /// Store actor task, absent in local-only mode or with an injected remote.
    store_handle: Option<JoinHandle<()>>,
}

impl OrderSystem {
    /// Builds the whole system from `config` and starts the remote watch.
    pub async fn start(config: &Config, auth: Arc<dyn AuthProvider>) -> Result<Self, OrderError> {
        let cache = match &config.cache_dir {
            Some(dir) => LocalCache::new(FileBackend::open(dir)?),
            None => LocalCache::in_memory(),
        };

        if config.local_only {
            info!("Starting in local-only mode");
            let sync = Arc::new(SyncLayer::local_only(cache));
            return Self::assemble(sync, auth, None).await;
        }

        let (store_actor, store_client) = StoreActor::<Order>::new(config.store_buffer);
        let store_handle = tokio::spawn(store_actor.run());
        let remote: Arc<dyn RemoteStore> = Arc::new(store_client);
        let sync = Arc::new(SyncLayer::new(Some(remote), cache, config.remote_timeout));
        Self::assemble(sync, auth, Some(store_handle)).await
    }

    /// Builds the system around an existing sync layer, e.g. one backed by a test double.
    pub async fn with_sync(
        sync: Arc<SyncLayer>,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Self, OrderError> {
        Self::assemble(sync, auth, None).await
    }

    async fn assemble(
        sync: Arc<SyncLayer>,
        auth: Arc<dyn AuthProvider>,
        store_handle: Option<JoinHandle<()>>,
    ) -> Result<Self, OrderError> {
        sync.seed_catalog(Restaurant::demo_catalog())?;
        let cart = Cart::load(sync.clone())?;
        let engine = LifecycleEngine::new(sync.clone());
        let watch = sync.watch_remote().await?;
        let session = auth.on_actor_changed(Box::new(|actor: Option<&Actor>| match actor {
            Some(actor) => info!(actor = %actor.id, role = %actor.role, "Active actor changed"),
            None => info!("Active actor signed out"),
        }));

        info!(local_only = sync.is_local_only(), "Order system started");
        Ok(Self {
            auth,
            sync,
            engine,
            cart: Mutex::new(cart),
            subscriptions: vec![watch, session],
            store_handle,
        })
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub fn sync(&self) -> &Arc<SyncLayer> {
        &self.sync
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&SyncEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.sync.subscribe(kind, callback)
    }

    /// The signed-in actor, or `Forbidden`.
    pub fn current_actor(&self) -> Result<Actor, OrderError> {
        self.auth
            .current_actor()
            .ok_or_else(|| OrderError::Forbidden("nobody is signed in".to_string()))
    }

    fn require(&self, role: Role) -> Result<Actor, OrderError> {
        let actor = self.current_actor()?;
        if actor.role != role {
            warn!(actor = %actor.id, role = %actor.role, required = %role, "Role rejected");
            return Err(OrderError::Forbidden(format!(
                "{} accounts cannot do this",
                actor.role
            )));
        }
        Ok(actor)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub fn restaurants(&self) -> Result<Vec<Restaurant>, OrderError> {
        self.current_actor()?;
        self.sync.restaurants()
    }

    pub fn menu(&self, restaurant: &RestaurantId) -> Result<Vec<MenuItem>, OrderError> {
        self.current_actor()?;
        self.sync.menu(restaurant)
    }

    /// Replaces the signed-in restaurant's own menu.
    pub fn update_menu(&self, menu: Vec<MenuItem>) -> Result<Restaurant, OrderError> {
        let actor = self.require(Role::Restaurant)?;
        self.sync.update_menu(own_restaurant(&actor)?, menu)
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Adds `item` as currently offered on its restaurant's menu.
    pub async fn add_to_cart(
        &self,
        item: &MenuItem,
        quantity: u32,
        customization: Option<Customization>,
    ) -> Result<CartSnapshot, OrderError> {
        self.require(Role::Customer)?;
        let offered = self.sync.restaurant(&item.restaurant_id)?;
        if offered.menu_item(&item.id) != Some(item) {
            return Err(OrderError::Validation(format!(
                "{} is no longer on the menu at this price",
                item.name
            )));
        }
        let mut cart = self.cart.lock().await;
        cart.add_line(item, quantity, customization)?;
        Ok(cart.snapshot())
    }

    pub async fn cart(&self) -> CartSnapshot {
        self.cart.lock().await.snapshot()
    }

    #[instrument(skip(self))]
    pub async fn place_order(&self, address: &str) -> Result<Order, OrderError> {
        let actor = self.require(Role::Customer)?;
        let mut cart = self.cart.lock().await;
        cart.checkout(&self.engine, address, &actor.id).await
    }

    // =========================================================================
    // Restaurant
    // =========================================================================

    pub async fn advance(&self, id: &OrderId) -> Result<Order, OrderError> {
        let actor = self.current_actor()?;
        match actor.role {
            Role::Restaurant => {
                let restaurant = own_restaurant(&actor)?;
                self.engine.advance_for_restaurant(id, restaurant).await
            }
            role => self.engine.advance(id, role).await,
        }
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    pub async fn claim(&self, id: &OrderId) -> Result<Order, OrderError> {
        let agent = self.require(Role::Delivery)?;
        self.engine.claim_for_delivery(id, &agent.id).await
    }

    pub async fn complete(&self, id: &OrderId) -> Result<Order, OrderError> {
        let agent = self.require(Role::Delivery)?;
        self.engine.complete_delivery(id, &agent.id).await
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// The view that fits the signed-in actor's role.
    pub async fn dashboard(&self) -> Result<Sourced<Dashboard>, OrderError> {
        let actor = self.current_actor()?;
        match actor.role {
            Role::Customer => {
                let loaded = views::load_customer_view(&self.sync, &actor.id).await?;
                Ok(Sourced {
                    view: Dashboard::Customer(loaded.view),
                    source: loaded.source,
                })
            }
            Role::Restaurant => {
                let restaurant = own_restaurant(&actor)?;
                let loaded = views::load_restaurant_view(&self.sync, restaurant).await?;
                Ok(Sourced {
                    view: Dashboard::Restaurant(loaded.view),
                    source: loaded.source,
                })
            }
            Role::Delivery => {
                let loaded = views::load_delivery_view(&self.sync, &actor.id).await?;
                Ok(Sourced {
                    view: Dashboard::Delivery(loaded.view),
                    source: loaded.source,
                })
            }
        }
    }

    /// Gracefully shuts down the system.
    ///
    /// Cancels the remote watch and every other subscription, drops the handles that keep
    /// the store channel open, then waits for the store actor to finish.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down order system...");

        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
        drop(self.cart);
        drop(self.engine);
        drop(self.sync);

        if let Some(handle) = self.store_handle {
            if let Err(e) = handle.await {
                error!("Store actor task failed: {:?}", e);
                return Err(format!("Store actor task failed: {:?}", e));
            }
        }

        info!("Order system shutdown complete.");
        Ok(())
    }
}

/// The restaurant a restaurant account works for. An account without one may not act.
fn own_restaurant(actor: &Actor) -> Result<&RestaurantId, OrderError> {
    actor.restaurant_id.as_ref().ok_or_else(|| {
        warn!(actor = %actor.id, "Restaurant account has no restaurant");
        OrderError::Forbidden("restaurant account has no restaurant".to_string())
    })
}
