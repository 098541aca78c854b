//! # Auth Collaborator
//!
//! The order system does not manage sessions. It asks an [`AuthProvider`] who is signed in
//! and may listen for changes. [`SessionAuth`] is an in-memory provider for the demo binary
//! and tests; real deployments plug in their own.

use crate::model::Actor;
use crate::sync::Subscription;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

pub type ActorListener = Arc<dyn Fn(Option<&Actor>) + Send + Sync>;

pub trait AuthProvider: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;

    /// Calls `callback` with the new actor (or `None` on sign-out) after every change.
    fn on_actor_changed(
        &self,
        callback: Box<dyn Fn(Option<&Actor>) + Send + Sync>,
    ) -> Subscription;
}

type Listeners = Mutex<Vec<(u64, ActorListener)>>;

/// Explicitly-owned session state. Create one per user session and share it by `Arc`.
#[derive(Default)]
pub struct SessionAuth {
    current: RwLock<Option<Actor>>,
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl SessionAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(actor: Actor) -> Self {
        let auth = Self::new();
        auth.sign_in(actor);
        auth
    }

    pub fn sign_in(&self, actor: Actor) {
        info!(actor = %actor.id, role = %actor.role, "Signed in");
        self.replace(Some(actor));
    }

    pub fn sign_out(&self) {
        info!("Signed out");
        self.replace(None);
    }

    fn replace(&self, actor: Option<Actor>) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = actor.clone();

        let listeners: Vec<ActorListener> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(actor.as_ref());
        }
    }
}

impl AuthProvider for SessionAuth {
    fn current_actor(&self) -> Option<Actor> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn on_actor_changed(
        &self,
        callback: Box<dyn Fn(Option<&Actor>) + Send + Sync>,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, Arc::from(callback)));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                lock(&listeners).retain(|(lid, _)| *lid != id);
            }
        })
    }
}

fn lock(listeners: &Listeners) -> std::sync::MutexGuard<'_, Vec<(u64, ActorListener)>> {
    listeners
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn test_sign_in_and_out_notify_listeners() {
        let auth = SessionAuth::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let sub = auth.on_actor_changed(Box::new(move |actor: Option<&Actor>| {
            log.lock().unwrap().push(actor.map(|a| a.role));
        }));

        auth.sign_in(Actor::delivery("rider-1"));
        assert_eq!(auth.current_actor().map(|a| a.role), Some(Role::Delivery));
        auth.sign_out();
        assert!(auth.current_actor().is_none());

        sub.unsubscribe();
        auth.sign_in(Actor::customer("ann"));

        assert_eq!(*seen.lock().unwrap(), vec![Some(Role::Delivery), None]);
    }
}
