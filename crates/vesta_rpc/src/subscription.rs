//! The new-heads subscription engine.
//!
//! Subscriptions only make sense on a streaming transport; the websocket
//! layer hands each call its connection handle, and a call without one is
//! answered with method-not-found. Connections cannot be compared across
//! transports, so equality is delegated to the handle itself.

#[cfg(test)]
#[path = "subscription_test.rs"]
mod subscription_test;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::block::BlockHeader;

pub type SubscriptionId = u64;

/// The method name notifications are delivered under.
pub const NEW_HEADS_NOTIFICATION_METHOD: &str = "juno_subscribeNewHeads";

/// A client connection capable of receiving server-initiated messages.
pub trait RpcConn: Send + Sync {
    fn write(&self, message: &str) -> Result<(), std::io::Error>;
    fn equals(&self, other: &dyn RpcConn) -> bool;
}

struct NewHeadsSubscription {
    conn: Arc<dyn RpcConn>,
}

type IdGen = Box<dyn Fn() -> SubscriptionId + Send + Sync>;

/// All active subscriptions, keyed by id. Mutations are rare and short, one
/// lock is enough.
pub struct SubscriptionRegistry {
    subscriptions: Mutex<HashMap<SubscriptionId, NewHeadsSubscription>>,
    id_gen: Mutex<IdGen>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        let counter = AtomicU64::new(1);
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            id_gen: Mutex::new(Box::new(move || counter.fetch_add(1, Ordering::Relaxed))),
        }
    }

    /// Replaces the subscription id generator. Test hook.
    pub fn set_id_gen(&self, id_gen: IdGen) {
        *self.id_gen.lock().expect("subscription id gen poisoned") = id_gen;
    }

    pub fn subscribe(&self, conn: Arc<dyn RpcConn>) -> SubscriptionId {
        let id = (self.id_gen.lock().expect("subscription id gen poisoned"))();
        self.subscriptions
            .lock()
            .expect("subscription registry poisoned")
            .insert(id, NewHeadsSubscription { conn });
        id
    }

    /// Removes a subscription, but only for the connection that created it.
    pub fn unsubscribe(&self, conn: &dyn RpcConn, id: SubscriptionId) -> bool {
        let mut subscriptions =
            self.subscriptions.lock().expect("subscription registry poisoned");
        match subscriptions.get(&id) {
            Some(subscription) if subscription.conn.equals(conn) => {
                subscriptions.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Drops every subscription bound to a closed connection.
    pub fn drop_conn(&self, conn: &dyn RpcConn) {
        self.subscriptions
            .lock()
            .expect("subscription registry poisoned")
            .retain(|_, subscription| !subscription.conn.equals(conn));
    }

    /// Pushes a new head to every subscriber. A failed write means the
    /// connection is gone and its subscription with it.
    pub fn notify_new_head(&self, header: &BlockHeader) {
        let mut subscriptions =
            self.subscriptions.lock().expect("subscription registry poisoned");
        subscriptions.retain(|id, subscription| {
            let notification = json!({
                "jsonrpc": "2.0",
                "method": NEW_HEADS_NOTIFICATION_METHOD,
                "params": {
                    "result": header,
                    "subscription": id,
                },
            });
            subscription.conn.write(&notification.to_string()).is_ok()
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscriptions.lock().expect("subscription registry poisoned").len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
