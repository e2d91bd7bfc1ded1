//! Live-subscriber registries for the realtime channels.
//!
//! Each channel (chat, documents) owns one [`Registry`]: connections join
//! when their websocket upgrades, leave on close or transport error, and
//! everything in between is an explicit `broadcast` / `send_to` against the
//! current membership. There is no ambient global connection set.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

pub type ConnId = u64;

#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<Connections>>,
}

#[derive(Default)]
struct Connections {
    next_id: ConnId,
    senders: HashMap<ConnId, mpsc::UnboundedSender<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, handing back its id and the receiving end of
    /// its outbound frame queue.
    pub fn join(&self) -> (ConnId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut conns = self.inner.lock().unwrap();
        let id = conns.next_id;
        conns.next_id += 1;
        conns.senders.insert(id, tx);
        (id, rx)
    }

    pub fn leave(&self, id: ConnId) -> bool {
        self.inner.lock().unwrap().senders.remove(&id).is_some()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().senders.len()
    }

    /// Fan a frame out to every live connection. Connections whose queue is
    /// gone (task already finished) are dropped from the set.
    pub fn broadcast(&self, frame: &str) {
        let mut conns = self.inner.lock().unwrap();
        conns.senders.retain(|_, tx| tx.send(frame.to_owned()).is_ok());
    }

    /// Fan a frame out to everyone except the originating connection.
    pub fn broadcast_except(&self, origin: ConnId, frame: &str) {
        let mut conns = self.inner.lock().unwrap();
        conns
            .senders
            .retain(|&id, tx| id == origin || tx.send(frame.to_owned()).is_ok());
    }

    /// Point-to-point delivery. Returns false if the connection is gone.
    pub fn send_to(&self, id: ConnId, frame: String) -> bool {
        let conns = self.inner.lock().unwrap();
        match conns.senders.get(&id) {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }
}

/// Chat channel registry, a distinct state type so handlers can extract it
/// alongside [`DocChannel`] via `FromRef`.
#[derive(Clone, Default)]
pub struct ChatChannel(pub Registry);

/// Document channel registry.
#[derive(Clone, Default)]
pub struct DocChannel(pub Registry);

impl Deref for ChatChannel {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        &self.0
    }
}

impl Deref for DocChannel {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_every_member() {
        let registry = Registry::new();
        let (_a, mut rx_a) = registry.join();
        let (_b, mut rx_b) = registry.join();

        registry.broadcast("hola");

        assert_eq!(rx_a.try_recv().unwrap(), "hola");
        assert_eq!(rx_b.try_recv().unwrap(), "hola");
    }

    #[test]
    fn broadcast_except_skips_the_originator() {
        let registry = Registry::new();
        let (a, mut rx_a) = registry.join();
        let (_b, mut rx_b) = registry.join();

        registry.broadcast_except(a, "edit");

        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "edit");
        // the originator stays registered for later frames
        registry.broadcast("next");
        assert_eq!(rx_a.try_recv().unwrap(), "next");
    }

    #[test]
    fn send_to_is_point_to_point() {
        let registry = Registry::new();
        let (a, mut rx_a) = registry.join();
        let (_b, mut rx_b) = registry.join();

        assert!(registry.send_to(a, "snapshot".to_owned()));
        assert_eq!(rx_a.try_recv().unwrap(), "snapshot");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn leave_removes_the_connection() {
        let registry = Registry::new();
        let (a, _rx_a) = registry.join();
        assert_eq!(registry.count(), 1);
        assert!(registry.leave(a));
        assert!(!registry.leave(a));
        assert_eq!(registry.count(), 0);
        assert!(!registry.send_to(a, "gone".to_owned()));
    }

    #[test]
    fn dead_connections_are_pruned_on_broadcast() {
        let registry = Registry::new();
        let (_a, rx_a) = registry.join();
        let (_b, mut rx_b) = registry.join();
        drop(rx_a);

        registry.broadcast("ping");
        assert_eq!(registry.count(), 1);
        assert_eq!(rx_b.try_recv().unwrap(), "ping");
    }
}
