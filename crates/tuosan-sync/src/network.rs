//! Simulated best-effort broadcast bus between clients.
//!
//! Every client sees every message except its own. Delivery is not
//! guaranteed: a receiver that falls behind the channel capacity loses
//! messages, and an optional loss rate drops messages at random. A gap is
//! surfaced as a payload-less lobby update so the receiver reloads from the
//! shared store.

use crate::protocol::{ClientId, NetworkMessage};
use rand::prelude::*;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

/// The shared bus; cheap to clone
#[derive(Debug, Clone)]
pub struct Network {
    sender: broadcast::Sender<NetworkMessage>,
    loss_rate: f64,
}

impl Network {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            loss_rate: 0.0,
        }
    }

    /// Drop each delivery with the given probability
    pub fn with_loss_rate(mut self, loss_rate: f64) -> Self {
        self.loss_rate = loss_rate.clamp(0.0, 1.0);
        self
    }

    /// Attach a client to the bus
    pub fn connect(&self, client_id: ClientId) -> (Publisher, Subscriber) {
        let publisher = Publisher {
            client_id,
            sender: self.sender.clone(),
        };
        let subscriber = Subscriber {
            client_id,
            receiver: self.sender.subscribe(),
            loss_rate: self.loss_rate,
            rng: StdRng::from_entropy(),
        };
        (publisher, subscriber)
    }

    /// Number of attached subscribers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Sending half of a client's connection
#[derive(Debug, Clone)]
pub struct Publisher {
    client_id: ClientId,
    sender: broadcast::Sender<NetworkMessage>,
}

impl Publisher {
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Fire and forget
    pub fn broadcast(&self, msg: NetworkMessage) {
        if self.sender.send(msg).is_err() {
            debug!("No receivers for broadcast from {}", self.client_id);
        }
    }
}

/// Receiving half of a client's connection
pub struct Subscriber {
    client_id: ClientId,
    receiver: broadcast::Receiver<NetworkMessage>,
    loss_rate: f64,
    rng: StdRng,
}

impl Subscriber {
    /// Next message from another client, or `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<NetworkMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if msg.sender_id == self.client_id => continue,
                Ok(msg) => {
                    if self.loss_rate > 0.0 && self.rng.gen_bool(self.loss_rate) {
                        debug!("Dropped {:?} for {}", msg.kind, self.client_id);
                        continue;
                    }
                    return Some(msg);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Client {} missed {} messages", self.client_id, skipped);
                    return Some(NetworkMessage::lobby_refresh(Uuid::nil()));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_own_messages_are_not_echoed() {
        let network = Network::new(16);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (pub_a, mut sub_a) = network.connect(a);
        let (pub_b, mut sub_b) = network.connect(b);

        pub_a.broadcast(NetworkMessage::lobby_refresh(a));
        pub_b.broadcast(NetworkMessage::lobby_refresh(b));

        assert_eq!(sub_a.recv().await.map(|m| m.sender_id), Some(b));
        assert_eq!(sub_b.recv().await.map(|m| m.sender_id), Some(a));
    }

    #[tokio::test]
    async fn test_lagging_receiver_gets_refresh() {
        let network = Network::new(2);
        let a = Uuid::new_v4();
        let (publisher, _) = network.connect(a);
        let (_, mut slow) = network.connect(Uuid::new_v4());

        for _ in 0..5 {
            publisher.broadcast(NetworkMessage::lobby_update(a, &[]).unwrap());
        }

        let msg = slow.recv().await.unwrap();
        assert_eq!(msg.payload, None);
        assert_eq!(msg.sender_id, Uuid::nil());
    }

    #[tokio::test]
    async fn test_total_loss_drops_everything() {
        let network = Network::new(8).with_loss_rate(1.0);
        let a = Uuid::new_v4();
        let (publisher, _) = network.connect(a);
        let (_, mut sub) = network.connect(Uuid::new_v4());

        publisher.broadcast(NetworkMessage::lobby_refresh(a));
        let got = tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await;
        assert!(got.is_err());
    }
}
