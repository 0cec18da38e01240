use std::collections::HashMap;

use sketchmatch_lib::net::{Envelope, Message};
use sketchmatch_lib::ConnectionId;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::game::Outbox;

/// Routes notifications to the outbound queue of each live connection.
///
/// Delivery never waits. A notification for a connection whose queue is full or closed is dropped.
#[derive(Debug, Default)]
pub struct Relay {
    outbound: HashMap<ConnectionId, mpsc::Sender<Message>>,
}

impl Relay {
    pub fn attach(&mut self, connection_id: ConnectionId, sender: mpsc::Sender<Message>) {
        if self.outbound.insert(connection_id, sender).is_some() {
            tracing::warn!(%connection_id, "Replaced outbound channel");
        }
    }

    pub fn detach(&mut self, connection_id: ConnectionId) {
        self.outbound.remove(&connection_id);
    }

    #[cfg(test)]
    pub fn is_attached(&self, connection_id: ConnectionId) -> bool {
        self.outbound.contains_key(&connection_id)
    }

    /// Stamp and send everything in `outbox`. Returns how many notifications were queued.
    pub fn deliver(&self, outbox: Outbox) -> usize {
        let mut delivered = 0;
        for delivery in outbox {
            let Some(sender) = self.outbound.get(&delivery.to) else {
                tracing::warn!(connection_id = %delivery.to, "No outbound channel for connection");
                continue;
            };

            match sender.try_send(Envelope::now(delivery.notification).into()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = %delivery.to, "Outbound queue full, dropping notification");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = %delivery.to, "Outbound queue closed");
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod test {
    use sketchmatch_lib::net::{Message, Notification};
    use tokio::sync::mpsc;

    use super::Relay;
    use crate::game::Delivery;

    #[test]
    fn deliver_routes_by_connection() {
        let mut relay = Relay::default();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        relay.attach(1.into(), tx_a);
        relay.attach(2.into(), tx_b);

        let delivered = relay.deliver(vec![
            Delivery::new(2.into(), Notification::GuessIncorrect),
            Delivery::new(1.into(), Notification::GameStarted),
            Delivery::new(2.into(), Notification::GameStarted),
            Delivery::new(3.into(), Notification::GameStarted),
        ]);
        assert_eq!(delivered, 3);

        let Ok(Message::Notify(envelope)) = rx_a.try_recv() else {
            panic!("Expected a notification");
        };
        assert_eq!(envelope.notification, Notification::GameStarted);
        assert!(rx_a.try_recv().is_err());

        let notifications: Vec<_> = std::iter::from_fn(|| rx_b.try_recv().ok())
            .map(|m| match m {
                Message::Notify(envelope) => envelope.notification,
                m => panic!("Unexpected message {m:?}"),
            })
            .collect();
        assert_eq!(
            notifications,
            vec![Notification::GuessIncorrect, Notification::GameStarted]
        );
    }

    #[test]
    fn full_or_closed_queues_drop() {
        let mut relay = Relay::default();
        let (tx_full, _rx_full) = mpsc::channel(1);
        let (tx_closed, rx_closed) = mpsc::channel(1);
        relay.attach(1.into(), tx_full);
        relay.attach(2.into(), tx_closed);
        drop(rx_closed);

        let delivered = relay.deliver(vec![
            Delivery::new(1.into(), Notification::GameStarted),
            Delivery::new(1.into(), Notification::GuessIncorrect),
            Delivery::new(2.into(), Notification::GameStarted),
        ]);
        assert_eq!(delivered, 1);

        relay.detach(1.into());
        assert!(!relay.is_attached(1.into()));
        assert!(relay.is_attached(2.into()));
    }
}
