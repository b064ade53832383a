use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::dto::player::PlayerState;

/// Domain events pushed onto the bus, one per reconciled inbound message.
///
/// Each variant carries only what subscribers need; the full roster lives in
/// the player registry and can be snapshotted on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Another player joined the room.
    PlayerJoined(PlayerState),
    /// A player left or dropped; their board is retained but stale.
    PlayerLeft {
        /// Identifier of the departed player.
        player_id: String,
        /// Display name of the departed player.
        player_name: String,
    },
    /// A player's state changed (marks, bingo, liveness). Also how the local
    /// player's own marks are reflected back.
    PlayerUpdated(PlayerState),
    /// Somebody won.
    Bingo {
        /// Identifier of the winner.
        player_id: String,
        /// Display name of the winner.
        player_name: String,
    },
    /// Recognized speech, either relayed by the server or ingested locally.
    Transcript {
        /// The recognized text.
        text: String,
    },
    /// The roster was replaced wholesale; re-render from a fresh snapshot.
    RosterSynced {
        /// Number of other players after the sync.
        count: usize,
    },
    /// The room was expired or reset server-side.
    RoomClosed {
        /// Human-readable reason from the server.
        reason: String,
    },
    /// The server reported a failure on this connection.
    Error {
        /// Human-readable description.
        message: String,
    },
}

/// Ordered, multi-subscriber, in-process event channel.
///
/// A thin wrapper over a Tokio broadcast channel. Delivery order matches
/// publish order, publishing never blocks, and a subscriber that falls a
/// full ring behind observes a `Lagged` gap and resumes from the newest
/// events: latest-value-wins for roster snapshots, while discrete events
/// (bingo, transcript) are only lost past a full ring of lag. Slow or absent
/// subscribers never stall decoding.
pub struct EventHub {
    sender: broadcast::Sender<GameEvent>,
}

impl EventHub {
    /// Construct a hub with the given ring capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    /// Stream-flavored subscription for `while let Some(..)` consumers.
    pub fn stream(&self) -> BroadcastStream<GameEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Publish an event to all current subscribers, ignoring delivery errors;
    /// an event with no listeners is simply dropped.
    pub fn publish(&self, event: GameEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivery_preserves_publish_order() {
        let hub = EventHub::new(8);
        let mut receiver = hub.subscribe();

        hub.publish(GameEvent::RosterSynced { count: 0 });
        hub.publish(GameEvent::Transcript {
            text: "synergy".into(),
        });
        hub.publish(GameEvent::Bingo {
            player_id: "p2".into(),
            player_name: "Bob".into(),
        });

        assert_eq!(
            receiver.recv().await.unwrap(),
            GameEvent::RosterSynced { count: 0 }
        );
        assert!(matches!(
            receiver.recv().await.unwrap(),
            GameEvent::Transcript { .. }
        ));
        assert!(matches!(receiver.recv().await.unwrap(), GameEvent::Bingo { .. }));
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let hub = EventHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.publish(GameEvent::RosterSynced { count: 3 });

        assert_eq!(
            first.recv().await.unwrap(),
            GameEvent::RosterSynced { count: 3 }
        );
        assert_eq!(
            second.recv().await.unwrap(),
            GameEvent::RosterSynced { count: 3 }
        );
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let hub = EventHub::new(8);
        hub.publish(GameEvent::RosterSynced { count: 0 });
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_to_newest() {
        let hub = EventHub::new(2);
        let mut receiver = hub.subscribe();

        for count in 0..5 {
            hub.publish(GameEvent::RosterSynced { count });
        }

        // The ring kept only the newest two; the receiver observes the gap.
        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert_eq!(
            receiver.recv().await.unwrap(),
            GameEvent::RosterSynced { count: 3 }
        );
        assert_eq!(
            receiver.recv().await.unwrap(),
            GameEvent::RosterSynced { count: 4 }
        );
    }
}
