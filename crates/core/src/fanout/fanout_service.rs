//! Lightweight broadcast bus that fans ticket events out to subscribers.

use dashmap::DashMap;
use tokio::sync::broadcast;

use super::fanout_model::{TicketEvent, Topic};
use crate::constants::EVENT_BUS_CAPACITY;

/// Per-topic broadcast channels over the real-time viewer rooms.
///
/// `publish` is non-blocking and safe to call inside a ledger critical
/// section, which is what gives subscribers FIFO order per topic matching
/// commit order. Lagging receivers lose oldest events rather than
/// blocking producers.
pub struct EventBus {
    capacity: usize,
    channels: DashMap<Topic, broadcast::Sender<TicketEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: DashMap::new(),
        }
    }

    /// Subscribes to one topic, creating its channel on first use.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<TicketEvent> {
        self.channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publishes the event to its queue and institution topics.
    ///
    /// Topics nobody subscribed to are skipped; send errors (no live
    /// receivers) are ignored.
    pub fn publish(&self, event: &TicketEvent) {
        for topic in event.topics() {
            if let Some(sender) = self.channels.get(&topic) {
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Number of live subscribers on a topic.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.channels
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::{Ticket, TicketStatus};
    use chrono::Utc;

    fn ticket(number: u32) -> Ticket {
        Ticket {
            id: format!("t{number}"),
            queue_id: "q1".to_string(),
            ticket_number: number,
            qr_code: format!("qr{number}"),
            status: TicketStatus::Pending,
            priority: 0,
            counter: None,
            user_id: Some("u1".to_string()),
            is_physical: false,
            trade_available: false,
            issued_at: Utc::now(),
            expires_at: None,
            attended_at: None,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_publish_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe(Topic::Queue("q1".to_string()));

        for n in 1..=3 {
            bus.publish(&TicketEvent::issued("i1", &ticket(n)));
        }

        for expected in 1..=3u32 {
            match rx.recv().await.unwrap() {
                TicketEvent::Issued { ticket_number, .. } => assert_eq!(ticket_number, expected),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_event_reaches_queue_and_institution_topics() {
        let bus = EventBus::default();
        let mut queue_rx = bus.subscribe(Topic::Queue("q1".to_string()));
        let mut inst_rx = bus.subscribe(Topic::Institution("i1".to_string()));

        bus.publish(&TicketEvent::issued("i1", &ticket(1)));

        assert!(matches!(
            queue_rx.recv().await.unwrap(),
            TicketEvent::Issued { .. }
        ));
        assert!(matches!(
            inst_rx.recv().await.unwrap(),
            TicketEvent::Issued { .. }
        ));
    }

    #[test]
    fn test_publish_without_subscribers_is_a_noop() {
        let bus = EventBus::default();
        bus.publish(&TicketEvent::issued("i1", &ticket(1)));
        assert_eq!(bus.subscriber_count(&Topic::Queue("q1".to_string())), 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = TicketEvent::issued("i1", &ticket(7));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "issued");
        assert_eq!(json["ticket_number"], 7);
    }
}
