//! In-process realtime event bus.
//!
//! Mutations publish [`StoreEvent`]s; the SSE endpoints subscribe and filter
//! them per viewer. Delivery is best-effort: a subscriber that falls more
//! than the channel capacity behind skips ahead.

use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use pixstore_core::{OrderId, OrderStatus, ProductId, TicketId, TicketStatus, UserId};

use crate::models::{CurrentUser, Message, StoreSettings};

/// Buffered events per subscriber.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something changed that open sessions may want to see.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    OrderChanged {
        order_id: OrderId,
        user_id: UserId,
        status: OrderStatus,
    },
    SupportMessage {
        /// Owner of the ticket, not necessarily the sender.
        user_id: UserId,
        message: Message,
    },
    TicketChanged {
        ticket_id: TicketId,
        user_id: UserId,
        /// `None` when the ticket was deleted.
        status: Option<TicketStatus>,
    },
    SettingsChanged {
        settings: StoreSettings,
    },
    StockChanged {
        product_id: ProductId,
        available: i64,
    },
}

impl StoreEvent {
    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OrderChanged { .. } => "order_changed",
            Self::SupportMessage { .. } => "support_message",
            Self::TicketChanged { .. } => "ticket_changed",
            Self::SettingsChanged { .. } => "settings_changed",
            Self::StockChanged { .. } => "stock_changed",
        }
    }

    /// The customer this event concerns, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<UserId> {
        match self {
            Self::OrderChanged { user_id, .. }
            | Self::SupportMessage { user_id, .. }
            | Self::TicketChanged { user_id, .. } => Some(*user_id),
            Self::SettingsChanged { .. } | Self::StockChanged { .. } => None,
        }
    }

    /// Whether `viewer` may receive this event. Admins see everything,
    /// customers see their own events and store-wide ones.
    #[must_use]
    pub fn visible_to(&self, viewer: &CurrentUser) -> bool {
        viewer.is_admin() || self.owner().is_none_or(|owner| owner == viewer.id)
    }
}

/// Broadcast bus for [`StoreEvent`]s. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: StoreEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(event = name, receivers, "event published"),
            Err(_) => tracing::trace!(event = name, "event dropped, no subscribers"),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Events visible to `viewer`, until the bus is dropped.
    pub fn stream_for(&self, viewer: CurrentUser) -> impl Stream<Item = StoreEvent> + use<> {
        let mut receiver = self.subscribe();
        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if event.visible_to(&viewer) {
                            yield event;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(user_id = %viewer.id, skipped, "event subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;
    use pixstore_core::{Email, UserRole};

    use super::*;

    fn viewer(id: i32, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse(&format!("user{id}@example.com")).unwrap(),
            role,
        }
    }

    fn order_event(user: i32) -> StoreEvent {
        StoreEvent::OrderChanged {
            order_id: OrderId::new(10),
            user_id: UserId::new(user),
            status: OrderStatus::Delivered,
        }
    }

    #[test]
    fn test_customer_sees_only_own_events() {
        let alice = viewer(1, UserRole::Customer);
        assert!(order_event(1).visible_to(&alice));
        assert!(!order_event(2).visible_to(&alice));
    }

    #[test]
    fn test_store_wide_events_visible_to_everyone() {
        let alice = viewer(1, UserRole::Customer);
        let event = StoreEvent::StockChanged {
            product_id: ProductId::new(3),
            available: 4,
        };
        assert!(event.visible_to(&alice));
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = viewer(99, UserRole::Admin);
        assert!(order_event(1).visible_to(&admin));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(order_event(1)).unwrap();
        assert_eq!(json["type"], "order_changed");
        assert_eq!(json["status"], "delivered");
    }

    #[tokio::test]
    async fn test_stream_filters_per_viewer() {
        let bus = EventBus::default();
        let stream = bus.stream_for(viewer(1, UserRole::Customer));
        let mut stream = std::pin::pin!(stream);

        bus.publish(order_event(2));
        bus.publish(order_event(1));

        let received = stream.next().await.unwrap();
        assert_eq!(received.owner(), Some(UserId::new(1)));
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        EventBus::new(4).publish(order_event(1));
    }
}
