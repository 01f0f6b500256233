//! Publish/subscribe for live chat updates.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::Stream;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use payloads::{MessageId, RoomId, responses::ChatMessage};

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    MessagePosted(ChatMessage),
    MessageDeleted(MessageId),
}

pub fn room_topic(room_id: RoomId) -> String {
    format!("room:{room_id}")
}

/// A topic-based event channel. Delivery is best effort; subscribers only see
/// events published after they subscribed.
pub trait MessageBus {
    fn subscribe(&self, topic: &str) -> Subscription;

    fn publish(&self, topic: &str, event: ChatEvent);
}

type Senders = Rc<RefCell<HashMap<String, Vec<(u64, UnboundedSender<ChatEvent>)>>>>;

/// Stream of events for one topic. Dropping it unsubscribes.
pub struct Subscription {
    topic: String,
    id: u64,
    receiver: UnboundedReceiver<ChatEvent>,
    senders: Senders,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn unsubscribe(self) {}
}

impl Stream for Subscription {
    type Item = ChatEvent;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<ChatEvent>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut senders = self.senders.borrow_mut();
        if let Some(list) = senders.get_mut(&self.topic) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                senders.remove(&self.topic);
            }
        }
    }
}

/// Process-local bus.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    senders: Senders,
    next_id: Rc<Cell<u64>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.senders.borrow().get(topic).map_or(0, Vec::len)
    }
}

impl MessageBus for InMemoryBus {
    fn subscribe(&self, topic: &str) -> Subscription {
        let (sender, receiver) = unbounded();
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.senders
            .borrow_mut()
            .entry(topic.to_string())
            .or_default()
            .push((id, sender));
        Subscription {
            topic: topic.to_string(),
            id,
            receiver,
            senders: self.senders.clone(),
        }
    }

    fn publish(&self, topic: &str, event: ChatEvent) {
        let mut senders = self.senders.borrow_mut();
        let Some(list) = senders.get_mut(topic) else {
            tracing::trace!(topic, "no subscribers");
            return;
        };
        list.retain(|(_, sender)| sender.unbounded_send(event.clone()).is_ok());
    }
}
