use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable};
use futures::{FutureExt, StreamExt};
use payloads::{
    DataStore, Filter, MessageId, Query, RoomId, TableExt, UserId,
    requests::NewMessage, responses::ChatMessage,
};

use super::{AuthorSummary, ViewModel, lookup_author, lookup_profiles};
use crate::messaging::{ChatEvent, MessageBus, room_topic};
use crate::{
    AppContext, ClientError, MutationKind, OptimisticMutation, QueryRun,
    Record, RetryableQuery,
};

/// Messages loaded when a room is opened.
const ROOM_HISTORY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessageView {
    pub message: ChatMessage,
    pub sender: AuthorSummary,
}

impl Deref for ChatMessageView {
    type Target = ChatMessage;

    fn deref(&self) -> &ChatMessage {
        &self.message
    }
}

impl Record for ChatMessageView {
    type Id = MessageId;

    fn id(&self) -> MessageId {
        self.message.id
    }
}

/// One chat room, newest message first. Writes are announced on the bus so
/// other open views of the room can follow along through [`listen`].
///
/// [`listen`]: ChatViewModel::listen
pub struct ChatViewModel<S, B> {
    context: AppContext<S>,
    bus: Rc<B>,
    room_id: RoomId,
    messages: OptimisticMutation<Vec<ChatMessageView>>,
    listening: RefCell<Option<AbortHandle>>,
}

impl<S: DataStore + 'static, B: MessageBus> ChatViewModel<S, B> {
    pub fn new(context: AppContext<S>, bus: Rc<B>, room_id: RoomId) -> Self {
        let store = context.store().clone();
        let query = RetryableQuery::new(context.options, move || {
            let store = store.clone();
            async move { load_messages(&*store, room_id).await }
        });
        Self {
            messages: OptimisticMutation::new(query, context.toasts.clone()),
            context,
            bus,
            room_id,
            listening: RefCell::new(None),
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub async fn send_message(
        &self,
        content: impl Into<String>,
    ) -> Result<ChatMessageView, ClientError> {
        let draft = NewMessage {
            room_id: self.room_id,
            content: content.into(),
        };
        let user = self.messages.authorize(
            "send message",
            &self.context.session,
            draft.validate(),
        )?;
        let store = self.context.store();
        let sent = self
            .messages
            .create("send message", async {
                let message: ChatMessage =
                    store.create(&draft.insert(user.id)).await?;
                let sender = lookup_author(&**store, user.id).await;
                Ok::<_, ClientError>(ChatMessageView { message, sender })
            })
            .await?;
        self.bus.publish(
            &room_topic(self.room_id),
            ChatEvent::MessagePosted(sent.message.clone()),
        );
        Ok(sent)
    }

    pub async fn delete_message(
        &self,
        message_id: MessageId,
    ) -> Result<(), ClientError> {
        self.messages
            .authorize("delete message", &self.context.session, Ok(()))?;
        let store = self.context.store();
        self.messages
            .delete("delete message", message_id, async {
                store
                    .remove::<ChatMessage>(&Filter::new().eq("id", message_id))
                    .await
                    .map_err(ClientError::from)
            })
            .await?;
        self.bus.publish(
            &room_topic(self.room_id),
            ChatEvent::MessageDeleted(message_id),
        );
        Ok(())
    }

    /// Follow the room's bus topic until disposed or listened to again.
    ///
    /// The subscription is taken before this returns, so no event published
    /// after the call is missed even if the future is spawned later.
    pub fn listen(&self) -> QueryRun {
        let mut events = self.bus.subscribe(&room_topic(self.room_id));
        let messages = self.messages.clone();
        let store = self.context.store().clone();
        let (handle, registration) = AbortHandle::new_pair();
        if let Some(previous) = self.listening.borrow_mut().replace(handle) {
            previous.abort();
        }

        let room_id = self.room_id;
        let follow = async move {
            while let Some(event) = events.next().await {
                match event {
                    ChatEvent::MessagePosted(message) => {
                        tracing::trace!(%room_id, id = %message.id, "message posted");
                        let sender =
                            match known_sender(&messages, message.sender_id) {
                                Some(sender) => sender,
                                None => {
                                    lookup_author(&*store, message.sender_id)
                                        .await
                                }
                            };
                        messages.receive(ChatMessageView { message, sender });
                    }
                    ChatEvent::MessageDeleted(id) => {
                        tracing::trace!(%room_id, %id, "message deleted");
                        messages.forget(id);
                    }
                }
            }
        };
        Abortable::new(follow, registration).map(|_| ()).boxed_local()
    }
}

impl<S, B> ViewModel for ChatViewModel<S, B> {
    type Data = Vec<ChatMessageView>;

    fn query(&self) -> &RetryableQuery<Vec<ChatMessageView>> {
        self.messages.query()
    }

    fn is_pending(&self, kind: MutationKind) -> bool {
        self.messages.is_pending(kind)
    }

    fn dispose(&self) {
        if let Some(listening) = self.listening.borrow_mut().take() {
            listening.abort();
        }
        self.messages.query().dispose();
    }
}

/// Reuse a sender summary already on screen.
fn known_sender(
    messages: &OptimisticMutation<Vec<ChatMessageView>>,
    sender_id: UserId,
) -> Option<AuthorSummary> {
    messages.query().with_state(|state| {
        state
            .data
            .iter()
            .flatten()
            .find(|view| view.message.sender_id == sender_id)
            .map(|view| view.sender.clone())
    })
}

async fn load_messages<S: DataStore>(
    store: &S,
    room_id: RoomId,
) -> Result<Vec<ChatMessageView>, ClientError> {
    let messages: Vec<ChatMessage> = store
        .fetch(
            &Query::new()
                .eq("room_id", room_id)
                .order_desc("created_at")
                .limit(ROOM_HISTORY),
        )
        .await?;
    let profiles = lookup_profiles(
        store,
        messages.iter().map(|message| message.sender_id),
    )
    .await?;
    Ok(messages
        .into_iter()
        .map(|message| ChatMessageView {
            sender: AuthorSummary::resolve(message.sender_id, &profiles),
            message,
        })
        .collect())
}
