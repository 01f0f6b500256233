use client::{ViewModel, view_models::ChatViewModel};
use payloads::{RoomId, responses::ChatMessage};
use test_helpers::{MockStore, TestApp, spawn_app};

use crate::until;

fn room(
    app: &TestApp,
    room_id: RoomId,
) -> ChatViewModel<MockStore, client::InMemoryBus> {
    ChatViewModel::new(app.context(), app.bus.clone(), room_id)
}

fn contents(chat: &ChatViewModel<MockStore, client::InMemoryBus>) -> Vec<String> {
    chat.state()
        .data
        .unwrap_or_default()
        .iter()
        .map(|view| view.content.clone())
        .collect()
}

#[tokio::test]
async fn history_is_scoped_to_the_room() {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let (lobby, elsewhere) = (RoomId::new(), RoomId::new());
    for (room_id, content) in
        [(lobby, "hi"), (elsewhere, "wrong room"), (lobby, "anyone?")]
    {
        app.store.seed::<ChatMessage>(&serde_json::json!({
            "room_id": room_id,
            "sender_id": alice.id,
            "content": content,
        }));
    }

    let chat = room(&app, lobby);
    chat.retry().await;

    assert_eq!(contents(&chat), vec!["anyone?", "hi"]);
    let views = chat.state().data.unwrap_or_default();
    assert_eq!(views[0].sender.display_name, "Alice Liddell");
}

#[tokio::test]
async fn sent_messages_reach_other_listeners() -> anyhow::Result<()> {
    let app = spawn_app();
    app.sign_in_as_alice();
    let lobby = RoomId::new();
    let mine = room(&app, lobby);
    let theirs = room(&app, lobby);
    mine.retry().await;
    theirs.retry().await;

    let listening = theirs.listen();
    let conversation = async {
        let sent = mine.send_message("  hello room ").await?;
        assert_eq!(sent.content, "hello room");
        until(|| contents(&theirs) == vec!["hello room"]).await;
        assert_eq!(
            theirs.state().data.unwrap_or_default()[0].sender.display_name,
            "Alice Liddell"
        );

        mine.delete_message(sent.id).await?;
        until(|| contents(&theirs).is_empty()).await;
        theirs.dispose();
        anyhow::Ok(())
    };
    let ((), result) = futures::join!(listening, conversation);
    result?;

    assert_eq!(contents(&mine), Vec::<String>::new());
    assert_eq!(app.store.count("chat_messages"), 0);
    assert!(app.success_toasts().is_empty());
    Ok(())
}

#[tokio::test]
async fn other_rooms_are_not_heard() -> anyhow::Result<()> {
    let app = spawn_app();
    app.sign_in_as_alice();
    let elsewhere = room(&app, RoomId::new());
    let lobby = room(&app, RoomId::new());
    lobby.retry().await;

    let listening = lobby.listen();
    let conversation = async {
        elsewhere.send_message("psst").await?;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        lobby.dispose();
        anyhow::Ok(())
    };
    let ((), result) = futures::join!(listening, conversation);
    result?;

    assert!(contents(&lobby).is_empty());
    Ok(())
}

#[tokio::test]
async fn dispose_drops_the_subscription() {
    let app = spawn_app();
    let lobby = RoomId::new();
    let chat = room(&app, lobby);

    let first = chat.listen();
    let second = chat.listen();
    assert_eq!(
        app.bus.subscriber_count(&client::messaging::room_topic(lobby)),
        2
    );

    // Listening again cancels the earlier listener.
    first.await;
    chat.dispose();
    second.await;

    assert_eq!(
        app.bus.subscriber_count(&client::messaging::room_topic(lobby)),
        0
    );
    assert!(chat.query().is_disposed());
}

#[tokio::test]
async fn signed_out_users_cannot_send() {
    let app = spawn_app();
    let chat = room(&app, RoomId::new());

    let result = chat.send_message("hello").await;

    assert_eq!(result.err(), Some(client::ClientError::AuthRequired));
    assert_eq!(app.store.count("chat_messages"), 0);
    assert_eq!(
        app.error_toasts(),
        vec!["Could not send message: You need to sign in to do that."]
    );
}
