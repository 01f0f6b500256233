use client::{
    ClientError, MutationKind, MutationPhase, OptimisticMutation, QueryOptions,
    Record, RetryableQuery, Toasts, Toggle,
};
use futures::channel::oneshot;
use payloads::{StoreError, requests::ValidationError};
use test_helpers::{ScriptedProducer, network_error};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: &'static str,
    liked: bool,
    likes: i64,
}

impl Record for Item {
    type Id = &'static str;

    fn id(&self) -> &'static str {
        self.id
    }
}

impl Toggle for Item {
    fn toggled(&self) -> bool {
        self.liked
    }

    fn count(&self) -> i64 {
        self.likes
    }

    fn set_toggle(&mut self, toggled: bool, count: i64) {
        self.liked = toggled;
        self.likes = count;
    }
}

fn item(id: &'static str) -> Item {
    Item {
        id,
        liked: false,
        likes: 0,
    }
}

async fn loaded(items: Vec<Item>) -> (OptimisticMutation<Vec<Item>>, Toasts) {
    let producer = ScriptedProducer::new([Ok(items)]);
    let query = RetryableQuery::new(QueryOptions::once(), producer.producer());
    query.retry().await;
    let toasts = Toasts::new();
    (OptimisticMutation::new(query, toasts.clone()), toasts)
}

fn ids(mutation: &OptimisticMutation<Vec<Item>>) -> Vec<&'static str> {
    mutation
        .query()
        .data()
        .unwrap_or_default()
        .iter()
        .map(|item| item.id)
        .collect()
}

#[tokio::test]
async fn failed_toggle_restores_exact_values() {
    for liked in [true, false] {
        let original = Item {
            id: "p1",
            liked,
            likes: 5,
        };
        let (mutation, toasts) = loaded(vec![original.clone()]).await;

        let result = mutation
            .toggle("like post", "p1", |_| async { network_error::<()>() })
            .await;

        assert!(result.is_err());
        assert_eq!(mutation.query().data(), Some(vec![original]));
        assert_eq!(toasts.snapshot().len(), 1);
        assert!(!mutation.is_pending(MutationKind::Toggle));
    }
}

#[tokio::test]
async fn toggle_is_visible_before_the_write_runs() -> anyhow::Result<()> {
    let (mutation, _) = loaded(vec![Item {
        id: "p1",
        liked: false,
        likes: 5,
    }])
    .await;

    let observer = mutation.clone();
    mutation
        .toggle("like post", "p1", |liked| {
            assert!(liked);
            let during = observer.query().data();
            assert!(observer.is_pending(MutationKind::Toggle));
            async move {
                assert_eq!(
                    during,
                    Some(vec![Item {
                        id: "p1",
                        liked: true,
                        likes: 6
                    }])
                );
                Ok(())
            }
        })
        .await?;

    assert_eq!(mutation.query().data().map(|items| items[0].likes), Some(6));
    Ok(())
}

#[tokio::test]
async fn toggling_a_missing_item_is_rejected() {
    let (mutation, toasts) = loaded(vec![item("p1")]).await;

    let result = mutation
        .toggle("like post", "gone", |_| async { Ok(()) })
        .await;

    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::Invalid(_)))
    ));
    assert_eq!(toasts.snapshot().len(), 1);
}

#[tokio::test]
async fn create_prepends_the_stored_record_once() -> anyhow::Result<()> {
    let (mutation, toasts) = loaded(vec![item("p1"), item("p2")]).await;

    let created = mutation
        .create("create post", async { Ok(item("p3")) })
        .await?;
    assert_eq!(created.id, "p3");
    assert_eq!(ids(&mutation), vec!["p3", "p1", "p2"]);

    // Creating a record that is already present moves it to the front.
    mutation
        .create("create post", async { Ok(item("p2")) })
        .await?;
    assert_eq!(ids(&mutation), vec!["p2", "p3", "p1"]);
    assert!(toasts.snapshot().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_create_adds_nothing() {
    let (mutation, toasts) = loaded(vec![item("p1")]).await;

    let result = mutation
        .create("create post", async { network_error::<Item>() })
        .await;

    assert!(result.is_err());
    assert_eq!(ids(&mutation), vec!["p1"]);
    let toasts = toasts.snapshot();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, "Could not create post. Please try again.");
}

#[tokio::test]
async fn create_is_pending_until_the_write_settles() {
    let (mutation, _) = loaded(vec![]).await;
    let (sender, receiver) = oneshot::channel::<Item>();

    let mut create = Box::pin(mutation.create("create post", async {
        receiver
            .await
            .map_err(|_| ClientError::from(StoreError::Network("closed".into())))
    }));
    assert!(futures::poll!(&mut create).is_pending());
    assert_eq!(mutation.phase(MutationKind::Create), MutationPhase::Pending);
    assert!(!mutation.is_pending(MutationKind::Delete));

    let _ = sender.send(item("p1"));
    let result = create.await;

    assert!(result.is_ok());
    assert_eq!(mutation.phase(MutationKind::Create), MutationPhase::Idle);
    assert_eq!(ids(&mutation), vec!["p1"]);
}

#[tokio::test]
async fn delete_removes_only_after_success() {
    let (mutation, toasts) = loaded(vec![item("p1"), item("p2")]).await;

    let result = mutation
        .delete("delete post", "p1", async { network_error::<()>() })
        .await;
    assert!(result.is_err());
    assert_eq!(ids(&mutation), vec!["p1", "p2"]);
    assert_eq!(toasts.snapshot().len(), 1);

    mutation
        .delete("delete post", "p1", async { Ok(()) })
        .await
        .expect("delete succeeds");
    assert_eq!(ids(&mutation), vec!["p2"]);
}

#[tokio::test]
async fn update_merges_only_after_success() -> anyhow::Result<()> {
    let (mutation, _) = loaded(vec![item("p1")]).await;

    let failed = mutation
        .update(
            "edit post",
            "p1",
            async { network_error::<i64>() },
            |item, likes| item.likes = likes,
        )
        .await;
    assert!(failed.is_err());
    assert_eq!(mutation.query().data().map(|items| items[0].likes), Some(0));

    mutation
        .update("edit post", "p1", async { Ok(9) }, |item, likes| {
            item.likes = likes
        })
        .await?;
    assert_eq!(mutation.query().data().map(|items| items[0].likes), Some(9));
    Ok(())
}

#[tokio::test]
async fn received_records_are_upserted() {
    let (mutation, toasts) = loaded(vec![item("p1")]).await;

    mutation.receive(item("p2"));
    mutation.receive(Item {
        id: "p1",
        liked: true,
        likes: 1,
    });
    assert_eq!(ids(&mutation), vec!["p2", "p1"]);

    mutation.forget("p2");
    assert_eq!(ids(&mutation), vec!["p1"]);
    assert!(toasts.snapshot().is_empty());
}

#[tokio::test]
async fn rejections_toast_without_going_pending() {
    let (mutation, toasts) = loaded(vec![]).await;

    let error = mutation.reject(
        "create post",
        ValidationError::Empty("Post").into(),
    );

    assert!(error.is_local());
    assert!(!mutation.is_pending(MutationKind::Create));
    assert_eq!(
        toasts.snapshot()[0].message,
        "Could not create post: Post cannot be empty"
    );
}
