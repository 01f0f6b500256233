use client::{
    ClientError, ViewModel,
    view_models::{ANONYMOUS, CommentsViewModel},
};
use payloads::{
    StoreError,
    requests::{CommentInsert, ValidationError},
    responses::Comment,
};
use test_helpers::{StoreOp, spawn_app};

#[tokio::test]
async fn loads_comments_for_one_post_newest_first() {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let post = app.seed_post(alice.id, "post");
    let other = app.seed_post(alice.id, "other post");
    for (post_id, content) in [
        (post.id, "first"),
        (other.id, "elsewhere"),
        (post.id, "second"),
    ] {
        app.store.seed::<Comment>(&CommentInsert {
            post_id,
            author_id: alice.id,
            content: content.into(),
        });
    }

    let comments = CommentsViewModel::new(app.context(), post.id);
    comments.retry().await;

    let loaded = comments.state().data.expect("comments loaded");
    let contents: Vec<&str> =
        loaded.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["second", "first"]);
    assert_eq!(loaded[0].author.display_name, "Alice Liddell");
}

#[tokio::test]
async fn added_comment_is_prepended_with_its_author() -> anyhow::Result<()> {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let post = app.seed_post(alice.id, "post");
    let comments = CommentsViewModel::new(app.context(), post.id);
    comments.retry().await;

    let added = comments.add_comment("nice one").await?;

    assert_eq!(added.post_id, post.id);
    assert_eq!(added.author.display_name, "Alice Liddell");
    assert_eq!(comments.state().data.map(|c| c.len()), Some(1));
    assert_eq!(app.store.rows::<Comment>().len(), 1);
    assert!(app.success_toasts().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_author_lookup_gives_an_anonymous_comment() -> anyhow::Result<()> {
    let app = spawn_app();
    let ghost = app.create_user("ghost", None);
    app.sign_in(&ghost);
    let post = app.seed_post(ghost.id, "post");
    app.store.fail_next(
        StoreOp::Select,
        "profiles",
        StoreError::Api {
            status: 500,
            message: "boom".into(),
        },
    );
    let comments = CommentsViewModel::new(app.context(), post.id);

    let added = comments.add_comment("hello").await?;
    assert_eq!(added.author.display_name, ANONYMOUS);
    Ok(())
}

#[tokio::test]
async fn overlong_comment_is_rejected() {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let post = app.seed_post(alice.id, "post");
    let comments = CommentsViewModel::new(app.context(), post.id);

    let result = comments.add_comment("y".repeat(2001)).await;

    assert_eq!(
        result.err(),
        Some(ClientError::Validation(ValidationError::TooLong {
            field: "Comment",
            max: 2000
        }))
    );
    assert_eq!(app.store.count("comments"), 0);
}

#[tokio::test]
async fn delete_comment_removes_it() -> anyhow::Result<()> {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let post = app.seed_post(alice.id, "post");
    let comments = CommentsViewModel::new(app.context(), post.id);
    comments.retry().await;
    let added = comments.add_comment("oops").await?;

    comments.delete_comment(added.id).await?;

    assert_eq!(comments.state().data, Some(vec![]));
    assert_eq!(app.store.count("comments"), 0);
    Ok(())
}
