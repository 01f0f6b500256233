use client::{
    ClientError, ViewModel,
    view_models::{CommunitiesViewModel, CommunityView},
};
use payloads::{
    CommunityId, StoreError,
    requests::{MembershipInsert, NewCommunity, ValidationError},
    responses::{Community, CommunityMember, CommunityRole},
};
use test_helpers::{StoreOp, spawn_app};

fn find(
    communities: &CommunitiesViewModel<test_helpers::MockStore>,
    id: CommunityId,
) -> CommunityView {
    communities
        .state()
        .data
        .into_iter()
        .flatten()
        .find(|view| view.id == id)
        .expect("community listed")
}

#[tokio::test]
async fn lists_communities_with_the_viewers_role() {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let bob = app.create_user("bob", None);
    let chess = app.seed_community(bob.id, "Chess Club");
    let robotics = app.seed_community(bob.id, "Robotics");
    app.store.seed::<CommunityMember>(&MembershipInsert {
        community_id: chess.id,
        user_id: alice.id,
        role: CommunityRole::Member,
    });

    let communities = CommunitiesViewModel::new(app.context());
    communities.retry().await;

    assert!(find(&communities, chess.id).is_member());
    assert!(!find(&communities, robotics.id).is_member());
}

#[tokio::test]
async fn join_and_leave_move_the_member_count() -> anyhow::Result<()> {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let bob = app.create_user("bob", None);
    let chess = app.seed_community(bob.id, "Chess Club");
    let communities = CommunitiesViewModel::new(app.context());
    communities.retry().await;

    communities.toggle_membership(chess.id).await?;
    let joined = find(&communities, chess.id);
    assert_eq!(joined.role, Some(CommunityRole::Member));
    assert_eq!(joined.member_count, 2);
    assert_eq!(app.store.rows::<CommunityMember>().len(), 1);
    assert_eq!(app.store.rows::<CommunityMember>()[0].user_id, alice.id);

    communities.toggle_membership(chess.id).await?;
    let left = find(&communities, chess.id);
    assert!(!left.is_member());
    assert_eq!(left.member_count, 1);
    assert!(app.store.rows::<CommunityMember>().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_join_is_reverted() {
    let app = spawn_app();
    app.sign_in_as_alice();
    let bob = app.create_user("bob", None);
    let chess = app.seed_community(bob.id, "Chess Club");
    let communities = CommunitiesViewModel::new(app.context());
    communities.retry().await;

    app.store.fail_next(
        StoreOp::Insert,
        "community_members",
        StoreError::Network("offline".into()),
    );
    assert!(communities.toggle_membership(chess.id).await.is_err());

    let view = find(&communities, chess.id);
    assert_eq!((view.is_member(), view.member_count), (false, 1));
    assert_eq!(app.error_toasts().len(), 1);
}

#[tokio::test]
async fn create_community_makes_the_creator_owner() -> anyhow::Result<()> {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let communities = CommunitiesViewModel::new(app.context());
    communities.retry().await;

    let created = communities
        .create_community(NewCommunity {
            name: "  Film Society ".into(),
            description: Some("Weekly screenings".into()),
        })
        .await?;

    assert_eq!(created.name, "Film Society");
    assert!(created.is_owner());
    assert_eq!(created.member_count, 1);
    assert_eq!(
        app.store.rows::<CommunityMember>(),
        vec![CommunityMember {
            community_id: created.id,
            user_id: alice.id,
            role: CommunityRole::Owner,
        }]
    );
    assert_eq!(communities.state().data.map(|c| c.len()), Some(1));
    assert_eq!(app.success_toasts(), vec!["Community created!"]);
    Ok(())
}

#[tokio::test]
async fn owners_cannot_leave() -> anyhow::Result<()> {
    let app = spawn_app();
    app.sign_in_as_alice();
    let communities = CommunitiesViewModel::new(app.context());
    communities.retry().await;
    let created = communities
        .create_community(NewCommunity {
            name: "Film Society".into(),
            description: None,
        })
        .await?;

    let result = communities.toggle_membership(created.id).await;

    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::Invalid(_)))
    ));
    assert!(find(&communities, created.id).is_owner());
    assert_eq!(app.store.calls(StoreOp::Delete, "community_members"), 0);
    Ok(())
}

#[tokio::test]
async fn failed_owner_membership_removes_the_community() {
    let app = spawn_app();
    app.sign_in_as_alice();
    let communities = CommunitiesViewModel::new(app.context());
    communities.retry().await;

    app.store.fail_next(
        StoreOp::Insert,
        "community_members",
        StoreError::Permission("row-level security".into()),
    );
    let result = communities
        .create_community(NewCommunity {
            name: "Film Society".into(),
            description: None,
        })
        .await;

    assert!(matches!(
        result,
        Err(ClientError::Store(StoreError::Permission(_)))
    ));
    assert!(app.store.rows::<Community>().is_empty());
    assert_eq!(communities.state().data, Some(vec![]));
    assert!(app.success_toasts().is_empty());
    assert_eq!(app.error_toasts().len(), 1);
}

#[tokio::test]
async fn failed_cleanup_still_reports_the_membership_error() {
    let app = spawn_app();
    app.sign_in_as_alice();
    let communities = CommunitiesViewModel::new(app.context());

    app.store.fail_next(
        StoreOp::Insert,
        "community_members",
        StoreError::Network("offline".into()),
    );
    app.store.fail_next(
        StoreOp::Delete,
        "communities",
        StoreError::Network("still offline".into()),
    );
    let result = communities
        .create_community(NewCommunity {
            name: "Film Society".into(),
            description: None,
        })
        .await;

    assert_eq!(
        result.err(),
        Some(ClientError::Store(StoreError::Network("offline".into())))
    );
    assert_eq!(app.store.rows::<Community>().len(), 1);
    assert_eq!(app.store.calls(StoreOp::Delete, "communities"), 1);
}

#[tokio::test]
async fn community_name_is_required() {
    let app = spawn_app();
    app.sign_in_as_alice();
    let communities = CommunitiesViewModel::new(app.context());

    let result = communities
        .create_community(NewCommunity {
            name: " ".into(),
            description: None,
        })
        .await;

    assert_eq!(
        result.err(),
        Some(ClientError::Validation(ValidationError::Empty(
            "Community name"
        )))
    );
    assert_eq!(app.store.count("communities"), 0);
}
