use client::{ClientError, ViewModel, view_models::ProfileViewModel};
use payloads::{
    UserId,
    requests::{ProfileUpdate, ValidationError},
    responses::Profile,
};
use test_helpers::{StoreOp, spawn_app};

#[tokio::test]
async fn missing_profile_is_fetched_as_none() {
    let app = spawn_app();
    let profile = ProfileViewModel::new(app.context(), UserId::new());

    profile.retry().await;

    let state = profile.state();
    assert_eq!(state.data, Some(None));
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn own_profile_updates_replace_the_cached_record() -> anyhow::Result<()> {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let profile = ProfileViewModel::new(app.context(), alice.id);
    profile.retry().await;
    assert!(profile.is_own());

    profile
        .update_profile(ProfileUpdate {
            bio: Some("Physics, class of '26".into()),
            interests: Some(vec!["rust".into(), "climbing".into()]),
            ..Default::default()
        })
        .await?;

    let cached = profile.state().data.flatten().expect("profile loaded");
    assert_eq!(cached.bio.as_deref(), Some("Physics, class of '26"));
    assert_eq!(cached.interests, vec!["rust", "climbing"]);
    assert_eq!(cached.full_name.as_deref(), Some("Alice Liddell"));
    assert_eq!(app.store.rows::<Profile>()[0], cached);
    Ok(())
}

#[tokio::test]
async fn other_profiles_cannot_be_edited() {
    let app = spawn_app();
    app.sign_in_as_alice();
    let bob = app.create_user("bob", None);
    let profile = ProfileViewModel::new(app.context(), bob.id);
    profile.retry().await;

    let result = profile
        .update_profile(ProfileUpdate {
            bio: Some("hacked".into()),
            ..Default::default()
        })
        .await;

    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::Invalid(_)))
    ));
    assert_eq!(app.store.calls(StoreOp::Update, "profiles"), 0);
    assert_eq!(profile.state().data, Some(Some(bob)));
}

#[tokio::test]
async fn empty_update_is_a_no_op() -> anyhow::Result<()> {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let profile = ProfileViewModel::new(app.context(), alice.id);

    profile.update_profile(ProfileUpdate::default()).await?;

    assert_eq!(app.store.calls(StoreOp::Update, "profiles"), 0);
    assert!(app.error_toasts().is_empty());
    Ok(())
}

#[tokio::test]
async fn overlong_bio_is_rejected() {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let profile = ProfileViewModel::new(app.context(), alice.id);

    let result = profile
        .update_profile(ProfileUpdate {
            bio: Some("b".repeat(501)),
            ..Default::default()
        })
        .await;

    assert_eq!(
        result.err(),
        Some(ClientError::Validation(ValidationError::TooLong {
            field: "Bio",
            max: 500
        }))
    );
}
