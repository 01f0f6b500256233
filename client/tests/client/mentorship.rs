use client::{ClientError, ViewModel, view_models::MentorshipRequestsViewModel};
use payloads::{
    requests::{NewMentorshipRequest, ValidationError},
    responses::{MentorshipRequest, MentorshipStatus},
};
use test_helpers::{StoreOp, spawn_app};

fn ask(mentor: &payloads::responses::Profile) -> NewMentorshipRequest {
    NewMentorshipRequest {
        mentor_id: mentor.id,
        message: "Could you help me pick electives?".into(),
    }
}

#[tokio::test]
async fn request_is_stored_and_listed() -> anyhow::Result<()> {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let mentor = app.create_mentor("prof_x", "Physics", &["rust"]);
    let requests = MentorshipRequestsViewModel::new(app.context());
    requests.retry().await;
    assert_eq!(requests.state().data, Some(vec![]));

    let sent = requests.request_mentorship(ask(&mentor)).await?;

    assert_eq!(sent.mentee_id, alice.id);
    assert_eq!(sent.status, MentorshipStatus::Pending);
    assert_eq!(app.store.rows::<MentorshipRequest>(), vec![sent.clone()]);
    assert_eq!(requests.state().data, Some(vec![sent]));
    assert_eq!(app.success_toasts(), vec!["Mentorship request sent!"]);
    Ok(())
}

#[tokio::test]
async fn requesting_yourself_is_rejected() {
    let app = spawn_app();
    let alice = app.sign_in_as_alice();
    let requests = MentorshipRequestsViewModel::new(app.context());

    let result = requests.request_mentorship(ask(&alice)).await;

    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::Invalid(_)))
    ));
    assert_eq!(app.store.calls(StoreOp::Insert, "mentorship_requests"), 0);
}

#[tokio::test]
async fn second_pending_request_to_a_mentor_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app();
    app.sign_in_as_alice();
    let mentor = app.create_mentor("prof_x", "Physics", &[]);
    let requests = MentorshipRequestsViewModel::new(app.context());
    requests.retry().await;
    requests.request_mentorship(ask(&mentor)).await?;

    let again = requests.request_mentorship(ask(&mentor)).await;

    assert!(matches!(
        again,
        Err(ClientError::Validation(ValidationError::Invalid(_)))
    ));
    assert_eq!(app.store.count("mentorship_requests"), 1);
    assert_eq!(
        app.error_toasts(),
        vec![
            "Could not send mentorship request: You already have a pending \
             request with this mentor."
        ]
    );
    Ok(())
}

#[tokio::test]
async fn only_the_viewers_requests_are_loaded() {
    let app = spawn_app();
    let mentor = app.create_mentor("prof_x", "Physics", &[]);
    let bob = app.create_user("bob", None);
    app.store.seed::<MentorshipRequest>(&ask(&mentor).insert(bob.id));
    let alice = app.sign_in_as_alice();
    app.store.seed::<MentorshipRequest>(&ask(&mentor).insert(alice.id));

    let requests = MentorshipRequestsViewModel::new(app.context());
    requests.retry().await;

    let loaded = requests.state().data.expect("requests loaded");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].mentee_id, alice.id);
}

#[tokio::test]
async fn withdraw_removes_the_request() -> anyhow::Result<()> {
    let app = spawn_app();
    app.sign_in_as_alice();
    let mentor = app.create_mentor("prof_x", "Physics", &[]);
    let requests = MentorshipRequestsViewModel::new(app.context());
    requests.retry().await;
    let sent = requests.request_mentorship(ask(&mentor)).await?;

    requests.withdraw_request(sent.id).await?;

    assert_eq!(requests.state().data, Some(vec![]));
    assert_eq!(app.store.count("mentorship_requests"), 0);

    // With the pending request gone a new one may be sent.
    requests.request_mentorship(ask(&mentor)).await?;
    assert_eq!(app.store.count("mentorship_requests"), 1);
    Ok(())
}
