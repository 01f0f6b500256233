//! One hook per view-model, each bound to the app context. View-models are
//! rebuilt when the signed-in user changes.

use client::view_models::{
    ChatViewModel, CommentsViewModel, CommunitiesViewModel, FeedViewModel,
    MentorsViewModel, MentorshipRequestsViewModel, ProfileViewModel,
};
use client::{InMemoryBus, ViewModel};
use payloads::{PostId, RestClient, RoomId, UserId};
use yew::prelude::*;

use super::{ViewModelHandle, use_view_model};
use crate::contexts::{use_app_context, use_chat_bus, use_signed_in};

#[hook]
pub fn use_feed() -> ViewModelHandle<FeedViewModel<RestClient>> {
    let context = use_app_context();
    let signed_in = use_signed_in();
    use_view_model((context, signed_in), |(context, _)| {
        FeedViewModel::new(context.clone())
    })
}

#[hook]
pub fn use_comments(
    post_id: PostId,
) -> ViewModelHandle<CommentsViewModel<RestClient>> {
    let context = use_app_context();
    let signed_in = use_signed_in();
    use_view_model((context, signed_in, post_id), |(context, _, post_id)| {
        CommentsViewModel::new(context.clone(), *post_id)
    })
}

#[hook]
pub fn use_profile(
    user_id: UserId,
) -> ViewModelHandle<ProfileViewModel<RestClient>> {
    let context = use_app_context();
    let signed_in = use_signed_in();
    use_view_model((context, signed_in, user_id), |(context, _, user_id)| {
        ProfileViewModel::new(context.clone(), *user_id)
    })
}

#[hook]
pub fn use_communities() -> ViewModelHandle<CommunitiesViewModel<RestClient>> {
    let context = use_app_context();
    let signed_in = use_signed_in();
    use_view_model((context, signed_in), |(context, _)| {
        CommunitiesViewModel::new(context.clone())
    })
}

#[hook]
pub fn use_mentors() -> ViewModelHandle<MentorsViewModel> {
    let context = use_app_context();
    let signed_in = use_signed_in();
    use_view_model((context, signed_in), |(context, _)| {
        MentorsViewModel::new(context.clone())
    })
}

#[hook]
pub fn use_mentorship_requests()
-> ViewModelHandle<MentorshipRequestsViewModel<RestClient>> {
    let context = use_app_context();
    let signed_in = use_signed_in();
    use_view_model((context, signed_in), |(context, _)| {
        MentorshipRequestsViewModel::new(context.clone())
    })
}

/// A chat room that also follows messages published by other views of the
/// same room while mounted.
#[hook]
pub fn use_chat(
    room_id: RoomId,
) -> ViewModelHandle<ChatViewModel<RestClient, InMemoryBus>> {
    let context = use_app_context();
    let signed_in = use_signed_in();
    let bus = use_chat_bus();
    let deps = (context, signed_in, bus, room_id);
    let handle = use_view_model(deps.clone(), |(context, _, bus, room_id)| {
        ChatViewModel::new(context.clone(), bus.0.clone(), *room_id)
    });

    {
        let chat = handle.view_model.clone();
        // Disposing the view-model ends the listener.
        use_effect_with(deps, move |_| {
            if !chat.query().is_disposed() {
                yew::platform::spawn_local(chat.listen());
            }
        });
    }

    handle
}
