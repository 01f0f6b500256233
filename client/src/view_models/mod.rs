//! Screen-level state: one view-model per cached collection, each pairing a
//! [`RetryableQuery`] with the mutations that keep it current.

mod authors;
mod chat;
mod comments;
mod communities;
mod feed;
mod mentors;
mod mentorship;
mod profile;

pub use authors::{ANONYMOUS, AuthorSummary, lookup_author, lookup_profiles};
pub use chat::{ChatMessageView, ChatViewModel};
pub use comments::{CommentView, CommentsViewModel};
pub use communities::{CommunitiesViewModel, CommunityView};
pub use feed::{FeedPost, FeedViewModel};
pub use mentors::{MentorMatch, MentorsViewModel, rank_mentors};
pub use mentorship::MentorshipRequestsViewModel;
pub use profile::ProfileViewModel;

use crate::{
    ListenerId, MutationKind, QueryRun, QueryState, RetryableQuery,
};

/// The shape every view-model presents to the view layer.
pub trait ViewModel {
    type Data: Clone + 'static;

    fn query(&self) -> &RetryableQuery<Self::Data>;

    /// Read-only view-models are never pending.
    fn is_pending(&self, kind: MutationKind) -> bool;

    fn state(&self) -> QueryState<Self::Data> {
        self.query().state()
    }

    fn retry(&self) -> QueryRun {
        self.query().retry()
    }

    fn dispose(&self) {
        self.query().dispose();
    }

    /// Called after every change to the query state or a pending flag.
    fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerId
    where
        Self: Sized,
    {
        self.query().subscribe(listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.query().unsubscribe(id);
    }
}
