use std::ops::Deref;

use payloads::{
    CommentId, DataStore, Filter, PostId, Query, TableExt,
    requests::NewComment, responses::Comment,
};

use super::{AuthorSummary, ViewModel, lookup_author, lookup_profiles};
use crate::{
    AppContext, ClientError, MutationKind, OptimisticMutation, Record,
    RetryableQuery,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
    pub comment: Comment,
    pub author: AuthorSummary,
}

impl Deref for CommentView {
    type Target = Comment;

    fn deref(&self) -> &Comment {
        &self.comment
    }
}

impl Record for CommentView {
    type Id = CommentId;

    fn id(&self) -> CommentId {
        self.comment.id
    }
}

/// Comments under one post, newest first.
pub struct CommentsViewModel<S> {
    context: AppContext<S>,
    post_id: PostId,
    comments: OptimisticMutation<Vec<CommentView>>,
}

impl<S: DataStore + 'static> CommentsViewModel<S> {
    pub fn new(context: AppContext<S>, post_id: PostId) -> Self {
        let store = context.store().clone();
        let query = RetryableQuery::new(context.options, move || {
            let store = store.clone();
            async move { load_comments(&*store, post_id).await }
        });
        Self {
            comments: OptimisticMutation::new(query, context.toasts.clone()),
            post_id,
            context,
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub async fn add_comment(
        &self,
        content: impl Into<String>,
    ) -> Result<CommentView, ClientError> {
        let draft = NewComment {
            post_id: self.post_id,
            content: content.into(),
        };
        let user = self.comments.authorize(
            "add comment",
            &self.context.session,
            draft.validate(),
        )?;
        let store = self.context.store();
        self.comments
            .create("add comment", async {
                let comment: Comment =
                    store.create(&draft.insert(user.id)).await?;
                let author = lookup_author(&**store, user.id).await;
                Ok::<_, ClientError>(CommentView { comment, author })
            })
            .await
    }

    pub async fn delete_comment(
        &self,
        comment_id: CommentId,
    ) -> Result<(), ClientError> {
        self.comments
            .authorize("delete comment", &self.context.session, Ok(()))?;
        let store = self.context.store();
        self.comments
            .delete("delete comment", comment_id, async {
                store
                    .remove::<Comment>(&Filter::new().eq("id", comment_id))
                    .await
                    .map_err(ClientError::from)
            })
            .await
    }
}

impl<S> ViewModel for CommentsViewModel<S> {
    type Data = Vec<CommentView>;

    fn query(&self) -> &RetryableQuery<Vec<CommentView>> {
        self.comments.query()
    }

    fn is_pending(&self, kind: MutationKind) -> bool {
        self.comments.is_pending(kind)
    }
}

async fn load_comments<S: DataStore>(
    store: &S,
    post_id: PostId,
) -> Result<Vec<CommentView>, ClientError> {
    let comments: Vec<Comment> = store
        .fetch(&Query::new().eq("post_id", post_id).order_desc("created_at"))
        .await?;
    let profiles = lookup_profiles(
        store,
        comments.iter().map(|comment| comment.author_id),
    )
    .await?;
    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            author: AuthorSummary::resolve(comment.author_id, &profiles),
            comment,
        })
        .collect())
}
