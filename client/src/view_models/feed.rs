use std::collections::HashSet;
use std::ops::Deref;

use jiff::Timestamp;
use payloads::{
    DataStore, Filter, PostId, Query, TableExt,
    requests::{NewPost, PostEdit},
    responses::{Post, PostLike},
};

use super::{AuthorSummary, ViewModel, lookup_author, lookup_profiles};
use crate::{
    AppContext, ClientError, MutationKind, OptimisticMutation, Record,
    RetryableQuery, Session, Toggle, tolerate_conflict,
};

/// A post as the feed shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPost {
    pub post: Post,
    pub author: AuthorSummary,
    /// Whether the signed-in user likes this post.
    pub is_liked: bool,
}

impl Deref for FeedPost {
    type Target = Post;

    fn deref(&self) -> &Post {
        &self.post
    }
}

impl Record for FeedPost {
    type Id = PostId;

    fn id(&self) -> PostId {
        self.post.id
    }
}

impl Toggle for FeedPost {
    fn toggled(&self) -> bool {
        self.is_liked
    }

    fn count(&self) -> i64 {
        self.post.likes_count
    }

    fn set_toggle(&mut self, toggled: bool, count: i64) {
        self.is_liked = toggled;
        self.post.likes_count = count;
    }
}

/// The latest posts, newest first.
pub struct FeedViewModel<S> {
    context: AppContext<S>,
    posts: OptimisticMutation<Vec<FeedPost>>,
}

impl<S: DataStore + 'static> FeedViewModel<S> {
    pub fn new(context: AppContext<S>) -> Self {
        let session = context.session.clone();
        let limit = context.feed_page_size;
        let query = RetryableQuery::new(context.options, move || {
            let session = session.clone();
            async move { load_feed(&session, limit).await }
        });
        Self {
            posts: OptimisticMutation::new(query, context.toasts.clone()),
            context,
        }
    }

    pub async fn create_post(
        &self,
        draft: NewPost,
    ) -> Result<FeedPost, ClientError> {
        let user = self.posts.authorize(
            "create post",
            &self.context.session,
            draft.validate(),
        )?;
        let store = self.context.store();
        let created = self
            .posts
            .create("create post", async {
                let post: Post = store.create(&draft.insert(user.id)).await?;
                let author = lookup_author(&**store, user.id).await;
                Ok::<_, ClientError>(FeedPost {
                    post,
                    author,
                    is_liked: false,
                })
            })
            .await?;
        self.context.toasts.success("Post created!");
        Ok(created)
    }

    /// Like or unlike a post. The heart and count change immediately and
    /// are put back if the store rejects the write.
    pub async fn toggle_like(&self, post_id: PostId) -> Result<(), ClientError> {
        let user =
            self.posts
                .authorize("update like", &self.context.session, Ok(()))?;
        let store = self.context.store();
        self.posts
            .toggle("update like", post_id, |liked| async move {
                if liked {
                    let like = PostLike {
                        post_id,
                        user_id: user.id,
                    };
                    tolerate_conflict(store.create::<PostLike>(&like).await)?;
                } else {
                    store
                        .remove::<PostLike>(
                            &Filter::new()
                                .eq("post_id", post_id)
                                .eq("user_id", user.id),
                        )
                        .await?;
                }
                Ok::<_, ClientError>(())
            })
            .await
    }

    pub async fn edit_post(
        &self,
        post_id: PostId,
        edit: PostEdit,
    ) -> Result<(), ClientError> {
        self.posts
            .authorize("edit post", &self.context.session, edit.validate())?;
        let store = self.context.store();
        self.posts
            .update(
                "edit post",
                post_id,
                async {
                    let post: Post = store
                        .modify(post_id, &edit.patch(Timestamp::now()))
                        .await?;
                    Ok::<_, ClientError>(post)
                },
                |item, post| {
                    item.post.content = post.content;
                    item.post.updated_at = post.updated_at;
                },
            )
            .await
    }

    pub async fn delete_post(&self, post_id: PostId) -> Result<(), ClientError> {
        self.posts
            .authorize("delete post", &self.context.session, Ok(()))?;
        let store = self.context.store();
        self.posts
            .delete("delete post", post_id, async {
                store
                    .remove::<Post>(&Filter::new().eq("id", post_id))
                    .await
                    .map_err(ClientError::from)
            })
            .await
    }
}

impl<S> ViewModel for FeedViewModel<S> {
    type Data = Vec<FeedPost>;

    fn query(&self) -> &RetryableQuery<Vec<FeedPost>> {
        self.posts.query()
    }

    fn is_pending(&self, kind: MutationKind) -> bool {
        self.posts.is_pending(kind)
    }
}

async fn load_feed<S: DataStore>(
    session: &Session<S>,
    limit: usize,
) -> Result<Vec<FeedPost>, ClientError> {
    let store: &S = session.store();
    let posts: Vec<Post> = store
        .fetch(&Query::new().order_desc("created_at").limit(limit))
        .await?;
    let profiles =
        lookup_profiles(store, posts.iter().map(|post| post.author_id)).await?;

    let liked: HashSet<PostId> = match session.user_id() {
        Some(user_id) if !posts.is_empty() => {
            let ids: Vec<PostId> = posts.iter().map(|post| post.id).collect();
            store
                .fetch::<PostLike>(
                    &Query::new().eq("user_id", user_id).in_list("post_id", &ids),
                )
                .await?
                .into_iter()
                .map(|like| like.post_id)
                .collect()
        }
        _ => HashSet::new(),
    };
    tracing::debug!(posts = posts.len(), "loaded feed");

    Ok(posts
        .into_iter()
        .map(|post| FeedPost {
            author: AuthorSummary::resolve(post.author_id, &profiles),
            is_liked: liked.contains(&post.id),
            post,
        })
        .collect())
}
