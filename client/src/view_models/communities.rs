use std::collections::HashMap;
use std::ops::Deref;

use payloads::{
    CommunityId, DataStore, Filter, Query, TableExt,
    requests::{MembershipInsert, NewCommunity, ValidationError},
    responses::{Community, CommunityMember, CommunityRole},
};

use super::ViewModel;
use crate::{
    AppContext, ClientError, MutationKind, OptimisticMutation, Record,
    RetryableQuery, Session, Toggle, tolerate_conflict,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CommunityView {
    pub community: Community,
    /// The signed-in user's role, `None` when not a member.
    pub role: Option<CommunityRole>,
}

impl CommunityView {
    pub fn is_member(&self) -> bool {
        self.role.is_some()
    }

    pub fn is_owner(&self) -> bool {
        self.role == Some(CommunityRole::Owner)
    }
}

impl Deref for CommunityView {
    type Target = Community;

    fn deref(&self) -> &Community {
        &self.community
    }
}

impl Record for CommunityView {
    type Id = CommunityId;

    fn id(&self) -> CommunityId {
        self.community.id
    }
}

impl Toggle for CommunityView {
    fn toggled(&self) -> bool {
        self.is_member()
    }

    fn count(&self) -> i64 {
        self.community.member_count
    }

    fn set_toggle(&mut self, toggled: bool, count: i64) {
        self.role = match (toggled, self.role) {
            (true, Some(role)) => Some(role),
            (true, None) => Some(CommunityRole::Member),
            (false, _) => None,
        };
        self.community.member_count = count;
    }
}

/// All communities with the signed-in user's membership, newest first.
pub struct CommunitiesViewModel<S> {
    context: AppContext<S>,
    communities: OptimisticMutation<Vec<CommunityView>>,
}

impl<S: DataStore + 'static> CommunitiesViewModel<S> {
    pub fn new(context: AppContext<S>) -> Self {
        let session = context.session.clone();
        let query = RetryableQuery::new(context.options, move || {
            let session = session.clone();
            async move { load_communities(&session).await }
        });
        Self {
            communities: OptimisticMutation::new(query, context.toasts.clone()),
            context,
        }
    }

    /// Join a community, or leave it if already a member. Owners cannot
    /// leave.
    pub async fn toggle_membership(
        &self,
        community_id: CommunityId,
    ) -> Result<(), ClientError> {
        const ACTION: &str = "update membership";
        let user =
            self.communities
                .authorize(ACTION, &self.context.session, Ok(()))?;
        let is_owner = self.communities.query().with_state(|state| {
            state.data.iter().flatten().any(|view| {
                view.community.id == community_id && view.is_owner()
            })
        });
        if is_owner {
            return Err(self.communities.reject(
                ACTION,
                ValidationError::Invalid(
                    "Owners cannot leave their own community.",
                )
                .into(),
            ));
        }

        let store = self.context.store();
        self.communities
            .toggle(ACTION, community_id, |joined| async move {
                if joined {
                    let membership = MembershipInsert {
                        community_id,
                        user_id: user.id,
                        role: CommunityRole::Member,
                    };
                    tolerate_conflict(
                        store.create::<CommunityMember>(&membership).await,
                    )?;
                } else {
                    store
                        .remove::<CommunityMember>(
                            &Filter::new()
                                .eq("community_id", community_id)
                                .eq("user_id", user.id),
                        )
                        .await?;
                }
                Ok::<_, ClientError>(())
            })
            .await
    }

    /// Create a community with the signed-in user as its owner.
    ///
    /// The community row and the owner's membership row are separate writes.
    /// If the membership insert fails the community row is deleted again and
    /// the membership error is returned.
    pub async fn create_community(
        &self,
        draft: NewCommunity,
    ) -> Result<CommunityView, ClientError> {
        let user = self.communities.authorize(
            "create community",
            &self.context.session,
            draft.validate(),
        )?;
        let store = self.context.store();
        let created = self
            .communities
            .create("create community", async {
                let community: Community =
                    store.create(&draft.insert(user.id)).await?;
                let membership = MembershipInsert {
                    community_id: community.id,
                    user_id: user.id,
                    role: CommunityRole::Owner,
                };
                if let Err(e) =
                    store.create::<CommunityMember>(&membership).await
                {
                    tracing::warn!(
                        community_id = %community.id,
                        "owner membership failed, removing community: {e}"
                    );
                    let cleanup = store
                        .remove::<Community>(
                            &Filter::new().eq("id", community.id),
                        )
                        .await;
                    if let Err(cleanup) = cleanup {
                        tracing::error!(
                            community_id = %community.id,
                            "community left without an owner: {cleanup}"
                        );
                    }
                    return Err(e.into());
                }
                Ok::<_, ClientError>(CommunityView {
                    community,
                    role: Some(CommunityRole::Owner),
                })
            })
            .await?;
        self.context.toasts.success("Community created!");
        Ok(created)
    }
}

impl<S> ViewModel for CommunitiesViewModel<S> {
    type Data = Vec<CommunityView>;

    fn query(&self) -> &RetryableQuery<Vec<CommunityView>> {
        self.communities.query()
    }

    fn is_pending(&self, kind: MutationKind) -> bool {
        self.communities.is_pending(kind)
    }
}

async fn load_communities<S: DataStore>(
    session: &Session<S>,
) -> Result<Vec<CommunityView>, ClientError> {
    let store: &S = session.store();
    let communities: Vec<Community> =
        store.fetch(&Query::new().order_desc("created_at")).await?;

    let roles: HashMap<CommunityId, CommunityRole> = match session.user_id() {
        Some(user_id) => store
            .fetch::<CommunityMember>(&Query::new().eq("user_id", user_id))
            .await?
            .into_iter()
            .map(|member| (member.community_id, member.role))
            .collect(),
        None => HashMap::new(),
    };

    Ok(communities
        .into_iter()
        .map(|community| CommunityView {
            role: roles.get(&community.id).copied(),
            community,
        })
        .collect())
}
