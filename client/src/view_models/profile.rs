use payloads::{
    DataStore, Filter, TableExt, UserId,
    requests::{ProfileUpdate, ValidationError},
    responses::Profile,
};

use super::ViewModel;
use crate::{
    AppContext, ClientError, MutationKind, OptimisticMutation, Record,
    RetryableQuery,
};

impl Record for Profile {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// One user's profile. Fetched data is `None` when the user has no profile
/// row.
pub struct ProfileViewModel<S> {
    context: AppContext<S>,
    user_id: UserId,
    profile: OptimisticMutation<Option<Profile>>,
}

impl<S: DataStore + 'static> ProfileViewModel<S> {
    pub fn new(context: AppContext<S>, user_id: UserId) -> Self {
        let store = context.store().clone();
        let query = RetryableQuery::new(context.options, move || {
            let store = store.clone();
            async move {
                let profile = store
                    .fetch_one::<Profile>(Filter::new().eq("id", user_id))
                    .await?;
                Ok::<_, ClientError>(profile)
            }
        });
        Self {
            profile: OptimisticMutation::new(query, context.toasts.clone()),
            user_id,
            context,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Whether the signed-in user is looking at their own profile.
    pub fn is_own(&self) -> bool {
        self.context.session.user_id() == Some(self.user_id)
    }

    pub async fn update_profile(
        &self,
        update: ProfileUpdate,
    ) -> Result<(), ClientError> {
        self.profile.authorize(
            "update profile",
            &self.context.session,
            update.validate(),
        )?;
        if !self.is_own() {
            return Err(self.profile.reject(
                "update profile",
                ValidationError::Invalid("You can only edit your own profile.")
                    .into(),
            ));
        }
        if update.is_empty() {
            return Ok(());
        }

        let store = self.context.store();
        self.profile
            .update(
                "update profile",
                self.user_id,
                async {
                    let profile: Profile =
                        store.modify(self.user_id, &update).await?;
                    Ok::<_, ClientError>(profile)
                },
                |current, canonical| *current = canonical,
            )
            .await
    }
}

impl<S> ViewModel for ProfileViewModel<S> {
    type Data = Option<Profile>;

    fn query(&self) -> &RetryableQuery<Option<Profile>> {
        self.profile.query()
    }

    fn is_pending(&self, kind: MutationKind) -> bool {
        self.profile.is_pending(kind)
    }
}
