use std::collections::HashMap;

use payloads::{
    DataStore, Filter, Query, StoreError, TableExt, UserId, responses::Profile,
};

/// Label shown when an author's profile is missing or could not be loaded.
pub const ANONYMOUS: &str = "Anonymous";

/// What a list item needs to show about the user who wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSummary {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl AuthorSummary {
    pub fn anonymous(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: ANONYMOUS.to_string(),
            avatar_url: None,
        }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            user_id: profile.id,
            display_name: profile.display_name().to_string(),
            avatar_url: profile.avatar_url.clone(),
        }
    }

    /// Summary for `user_id` from a batch of loaded profiles.
    pub fn resolve(user_id: UserId, profiles: &HashMap<UserId, Profile>) -> Self {
        profiles
            .get(&user_id)
            .map(Self::from_profile)
            .unwrap_or_else(|| Self::anonymous(user_id))
    }
}

/// Look up one author after a write has already succeeded. Never fails: a
/// missing profile or a failed lookup gives the anonymous summary.
pub async fn lookup_author<S: DataStore>(store: &S, user_id: UserId) -> AuthorSummary {
    match store.fetch_one::<Profile>(Filter::new().eq("id", user_id)).await {
        Ok(Some(profile)) => AuthorSummary::from_profile(&profile),
        Ok(None) => AuthorSummary::anonymous(user_id),
        Err(e) => {
            tracing::warn!(%user_id, "author lookup failed: {e}");
            AuthorSummary::anonymous(user_id)
        }
    }
}

/// Load the profiles of several users in one read.
pub async fn lookup_profiles<S: DataStore>(
    store: &S,
    user_ids: impl IntoIterator<Item = UserId>,
) -> Result<HashMap<UserId, Profile>, StoreError> {
    let mut ids: Vec<UserId> = user_ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let profiles: Vec<Profile> =
        store.fetch(&Query::new().in_list("id", &ids)).await?;
    Ok(profiles
        .into_iter()
        .map(|profile| (profile.id, profile))
        .collect())
}
