use std::collections::HashSet;

use payloads::{DataStore, Filter, Query, TableExt, responses::Profile};

use super::ViewModel;
use crate::{AppContext, ClientError, MutationKind, RetryableQuery, Session};

#[derive(Debug, Clone, PartialEq)]
pub struct MentorMatch {
    pub profile: Profile,
    /// Interests shared with the viewer, in the mentor's order.
    pub shared_interests: Vec<String>,
    pub score: u32,
}

/// Rank mentors for `viewer`: two points per shared interest, one more for
/// the same department. Equal scores are ordered by display name. Without a
/// viewer profile every mentor scores zero.
pub fn rank_mentors(
    viewer: Option<&Profile>,
    mentors: Vec<Profile>,
) -> Vec<MentorMatch> {
    let interests: HashSet<String> = viewer
        .map(|viewer| viewer.interests.iter().map(|i| normalize(i)).collect())
        .unwrap_or_default();
    let department = viewer
        .and_then(|viewer| viewer.department.as_deref())
        .map(normalize)
        .filter(|department| !department.is_empty());

    let mut matches: Vec<MentorMatch> = mentors
        .into_iter()
        .filter(|mentor| viewer.is_none_or(|viewer| viewer.id != mentor.id))
        .map(|profile| {
            let shared_interests: Vec<String> = profile
                .interests
                .iter()
                .filter(|interest| interests.contains(&normalize(interest)))
                .cloned()
                .collect();
            let same_department = department.is_some()
                && profile.department.as_deref().map(normalize) == department;
            let score = shared_interests.len() as u32 * 2
                + u32::from(same_department);
            MentorMatch {
                profile,
                shared_interests,
                score,
            }
        })
        .collect();

    matches.sort_by(|a, b| {
        b.score.cmp(&a.score).then_with(|| {
            a.profile
                .display_name()
                .to_lowercase()
                .cmp(&b.profile.display_name().to_lowercase())
        })
    });
    matches
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Mentor profiles ranked against the signed-in user. Read-only.
pub struct MentorsViewModel {
    query: RetryableQuery<Vec<MentorMatch>>,
}

impl MentorsViewModel {
    pub fn new<S: DataStore + 'static>(context: AppContext<S>) -> Self {
        let session = context.session.clone();
        let query = RetryableQuery::new(context.options, move || {
            let session = session.clone();
            async move { load_mentors(&session).await }
        });
        Self { query }
    }
}

impl ViewModel for MentorsViewModel {
    type Data = Vec<MentorMatch>;

    fn query(&self) -> &RetryableQuery<Vec<MentorMatch>> {
        &self.query
    }

    fn is_pending(&self, _kind: MutationKind) -> bool {
        false
    }
}

async fn load_mentors<S: DataStore>(
    session: &Session<S>,
) -> Result<Vec<MentorMatch>, ClientError> {
    let store: &S = session.store();
    let viewer = match session.user_id() {
        Some(user_id) => {
            store
                .fetch_one::<Profile>(Filter::new().eq("id", user_id))
                .await?
        }
        None => None,
    };
    let mentors: Vec<Profile> =
        store.fetch(&Query::new().eq("is_mentor", true)).await?;
    let ranked = rank_mentors(viewer.as_ref(), mentors);
    tracing::debug!(mentors = ranked.len(), "ranked mentors");
    Ok(ranked)
}
