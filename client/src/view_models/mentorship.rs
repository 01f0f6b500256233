use payloads::{
    DataStore, Filter, MentorshipRequestId, Query, TableExt,
    requests::{NewMentorshipRequest, ValidationError},
    responses::{MentorshipRequest, MentorshipStatus},
};

use super::ViewModel;
use crate::{
    AppContext, ClientError, MutationKind, OptimisticMutation, Record,
    RetryableQuery, Session,
};

impl Record for MentorshipRequest {
    type Id = MentorshipRequestId;

    fn id(&self) -> MentorshipRequestId {
        self.id
    }
}

/// Requests the signed-in user has sent, newest first.
pub struct MentorshipRequestsViewModel<S> {
    context: AppContext<S>,
    requests: OptimisticMutation<Vec<MentorshipRequest>>,
}

impl<S: DataStore + 'static> MentorshipRequestsViewModel<S> {
    pub fn new(context: AppContext<S>) -> Self {
        let session = context.session.clone();
        let query = RetryableQuery::new(context.options, move || {
            let session = session.clone();
            async move { load_requests(&session).await }
        });
        Self {
            requests: OptimisticMutation::new(query, context.toasts.clone()),
            context,
        }
    }

    /// Whether a request to `mentor` is still waiting for an answer.
    fn has_pending_request(&self, draft: &NewMentorshipRequest) -> bool {
        self.requests.query().with_state(|state| {
            state.data.iter().flatten().any(|request| {
                request.mentor_id == draft.mentor_id
                    && request.status == MentorshipStatus::Pending
            })
        })
    }

    pub async fn request_mentorship(
        &self,
        draft: NewMentorshipRequest,
    ) -> Result<MentorshipRequest, ClientError> {
        const ACTION: &str = "send mentorship request";
        let user = self.requests.authorize(
            ACTION,
            &self.context.session,
            draft.validate(),
        )?;
        if draft.mentor_id == user.id {
            return Err(self.requests.reject(
                ACTION,
                ValidationError::Invalid(
                    "You cannot request mentorship from yourself.",
                )
                .into(),
            ));
        }
        if self.has_pending_request(&draft) {
            return Err(self.requests.reject(
                ACTION,
                ValidationError::Invalid(
                    "You already have a pending request with this mentor.",
                )
                .into(),
            ));
        }

        let store = self.context.store();
        let request = self
            .requests
            .create(ACTION, async {
                let request: MentorshipRequest =
                    store.create(&draft.insert(user.id)).await?;
                Ok::<_, ClientError>(request)
            })
            .await?;
        self.context.toasts.success("Mentorship request sent!");
        Ok(request)
    }

    pub async fn withdraw_request(
        &self,
        request_id: MentorshipRequestId,
    ) -> Result<(), ClientError> {
        self.requests
            .authorize("withdraw request", &self.context.session, Ok(()))?;
        let store = self.context.store();
        self.requests
            .delete("withdraw request", request_id, async {
                store
                    .remove::<MentorshipRequest>(
                        &Filter::new().eq("id", request_id),
                    )
                    .await
                    .map_err(ClientError::from)
            })
            .await
    }
}

impl<S> ViewModel for MentorshipRequestsViewModel<S> {
    type Data = Vec<MentorshipRequest>;

    fn query(&self) -> &RetryableQuery<Vec<MentorshipRequest>> {
        self.requests.query()
    }

    fn is_pending(&self, kind: MutationKind) -> bool {
        self.requests.is_pending(kind)
    }
}

async fn load_requests<S: DataStore>(
    session: &Session<S>,
) -> Result<Vec<MentorshipRequest>, ClientError> {
    let Some(user_id) = session.user_id() else {
        return Ok(Vec::new());
    };
    let requests = session
        .store()
        .fetch(
            &Query::new()
                .eq("mentee_id", user_id)
                .order_desc("created_at"),
        )
        .await?;
    Ok(requests)
}
