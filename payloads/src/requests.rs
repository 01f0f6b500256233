//! Drafts submitted by the user, and the rows they become once stamped with
//! the acting user's id.

use crate::{
    CommunityId, PostId, RoomId, UserId,
    responses::{CommunityRole, MentorshipStatus},
};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

pub const POST_MAX_LEN: usize = 5000;
pub const COMMENT_MAX_LEN: usize = 2000;
pub const MESSAGE_MAX_LEN: usize = 2000;
pub const COMMUNITY_NAME_MAX_LEN: usize = 100;
pub const COMMUNITY_DESCRIPTION_MAX_LEN: usize = 1000;
pub const BIO_MAX_LEN: usize = 500;
pub const FULL_NAME_MAX_LEN: usize = 255;
pub const MENTORSHIP_MESSAGE_MAX_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{0}")]
    Invalid(&'static str),
}

/// Check that a required text field has non-whitespace content within the
/// length limit.
pub fn validate_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    validate_optional_text(field, Some(value), max)
}

/// Length check for a field that may be absent or blank.
pub fn validate_optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(value) if value.chars().count() > max => {
            Err(ValidationError::TooLong { field, max })
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub content: String,
    pub image_url: Option<String>,
    pub community_id: Option<CommunityId>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("Post", &self.content, POST_MAX_LEN)
    }

    pub fn insert(&self, author_id: UserId) -> PostInsert {
        PostInsert {
            author_id,
            content: self.content.trim().to_string(),
            image_url: self.image_url.clone(),
            community_id: self.community_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostInsert {
    pub author_id: UserId,
    pub content: String,
    pub image_url: Option<String>,
    pub community_id: Option<CommunityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEdit {
    pub content: String,
}

impl PostEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("Post", &self.content, POST_MAX_LEN)
    }

    pub fn patch(&self, now: Timestamp) -> PostPatch {
        PostPatch {
            content: self.content.trim().to_string(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPatch {
    pub content: String,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("Comment", &self.content, COMMENT_MAX_LEN)
    }

    pub fn insert(&self, author_id: UserId) -> CommentInsert {
        CommentInsert {
            post_id: self.post_id,
            author_id,
            content: self.content.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentInsert {
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
}

/// Fields a user may change on their own profile. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mentor: Option<bool>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_optional_text(
            "Full name",
            self.full_name.as_deref(),
            FULL_NAME_MAX_LEN,
        )?;
        validate_optional_text("Bio", self.bio.as_deref(), BIO_MAX_LEN)?;
        if self.interests.as_ref().is_some_and(|interests| {
            interests.iter().any(|i| i.trim().is_empty())
        }) {
            return Err(ValidationError::Empty("Interest"));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommunity {
    pub name: String,
    pub description: Option<String>,
}

impl NewCommunity {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("Community name", &self.name, COMMUNITY_NAME_MAX_LEN)?;
        validate_optional_text(
            "Description",
            self.description.as_deref(),
            COMMUNITY_DESCRIPTION_MAX_LEN,
        )
    }

    pub fn insert(&self, created_by: UserId) -> CommunityInsert {
        CommunityInsert {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            created_by,
            member_count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunityInsert {
    pub name: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipInsert {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub role: CommunityRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMentorshipRequest {
    pub mentor_id: UserId,
    pub message: String,
}

impl NewMentorshipRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text(
            "Message",
            &self.message,
            MENTORSHIP_MESSAGE_MAX_LEN,
        )
    }

    pub fn insert(&self, mentee_id: UserId) -> MentorshipRequestInsert {
        MentorshipRequestInsert {
            mentor_id: self.mentor_id,
            mentee_id,
            message: self.message.trim().to_string(),
            status: MentorshipStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MentorshipRequestInsert {
    pub mentor_id: UserId,
    pub mentee_id: UserId,
    pub message: String,
    pub status: MentorshipStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub content: String,
}

impl NewMessage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("Message", &self.content, MESSAGE_MAX_LEN)
    }

    pub fn insert(&self, sender_id: UserId) -> MessageInsert {
        MessageInsert {
            room_id: self.room_id,
            sender_id,
            content: self.content.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageInsert {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
}

#[derive(Serialize, Deserialize)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}
