use crate::{
    CommentId, CommunityId, MentorshipRequestId, MessageId, PostId, RoomId,
    Table, UserId,
};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub is_mentor: bool,
    pub created_at: Timestamp,
}

impl Profile {
    /// The name to show for this user: full name if set, otherwise the
    /// username.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

impl Table for Profile {
    const NAME: &'static str = "profiles";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub image_url: Option<String>,
    pub community_id: Option<CommunityId>,
    /// Maintained by the store when like rows change.
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl Table for Post {
    const NAME: &'static str = "posts";
}

/// Join row recording that a user liked a post. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLike {
    pub post_id: PostId,
    pub user_id: UserId,
}

impl Table for PostLike {
    const NAME: &'static str = "post_likes";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
}

impl Table for Comment {
    const NAME: &'static str = "comments";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub member_count: i64,
    pub created_by: UserId,
    pub created_at: Timestamp,
}

impl Table for Community {
    const NAME: &'static str = "communities";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityRole {
    Owner,
    Member,
}

/// Join row for community membership. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityMember {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub role: CommunityRole,
}

impl Table for CommunityMember {
    const NAME: &'static str = "community_members";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentorshipStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorshipRequest {
    pub id: MentorshipRequestId,
    pub mentor_id: UserId,
    pub mentee_id: UserId,
    pub message: String,
    pub status: MentorshipStatus,
    pub created_at: Timestamp,
}

impl Table for MentorshipRequest {
    const NAME: &'static str = "mentorship_requests";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
}

impl Table for ChatMessage {
    const NAME: &'static str = "chat_messages";
}
