pub mod use_view_model;
pub mod use_view_models;

pub use use_view_model::{ViewModelHandle, use_view_model};
pub use use_view_models::{
    use_chat, use_comments, use_communities, use_feed, use_mentors,
    use_mentorship_requests, use_profile,
};
