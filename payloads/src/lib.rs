pub mod requests;
pub mod responses;
pub mod rest_client;
pub mod store;

pub use rest_client::RestClient;
pub use store::{
    AuthStore, AuthUser, Condition, DataStore, Filter, Op, Order, Query, Row,
    StoreError, Table, TableExt,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id type wrappers help ensure we don't mix up ids for different tables.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            derive_more::Display,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

id_type!(
    /// Auth user id. Profiles share the id of the user they describe.
    UserId
);
id_type!(PostId);
id_type!(CommentId);
id_type!(CommunityId);
id_type!(MentorshipRequestId);
id_type!(RoomId);
id_type!(MessageId);
