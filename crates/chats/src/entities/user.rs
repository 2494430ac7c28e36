use serde::{Deserialize, Serialize};

use crate::types::UserId;

pub use parley_database::UserStatus;

/// Public identity of a user as shown next to conversations and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub status: UserStatus,
}
