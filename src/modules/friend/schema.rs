use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

/// Friend-request lifecycle. `pending` may transition once to `accepted` or
/// `declined`, or be deleted by cancellation; nothing leaves the terminal
/// states.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FriendRequestEntity {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Stored with `user_a < user_b` so that (A,B) and (B,A) resolve to the same
/// row. Always go through [`canonical_pair`] before touching this table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FriendshipEntity {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl FriendshipEntity {
    /// The other side of the friendship, as seen by `user_id`.
    pub fn counterpart(&self, user_id: &Uuid) -> Uuid {
        if self.user_a == *user_id {
            self.user_b
        } else {
            self.user_a
        }
    }
}

/// Normalizes an unordered user pair to a fixed order. Single source of
/// ordering for every friendship read and write path.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
