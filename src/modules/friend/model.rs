use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::user::schema::UserEntity;

/// The slice of a profile the friend views expose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_online: bool,
}

impl From<UserEntity> for FriendProfile {
    fn from(user: UserEntity) -> Self {
        FriendProfile {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            is_online: user.is_online,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendshipView {
    pub friend: FriendProfile,
    pub since: chrono::DateTime<chrono::Utc>,
}

/// A pending request as seen from one side: `counterpart` is the sender for
/// received requests and the recipient for sent ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestView {
    pub id: Uuid,
    pub counterpart: FriendProfile,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FriendshipStats {
    pub friends_count: usize,
    pub pending_requests_count: usize,
    pub sent_requests_count: usize,
}

/// Outcome of a read that deliberately never fails: either the data, or a
/// marker that the backend degraded and the data is unknown. The default
/// projection of `Degraded` is the empty list, which preserves the
/// availability-over-correctness behavior the UI expects, while callers that
/// care can still tell the two apart.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    Loaded(Vec<T>),
    Degraded(Cow<'static, str>),
}

impl<T> ReadOutcome<T> {
    pub fn degraded(reason: impl Into<Cow<'static, str>>) -> Self {
        ReadOutcome::Degraded(reason.into())
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ReadOutcome::Degraded(_))
    }

    pub fn len(&self) -> usize {
        match self {
            ReadOutcome::Loaded(items) => items.len(),
            ReadOutcome::Degraded(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            ReadOutcome::Loaded(items) => items,
            ReadOutcome::Degraded(_) => Vec::new(),
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendRequestBody {
    pub recipient_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendRequestResponse {
    pub request_id: Uuid,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkAcceptBody {
    #[validate(length(min = 1, message = "At least one request id is required"))]
    pub request_ids: Vec<Uuid>,
}

#[derive(Deserialize, Validate)]
pub struct RecommendedQuery {
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: Option<usize>,
}
