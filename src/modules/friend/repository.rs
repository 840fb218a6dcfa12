use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::schema::{FriendRequestEntity, FriendshipEntity, RequestStatus};

/// Friendship rows, keyed by canonical pair. Implementations must normalize
/// the pair themselves so no caller can bypass the ordering.
#[async_trait::async_trait]
pub trait FriendshipRepository {
    async fn find_friendship(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<FriendshipEntity>, error::SystemError>;

    /// All friendships involving `user_id`, newest first.
    async fn find_friendships_for(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendshipEntity>, error::SystemError>;

    async fn create_friendship(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<(), error::SystemError>;

    /// Returns whether a row was actually deleted.
    async fn delete_friendship(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<bool, error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRequestRepository {
    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    /// The pending request between two users in either direction, if any.
    /// The caller inspects `from_user_id` to tell duplicate from reciprocal.
    async fn find_pending_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    /// Pending requests addressed to `user_id`, newest first.
    async fn find_pending_to(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError>;

    /// Pending requests sent by `user_id`, newest first.
    async fn find_pending_from(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError>;

    async fn create_request(
        &self,
        sender_id: &Uuid,
        recipient_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError>;

    async fn set_request_status(
        &self,
        request_id: &Uuid,
        status: RequestStatus,
    ) -> Result<(), error::SystemError>;

    async fn delete_request(&self, request_id: &Uuid) -> Result<(), error::SystemError>;
}

/// The full store the lifecycle manager is built on.
#[async_trait::async_trait]
pub trait FriendStore: FriendshipRepository + FriendRequestRepository + Send + Sync {
    /// Marks every given request accepted and creates the matching
    /// friendships as one atomic batch. Callers pass only revalidated pending
    /// requests; either all of them apply or none do.
    async fn bulk_accept(
        &self,
        requests: &[FriendRequestEntity],
    ) -> Result<(), error::SystemError>;
}
