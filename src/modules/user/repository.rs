use uuid::Uuid;

use crate::{
    api::error,
    modules::user::model::{InsertUser, UpdateUser},
    modules::user::schema::UserEntity,
};

/// Profile directory. The friend module reads profiles through this trait
/// only; ownership of the data belongs here.
#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError>;

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError>;

    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserEntity, error::SystemError>;

    async fn set_online(&self, id: &Uuid, online: bool) -> Result<(), error::SystemError>;

    /// Most recently created profiles, excluding `exclude`. Candidate pool
    /// for friend recommendations.
    async fn find_recent(
        &self,
        exclude: &Uuid,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError>;

    /// Search users by username or display name (case-insensitive, partial match)
    async fn search_users(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError>;
}
