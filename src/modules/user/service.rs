use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::api::error;
use crate::configs::{Cache, RedisCache};
use crate::ENV;

use crate::modules::user::model::{
    InsertUser, SignInModel, SignUpModel, UpdateUser, UpdateUserModel, UserResponse,
};
use crate::modules::user::repository::UserRepository;
use crate::utils::{hash_password, verify_password, Claims};

const PROFILE_CACHE_TTL: usize = 3600;

pub struct UserService<C: Cache = RedisCache> {
    repo: Arc<dyn UserRepository + Send + Sync>,
    cache: Arc<C>,
}

impl<C: Cache> Clone for UserService<C> {
    fn clone(&self) -> Self {
        UserService { repo: self.repo.clone(), cache: self.cache.clone() }
    }
}

impl<C: Cache> UserService<C> {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<C>,
    ) -> Self {
        UserService { repo, cache }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        let key = format!("user:{}", id);
        if let Some(cached) = self.cache.get::<UserResponse>(&key).await? {
            return Ok(cached);
        }
        let entity = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        let response = UserResponse::from(entity);
        self.cache.set(&key, &response, PROFILE_CACHE_TTL).await?;
        Ok(response)
    }

    pub async fn search(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserResponse>, error::SystemError> {
        let users = self.repo.search_users(query, limit).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        user: UpdateUserModel,
    ) -> Result<(), error::SystemError> {
        if user.username.is_none()
            && user.email.is_none()
            && user.display_name.is_none()
            && user.avatar_url.is_none()
            && user.bio.is_none()
            && user.phone.is_none()
            && user.tags.is_none()
        {
            return Err(error::SystemError::bad_request("No fields to update"));
        }

        let update_user = UpdateUser {
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            bio: user.bio,
            phone: user.phone,
            tags: user.tags,
        };

        self.repo.update(&id, &update_user).await?;

        self.cache.delete(&format!("user:{}", id)).await?;
        Ok(())
    }

    pub async fn sign_up(&self, user: SignUpModel) -> Result<Uuid, error::SystemError> {
        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            username: user.username,
            email: user.email,
            hash_password,
            display_name: user.display_name,
        };

        let user_id = self.repo.create(&new_user).await?;
        info!(user_id = %user_id, "new account registered");
        Ok(user_id)
    }

    pub async fn sign_in(&self, user: SignInModel) -> Result<(String, String), error::SystemError> {
        let user_entity = self
            .repo
            .find_by_username(&user.username)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid username or password"))?;

        let valid = verify_password(&user_entity.hash_password, &user.password)?;
        if !valid {
            return Err(error::SystemError::unauthorized("Invalid username or password"));
        }

        let access_token =
            Claims::new(&user_entity.id, &user_entity.role, ENV.access_token_expiration, None)
                .encode(ENV.jwt_secret.as_ref())?;

        let jti = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));

        let refresh_token = Claims::new(
            &user_entity.id,
            &user_entity.role,
            ENV.refresh_token_expiration,
            Some(&jti),
        )
        .encode(ENV.jwt_secret.as_ref())?;

        let refresh_key = format!("refresh_token:{jti}");
        self.cache
            .set(&refresh_key, &user_entity.id, ENV.refresh_token_expiration as usize)
            .await?;

        self.repo.set_online(&user_entity.id, true).await?;
        // The cached profile still carries the old online flag.
        self.cache.delete(&format!("user:{}", user_entity.id)).await?;

        Ok((access_token, refresh_token))
    }

    pub async fn sign_out(&self, refresh_token: Option<String>) -> Result<(), error::SystemError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        let claims = match Claims::decode(&token, ENV.jwt_secret.as_ref()) {
            Ok(c) => c,
            // Expired or garbled token: nothing to revoke.
            Err(_) => return Ok(()),
        };

        if let Some(jti) = claims.jti {
            self.cache.delete(&format!("refresh_token:{jti}")).await?;
        }

        self.repo.set_online(&claims.sub, false).await?;
        self.cache.delete(&format!("user:{}", claims.sub)).await?;
        Ok(())
    }

    pub async fn refresh(
        &self,
        refresh_token: Option<String>,
    ) -> Result<(String, String), error::SystemError> {
        let token = refresh_token
            .ok_or_else(|| error::SystemError::unauthorized("Missing refresh token"))?;

        let claims = Claims::decode(&token, ENV.jwt_secret.as_ref())
            .map_err(|_| error::SystemError::unauthorized("Invalid refresh token"))?;

        let jti =
            claims.jti.ok_or_else(|| error::SystemError::unauthorized("Invalid refresh token"))?;

        let stored: Option<Uuid> = self.cache.get(&format!("refresh_token:{jti}")).await?;
        if stored != Some(claims.sub) {
            return Err(error::SystemError::unauthorized("Refresh token revoked"));
        }

        // Rotate: drop the old jti before issuing the new pair.
        self.cache.delete(&format!("refresh_token:{jti}")).await?;

        let access_token =
            Claims::new(&claims.sub, &claims.role, ENV.access_token_expiration, None)
                .encode(ENV.jwt_secret.as_ref())?;

        let new_jti = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let new_refresh =
            Claims::new(&claims.sub, &claims.role, ENV.refresh_token_expiration, Some(&new_jti))
                .encode(ENV.jwt_secret.as_ref())?;

        self.cache
            .set(&format!("refresh_token:{new_jti}"), &claims.sub, ENV.refresh_token_expiration as usize)
            .await?;

        Ok((access_token, new_refresh))
    }
}
