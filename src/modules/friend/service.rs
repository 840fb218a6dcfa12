use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::RECOMMENDATION_POOL_SIZE;
use crate::modules::{
    friend::{
        error::FriendError,
        events::{FriendEventHub, FriendGraphEvent, Subscription},
        model::{FriendProfile, FriendRequestView, FriendshipStats, FriendshipView, ReadOutcome},
        repository::FriendStore,
        schema::{FriendRequestEntity, RequestStatus},
    },
    user::repository::UserRepository,
};

/// The friendship lifecycle manager. Owns request creation, acceptance,
/// decline, cancellation, friendship formation and removal, listings with
/// profile resolution, recommendations, stats and live change feeds.
///
/// Constructed once at startup with its two collaborators injected; there is
/// no global instance.
pub struct FriendService<R, U>
where
    R: FriendStore + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    friend_repo: Arc<R>,
    user_repo: Arc<U>,
    events: Arc<FriendEventHub>,
}

impl<R, U> Clone for FriendService<R, U>
where
    R: FriendStore + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        FriendService {
            friend_repo: self.friend_repo.clone(),
            user_repo: self.user_repo.clone(),
            events: self.events.clone(),
        }
    }
}

impl<R, U> FriendService<R, U>
where
    R: FriendStore + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        friend_repo: Arc<R>,
        user_repo: Arc<U>,
        events: Arc<FriendEventHub>,
    ) -> Self {
        FriendService { friend_repo, user_repo, events }
    }

    /// Creates a pending request from `sender_id` to `recipient_id`.
    ///
    /// Check order: already friends, duplicate pending request in the same
    /// direction, then pending request in the reverse direction (the caller
    /// should accept that one instead). Nothing but the single insert happens
    /// on success.
    pub async fn send_friend_request(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Uuid, FriendError> {
        if sender_id == recipient_id {
            return Err(FriendError::SelfRequest);
        }

        if self.user_repo.find_by_id(&recipient_id).await.map_err(FriendError::Backend)?.is_none()
        {
            return Err(FriendError::NotFound("user"));
        }

        let (friendship, pending) = tokio::try_join!(
            self.friend_repo.find_friendship(&sender_id, &recipient_id),
            self.friend_repo.find_pending_between(&sender_id, &recipient_id),
        )?;

        if friendship.is_some() {
            return Err(FriendError::AlreadyFriends);
        }

        if let Some(request) = pending {
            if request.from_user_id == sender_id {
                return Err(FriendError::DuplicateRequest);
            }
            return Err(FriendError::ReciprocalRequestExists);
        }

        let request = self.friend_repo.create_request(&sender_id, &recipient_id).await?;
        debug!(request_id = %request.id, %sender_id, %recipient_id, "friend request sent");

        self.events.publish(FriendGraphEvent::new(sender_id, recipient_id));
        Ok(request.id)
    }

    /// Accepts a pending request addressed to `acting_user`.
    ///
    /// The status update and the friendship insert are two independent
    /// writes, status first: an observer may briefly see an accepted request
    /// without its friendship, never the reverse.
    pub async fn accept_friend_request(
        &self,
        acting_user: Uuid,
        request_id: Uuid,
    ) -> Result<(), FriendError> {
        let request = self.load_pending(acting_user, request_id, Role::Recipient).await?;

        self.friend_repo.set_request_status(&request_id, RequestStatus::Accepted).await?;
        self.friend_repo
            .create_friendship(&request.from_user_id, &request.to_user_id)
            .await?;
        debug!(%request_id, "friend request accepted");

        self.events.publish(FriendGraphEvent::new(request.from_user_id, request.to_user_id));
        Ok(())
    }

    /// Declines a pending request addressed to `acting_user`. Terminal.
    pub async fn decline_friend_request(
        &self,
        acting_user: Uuid,
        request_id: Uuid,
    ) -> Result<(), FriendError> {
        let request = self.load_pending(acting_user, request_id, Role::Recipient).await?;

        self.friend_repo.set_request_status(&request_id, RequestStatus::Declined).await?;
        debug!(%request_id, "friend request declined");

        self.events.publish(FriendGraphEvent::new(request.from_user_id, request.to_user_id));
        Ok(())
    }

    /// Cancels a request `acting_user` sent. Deletes the row outright; no
    /// terminal status is retained.
    pub async fn cancel_friend_request(
        &self,
        acting_user: Uuid,
        request_id: Uuid,
    ) -> Result<(), FriendError> {
        let request = self.load_pending(acting_user, request_id, Role::Sender).await?;

        self.friend_repo.delete_request(&request_id).await?;
        debug!(%request_id, "friend request cancelled");

        self.events.publish(FriendGraphEvent::new(request.from_user_id, request.to_user_id));
        Ok(())
    }

    /// Full unfriend. Leaves no residual state; either party must send a
    /// fresh request to reconnect.
    pub async fn remove_friendship(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
    ) -> Result<(), FriendError> {
        let deleted = self.friend_repo.delete_friendship(&user_id, &friend_id).await?;
        if !deleted {
            return Err(FriendError::NotFound("friendship"));
        }

        self.events.publish(FriendGraphEvent::new(user_id, friend_id));
        Ok(())
    }

    async fn load_pending(
        &self,
        acting_user: Uuid,
        request_id: Uuid,
        role: Role,
    ) -> Result<FriendRequestEntity, FriendError> {
        let request = self
            .friend_repo
            .find_request_by_id(&request_id)
            .await?
            .ok_or(FriendError::NotFound("friend request"))?;

        let owner = match role {
            Role::Recipient => request.to_user_id,
            Role::Sender => request.from_user_id,
        };
        if owner != acting_user {
            return Err(FriendError::Forbidden);
        }

        if request.status != RequestStatus::Pending {
            return Err(FriendError::NotPending);
        }

        Ok(request)
    }

    /// Friendships involving `user_id`, newest first, with the counterpart
    /// profile resolved. Rows whose profile lookup fails are dropped; a
    /// failed query degrades instead of erroring.
    pub async fn get_user_friendships(&self, user_id: Uuid) -> ReadOutcome<FriendshipView> {
        let friendships = match self.friend_repo.find_friendships_for(&user_id).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(%user_id, error = %err, "friendship listing degraded");
                return ReadOutcome::degraded(err.to_string());
            }
        };

        let mut views = Vec::with_capacity(friendships.len());
        for friendship in friendships {
            let counterpart = friendship.counterpart(&user_id);
            if let Some(profile) = self.resolve_profile(&counterpart).await {
                views.push(FriendshipView { friend: profile, since: friendship.created_at });
            }
        }
        ReadOutcome::Loaded(views)
    }

    /// Pending requests addressed to `user_id`; counterpart is the sender.
    pub async fn get_pending_friend_requests(&self, user_id: Uuid) -> ReadOutcome<FriendRequestView> {
        let requests = match self.friend_repo.find_pending_to(&user_id).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(%user_id, error = %err, "pending request listing degraded");
                return ReadOutcome::degraded(err.to_string());
            }
        };
        self.resolve_request_views(requests, |r| r.from_user_id).await
    }

    /// Pending requests sent by `user_id`; counterpart is the recipient.
    pub async fn get_sent_friend_requests(&self, user_id: Uuid) -> ReadOutcome<FriendRequestView> {
        let requests = match self.friend_repo.find_pending_from(&user_id).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(%user_id, error = %err, "sent request listing degraded");
                return ReadOutcome::degraded(err.to_string());
            }
        };
        self.resolve_request_views(requests, |r| r.to_user_id).await
    }

    async fn resolve_request_views(
        &self,
        requests: Vec<FriendRequestEntity>,
        counterpart_of: impl Fn(&FriendRequestEntity) -> Uuid,
    ) -> ReadOutcome<FriendRequestView> {
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            let counterpart = counterpart_of(&request);
            if let Some(profile) = self.resolve_profile(&counterpart).await {
                views.push(FriendRequestView {
                    id: request.id,
                    counterpart: profile,
                    created_at: request.created_at,
                });
            }
        }
        ReadOutcome::Loaded(views)
    }

    /// One failed lookup drops one row, never the whole listing.
    async fn resolve_profile(&self, user_id: &Uuid) -> Option<FriendProfile> {
        match self.user_repo.find_by_id(user_id).await {
            Ok(Some(user)) => Some(FriendProfile::from(user)),
            Ok(None) => None,
            Err(err) => {
                warn!(%user_id, error = %err, "profile lookup failed, dropping row");
                None
            }
        }
    }

    /// Best-effort recommender: a bounded pool of the newest profiles minus
    /// the user's friends and anyone in a pending request with them. May
    /// return fewer than `limit` entries, or none, when the pool is thin.
    pub async fn get_recommended_friends(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> ReadOutcome<FriendProfile> {
        let candidates =
            match self.user_repo.find_recent(&user_id, RECOMMENDATION_POOL_SIZE).await {
                Ok(users) => users,
                Err(err) => {
                    warn!(%user_id, error = %err, "recommendation pool degraded");
                    return ReadOutcome::degraded(err.to_string());
                }
            };

        let excluded = match self.connected_user_ids(&user_id).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(%user_id, error = %err, "recommendation exclusion set degraded");
                return ReadOutcome::degraded(err.to_string());
            }
        };

        let recommended = candidates
            .into_iter()
            .filter(|user| !excluded.contains(&user.id))
            .take(limit)
            .map(FriendProfile::from)
            .collect();
        ReadOutcome::Loaded(recommended)
    }

    /// Friend IDs plus every ID involved in a pending request touching the
    /// user, sent or received.
    async fn connected_user_ids(
        &self,
        user_id: &Uuid,
    ) -> Result<HashSet<Uuid>, crate::api::error::SystemError> {
        let (friendships, incoming, outgoing) = tokio::try_join!(
            self.friend_repo.find_friendships_for(user_id),
            self.friend_repo.find_pending_to(user_id),
            self.friend_repo.find_pending_from(user_id),
        )?;

        let mut ids = HashSet::new();
        for friendship in &friendships {
            ids.insert(friendship.counterpart(user_id));
        }
        for request in incoming.iter().chain(outgoing.iter()) {
            ids.insert(request.from_user_id);
            ids.insert(request.to_user_id);
        }
        ids.remove(user_id);
        Ok(ids)
    }

    /// Counts from the three listings, issued concurrently. A degraded
    /// listing counts as zero; this call never fails.
    pub async fn get_friendship_stats(&self, user_id: Uuid) -> FriendshipStats {
        let (friendships, pending, sent) = tokio::join!(
            self.get_user_friendships(user_id),
            self.get_pending_friend_requests(user_id),
            self.get_sent_friend_requests(user_id),
        );

        FriendshipStats {
            friends_count: friendships.len(),
            pending_requests_count: pending.len(),
            sent_requests_count: sent.len(),
        }
    }

    /// Accepts every valid pending request in `request_ids` addressed to
    /// `acting_user` as one atomic batch. IDs that are unknown, not pending,
    /// or not addressed to the acting user are silently skipped; they are
    /// never part of the batch and never reported.
    pub async fn bulk_accept_friend_requests(
        &self,
        acting_user: Uuid,
        request_ids: &[Uuid],
    ) -> Result<(), FriendError> {
        let mut valid = Vec::with_capacity(request_ids.len());
        let mut seen = HashSet::new();

        for request_id in request_ids {
            if !seen.insert(*request_id) {
                continue;
            }
            let Some(request) = self.friend_repo.find_request_by_id(request_id).await? else {
                continue;
            };
            if request.status != RequestStatus::Pending || request.to_user_id != acting_user {
                continue;
            }
            valid.push(request);
        }

        if valid.is_empty() {
            return Ok(());
        }

        self.friend_repo.bulk_accept(&valid).await?;
        debug!(count = valid.len(), "bulk accepted friend requests");

        for request in &valid {
            self.events.publish(FriendGraphEvent::new(request.from_user_id, request.to_user_id));
        }
        Ok(())
    }

    /// Live feed of the user's friendship list: one initial snapshot, then
    /// the full re-resolved list after every change touching the user. On a
    /// feed-level failure the callback sees one empty list and the feed
    /// stops; re-subscribe to recover.
    pub fn subscribe_to_friendships(
        &self,
        user_id: Uuid,
        callback: impl Fn(Vec<FriendshipView>) + Send + Sync + 'static,
    ) -> Subscription {
        let service = self.clone();
        self.spawn_feed(
            user_id,
            move |uid| {
                let service = service.clone();
                async move { service.get_user_friendships(uid).await }.boxed()
            },
            callback,
        )
    }

    /// Live feed of requests addressed to the user. Same contract as
    /// [`Self::subscribe_to_friendships`].
    pub fn subscribe_to_friend_requests(
        &self,
        user_id: Uuid,
        callback: impl Fn(Vec<FriendRequestView>) + Send + Sync + 'static,
    ) -> Subscription {
        let service = self.clone();
        self.spawn_feed(
            user_id,
            move |uid| {
                let service = service.clone();
                async move { service.get_pending_friend_requests(uid).await }.boxed()
            },
            callback,
        )
    }

    /// Live feed of requests the user sent. Same contract as
    /// [`Self::subscribe_to_friendships`].
    pub fn subscribe_to_sent_friend_requests(
        &self,
        user_id: Uuid,
        callback: impl Fn(Vec<FriendRequestView>) + Send + Sync + 'static,
    ) -> Subscription {
        let service = self.clone();
        self.spawn_feed(
            user_id,
            move |uid| {
                let service = service.clone();
                async move { service.get_sent_friend_requests(uid).await }.boxed()
            },
            callback,
        )
    }

    fn spawn_feed<T, F, C>(&self, user_id: Uuid, fetch: F, callback: C) -> Subscription
    where
        T: Send + 'static,
        F: Fn(Uuid) -> BoxFuture<'static, ReadOutcome<T>> + Send + 'static,
        C: Fn(Vec<T>) + Send + Sync + 'static,
    {
        let mut receiver = self.events.listen();

        let task = tokio::spawn(async move {
            match fetch(user_id).await {
                ReadOutcome::Loaded(items) => callback(items),
                ReadOutcome::Degraded(reason) => {
                    warn!(%user_id, %reason, "feed failed on initial snapshot");
                    callback(Vec::new());
                    return;
                }
            }

            loop {
                match receiver.recv().await {
                    Ok(event) if event.touches(&user_id) => {
                        match fetch(user_id).await {
                            ReadOutcome::Loaded(items) => callback(items),
                            ReadOutcome::Degraded(reason) => {
                                warn!(%user_id, %reason, "feed degraded, stopping");
                                callback(Vec::new());
                                return;
                            }
                        }
                    }
                    Ok(_) => {}
                    // Missed events: the next delivery is a full snapshot
                    // anyway, so just resync.
                    Err(broadcast::error::RecvError::Lagged(_)) => match fetch(user_id).await {
                        ReadOutcome::Loaded(items) => callback(items),
                        ReadOutcome::Degraded(reason) => {
                            warn!(%user_id, %reason, "feed degraded, stopping");
                            callback(Vec::new());
                            return;
                        }
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        callback(Vec::new());
                        return;
                    }
                }
            }
        });

        Subscription::new(task)
    }
}

enum Role {
    Sender,
    Recipient,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::SystemError;
    use crate::modules::friend::repository::{FriendRequestRepository, FriendshipRepository};
    use crate::modules::friend::schema::{canonical_pair, FriendshipEntity};
    use crate::modules::user::model::{InsertUser, UpdateUser};
    use crate::modules::user::schema::{UserEntity, UserRole};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryStore {
        users: Mutex<HashMap<Uuid, UserEntity>>,
        requests: Mutex<HashMap<Uuid, FriendRequestEntity>>,
        friendships: Mutex<Vec<FriendshipEntity>>,
        fail_friend_reads: AtomicBool,
    }

    impl MemoryStore {
        fn check_reads(&self) -> Result<(), SystemError> {
            if self.fail_friend_reads.load(Ordering::SeqCst) {
                Err(SystemError::DatabaseError("store unavailable".into()))
            } else {
                Ok(())
            }
        }

        fn add_user(&self, username: &str) -> Uuid {
            let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
            let now = chrono::Utc::now();
            let user = UserEntity {
                id,
                username: username.to_string(),
                email: format!("{username}@example.com"),
                hash_password: String::new(),
                role: UserRole::User,
                display_name: username.to_string(),
                avatar_url: None,
                bio: None,
                phone: None,
                is_online: false,
                tags: Vec::new(),
                deleted_at: None,
                created_at: now,
                updated_at: now,
            };
            self.users.lock().unwrap().insert(id, user);
            id
        }

        fn remove_user(&self, id: &Uuid) {
            self.users.lock().unwrap().remove(id);
        }

        fn request(&self, id: &Uuid) -> Option<FriendRequestEntity> {
            self.requests.lock().unwrap().get(id).cloned()
        }

        fn friendship_count(&self) -> usize {
            self.friendships.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl UserRepository for MemoryStore {
        async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, SystemError> {
            Ok(self.users.lock().unwrap().get(id).cloned())
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserEntity>, SystemError> {
            Ok(self.users.lock().unwrap().values().find(|u| u.username == username).cloned())
        }

        async fn create(&self, user: &InsertUser) -> Result<Uuid, SystemError> {
            Ok(self.add_user(&user.username))
        }

        async fn update(&self, _id: &Uuid, _user: &UpdateUser) -> Result<UserEntity, SystemError> {
            Err(SystemError::bad_request("not supported in tests"))
        }

        async fn set_online(&self, _id: &Uuid, _online: bool) -> Result<(), SystemError> {
            Ok(())
        }

        async fn find_recent(
            &self,
            exclude: &Uuid,
            limit: i64,
        ) -> Result<Vec<UserEntity>, SystemError> {
            let mut users: Vec<UserEntity> = self
                .users
                .lock()
                .unwrap()
                .values()
                .filter(|u| u.id != *exclude)
                .cloned()
                .collect();
            users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            users.truncate(limit as usize);
            Ok(users)
        }

        async fn search_users(
            &self,
            _query: &str,
            _limit: i64,
        ) -> Result<Vec<UserEntity>, SystemError> {
            Ok(Vec::new())
        }
    }

    #[async_trait::async_trait]
    impl FriendshipRepository for MemoryStore {
        async fn find_friendship(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<Option<FriendshipEntity>, SystemError> {
            let (a, b) = canonical_pair(*user_id_a, *user_id_b);
            Ok(self
                .friendships
                .lock()
                .unwrap()
                .iter()
                .find(|f| f.user_a == a && f.user_b == b)
                .cloned())
        }

        async fn find_friendships_for(
            &self,
            user_id: &Uuid,
        ) -> Result<Vec<FriendshipEntity>, SystemError> {
            self.check_reads()?;
            let mut rows: Vec<FriendshipEntity> = self
                .friendships
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.user_a == *user_id || f.user_b == *user_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn create_friendship(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<(), SystemError> {
            let (a, b) = canonical_pair(*user_id_a, *user_id_b);
            let mut friendships = self.friendships.lock().unwrap();
            if !friendships.iter().any(|f| f.user_a == a && f.user_b == b) {
                friendships.push(FriendshipEntity {
                    user_a: a,
                    user_b: b,
                    created_at: chrono::Utc::now(),
                });
            }
            Ok(())
        }

        async fn delete_friendship(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<bool, SystemError> {
            let (a, b) = canonical_pair(*user_id_a, *user_id_b);
            let mut friendships = self.friendships.lock().unwrap();
            let before = friendships.len();
            friendships.retain(|f| !(f.user_a == a && f.user_b == b));
            Ok(friendships.len() < before)
        }
    }

    #[async_trait::async_trait]
    impl FriendRequestRepository for MemoryStore {
        async fn find_request_by_id(
            &self,
            request_id: &Uuid,
        ) -> Result<Option<FriendRequestEntity>, SystemError> {
            Ok(self.requests.lock().unwrap().get(request_id).cloned())
        }

        async fn find_pending_between(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<Option<FriendRequestEntity>, SystemError> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .values()
                .find(|r| {
                    r.status == RequestStatus::Pending
                        && ((r.from_user_id == *user_id_a && r.to_user_id == *user_id_b)
                            || (r.from_user_id == *user_id_b && r.to_user_id == *user_id_a))
                })
                .cloned())
        }

        async fn find_pending_to(
            &self,
            user_id: &Uuid,
        ) -> Result<Vec<FriendRequestEntity>, SystemError> {
            self.check_reads()?;
            let mut rows: Vec<FriendRequestEntity> = self
                .requests
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.to_user_id == *user_id && r.status == RequestStatus::Pending)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn find_pending_from(
            &self,
            user_id: &Uuid,
        ) -> Result<Vec<FriendRequestEntity>, SystemError> {
            self.check_reads()?;
            let mut rows: Vec<FriendRequestEntity> = self
                .requests
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.from_user_id == *user_id && r.status == RequestStatus::Pending)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn create_request(
            &self,
            sender_id: &Uuid,
            recipient_id: &Uuid,
        ) -> Result<FriendRequestEntity, SystemError> {
            let now = chrono::Utc::now();
            let request = FriendRequestEntity {
                id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
                from_user_id: *sender_id,
                to_user_id: *recipient_id,
                status: RequestStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            self.requests.lock().unwrap().insert(request.id, request.clone());
            Ok(request)
        }

        async fn set_request_status(
            &self,
            request_id: &Uuid,
            status: RequestStatus,
        ) -> Result<(), SystemError> {
            if let Some(request) = self.requests.lock().unwrap().get_mut(request_id) {
                request.status = status;
                request.updated_at = chrono::Utc::now();
            }
            Ok(())
        }

        async fn delete_request(&self, request_id: &Uuid) -> Result<(), SystemError> {
            self.requests.lock().unwrap().remove(request_id);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl FriendStore for MemoryStore {
        async fn bulk_accept(
            &self,
            requests: &[FriendRequestEntity],
        ) -> Result<(), SystemError> {
            for request in requests {
                self.set_request_status(&request.id, RequestStatus::Accepted).await?;
                self.create_friendship(&request.from_user_id, &request.to_user_id).await?;
            }
            Ok(())
        }
    }

    fn service() -> (FriendService<MemoryStore, MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let service = FriendService::with_dependencies(
            store.clone(),
            store.clone(),
            Arc::new(FriendEventHub::new()),
        );
        (service, store)
    }

    #[tokio::test]
    async fn send_rejects_duplicate_and_reciprocal_requests() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        service.send_friend_request(alice, bob).await.unwrap();

        assert!(matches!(
            service.send_friend_request(alice, bob).await,
            Err(FriendError::DuplicateRequest)
        ));
        assert!(matches!(
            service.send_friend_request(bob, alice).await,
            Err(FriendError::ReciprocalRequestExists)
        ));
    }

    #[tokio::test]
    async fn send_rejects_self_and_unknown_recipient() {
        let (service, store) = service();
        let alice = store.add_user("alice");

        assert!(matches!(
            service.send_friend_request(alice, alice).await,
            Err(FriendError::SelfRequest)
        ));
        let ghost = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        assert!(matches!(
            service.send_friend_request(alice, ghost).await,
            Err(FriendError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn accept_creates_one_canonical_friendship() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let request_id = service.send_friend_request(alice, bob).await.unwrap();
        service.accept_friend_request(bob, request_id).await.unwrap();

        let ab = store.find_friendship(&alice, &bob).await.unwrap().unwrap();
        let ba = store.find_friendship(&bob, &alice).await.unwrap().unwrap();
        assert_eq!((ab.user_a, ab.user_b), (ba.user_a, ba.user_b));
        assert_eq!(store.friendship_count(), 1);
        assert_eq!(store.request(&request_id).unwrap().status, RequestStatus::Accepted);
    }

    #[tokio::test]
    async fn accept_twice_fails_not_pending() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let request_id = service.send_friend_request(alice, bob).await.unwrap();
        service.accept_friend_request(bob, request_id).await.unwrap();

        assert!(matches!(
            service.accept_friend_request(bob, request_id).await,
            Err(FriendError::NotPending)
        ));
        assert_eq!(store.friendship_count(), 1);
    }

    #[tokio::test]
    async fn only_the_recipient_may_accept() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let request_id = service.send_friend_request(alice, bob).await.unwrap();

        assert!(matches!(
            service.accept_friend_request(alice, request_id).await,
            Err(FriendError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn decline_is_terminal() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let request_id = service.send_friend_request(alice, bob).await.unwrap();
        service.decline_friend_request(bob, request_id).await.unwrap();

        assert_eq!(store.request(&request_id).unwrap().status, RequestStatus::Declined);
        assert!(matches!(
            service.accept_friend_request(bob, request_id).await,
            Err(FriendError::NotPending)
        ));
        assert_eq!(store.friendship_count(), 0);
    }

    #[tokio::test]
    async fn cancel_deletes_the_request_without_trace() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let request_id = service.send_friend_request(alice, bob).await.unwrap();
        service.cancel_friend_request(alice, request_id).await.unwrap();

        assert!(store.request(&request_id).is_none());
        // The pair is unblocked again.
        service.send_friend_request(alice, bob).await.unwrap();
    }

    #[tokio::test]
    async fn remove_friendship_leaves_no_residual_block() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let request_id = service.send_friend_request(alice, bob).await.unwrap();
        service.accept_friend_request(bob, request_id).await.unwrap();

        service.remove_friendship(alice, bob).await.unwrap();
        assert!(matches!(
            service.remove_friendship(alice, bob).await,
            Err(FriendError::NotFound("friendship"))
        ));

        service.send_friend_request(alice, bob).await.unwrap();
    }

    #[tokio::test]
    async fn accepted_request_blocks_resend_via_already_friends() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let request_id = service.send_friend_request(alice, bob).await.unwrap();
        service.accept_friend_request(bob, request_id).await.unwrap();

        assert!(matches!(
            service.send_friend_request(alice, bob).await,
            Err(FriendError::AlreadyFriends)
        ));
    }

    #[tokio::test]
    async fn pending_listing_then_accept_links_both_sides() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let request_id = service.send_friend_request(alice, bob).await.unwrap();

        let pending = service.get_pending_friend_requests(bob).await.into_items();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].counterpart.id, alice);
        assert_eq!(pending[0].id, request_id);

        let sent = service.get_sent_friend_requests(alice).await.into_items();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].counterpart.id, bob);

        service.accept_friend_request(bob, request_id).await.unwrap();

        let alice_friends = service.get_user_friendships(alice).await.into_items();
        let bob_friends = service.get_user_friendships(bob).await.into_items();
        assert_eq!(alice_friends.len(), 1);
        assert_eq!(alice_friends[0].friend.id, bob);
        assert_eq!(bob_friends.len(), 1);
        assert_eq!(bob_friends[0].friend.id, alice);
    }

    #[tokio::test]
    async fn bulk_accept_skips_invalid_entries_silently() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");
        let carol = store.add_user("carol");

        let r1 = service.send_friend_request(alice, carol).await.unwrap();
        let r2 = service.send_friend_request(bob, carol).await.unwrap();
        service.decline_friend_request(carol, r2).await.unwrap();

        let unknown = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        service.bulk_accept_friend_requests(carol, &[r1, r2, unknown]).await.unwrap();

        assert_eq!(store.request(&r1).unwrap().status, RequestStatus::Accepted);
        assert_eq!(store.request(&r2).unwrap().status, RequestStatus::Declined);
        assert_eq!(store.friendship_count(), 1);
        assert!(store.find_friendship(&alice, &carol).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn recommendations_exclude_friends_and_pending() {
        let (service, store) = service();
        let me = store.add_user("me");
        let friend1 = store.add_user("friend1");
        let friend2 = store.add_user("friend2");
        let pending = store.add_user("pending");
        let eligible1 = store.add_user("eligible1");
        let eligible2 = store.add_user("eligible2");

        for friend in [friend1, friend2] {
            let id = service.send_friend_request(me, friend).await.unwrap();
            service.accept_friend_request(friend, id).await.unwrap();
        }
        service.send_friend_request(pending, me).await.unwrap();

        let recommended = service.get_recommended_friends(me, 3).await.into_items();
        let ids: HashSet<Uuid> = recommended.iter().map(|p| p.id).collect();
        assert_eq!(ids, HashSet::from([eligible1, eligible2]));
    }

    #[tokio::test]
    async fn stats_count_all_three_collections() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");
        let carol = store.add_user("carol");
        let dave = store.add_user("dave");

        let id = service.send_friend_request(alice, bob).await.unwrap();
        service.accept_friend_request(bob, id).await.unwrap();
        service.send_friend_request(carol, alice).await.unwrap();
        service.send_friend_request(alice, dave).await.unwrap();

        let stats = service.get_friendship_stats(alice).await;
        assert_eq!(
            stats,
            FriendshipStats {
                friends_count: 1,
                pending_requests_count: 1,
                sent_requests_count: 1
            }
        );
    }

    #[tokio::test]
    async fn degraded_reads_project_to_empty_and_zero_stats() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");
        let id = service.send_friend_request(alice, bob).await.unwrap();
        service.accept_friend_request(bob, id).await.unwrap();

        store.fail_friend_reads.store(true, Ordering::SeqCst);

        let friendships = service.get_user_friendships(alice).await;
        assert!(friendships.is_degraded());
        assert!(friendships.into_items().is_empty());

        let stats = service.get_friendship_stats(alice).await;
        assert_eq!(stats, FriendshipStats::default());
    }

    #[tokio::test]
    async fn listings_drop_rows_with_missing_profiles() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");
        let carol = store.add_user("carol");

        service.send_friend_request(bob, alice).await.unwrap();
        service.send_friend_request(carol, alice).await.unwrap();

        store.remove_user(&carol);

        let pending = service.get_pending_friend_requests(alice).await.into_items();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].counterpart.id, bob);
    }

    #[tokio::test]
    async fn friendship_feed_delivers_snapshot_then_changes() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = service.subscribe_to_friendships(alice, move |list| {
            let _ = tx.send(list);
        });

        let initial = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(initial.is_empty());

        let request_id = service.send_friend_request(bob, alice).await.unwrap();
        // The send itself touches alice, so the feed re-delivers the (still
        // empty) friendship list before the accept lands.
        let mut update = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(update.is_empty());

        service.accept_friend_request(alice, request_id).await.unwrap();
        update = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update[0].friend.id, bob);

        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn request_feed_tracks_pending_requests() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _subscription = service.subscribe_to_friend_requests(bob, move |list| {
            let _ = tx.send(list);
        });

        let initial = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(initial.is_empty());

        service.send_friend_request(alice, bob).await.unwrap();
        let update = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update[0].counterpart.id, alice);
    }

    #[tokio::test]
    async fn feed_failure_delivers_one_empty_list_then_stops() {
        let (service, store) = service();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _subscription = service.subscribe_to_friendships(alice, move |list| {
            let _ = tx.send(list);
        });

        let initial = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(initial.is_empty());

        store.fail_friend_reads.store(true, Ordering::SeqCst);

        // Writes still land while only the listing reads fail, so this event
        // drives the feed into its degraded fetch.
        service.send_friend_request(bob, alice).await.unwrap();

        let last = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(last.is_empty());

        // The feed task ended and dropped the callback: the channel closes
        // with nothing further delivered.
        let closed = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(closed.is_none());
    }
}
