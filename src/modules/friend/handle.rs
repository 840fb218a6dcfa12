use actix_web::{delete, get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        friend::{
            model::{
                BulkAcceptBody, FriendProfile, FriendRequestView, FriendshipStats, FriendshipView,
                RecommendedQuery, SendFriendRequestBody, SendFriendRequestResponse,
            },
            repository_pg::FriendRepositoryPg,
            service::FriendService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub type FriendSvc = FriendService<FriendRepositoryPg, UserRepositoryPg>;

const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

#[post("/requests")]
pub async fn send_friend_request(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<SendFriendRequestBody>,
    req: HttpRequest,
) -> Result<success::Success<SendFriendRequestResponse>, error::Error> {
    let sender_id = get_claims(&req)?.sub;
    let request_id =
        friend_service.send_friend_request(sender_id, body.0.recipient_id).await?;

    Ok(success::Success::created(Some(SendFriendRequestResponse { request_id }))
        .message("Friend request sent successfully"))
}

#[post("/requests/bulk-accept")]
pub async fn bulk_accept_friend_requests(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<BulkAcceptBody>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    friend_service.bulk_accept_friend_requests(user_id, &body.0.request_ids).await?;
    Ok(success::Success::ok(None).message("Friend requests accepted successfully"))
}

#[post("/requests/{request_id}/accept")]
pub async fn accept_friend_request(
    friend_service: web::Data<FriendSvc>,
    request_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    friend_service.accept_friend_request(user_id, *request_id).await?;
    Ok(success::Success::ok(None).message("Friend request accepted successfully"))
}

#[post("/requests/{request_id}/decline")]
pub async fn decline_friend_request(
    friend_service: web::Data<FriendSvc>,
    request_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    friend_service.decline_friend_request(user_id, *request_id).await?;
    Ok(success::Success::no_content())
}

#[delete("/requests/{request_id}")]
pub async fn cancel_friend_request(
    friend_service: web::Data<FriendSvc>,
    request_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    friend_service.cancel_friend_request(user_id, *request_id).await?;
    Ok(success::Success::no_content())
}

#[get("/")]
pub async fn list_friends(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendshipView>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let friends = friend_service.get_user_friendships(user_id).await.into_items();

    Ok(success::Success::ok(Some(friends)).message("Friends retrieved successfully"))
}

#[get("/requests")]
pub async fn list_friend_requests(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendRequestView>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let requests = friend_service.get_pending_friend_requests(user_id).await.into_items();

    Ok(success::Success::ok(Some(requests)).message("Friend requests retrieved successfully"))
}

#[get("/requests/sent")]
pub async fn list_sent_friend_requests(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendRequestView>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let requests = friend_service.get_sent_friend_requests(user_id).await.into_items();

    Ok(success::Success::ok(Some(requests)).message("Sent friend requests retrieved successfully"))
}

#[get("/recommended")]
pub async fn list_recommended_friends(
    friend_service: web::Data<FriendSvc>,
    query: ValidatedQuery<RecommendedQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendProfile>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let limit = query.0.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
    let recommended = friend_service.get_recommended_friends(user_id, limit).await.into_items();

    Ok(success::Success::ok(Some(recommended)).message("Recommendations retrieved successfully"))
}

#[get("/stats")]
pub async fn friendship_stats(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<FriendshipStats>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let stats = friend_service.get_friendship_stats(user_id).await;

    Ok(success::Success::ok(Some(stats)).message("Stats retrieved successfully"))
}

#[delete("/{friend_id:[0-9a-fA-F-]{36}}")]
pub async fn remove_friend(
    friend_service: web::Data<FriendSvc>,
    friend_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    friend_service.remove_friendship(user_id, *friend_id).await?;
    Ok(success::Success::no_content())
}
