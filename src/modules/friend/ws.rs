use actix_web::{get, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use tracing::debug;

use crate::{
    api::error,
    middlewares::get_claims,
    modules::friend::{handle::FriendSvc, model::FriendshipView},
};

/// Streams the caller's friendship list over a WebSocket: one snapshot on
/// connect, then the full list after every change touching them. The
/// subscription is torn down when the socket closes.
#[get("/ws")]
pub async fn friendship_feed(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
    stream: web::Payload,
) -> Result<HttpResponse, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let (response, session, msg_stream) =
        actix_ws::handle(&req, stream).map_err(|_| error::Error::InternalServer)?;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Vec<FriendshipView>>();
    let subscription = friend_service.subscribe_to_friendships(user_id, move |list| {
        let _ = tx.send(list);
    });

    actix_web::rt::spawn(run_feed(user_id, session, msg_stream, rx, subscription));

    Ok(response)
}

async fn run_feed(
    user_id: uuid::Uuid,
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<Vec<FriendshipView>>,
    subscription: crate::modules::friend::events::Subscription,
) {
    debug!(%user_id, "friendship feed opened");

    loop {
        tokio::select! {
            list = rx.recv() => {
                let Some(list) = list else { break };
                let Ok(payload) = serde_json::to_string(&list) else { break };
                if session.text(payload).await.is_err() {
                    break;
                }
            }
            msg = msg_stream.next() => {
                match msg {
                    Some(Ok(actix_ws::Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(actix_ws::Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    subscription.unsubscribe();
    let _ = session.close(None).await;
    debug!(%user_id, "friendship feed closed");
}
