use crate::modules::friend::{handle::*, ws};
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/friends")
            .service(send_friend_request)
            .service(bulk_accept_friend_requests)
            .service(list_sent_friend_requests)
            .service(accept_friend_request)
            .service(decline_friend_request)
            .service(cancel_friend_request)
            .service(list_friend_requests)
            .service(list_recommended_friends)
            .service(friendship_stats)
            .service(ws::friendship_feed)
            .service(list_friends)
            .service(remove_friend),
    );
}
