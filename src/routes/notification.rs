use actix_web::web;

use crate::handlers::notification::{
    dismiss_handler, get_notifications_handler, mark_all_read_handler, mark_read_handler,
};

pub fn configure_notification_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/notifications", web::get().to(get_notifications_handler))
        .route(
            "/notifications/read",
            web::patch().to(mark_all_read_handler),
        )
        .route(
            "/notifications/{id}/read",
            web::patch().to(mark_read_handler),
        )
        .route(
            "/notifications/{id}/dismiss",
            web::patch().to(dismiss_handler),
        );
}
