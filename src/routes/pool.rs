use actix_web::web;

use crate::handlers::pool::{
    accept_wager_handler, add_user_handler, complete_wager_handler, create_pool_handler,
    delete_pool_handler, get_balances_handler, get_pool_handler, get_user_pools_handler,
    propose_wager_handler, remove_wager_handler,
};

pub fn configure_pool_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/pools", web::get().to(get_user_pools_handler))
        .route("/pools", web::post().to(create_pool_handler))
        .route("/pools/{pool_id}", web::get().to(get_pool_handler))
        .route("/pools/{pool_id}", web::delete().to(delete_pool_handler))
        .route("/pools/{pool_id}/users", web::post().to(add_user_handler))
        .route(
            "/pools/{pool_id}/balances",
            web::get().to(get_balances_handler),
        )
        .route(
            "/pools/{pool_id}/wagers",
            web::post().to(propose_wager_handler),
        )
        .route(
            "/pools/{pool_id}/wagers/{wager_id}",
            web::delete().to(remove_wager_handler),
        )
        .route(
            "/pools/{pool_id}/wagers/{wager_id}/accept",
            web::patch().to(accept_wager_handler),
        )
        .route(
            "/pools/{pool_id}/wagers/{wager_id}/complete",
            web::patch().to(complete_wager_handler),
        );
}
