use actix_web::{web, HttpResponse};
use log::{error, info};

use crate::{
    database::store::NotificationStore,
    errors::ApiError,
    handlers::{
        auth::ApiKey,
        notification::dto::{MarkAllReadRequest, NotificationResponse, NotificationsQuery},
        pool::parse_object_id,
    },
    services::validation::{validate_page, validate_user_email},
};

/// GET /notifications?userEmail=.. - Returns a user's undismissed notifications, newest first
pub async fn get_notifications_handler(
    store: web::Data<dyn NotificationStore>,
    query: web::Query<NotificationsQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    info!("Handling GET /notifications request for {}", query.user_email);

    validate_user_email(&query.user_email)?;
    validate_page(query.page_num, query.page_size)?;

    match store
        .find_for_user(query.page_num, query.page_size, &query.user_email)
        .await
    {
        Ok(page) => {
            info!("Successfully retrieved {} notifications", page.items.len());
            Ok(HttpResponse::Ok().json(page.map(NotificationResponse::from)))
        }
        Err(e) => {
            error!("Failed to retrieve notifications: {}", e);
            Err(ApiError::DatabaseError(format!(
                "Failed to retrieve notifications: {}",
                e
            )))
        }
    }
}

/// PATCH /notifications/read - Marks all of a user's notifications as read
/// Requires API key authentication via X-API-Key header
pub async fn mark_all_read_handler(
    _api_key: ApiKey,
    store: web::Data<dyn NotificationStore>,
    body: web::Json<MarkAllReadRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Handling PATCH /notifications/read request for {}", body.user_email);
    validate_user_email(&body.user_email)?;

    let updated = store.mark_all_read(&body.user_email).await.map_err(|e| {
        error!("Failed to mark notifications read: {}", e);
        ApiError::DatabaseError(e.to_string())
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

/// PATCH /notifications/{id}/read - Marks one notification as read
/// Requires API key authentication via X-API-Key header
pub async fn mark_read_handler(
    _api_key: ApiKey,
    store: web::Data<dyn NotificationStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id(&path.into_inner(), "notification id")?;
    info!("Handling PATCH /notifications/{}/read request", id);

    match store.mark_read(&id).await {
        Ok(true) => Ok(HttpResponse::NoContent().finish()),
        Ok(false) => Err(ApiError::NotFound(format!("notification {} not found", id))),
        Err(e) => {
            error!("Failed to mark notification {} read: {}", id, e);
            Err(ApiError::DatabaseError(e.to_string()))
        }
    }
}

/// PATCH /notifications/{id}/dismiss - Hides a notification from listings
/// Requires API key authentication via X-API-Key header
pub async fn dismiss_handler(
    _api_key: ApiKey,
    store: web::Data<dyn NotificationStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id(&path.into_inner(), "notification id")?;
    info!("Handling PATCH /notifications/{}/dismiss request", id);

    match store.dismiss(&id).await {
        Ok(true) => Ok(HttpResponse::NoContent().finish()),
        Ok(false) => Err(ApiError::NotFound(format!("notification {} not found", id))),
        Err(e) => {
            error!("Failed to dismiss notification {}: {}", id, e);
            Err(ApiError::DatabaseError(e.to_string()))
        }
    }
}
