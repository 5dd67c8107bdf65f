use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::{debug, warn};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::ApiError;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// API key extractor guarding mutating routes.
///
/// When no key is configured every request is let through.
pub struct ApiKey(pub String);

impl FromRequest for ApiKey {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(config) = req.app_data::<web::Data<Arc<Config>>>() else {
            warn!("Config not found in app data");
            return ready(Err(ApiError::InternalError));
        };

        let header_key = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let result = match (&config.server.api_key, header_key) {
            (None, header_key) => {
                debug!("API key not configured, allowing access");
                Ok(ApiKey(header_key.unwrap_or_default()))
            }
            (Some(configured_key), Some(header_key)) if *configured_key == header_key => {
                Ok(ApiKey(header_key))
            }
            (Some(_), Some(_)) => {
                warn!("Invalid API key provided");
                Err(ApiError::Unauthorized("Invalid API key".to_string()))
            }
            (Some(_), None) => {
                warn!("API key required but not provided");
                Err(ApiError::Unauthorized("API key required".to_string()))
            }
        };

        ready(result)
    }
}
