use actix_web::{web, HttpResponse};
use log::{error, info};
use mongodb::bson::oid::ObjectId;

use crate::{
    errors::ApiError,
    handlers::{
        auth::ApiKey,
        pool::dto::{
            AcceptWagerRequest, AddUserRequest, BalancesResponse, CompleteWagerRequest,
            CompleteWagerResponse, CreatePoolRequest, PoolResponse, ProposeWagerRequest,
            UserPoolsQuery, WagerResponse,
        },
    },
    services::{PoolService, ProposeWager, SettlementReport},
};

pub(crate) fn parse_object_id(value: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value).map_err(|e| {
        error!("Invalid {} format: {}", what, e);
        ApiError::BadRequest(format!("Invalid {} format: {}", what, value))
    })
}

/// GET /pools?userEmail=..&pageNum=..&pageSize=.. - Returns the pools a user belongs to
///
/// Pools are listed newest first without their wagers.
pub async fn get_user_pools_handler(
    service: web::Data<PoolService>,
    query: web::Query<UserPoolsQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    info!(
        "Handling GET /pools request for {} (page {}, size {})",
        query.user_email, query.page_num, query.page_size
    );

    let page = service
        .get_user_pools(query.page_num, query.page_size, &query.user_email)
        .await?;
    info!(
        "Successfully retrieved {} of {} pools",
        page.items.len(),
        page.total_items
    );

    Ok(HttpResponse::Ok().json(page.map(PoolResponse::from)))
}

/// POST /pools - Creates a pool whose only member is its creator
/// Requires API key authentication via X-API-Key header
pub async fn create_pool_handler(
    _api_key: ApiKey,
    service: web::Data<PoolService>,
    body: web::Json<CreatePoolRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Handling POST /pools request");
    let body = body.into_inner();

    let pool = service.create_pool(&body.name, &body.created_by).await?;
    info!("Successfully created pool with id: {}", pool.id_hex());

    Ok(HttpResponse::Created().json(PoolResponse::from(pool)))
}

/// GET /pools/{pool_id} - Returns a pool with its wagers
pub async fn get_pool_handler(
    service: web::Data<PoolService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let pool_id = parse_object_id(&path.into_inner(), "pool id")?;
    info!("Handling GET /pools/{} request", pool_id);

    let pool = service.get_pool_by_id(&pool_id).await?;
    Ok(HttpResponse::Ok().json(PoolResponse::from(pool)))
}

/// DELETE /pools/{pool_id} - Deletes a pool
/// Requires API key authentication via X-API-Key header
pub async fn delete_pool_handler(
    _api_key: ApiKey,
    service: web::Data<PoolService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let pool_id = parse_object_id(&path.into_inner(), "pool id")?;
    info!("Handling DELETE /pools/{} request", pool_id);

    service.delete_pool(&pool_id).await?;
    info!("Successfully deleted pool {}", pool_id);

    Ok(HttpResponse::NoContent().finish())
}

/// POST /pools/{pool_id}/users - Adds a member to a pool
/// Requires API key authentication via X-API-Key header
pub async fn add_user_handler(
    _api_key: ApiKey,
    service: web::Data<PoolService>,
    path: web::Path<String>,
    body: web::Json<AddUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let pool_id = parse_object_id(&path.into_inner(), "pool id")?;
    info!("Handling POST /pools/{}/users request", pool_id);

    let pool = service.add_user(&pool_id, &body.user_email).await?;
    Ok(HttpResponse::Ok().json(PoolResponse::from(pool)))
}

/// GET /pools/{pool_id}/balances - Returns net settled points per user
pub async fn get_balances_handler(
    service: web::Data<PoolService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let pool_id = parse_object_id(&path.into_inner(), "pool id")?;
    info!("Handling GET /pools/{}/balances request", pool_id);

    let balances = service.get_balances(&pool_id).await?;
    Ok(HttpResponse::Ok().json(BalancesResponse {
        pool_id: pool_id.to_hex(),
        balances,
    }))
}

/// POST /pools/{pool_id}/wagers - Proposes a wager among pool members
/// Requires API key authentication via X-API-Key header
pub async fn propose_wager_handler(
    _api_key: ApiKey,
    service: web::Data<PoolService>,
    path: web::Path<String>,
    body: web::Json<ProposeWagerRequest>,
) -> Result<HttpResponse, ApiError> {
    let pool_id = parse_object_id(&path.into_inner(), "pool id")?;
    info!("Handling POST /pools/{}/wagers request", pool_id);
    let body = body.into_inner();

    let wager = service
        .propose_wager(
            &pool_id,
            ProposeWager {
                created_by: body.created_by,
                amount: body.amount,
                description: body.description,
                users: body.users,
            },
        )
        .await?;
    info!("Successfully proposed wager {}", wager.id);

    Ok(HttpResponse::Created().json(WagerResponse::from(wager)))
}

/// DELETE /pools/{pool_id}/wagers/{wager_id} - Removes a wager that is not settled
/// Requires API key authentication via X-API-Key header
pub async fn remove_wager_handler(
    _api_key: ApiKey,
    service: web::Data<PoolService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (pool_id, wager_id) = path.into_inner();
    let pool_id = parse_object_id(&pool_id, "pool id")?;
    let wager_id = parse_object_id(&wager_id, "wager id")?;
    info!("Handling DELETE /pools/{}/wagers/{} request", pool_id, wager_id);

    let removed = service.remove_wager(&pool_id, &wager_id).await?;
    Ok(HttpResponse::Ok().json(WagerResponse::from(removed)))
}

/// PATCH /pools/{pool_id}/wagers/{wager_id}/accept - Accepts a wager
/// Requires API key authentication via X-API-Key header
pub async fn accept_wager_handler(
    _api_key: ApiKey,
    service: web::Data<PoolService>,
    path: web::Path<(String, String)>,
    body: web::Json<AcceptWagerRequest>,
) -> Result<HttpResponse, ApiError> {
    let (pool_id, wager_id) = path.into_inner();
    let pool_id = parse_object_id(&pool_id, "pool id")?;
    let wager_id = parse_object_id(&wager_id, "wager id")?;
    info!(
        "Handling PATCH /pools/{}/wagers/{}/accept request",
        pool_id, wager_id
    );

    let wager = service
        .accept_wager(&pool_id, &wager_id, &body.user_email)
        .await?;
    Ok(HttpResponse::Ok().json(WagerResponse::from(wager)))
}

/// PATCH /pools/{pool_id}/wagers/{wager_id}/complete - Completes and settles a wager
/// Requires API key authentication via X-API-Key header
///
/// A completion whose point transfer failed still returns 200 with a pending settlement.
pub async fn complete_wager_handler(
    _api_key: ApiKey,
    service: web::Data<PoolService>,
    path: web::Path<(String, String)>,
    body: web::Json<CompleteWagerRequest>,
) -> Result<HttpResponse, ApiError> {
    let (pool_id, wager_id) = path.into_inner();
    let pool_id = parse_object_id(&pool_id, "pool id")?;
    let wager_id = parse_object_id(&wager_id, "wager id")?;
    info!(
        "Handling PATCH /pools/{}/wagers/{}/complete request",
        pool_id, wager_id
    );

    let completed = service
        .complete_wager(&pool_id, &wager_id, &body.completed_by, &body.winners)
        .await?;
    if let SettlementReport::Pending { reason } = &completed.settlement {
        error!("Wager {} settlement left pending: {}", wager_id, reason);
    }

    Ok(HttpResponse::Ok().json(CompleteWagerResponse::from(completed)))
}
