use crate::domain::models::{CreateLease, LedgerQuery, UpdateLease};
use crate::presentation::handlers::{AppState, MessageResponse, ShopError};
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::{HttpResponse, web};
use tracing::{info, instrument};
use uuid::Uuid;

#[instrument(skip(state))]
pub async fn list_leases(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<LedgerQuery>,
) -> Result<HttpResponse, ShopError> {
    let leases = state
        .ledger
        .list_leases(&user.user_id, query.into_inner().customer)
        .await?;
    Ok(HttpResponse::Ok().json(leases))
}

#[instrument(skip(state), fields(lease_id = %*path))]
pub async fn get_lease(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ShopError> {
    let lease = state
        .ledger
        .get_lease(&user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(lease))
}

#[instrument(skip(state, req), fields(customer_id = %req.customer, amount = %req.amount.inner()))]
pub async fn create_lease(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateLease>,
) -> Result<HttpResponse, ShopError> {
    info!("Creating lease");
    let lease = state
        .ledger
        .create_lease(&user.user_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(lease))
}

#[instrument(skip(state, req), fields(lease_id = %*path))]
pub async fn update_lease(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateLease>,
) -> Result<HttpResponse, ShopError> {
    let lease = state
        .ledger
        .update_lease(&user.user_id, path.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(lease))
}

#[instrument(skip(state), fields(lease_id = %*path))]
pub async fn delete_lease(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ShopError> {
    state
        .ledger
        .delete_lease(&user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Lease deleted successfully")))
}
