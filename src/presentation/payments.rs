use crate::domain::models::{CreatePayment, LedgerQuery, UpdatePayment};
use crate::presentation::handlers::{AppState, MessageResponse, ShopError};
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::{HttpResponse, web};
use tracing::{info, instrument};
use uuid::Uuid;

#[instrument(skip(state))]
pub async fn list_payments(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<LedgerQuery>,
) -> Result<HttpResponse, ShopError> {
    let payments = state
        .ledger
        .list_payments(&user.user_id, query.into_inner().customer)
        .await?;
    Ok(HttpResponse::Ok().json(payments))
}

#[instrument(skip(state), fields(payment_id = %*path))]
pub async fn get_payment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ShopError> {
    let payment = state
        .ledger
        .get_payment(&user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[instrument(skip(state, req), fields(customer_id = %req.customer, amount = %req.amount.inner()))]
pub async fn record_payment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreatePayment>,
) -> Result<HttpResponse, ShopError> {
    info!(method = ?req.payment_method, "Recording payment");
    let payment = state
        .ledger
        .record_payment(&user.user_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(payment))
}

#[instrument(skip(state, req), fields(payment_id = %*path))]
pub async fn update_payment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdatePayment>,
) -> Result<HttpResponse, ShopError> {
    let payment = state
        .ledger
        .update_payment(&user.user_id, path.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[instrument(skip(state), fields(payment_id = %*path))]
pub async fn delete_payment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ShopError> {
    state
        .ledger
        .delete_payment(&user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Payment deleted successfully")))
}
