use crate::domain::user::{NewBilling, NewLoan, RecordCollection, RecordSale, UpdateLoanStatus};
use crate::presentation::handlers::{AppState, ShopError};
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::{HttpResponse, web};
use tracing::instrument;
use uuid::Uuid;

#[instrument(skip(state))]
pub async fn list_sales(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ShopError> {
    let sales = state.shop_book.list_sales(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(sales))
}

#[instrument(skip(state, req))]
pub async fn record_sale(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<RecordSale>,
) -> Result<HttpResponse, ShopError> {
    let sale = state
        .shop_book
        .record_sale(&user.user_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(sale))
}

#[instrument(skip(state))]
pub async fn list_collections(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ShopError> {
    let collections = state.shop_book.list_collections(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(collections))
}

#[instrument(skip(state, req))]
pub async fn record_collection(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<RecordCollection>,
) -> Result<HttpResponse, ShopError> {
    let collection = state
        .shop_book
        .record_collection(&user.user_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(collection))
}

#[instrument(skip(state))]
pub async fn list_loans(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ShopError> {
    let loans = state.shop_book.list_loans(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(loans))
}

#[instrument(skip(state, req))]
pub async fn add_loan(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<NewLoan>,
) -> Result<HttpResponse, ShopError> {
    let loan = state
        .shop_book
        .add_loan(&user.user_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(loan))
}

#[instrument(skip(state, req), fields(loan_id = %*path))]
pub async fn update_loan_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateLoanStatus>,
) -> Result<HttpResponse, ShopError> {
    let loan = state
        .shop_book
        .update_loan_status(&user.user_id, path.into_inner(), req.into_inner().status)
        .await?;
    Ok(HttpResponse::Ok().json(loan))
}

#[instrument(skip(state))]
pub async fn list_billings(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ShopError> {
    let billings = state.shop_book.list_billings(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(billings))
}

#[instrument(skip(state, req))]
pub async fn add_billing(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<NewBilling>,
) -> Result<HttpResponse, ShopError> {
    let billing = state
        .shop_book
        .add_billing(&user.user_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(billing))
}
