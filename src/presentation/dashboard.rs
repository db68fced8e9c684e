use crate::presentation::handlers::{AppState, ShopError};
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::{HttpResponse, web};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn summary(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ShopError> {
    let summary = state.dashboard.summary(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}
