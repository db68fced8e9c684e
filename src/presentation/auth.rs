use crate::domain::user::{CreateUser, LoginRequest, UpdateSettings, UserProfile};
use crate::presentation::handlers::{AppState, ShopError};
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<CreateUser>,
) -> Result<HttpResponse, ShopError> {
    info!("Registration request received");
    let user = state.auth_service.register_user(req.into_inner()).await?;

    info!(user_id = %user.id, "User registered successfully");
    Ok(HttpResponse::Created().json(RegisterResponse {
        id: user.id,
        email: user.email,
    }))
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ShopError> {
    info!("Login request received");
    let token = state.auth_service.login(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: token,
    }))
}

#[instrument(skip(state))]
pub async fn me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ShopError> {
    let account = state.auth_service.get_user(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&account)))
}

#[instrument(skip(state, req))]
pub async fn update_settings(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<UpdateSettings>,
) -> Result<HttpResponse, ShopError> {
    let account = state
        .auth_service
        .update_settings(&user.user_id, req.into_inner())
        .await?;
    info!(user_id = %account.id, "Settings updated");
    Ok(HttpResponse::Ok().json(UserProfile::from(&account)))
}
