use crate::domain::error::DomainError;
use crate::domain::repository::{UserRepository, user_update};
use crate::domain::user::{CreateUser, LoginRequest, UpdateSettings, User, UserSettings};
use crate::infrastructure::security::{generate_token, hash_password, verify_password};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

pub struct AuthService<R: UserRepository> {
    user_repository: Arc<R>,
    jwt_secret: String,
    token_ttl_secs: u64,
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(user_repository: Arc<R>, jwt_secret: String, token_ttl_secs: u64) -> Self {
        Self {
            user_repository,
            jwt_secret,
            token_ttl_secs,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register_user(&self, req: CreateUser) -> Result<User> {
        trace!("Starting user registration");

        let email = req.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::Validation("A valid email is required".to_string()).into());
        }
        if req.password.is_empty() {
            return Err(DomainError::Validation("password is required".to_string()).into());
        }

        let password_hash = hash_password(&req.password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            full_name: required(&req.full_name, "fullName")?,
            shop_name: required(&req.shop_name, "shopName")?,
            shop_address: required(&req.shop_address, "shopAddress")?,
            phone_number: required(&req.phone_number, "phoneNumber")?,
            profile_photo: None,
            monthly_sales: Vec::new(),
            katha_collected: Vec::new(),
            loans: Vec::new(),
            monthly_billings: Vec::new(),
            settings: UserSettings::default(),
            created_at: Utc::now(),
        };

        debug!(user_id = %user.id, "Saving user to repository");
        self.user_repository.create_user(user.clone()).await?;

        info!(user_id = %user.id, email = %user.email, "User registered successfully");
        Ok(user)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<String> {
        trace!("Starting login");

        let email = req.email.trim().to_lowercase();
        let user = self
            .user_repository
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| {
                warn!("User not found during login");
                DomainError::Unauthorized("Invalid email or password".to_string())
            })?;

        let is_valid = verify_password(&req.password, &user.password_hash).map_err(|e| {
            error!(error = %e, "Failed to verify password");
            DomainError::Internal(format!("Failed to verify password: {}", e))
        })?;

        if !is_valid {
            warn!(user_id = %user.id, "Invalid password during login");
            return Err(DomainError::Unauthorized("Invalid email or password".to_string()).into());
        }

        let token = generate_token(&user.id, &self.jwt_secret, self.token_ttl_secs).map_err(|e| {
            error!(error = %e, "Failed to generate token");
            DomainError::Internal(format!("Failed to generate token: {}", e))
        })?;

        info!(user_id = %user.id, "Login successful");
        Ok(token)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.user_repository
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| {
                // A valid token for an account that no longer exists
                warn!("Authenticated user not found");
                DomainError::Unauthorized("User no longer exists".to_string()).into()
            })
    }

    #[instrument(skip(self, req))]
    pub async fn update_settings(&self, user_id: &str, req: UpdateSettings) -> Result<User> {
        self.get_user(user_id).await?;
        let currency = match req.currency {
            Some(currency) => Some(required(&currency, "currency")?.to_uppercase()),
            None => None,
        };
        let theme = match req.theme {
            Some(theme) => {
                let theme = required(&theme, "theme")?.to_lowercase();
                if theme != "light" && theme != "dark" {
                    return Err(DomainError::Validation(
                        "theme must be 'light' or 'dark'".to_string(),
                    )
                    .into());
                }
                Some(theme)
            }
            None => None,
        };
        let notifications = req.notifications;

        let user = self
            .user_repository
            .update_user(
                user_id,
                user_update(move |user| {
                    if let Some(currency) = currency {
                        user.settings.currency = currency;
                    }
                    if let Some(theme) = theme {
                        user.settings.theme = theme;
                    }
                    if let Some(notifications) = notifications {
                        user.settings.notifications = notifications;
                    }
                    Ok(())
                }),
            )
            .await?;
        info!("Settings updated");
        Ok(user)
    }
}
