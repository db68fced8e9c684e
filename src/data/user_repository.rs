use crate::domain::error::DomainError;
use crate::domain::repository::{UserRepository, UserUpdate};
use crate::domain::user::User;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace, warn};

#[derive(Default)]
struct UserTables {
    by_id: HashMap<String, User>,
    /// email -> user id
    emails: HashMap<String, String>,
}

#[derive(Clone)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<UserTables>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(UserTables::default())),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id, email = %user.email))]
    async fn create_user(&self, user: User) -> Result<()> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;
        if storage.emails.contains_key(&user.email) {
            warn!("Email already registered");
            return Err(DomainError::Validation(
                "User with this email already exists".to_string(),
            )
            .into());
        }
        storage.emails.insert(user.email.clone(), user.id.clone());
        storage.by_id.insert(user.id.clone(), user);
        debug!("User created in memory storage");
        Ok(())
    }

    #[instrument(skip(self, update))]
    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<User> {
        trace!("Acquiring write lock for user update");
        let mut storage = self.storage.write().await;
        let mut user = storage
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("User not found: {id}")))?;
        let previous_email = user.email.clone();

        update(&mut user)?;
        user.id = id.to_string();
        if previous_email != user.email {
            if storage.emails.contains_key(&user.email) {
                return Err(DomainError::Validation(
                    "User with this email already exists".to_string(),
                )
                .into());
            }
            storage.emails.remove(&previous_email);
            storage.emails.insert(user.email.clone(), user.id.clone());
        }
        storage.by_id.insert(user.id.clone(), user.clone());
        debug!("User updated in memory storage");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        let user = storage
            .emails
            .get(email)
            .and_then(|id| storage.by_id.get(id))
            .cloned();
        if user.is_none() {
            trace!("User not found in storage");
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        Ok(storage.by_id.get(id).cloned())
    }
}
