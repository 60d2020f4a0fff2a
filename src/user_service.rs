use crate::{
    domain::{MemeRepository, UserRepository},
    errors::{ServiceError, INVALID_USER_ID, USER_NOT_FOUND},
    models::Meme,
    payload::parse_id,
};
use std::sync::Arc;

/// Read-only lookups keyed by user.
#[derive(Clone)]
pub struct UserService {
    memes: Arc<dyn MemeRepository>,
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(memes: Arc<dyn MemeRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { memes, users }
    }

    pub async fn memes_by_user(&self, raw_id: &str) -> Result<Vec<Meme>, ServiceError> {
        let user_id = parse_id(raw_id)
            .filter(|id| *id > 0)
            .ok_or_else(|| ServiceError::invalid(INVALID_USER_ID))?;

        self.users
            .get_by_id(user_id)
            .await
            .map_err(ServiceError::Unhandled)?
            .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))?;

        let memes = self
            .memes
            .list_by_user(user_id)
            .await
            .map_err(ServiceError::Unhandled)?;
        tracing::debug!(user_id, count = memes.len(), "Listed memes for user");
        Ok(memes)
    }
}
