use crate::errors::RepoError;
use crate::models::{Meme, MemeChanges, NewMeme, NewUser, User};
use async_trait::async_trait;

/// Trait defining operations for storing and retrieving memes.
///
/// Implementations enforce that `Meme::user_id` names an existing user and report
/// violations as `RepoError::ConstraintViolation`.
#[async_trait]
pub trait MemeRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Lists every meme ordered by ascending id.
    async fn list_all(&self) -> Result<Vec<Meme>, RepoError>;

    /// Returns Ok(None) if the meme is not found.
    async fn get_by_id(&self, id: i64) -> Result<Option<Meme>, RepoError>;

    /// Stores a new meme under the next free id and returns it.
    async fn create(&self, meme: NewMeme) -> Result<Meme, RepoError>;

    /// Applies `changes` to an existing meme and returns the stored result.
    async fn update(&self, id: i64, changes: &MemeChanges) -> Result<Meme, RepoError>;

    /// Removes a meme, returning it as it was right before deletion.
    async fn delete(&self, id: i64) -> Result<Meme, RepoError>;

    /// Memes owned by `user_id`, ordered by ascending id.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Meme>, RepoError>;

    /// Removes every meme. Returns the number of deleted rows.
    async fn delete_all(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;

    async fn list_all(&self) -> Result<Vec<User>, RepoError>;

    async fn create(&self, user: NewUser) -> Result<User, RepoError>;

    /// Removes every user. Fails with `ConstraintViolation` while memes still
    /// reference any of them.
    async fn delete_all(&self) -> Result<u64, RepoError>;
}
