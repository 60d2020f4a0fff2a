//! In-process storage backend.
//!
//! Both tables live behind one lock so the foreign-key check and the write it
//! guards happen atomically.

use crate::{
    domain::{MemeRepository, UserRepository},
    errors::RepoError,
    models::{Meme, MemeChanges, NewMeme, NewUser, User},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    memes: BTreeMap<i64, Meme>,
    users: BTreeMap<i64, User>,
    // Last assigned ids; never rewound so ids are not reused.
    meme_seq: i64,
    user_seq: i64,
}

impl Tables {
    fn check_user(&self, user_id: i64) -> Result<(), RepoError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(RepoError::ConstraintViolation(format!(
                "user {} does not exist",
                user_id
            )))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        tracing::info!("Initializing in-memory store");
        Self::default()
    }
}

#[async_trait]
impl MemeRepository for InMemoryStore {
    async fn list_all(&self) -> Result<Vec<Meme>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.memes.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Meme>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.memes.get(&id).cloned())
    }

    async fn create(&self, meme: NewMeme) -> Result<Meme, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_user(meme.user_id)?;

        tables.meme_seq += 1;
        let stored = Meme {
            id: tables.meme_seq,
            title: meme.title,
            url: meme.url,
            user_id: meme.user_id,
        };
        tables.memes.insert(stored.id, stored.clone());
        tracing::debug!(meme_id = stored.id, "Memory: meme stored");
        Ok(stored)
    }

    async fn update(&self, id: i64, changes: &MemeChanges) -> Result<Meme, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.memes.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        if let Some(user_id) = changes.user_id {
            tables.check_user(user_id)?;
        }

        let meme = tables.memes.get_mut(&id).ok_or(RepoError::NotFound)?;
        changes.apply_to(meme);
        Ok(meme.clone())
    }

    async fn delete(&self, id: i64) -> Result<Meme, RepoError> {
        let mut tables = self.tables.write().await;
        tables.memes.remove(&id).ok_or(RepoError::NotFound)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Meme>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .memes
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        let mut tables = self.tables.write().await;
        let count = tables.memes.len() as u64;
        tables.memes.clear();
        Ok(count)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        tables.user_seq += 1;
        let stored = User {
            id: tables.user_seq,
            username: user.username,
            password: user.password,
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        let mut tables = self.tables.write().await;
        if let Some(meme) = tables.memes.values().next() {
            return Err(RepoError::ConstraintViolation(format!(
                "meme {} still references user {}",
                meme.id, meme.user_id
            )));
        }
        let count = tables.users.len() as u64;
        tables.users.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user() -> (InMemoryStore, User) {
        let store = InMemoryStore::new();
        let user = UserRepository::create(
            &store,
            NewUser {
                username: "alice".into(),
                password: "pass1".into(),
            },
        )
        .await
        .unwrap();
        (store, user)
    }

    fn new_meme(title: &str, user_id: i64) -> NewMeme {
        NewMeme {
            title: title.into(),
            url: format!("https://x/{}.jpg", title.to_lowercase()),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let (store, alice) = store_with_user().await;
        let a = MemeRepository::create(&store, new_meme("A", alice.id)).await.unwrap();
        let b = MemeRepository::create(&store, new_meme("B", alice.id)).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_user() {
        let (store, _) = store_with_user().await;
        let err = MemeRepository::create(&store, new_meme("A", 42)).await.unwrap_err();
        assert!(matches!(err, RepoError::ConstraintViolation(_)));
        assert!(MemeRepository::list_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let (store, alice) = store_with_user().await;
        let a = MemeRepository::create(&store, new_meme("A", alice.id)).await.unwrap();
        MemeRepository::delete(&store, a.id).await.unwrap();
        MemeRepository::delete_all(&store).await.unwrap();
        let b = MemeRepository::create(&store, new_meme("B", alice.id)).await.unwrap();
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn test_update_missing_and_bad_fk() {
        let (store, alice) = store_with_user().await;
        let err = store.update(9, &MemeChanges::default()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));

        let a = MemeRepository::create(&store, new_meme("A", alice.id)).await.unwrap();
        let changes = MemeChanges {
            title: Some("changed".into()),
            user_id: Some(77),
            ..Default::default()
        };
        let err = store.update(a.id, &changes).await.unwrap_err();
        assert!(matches!(err, RepoError::ConstraintViolation(_)));
        // Nothing applied when the FK check fails
        let stored = MemeRepository::get_by_id(&store, a.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "A");
    }

    #[tokio::test]
    async fn test_delete_returns_previous_value() {
        let (store, alice) = store_with_user().await;
        let a = MemeRepository::create(&store, new_meme("A", alice.id)).await.unwrap();
        let deleted = MemeRepository::delete(&store, a.id).await.unwrap();
        assert_eq!(deleted, a);
        assert!(matches!(
            MemeRepository::delete(&store, a.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_users_cannot_be_cleared_while_referenced() {
        let (store, alice) = store_with_user().await;
        MemeRepository::create(&store, new_meme("A", alice.id)).await.unwrap();
        assert!(matches!(
            UserRepository::delete_all(&store).await,
            Err(RepoError::ConstraintViolation(_))
        ));
        MemeRepository::delete_all(&store).await.unwrap();
        assert_eq!(UserRepository::delete_all(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_by_user() {
        let (store, alice) = store_with_user().await;
        let bob = UserRepository::create(
            &store,
            NewUser {
                username: "bob".into(),
                password: "pass2".into(),
            },
        )
        .await
        .unwrap();
        MemeRepository::create(&store, new_meme("A", alice.id)).await.unwrap();
        MemeRepository::create(&store, new_meme("B", bob.id)).await.unwrap();
        MemeRepository::create(&store, new_meme("C", alice.id)).await.unwrap();

        let titles: Vec<_> = store
            .list_by_user(alice.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["A", "C"]);
    }
}
