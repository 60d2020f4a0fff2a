use crate::{
    domain::{MemeRepository, UserRepository},
    errors::{
        RepoError, ServiceError, INVALID_FOREIGN_KEY, INVALID_MEME_ID, MEME_NOT_FOUND,
    },
    models::{Meme, MemeChanges, MemeWithOwner, NewMeme, UserSummary},
    payload::{parse_id, FieldInput, MemeFields},
};
use std::collections::HashMap;
use std::sync::Arc;

const TITLE_AND_URL_REQUIRED: &str = "Title and URL are required.";
const TITLE_EMPTY: &str = "Title cannot be empty.";
const URL_EMPTY: &str = "URL cannot be empty.";
const USER_ID_NOT_INTEGER: &str = "userId must be an integer";

/// Validates and executes CRUD operations on memes.
#[derive(Clone)]
pub struct MemeService {
    memes: Arc<dyn MemeRepository>,
    users: Arc<dyn UserRepository>,
}

impl MemeService {
    pub fn new(memes: Arc<dyn MemeRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { memes, users }
    }

    /// All memes by ascending id, each with its owner's id and username.
    pub async fn list(&self) -> Result<Vec<MemeWithOwner>, ServiceError> {
        let memes = self.memes.list_all().await.map_err(map_repo_error)?;
        let owners: HashMap<i64, UserSummary> = self
            .users
            .list_all()
            .await
            .map_err(map_repo_error)?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        tracing::debug!(count = memes.len(), "Listing memes");
        Ok(memes
            .into_iter()
            .map(|meme| {
                let user = owners.get(&meme.user_id).cloned();
                MemeWithOwner { meme, user }
            })
            .collect())
    }

    pub async fn get_by_id(&self, raw_id: &str) -> Result<Meme, ServiceError> {
        let id = parse_meme_id(raw_id)?;
        self.find_existing(id).await
    }

    pub async fn create(&self, fields: MemeFields) -> Result<Meme, ServiceError> {
        let (title, url) = match (fields.title, fields.url) {
            (FieldInput::Present(title), FieldInput::Present(url)) => (title, url),
            _ => return Err(ServiceError::invalid(TITLE_AND_URL_REQUIRED)),
        };
        let user_id = fields
            .user_id
            .present()
            .ok_or_else(|| ServiceError::invalid(USER_ID_NOT_INTEGER))?;

        let meme = self
            .memes
            .create(NewMeme {
                title,
                url,
                user_id,
            })
            .await
            .map_err(map_repo_error)?;
        tracing::info!(meme_id = meme.id, user_id, "Meme created");
        Ok(meme)
    }

    /// Replaces each field present in `fields`; absent fields are kept as stored.
    pub async fn update(&self, raw_id: &str, fields: MemeFields) -> Result<Meme, ServiceError> {
        let id = parse_meme_id(raw_id)?;
        let existing = self.find_existing(id).await?;

        let changes = validate_changes(fields)?;
        if changes.is_empty() {
            return Ok(existing);
        }

        let meme = self.memes.update(id, &changes).await.map_err(map_repo_error)?;
        tracing::info!(meme_id = id, "Meme updated");
        Ok(meme)
    }

    pub async fn delete(&self, raw_id: &str) -> Result<Meme, ServiceError> {
        let id = parse_meme_id(raw_id)?;
        let meme = self.memes.delete(id).await.map_err(map_repo_error)?;
        tracing::info!(meme_id = id, "Meme deleted");
        Ok(meme)
    }

    async fn find_existing(&self, id: i64) -> Result<Meme, ServiceError> {
        self.memes
            .get_by_id(id)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| ServiceError::not_found(MEME_NOT_FOUND))
    }
}

fn parse_meme_id(raw: &str) -> Result<i64, ServiceError> {
    parse_id(raw).ok_or_else(|| ServiceError::invalid(INVALID_MEME_ID))
}

/// Checked in field order: title, url, userId.
fn validate_changes(fields: MemeFields) -> Result<MemeChanges, ServiceError> {
    let title = match fields.title {
        FieldInput::Invalid => return Err(ServiceError::invalid(TITLE_EMPTY)),
        other => other.present(),
    };
    let url = match fields.url {
        FieldInput::Invalid => return Err(ServiceError::invalid(URL_EMPTY)),
        other => other.present(),
    };
    let user_id = match fields.user_id {
        FieldInput::Invalid => return Err(ServiceError::invalid(USER_ID_NOT_INTEGER)),
        other => other.present(),
    };
    Ok(MemeChanges {
        title,
        url,
        user_id,
    })
}

fn map_repo_error(err: RepoError) -> ServiceError {
    match err {
        RepoError::NotFound => ServiceError::not_found(MEME_NOT_FOUND),
        RepoError::ConstraintViolation(detail) => {
            tracing::debug!(%detail, "Rejected meme write");
            ServiceError::ConstraintViolation(INVALID_FOREIGN_KEY.to_string())
        }
        e @ RepoError::BackendError(_) => ServiceError::Unhandled(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryStore;
    use crate::models::NewUser;
    use serde_json::{json, Value};

    fn fields(v: Value) -> MemeFields {
        MemeFields::from_body(v.as_object().unwrap())
    }

    async fn service() -> (MemeService, InMemoryStore) {
        let store = InMemoryStore::new();
        for name in ["alice", "bob"] {
            UserRepository::create(
                &store,
                NewUser {
                    username: name.into(),
                    password: "pw".into(),
                },
            )
            .await
            .unwrap();
        }
        let repo = Arc::new(store.clone());
        (MemeService::new(repo.clone(), repo), store)
    }

    fn assert_invalid(err: ServiceError, msg: &str) {
        match err {
            ServiceError::InvalidArgument(m) => assert_eq!(m, msg),
            other => panic!("expected InvalidArgument({msg}), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_trims_and_stores() {
        let (svc, _) = service().await;
        let meme = svc
            .create(fields(json!({ "title": " Doge ", "url": " https://x/doge.jpg ", "userId": 1 })))
            .await
            .unwrap();
        assert_eq!(meme.title, "Doge");
        assert_eq!(meme.url, "https://x/doge.jpg");
        assert_eq!(meme.user_id, 1);
        assert_eq!(svc.get_by_id("1").await.unwrap(), meme);
    }

    #[tokio::test]
    async fn test_create_validation_order() {
        let (svc, store) = service().await;

        // Missing title beats bad userId
        let err = svc
            .create(fields(json!({ "url": "u", "userId": "nope" })))
            .await
            .unwrap_err();
        assert_invalid(err, TITLE_AND_URL_REQUIRED);

        let err = svc
            .create(fields(json!({ "title": "t", "url": "u", "userId": "nope" })))
            .await
            .unwrap_err();
        assert_invalid(err, USER_ID_NOT_INTEGER);

        let err = svc
            .create(fields(json!({ "title": "t", "url": "u" })))
            .await
            .unwrap_err();
        assert_invalid(err, USER_ID_NOT_INTEGER);

        let err = svc
            .create(fields(json!({ "title": "t", "url": "u", "userId": 99 })))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ConstraintViolation(m) if m == INVALID_FOREIGN_KEY));

        assert!(MemeRepository::list_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_id_errors() {
        let (svc, _) = service().await;
        assert_invalid(svc.get_by_id("abc").await.unwrap_err(), INVALID_MEME_ID);
        assert!(matches!(
            svc.get_by_id("5").await.unwrap_err(),
            ServiceError::NotFound(m) if m == MEME_NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn test_update_partial_and_idempotent() {
        let (svc, _) = service().await;
        let created = svc
            .create(fields(json!({ "title": "Doge", "url": "https://x/doge.jpg", "userId": 1 })))
            .await
            .unwrap();

        let unchanged = svc.update("1", fields(json!({}))).await.unwrap();
        assert_eq!(unchanged, created);

        let first = svc
            .update("1", fields(json!({ "title": " Wow ", "userId": "2" })))
            .await
            .unwrap();
        let second = svc
            .update("1", fields(json!({ "title": " Wow ", "userId": "2" })))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.title, "Wow");
        assert_eq!(first.url, "https://x/doge.jpg");
        assert_eq!(first.user_id, 2);
    }

    #[tokio::test]
    async fn test_update_rejects_blank_fields_without_mutation() {
        let (svc, _) = service().await;
        let created = svc
            .create(fields(json!({ "title": "Doge", "url": "https://x/doge.jpg", "userId": 1 })))
            .await
            .unwrap();

        assert_invalid(
            svc.update("1", fields(json!({ "title": "  " }))).await.unwrap_err(),
            TITLE_EMPTY,
        );
        assert_invalid(
            svc.update("1", fields(json!({ "title": "ok", "url": "" }))).await.unwrap_err(),
            URL_EMPTY,
        );
        assert_invalid(
            svc.update("1", fields(json!({ "userId": "x" }))).await.unwrap_err(),
            USER_ID_NOT_INTEGER,
        );
        assert!(matches!(
            svc.update("1", fields(json!({ "userId": 50 }))).await.unwrap_err(),
            ServiceError::ConstraintViolation(_)
        ));
        assert_eq!(svc.get_by_id("1").await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_update_checks_id_before_existence() {
        let (svc, _) = service().await;
        assert_invalid(
            svc.update("x", fields(json!({ "title": "" }))).await.unwrap_err(),
            INVALID_MEME_ID,
        );
        assert!(matches!(
            svc.update("7", fields(json!({ "title": "" }))).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (svc, _) = service().await;
        let created = svc
            .create(fields(json!({ "title": "Doge", "url": "u", "userId": 1 })))
            .await
            .unwrap();
        assert_eq!(svc.delete("1").await.unwrap(), created);
        assert!(matches!(svc.get_by_id("1").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete("1").await, Err(ServiceError::NotFound(_))));
        assert_invalid(svc.delete("one").await.unwrap_err(), INVALID_MEME_ID);
    }

    #[tokio::test]
    async fn test_list_includes_owner() {
        let (svc, _) = service().await;
        svc.create(fields(json!({ "title": "A", "url": "u", "userId": 2 })))
            .await
            .unwrap();
        svc.create(fields(json!({ "title": "B", "url": "u", "userId": 1 })))
            .await
            .unwrap();

        let listed = svc.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].meme.id, 1);
        assert_eq!(listed[0].user.as_ref().unwrap().username, "bob");
        assert_eq!(listed[1].user.as_ref().unwrap().username, "alice");
    }
}
