use crate::{
    config::TableNames,
    domain::{MemeRepository, UserRepository},
    errors::RepoError,
    models::{Meme, MemeChanges, NewMeme, NewUser, User},
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{BuildError, SdkError},
    operation::transact_write_items::TransactWriteItemsError,
    types::{AttributeValue, ConditionCheck, Put, ReturnValue, TransactWriteItem, Update},
    Client as DynamoDbClient,
};
use std::collections::HashMap;
use tracing::{self, info};

type Item = HashMap<String, AttributeValue>;

const MEME_SEQUENCE: &str = "memes";
const USER_SEQUENCE: &str = "users";
const CONDITION_FAILED: &str = "ConditionalCheckFailed";

/// DynamoDB-backed store for users and memes.
///
/// Ids come from an atomic counter item per entity. Meme writes that set a
/// `user_id` run as a transaction with a condition check on the user item.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: DynamoDbClient,
    tables: TableNames,
}

impl DynamoDbStore {
    pub fn new(client: DynamoDbClient, tables: TableNames) -> Self {
        info!(memes = %tables.memes, users = %tables.users, counters = %tables.counters, "Initializing DynamoDbStore");
        Self { client, tables }
    }

    /// Atomically increments the named counter and returns the new value.
    async fn next_id(&self, sequence: &str) -> Result<i64, RepoError> {
        let resp = self
            .client
            .update_item()
            .table_name(&self.tables.counters)
            .key("name", AttributeValue::S(sequence.to_string()))
            .update_expression("ADD seq :one")
            .expression_attribute_values(":one", num(1))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to allocate id for '{}'", self.tables.counters, sequence))
            .map_err(RepoError::BackendError)?;

        resp.attributes
            .as_ref()
            .and_then(|attrs| get_n(attrs, "seq"))
            .ok_or_else(|| RepoError::BackendError(anyhow!("DynamoDB: counter '{}' returned no sequence value", sequence)))
    }

    /// Scans a whole table, following `LastEvaluatedKey` across pages.
    async fn scan_all(
        &self,
        table_name: &str,
        filter: Option<(&str, Item)>,
    ) -> Result<Vec<Item>, RepoError> {
        let mut items: Vec<Item> = Vec::new();
        let mut last_evaluated_key: Option<Item> = None;

        loop {
            let mut request_builder = self.client.scan().table_name(table_name);

            if let Some((expression, values)) = &filter {
                request_builder = request_builder
                    .filter_expression(*expression)
                    .set_expression_attribute_values(Some(values.clone()));
            }
            // Apply ExclusiveStartKey if paginating from previous response
            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", table_name))
                .map_err(RepoError::BackendError)?;

            if let Some(page) = resp.items {
                tracing::debug!("DynamoDB Scan (table: {}): Returned {} items", table_name, page.len());
                items.extend(page);
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        Ok(items)
    }

    async fn delete_every_item(&self, table_name: &str) -> Result<u64, RepoError> {
        let items = self.scan_all(table_name, None).await?;
        let mut deleted = 0;
        for item in items {
            let Some(id) = item.get("id").cloned() else {
                continue;
            };
            self.client
                .delete_item()
                .table_name(table_name)
                .key("id", id)
                .send()
                .await
                .context(format!("DynamoDB (table: {}): Failed to delete item", table_name))
                .map_err(RepoError::BackendError)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    fn user_exists_check(&self, user_id: i64) -> Result<TransactWriteItem, RepoError> {
        let check = ConditionCheck::builder()
            .table_name(&self.tables.users)
            .key("id", num(user_id))
            .condition_expression("attribute_exists(id)")
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().condition_check(check).build())
    }

    /// Runs a two-step transaction: user condition check, then the meme write.
    async fn write_with_user_check(
        &self,
        user_id: i64,
        write: TransactWriteItem,
        meme_missing: RepoError,
    ) -> Result<(), RepoError> {
        let result = self
            .client
            .transact_write_items()
            .transact_items(self.user_exists_check(user_id)?)
            .transact_items(write)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let failed = failed_conditions(&err);
                if failed.first().copied().unwrap_or(false) {
                    Err(RepoError::ConstraintViolation(format!("user {} does not exist", user_id)))
                } else if failed.get(1).copied().unwrap_or(false) {
                    Err(meme_missing)
                } else {
                    Err(RepoError::BackendError(
                        anyhow::Error::new(err).context(format!("DynamoDB (table: {}): Transaction failed", self.tables.memes)),
                    ))
                }
            }
        }
    }

    async fn get_meme_item(&self, id: i64) -> Result<Option<Meme>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.tables.memes)
            .key("id", num(id))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get meme (id: {})", self.tables.memes, id))
            .map_err(RepoError::BackendError)?;

        resp.item.as_ref().map(decode_meme).transpose()
    }
}

#[async_trait]
impl MemeRepository for DynamoDbStore {
    async fn list_all(&self) -> Result<Vec<Meme>, RepoError> {
        let items = self.scan_all(&self.tables.memes, None).await?;
        let mut memes = items.iter().map(decode_meme).collect::<Result<Vec<_>, _>>()?;
        memes.sort_by_key(|m| m.id);
        tracing::info!("DynamoDB (table: {}): Successfully listed {} memes", self.tables.memes, memes.len());
        Ok(memes)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Meme>, RepoError> {
        self.get_meme_item(id).await
    }

    async fn create(&self, meme: NewMeme) -> Result<Meme, RepoError> {
        let id = self.next_id(MEME_SEQUENCE).await?;
        let meme = Meme {
            id,
            title: meme.title,
            url: meme.url,
            user_id: meme.user_id,
        };

        let put = Put::builder()
            .table_name(&self.tables.memes)
            .set_item(Some(meme_to_item(&meme)))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(build_error)?;
        let collision = RepoError::BackendError(anyhow!("DynamoDB: meme id {} already allocated", id));
        self.write_with_user_check(
            meme.user_id,
            TransactWriteItem::builder().put(put).build(),
            collision,
        )
        .await?;

        tracing::debug!(meme_id = id, table_name = %self.tables.memes, "DynamoDB: Meme stored");
        Ok(meme)
    }

    async fn update(&self, id: i64, changes: &MemeChanges) -> Result<Meme, RepoError> {
        if changes.is_empty() {
            return self.get_meme_item(id).await?.ok_or(RepoError::NotFound);
        }
        let (expression, names, values) = update_expression(changes);

        if let Some(user_id) = changes.user_id {
            let update = Update::builder()
                .table_name(&self.tables.memes)
                .key("id", num(id))
                .update_expression(expression)
                .set_expression_attribute_names(Some(names))
                .set_expression_attribute_values(Some(values))
                .condition_expression("attribute_exists(id)")
                .build()
                .map_err(build_error)?;
            self.write_with_user_check(
                user_id,
                TransactWriteItem::builder().update(update).build(),
                RepoError::NotFound,
            )
            .await?;
            // Transactions return no attributes
            return self.get_meme_item(id).await?.ok_or(RepoError::NotFound);
        }

        let resp = self
            .client
            .update_item()
            .table_name(&self.tables.memes)
            .key("id", num(id))
            .update_expression(expression)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .condition_expression("attribute_exists(id)")
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match resp {
            Ok(output) => output
                .attributes
                .as_ref()
                .map(decode_meme)
                .transpose()?
                .ok_or_else(|| RepoError::BackendError(anyhow!("DynamoDB: update of meme {} returned no attributes", id))),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(RepoError::NotFound)
            }
            Err(err) => Err(RepoError::BackendError(
                anyhow::Error::new(err)
                    .context(format!("DynamoDB (table: {}): Failed to update meme (id: {})", self.tables.memes, id)),
            )),
        }
    }

    async fn delete(&self, id: i64) -> Result<Meme, RepoError> {
        tracing::debug!(meme_id = id, table_name = %self.tables.memes, "DynamoDB: Deleting item");

        let resp = self
            .client
            .delete_item()
            .table_name(&self.tables.memes)
            .key("id", num(id))
            .condition_expression("attribute_exists(id)")
            .return_values(ReturnValue::AllOld)
            .send()
            .await;

        match resp {
            Ok(output) => output
                .attributes
                .as_ref()
                .map(decode_meme)
                .transpose()?
                .ok_or_else(|| RepoError::BackendError(anyhow!("DynamoDB: delete of meme {} returned no attributes", id))),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(RepoError::NotFound)
            }
            Err(err) => Err(RepoError::BackendError(
                anyhow::Error::new(err)
                    .context(format!("DynamoDB (table: {}): Failed to delete meme (id: {})", self.tables.memes, id)),
            )),
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Meme>, RepoError> {
        let values = HashMap::from([(":uid".to_string(), num(user_id))]);
        let items = self
            .scan_all(&self.tables.memes, Some(("user_id = :uid", values)))
            .await?;
        let mut memes = items.iter().map(decode_meme).collect::<Result<Vec<_>, _>>()?;
        memes.sort_by_key(|m| m.id);
        Ok(memes)
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        self.delete_every_item(&self.tables.memes).await
    }
}

#[async_trait]
impl UserRepository for DynamoDbStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.tables.users)
            .key("id", num(id))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get user (id: {})", self.tables.users, id))
            .map_err(RepoError::BackendError)?;

        resp.item.as_ref().map(decode_user).transpose()
    }

    async fn list_all(&self) -> Result<Vec<User>, RepoError> {
        let items = self.scan_all(&self.tables.users, None).await?;
        let mut users = items.iter().map(decode_user).collect::<Result<Vec<_>, _>>()?;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let id = self.next_id(USER_SEQUENCE).await?;
        let user = User {
            id,
            username: user.username,
            password: user.password,
        };

        self.client
            .put_item()
            .table_name(&self.tables.users)
            .set_item(Some(user_to_item(&user)))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put user (id: {})", self.tables.users, id))
            .map_err(RepoError::BackendError)?;
        Ok(user)
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        let referenced = self
            .client
            .scan()
            .table_name(&self.tables.memes)
            .limit(1)
            .send()
            .await
            .context(format!("DynamoDB: Failed to scan table '{}'", self.tables.memes))
            .map_err(RepoError::BackendError)?;
        if !referenced.items().is_empty() {
            return Err(RepoError::ConstraintViolation("memes still reference users".to_string()));
        }
        self.delete_every_item(&self.tables.users).await
    }
}

fn build_error(err: BuildError) -> RepoError {
    RepoError::BackendError(anyhow::Error::new(err).context("DynamoDB: Failed to build request"))
}

/// Per transact item, whether its condition expression failed.
fn failed_conditions<R>(err: &SdkError<TransactWriteItemsError, R>) -> Vec<bool> {
    match err.as_service_error() {
        Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) => cancelled
            .cancellation_reasons()
            .iter()
            .map(|reason| reason.code() == Some(CONDITION_FAILED))
            .collect(),
        _ => Vec::new(),
    }
}

/// SET expression covering only the fields present in `changes`.
fn update_expression(changes: &MemeChanges) -> (String, HashMap<String, String>, Item) {
    let mut clauses = Vec::new();
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    let fields = [
        ("title", changes.title.clone().map(AttributeValue::S)),
        ("url", changes.url.clone().map(AttributeValue::S)),
        ("user_id", changes.user_id.map(num)),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            clauses.push(format!("#{field} = :{field}"));
            names.insert(format!("#{field}"), field.to_string());
            values.insert(format!(":{field}"), value);
        }
    }

    (format!("SET {}", clauses.join(", ")), names, values)
}

fn num(n: i64) -> AttributeValue {
    AttributeValue::N(n.to_string())
}

fn get_n(item: &Item, key: &str) -> Option<i64> {
    item.get(key)?.as_n().ok()?.parse().ok()
}

fn get_s(item: &Item, key: &str) -> Option<String> {
    Some(item.get(key)?.as_s().ok()?.to_string())
}

fn meme_to_item(meme: &Meme) -> Item {
    HashMap::from([
        ("id".to_string(), num(meme.id)),
        ("title".to_string(), AttributeValue::S(meme.title.clone())),
        ("url".to_string(), AttributeValue::S(meme.url.clone())),
        ("user_id".to_string(), num(meme.user_id)),
    ])
}

fn user_to_item(user: &User) -> Item {
    HashMap::from([
        ("id".to_string(), num(user.id)),
        ("username".to_string(), AttributeValue::S(user.username.clone())),
        ("password".to_string(), AttributeValue::S(user.password.clone())),
    ])
}

// Helper functions to convert DynamoDB item maps to model structs
fn item_to_meme(item: &Item) -> Option<Meme> {
    Some(Meme {
        id: get_n(item, "id")?,
        title: get_s(item, "title")?,
        url: get_s(item, "url")?,
        user_id: get_n(item, "user_id")?,
    })
}

fn item_to_user(item: &Item) -> Option<User> {
    Some(User {
        id: get_n(item, "id")?,
        username: get_s(item, "username")?,
        password: get_s(item, "password")?,
    })
}

fn decode_meme(item: &Item) -> Result<Meme, RepoError> {
    item_to_meme(item).ok_or_else(|| {
        let item_id = item.get("id").and_then(|v| v.as_n().ok());
        tracing::error!(item.id = ?item_id, "DynamoDB: Failed to parse item into Meme");
        RepoError::BackendError(anyhow!("DynamoDB: Failed to parse meme item {:?}", item_id))
    })
}

fn decode_user(item: &Item) -> Result<User, RepoError> {
    item_to_user(item).ok_or_else(|| {
        let item_id = item.get("id").and_then(|v| v.as_n().ok());
        tracing::error!(item.id = ?item_id, "DynamoDB: Failed to parse item into User");
        RepoError::BackendError(anyhow!("DynamoDB: Failed to parse user item {:?}", item_id))
    })
}
