use crate::{config::TableNames, errors::AppError};
use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client as DynamoDbClient,
};
use tracing;

/// Creates a DynamoDB table with a single hash key if it doesn't exist.
async fn create_table_if_not_exists(
    client: &DynamoDbClient,
    table_name: &str,
    key_name: &str,
    key_type: ScalarAttributeType,
) -> Result<(), AppError> {
    let result = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(key_name)
                .attribute_type(key_type)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(key_name)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;
    match result {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", table_name);
            Ok(())
        }
        Err(e) => {
            if let DynamoSdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
                    Ok(())
                } else {
                    let context = format!("Startup: Service error creating DynamoDB table '{}'", table_name);
                    tracing::error!("{}: {:?}", context, service_err);
                    Err(AppError::InitError(format!("{}: {}", context, e)))
                }
            } else {
                let context = format!("Startup: SDK error creating DynamoDB table '{}'", table_name);
                tracing::error!("{}: {}", context, e);
                Err(AppError::InitError(format!("{}: {}", context, e)))
            }
        }
    }
}

/// Initializes the DynamoDB tables backing users, memes and id counters.
pub async fn init_resources(client: &DynamoDbClient, tables: &TableNames) -> Result<(), AppError> {
    tracing::info!("Startup: Initializing DynamoDB tables...");
    create_table_if_not_exists(client, &tables.users, "id", ScalarAttributeType::N).await?;
    create_table_if_not_exists(client, &tables.memes, "id", ScalarAttributeType::N).await?;
    create_table_if_not_exists(client, &tables.counters, "name", ScalarAttributeType::S).await?;
    tracing::info!("Startup: DynamoDB table initialization complete.");
    Ok(())
}
